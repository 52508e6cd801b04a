//! HTTP tests for the Plex sessions client

use plexnp_core::{
    resolve, ClientDirectory, FetchError, Preferences, ServerEndpoint, SessionSource,
};
use plexnp_device_plex::PlexController;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint_for(server: &MockServer) -> ServerEndpoint {
    let address = server.address();
    let mut prefs = Preferences::default();
    prefs.host = address.ip().to_string();
    prefs.port = address.port();
    prefs.request_timeout_secs = 2;
    prefs.endpoint()
}

fn sessions_json() -> serde_json::Value {
    json!({
        "_elementType": "MediaContainer",
        "size": 1,
        "_children": [{
            "_elementType": "Video",
            "type": "movie",
            "title": "Arrival",
            "studio": "Paramount",
            "year": 2016,
            "_children": [
                { "_elementType": "Media", "videoResolution": "1080" },
                { "_elementType": "User", "title": "alex" },
                {
                    "_elementType": "Player",
                    "machineIdentifier": "abc",
                    "title": "Living Room",
                    "platform": "Roku",
                    "state": "playing"
                }
            ]
        }]
    })
}

#[tokio::test]
async fn test_fetch_sessions_requests_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/sessions"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sessions_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let controller = PlexController::new().unwrap();
    let listing = controller.get_sessions(&endpoint_for(&mock_server)).await.unwrap();

    assert_eq!(listing.sessions.len(), 1);
    assert_eq!(
        resolve(&listing, None).message().as_deref(),
        Some("is currently watching Arrival (2016) by Paramount on Plex")
    );

    let directory = ClientDirectory::from_listing(&listing).unwrap();
    assert_eq!(directory.lookup("Living Room (Roku)"), Some("abc"));
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/sessions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let controller = PlexController::new().unwrap();
    let result = controller.fetch_sessions(&endpoint_for(&mock_server)).await;

    assert!(matches!(result, Err(FetchError::Status { status: 401, .. })));
}

#[tokio::test]
async fn test_empty_body_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/sessions"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let controller = PlexController::new().unwrap();
    let result = controller.fetch_sessions(&endpoint_for(&mock_server)).await;

    assert!(matches!(result, Err(FetchError::EmptyBody { .. })));
}

#[tokio::test]
async fn test_slow_server_hits_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/sessions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sessions_json())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let controller = PlexController::new().unwrap();
    let mut endpoint = endpoint_for(&mock_server);
    endpoint.timeout = Duration::from_millis(200);

    let result = controller.fetch_sessions(&endpoint).await;
    assert!(matches!(result, Err(FetchError::Transport { .. })));
}

#[tokio::test]
async fn test_unavailable_server_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/sessions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let controller = PlexController::new().unwrap();
    let result = controller.fetch_sessions(&endpoint_for(&mock_server)).await;

    match result {
        Err(FetchError::Status { url, status }) => {
            assert_eq!(status, 503);
            assert!(url.ends_with("/status/sessions"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refused_connection_is_a_transport_error() {
    let controller = PlexController::new().unwrap();
    let endpoint = ServerEndpoint {
        host: "127.0.0.1".to_string(),
        port: 9,
        timeout: Duration::from_millis(500),
    };

    let result = controller.fetch_sessions(&endpoint).await;
    assert!(matches!(result, Err(FetchError::Transport { .. })));
}
