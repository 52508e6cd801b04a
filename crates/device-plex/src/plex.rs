use anyhow::{Context, Result};
use async_trait::async_trait;
use plexnp_core::{
    FetchError, ServerEndpoint, SessionListing, SessionSource, DEFAULT_TIMEOUT_SECS,
};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

/// Plex Media Server HTTP client
///
/// Sessions are read from `http://{host}:{port}/status/sessions` with
/// `Accept: application/json`. Each request carries the endpoint's own
/// timeout; failures are returned as-is and never retried.
pub struct PlexController {
    client: Client,
}

impl PlexController {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("plexnp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch and decode the session listing
    pub async fn get_sessions(&self, endpoint: &ServerEndpoint) -> Result<SessionListing> {
        let body = self.fetch_sessions(endpoint).await?;
        let listing = SessionListing::from_slice(&body)
            .context("Failed to parse /status/sessions response")?;

        tracing::debug!(
            "Server at {} reports {} session(s)",
            endpoint.host,
            listing.sessions.len()
        );
        Ok(listing)
    }
}

#[async_trait]
impl SessionSource for PlexController {
    async fn fetch_sessions(&self, endpoint: &ServerEndpoint) -> Result<Vec<u8>, FetchError> {
        let url = endpoint.sessions_url();
        tracing::debug!("Plex API call: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(endpoint.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Plex API returned status: {}", status);
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if body.is_empty() {
            return Err(FetchError::EmptyBody { url });
        }

        tracing::debug!("Plex API response: {} bytes", body.len());
        Ok(body.to_vec())
    }
}
