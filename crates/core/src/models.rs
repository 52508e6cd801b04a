use serde::{Deserialize, Deserializer};
use std::fmt;

/// `_elementType` value marking a player/device node under a session
pub const PLAYER_ELEMENT_TYPE: &str = "Player";

/// Top-level payload of `GET /status/sessions`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SessionListing {
    #[serde(rename = "_children", alias = "children")]
    pub sessions: Vec<Session>,
}

impl SessionListing {
    /// Decode a raw response body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// One active media item as reported by the server
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Session {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Movie title, or the episode title for episodes
    #[serde(default)]
    pub title: Option<String>,
    /// Show name (episodes)
    #[serde(rename = "grandparentTitle", default)]
    pub grandparent_title: Option<String>,
    /// Season number (episodes)
    #[serde(rename = "parentIndex", default, deserialize_with = "string_or_number")]
    pub parent_index: Option<String>,
    /// Episode number (episodes)
    #[serde(default, deserialize_with = "string_or_number")]
    pub index: Option<String>,
    #[serde(default)]
    pub studio: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    #[serde(rename = "_children", alias = "children")]
    pub elements: Vec<SessionElement>,
}

impl Session {
    pub fn media_kind(&self) -> Option<MediaKind> {
        self.kind.as_deref().map(MediaKind::from)
    }

    /// Nested elements whose `_elementType` is `Player`, in listing order
    pub fn players(&self) -> impl Iterator<Item = &SessionElement> {
        self.elements.iter().filter(|e| e.is_player())
    }

    /// A session is active only if at least one player is attached to it
    pub fn is_active(&self) -> bool {
        self.players().next().is_some()
    }
}

/// Element nested under a session (Player, Media, User, TranscodeSession...)
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SessionElement {
    #[serde(rename = "_elementType", default)]
    pub element_type: Option<String>,
    #[serde(rename = "machineIdentifier", default)]
    pub machine_identifier: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl SessionElement {
    pub fn is_player(&self) -> bool {
        self.element_type.as_deref() == Some(PLAYER_ELEMENT_TYPE)
    }

    pub fn player_state(&self) -> PlayerState {
        PlayerState::from(self.state.as_deref().unwrap_or_default())
    }
}

/// Session `type` discriminator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Episode,
    Movie,
    Other(String),
}

impl From<&str> for MediaKind {
    fn from(value: &str) -> Self {
        match value {
            "episode" => MediaKind::Episode,
            "movie" => MediaKind::Movie,
            other => MediaKind::Other(other.to_string()),
        }
    }
}

impl MediaKind {
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Episode => "episode",
            MediaKind::Movie => "movie",
            MediaKind::Other(kind) => kind,
        }
    }
}

/// Playback state reported for a player
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Other(String),
}

impl From<&str> for PlayerState {
    fn from(value: &str) -> Self {
        match value {
            "playing" => PlayerState::Playing,
            "paused" => PlayerState::Paused,
            other => PlayerState::Other(other.to_string()),
        }
    }
}

impl PlayerState {
    pub fn is_paused(&self) -> bool {
        matches!(self, PlayerState::Paused)
    }
}

/// Chat channel captured when the command was invoked
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelRef(String);

impl ChannelRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accept `"3"` and `3` alike; numeric fields are kept in their decimal form.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_episode_session() {
        let body = json!({
            "_children": [{
                "_elementType": "Video",
                "type": "episode",
                "title": "Pilot",
                "grandparentTitle": "Lost",
                "parentIndex": "1",
                "index": 1,
                "_children": [
                    { "_elementType": "Media" },
                    {
                        "_elementType": "Player",
                        "machineIdentifier": "xyz",
                        "title": "Living Room",
                        "platform": "Roku",
                        "state": "paused"
                    }
                ]
            }]
        });

        let listing: SessionListing = serde_json::from_value(body).unwrap();
        assert_eq!(listing.sessions.len(), 1);

        let session = &listing.sessions[0];
        assert_eq!(session.media_kind(), Some(MediaKind::Episode));
        assert_eq!(session.grandparent_title.as_deref(), Some("Lost"));
        assert_eq!(session.parent_index.as_deref(), Some("1"));
        assert_eq!(session.index.as_deref(), Some("1"));
        assert!(session.is_active());

        let players: Vec<_> = session.players().collect();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].machine_identifier.as_deref(), Some("xyz"));
        assert!(players[0].player_state().is_paused());
    }

    #[test]
    fn test_children_alias_accepted() {
        let body = br#"{"children":[{"type":"movie","children":[]}]}"#;
        let listing = SessionListing::from_slice(body).unwrap();
        assert_eq!(listing.sessions.len(), 1);
        assert!(!listing.sessions[0].is_active());
    }

    #[test]
    fn test_missing_children_is_an_error() {
        assert!(SessionListing::from_slice(br#"{"size":0}"#).is_err());
        assert!(SessionListing::from_slice(br#"{"_children":[{"type":"movie"}]}"#).is_err());
        assert!(SessionListing::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_player_state_parsing() {
        assert_eq!(PlayerState::from("playing"), PlayerState::Playing);
        assert_eq!(PlayerState::from("paused"), PlayerState::Paused);
        assert_eq!(
            PlayerState::from("buffering"),
            PlayerState::Other("buffering".to_string())
        );
        assert_eq!(SessionElement::default().player_state(), PlayerState::Other(String::new()));
    }
}
