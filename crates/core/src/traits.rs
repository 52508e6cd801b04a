use crate::error::FetchError;
use crate::models::ChannelRef;
use crate::preferences::{Preferences, ServerEndpoint};
use anyhow::Result;
use async_trait::async_trait;

/// Source of raw `/status/sessions` payloads (the Plex HTTP API, a fixture...)
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Fetch the current session listing body from `endpoint`
    async fn fetch_sessions(&self, endpoint: &ServerEndpoint) -> Result<Vec<u8>, FetchError>;
}

/// Outbound chat client. Fire-and-forget: failures are logged by the caller.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn send_action(&self, text: &str, channel: &ChannelRef) -> Result<()>;
}

/// Diagnostic notices that never reach the channel
pub trait DebugSink: Send + Sync {
    fn report_debug(&self, text: &str);
}

/// Key/value preference persistence
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load preferences, defaults filled in for anything not stored
    async fn load(&self) -> Result<Preferences>;

    async fn save(&self, prefs: &Preferences) -> Result<()>;
}
