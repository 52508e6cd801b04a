use crate::directory::{ClientDirectory, SharedClientDirectory};
use crate::error::PayloadError;
use crate::models::{ChannelRef, SessionListing};
use crate::preferences::Preferences;
use crate::resolver::{resolve_payload, resolve_with, Outcome};
use crate::traits::{ActionSink, DebugSink, PreferenceStore, SessionSource};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Name of the chat command that triggers a report
pub const COMMAND_NAME: &str = "plex";

pub const NOTHING_PLAYING_NOTICE: &str = "You are not currently playing anything.";
pub const UNSUPPORTED_FORMAT_NOTICE: &str =
    "The format of the currently playing item on Plex is not currently supported.";

/// How a single invocation ended. Every variant is terminal for that
/// invocation; none of them is retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandReport {
    /// The action line was handed to the chat client
    Sent { text: String },
    NothingPlaying,
    UnsupportedFormat { kind: String },
    MalformedPayload { reason: String },
    NetworkFailure { reason: String },
}

/// The `plex` command: fetch sessions, resolve, post the result
pub struct NowPlayingCommand {
    store: Arc<dyn PreferenceStore>,
    source: Arc<dyn SessionSource>,
    actions: Arc<dyn ActionSink>,
    debug: Arc<dyn DebugSink>,
}

impl NowPlayingCommand {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        source: Arc<dyn SessionSource>,
        actions: Arc<dyn ActionSink>,
        debug: Arc<dyn DebugSink>,
    ) -> Self {
        Self {
            store,
            source,
            actions,
            debug,
        }
    }

    /// Run the command for `channel`, the channel active when it was typed.
    ///
    /// Network and payload failures produce no chat or debug output; they
    /// are logged and reported back to the caller only.
    pub async fn invoke(&self, channel: ChannelRef) -> CommandReport {
        let prefs = self.preferences().await;
        match self.fetch(&prefs).await {
            Ok(body) => {
                let outcome = resolve_payload(&body, prefs.preferred_client(), &prefs.policy());
                self.settle(outcome, &prefs, &channel).await
            }
            Err(report) => report,
        }
    }

    /// One watch tick: a single request feeds both the client directory
    /// and the now-playing report.
    ///
    /// The directory is swapped into `shared` before resolving; if the
    /// listing can't be turned into a directory the previous one stays.
    pub async fn poll(
        &self,
        shared: &SharedClientDirectory,
        channel: ChannelRef,
    ) -> CommandReport {
        let prefs = self.preferences().await;
        let body = match self.fetch(&prefs).await {
            Ok(body) => body,
            Err(report) => return report,
        };

        let listing = match SessionListing::from_slice(&body) {
            Ok(listing) => listing,
            Err(e) => return self.settle(PayloadError::from(e).into(), &prefs, &channel).await,
        };

        match shared.refresh(&listing).await {
            Ok(_) => {
                check_preferred_client(&*shared.snapshot().await, &prefs);
            }
            Err(e) => tracing::debug!("Client directory not refreshed: {}", e),
        }

        let outcome = resolve_with(&listing, prefs.preferred_client(), &prefs.policy());
        self.settle(outcome, &prefs, &channel).await
    }

    async fn fetch(&self, prefs: &Preferences) -> Result<Vec<u8>, CommandReport> {
        self.source
            .fetch_sessions(&prefs.endpoint())
            .await
            .map_err(|e| {
                tracing::warn!("Session request failed: {}", e);
                CommandReport::NetworkFailure {
                    reason: e.to_string(),
                }
            })
    }

    /// Hand a resolution to the chat client or the debug sink
    async fn settle(
        &self,
        outcome: Outcome,
        prefs: &Preferences,
        channel: &ChannelRef,
    ) -> CommandReport {
        match outcome {
            Outcome::NowPlaying(now_playing) => {
                let text = now_playing.render();
                match self.actions.send_action(&text, channel).await {
                    Ok(()) => tracing::info!("Reported now playing to {}", channel),
                    Err(e) => tracing::warn!("Failed to send action to {}: {}", channel, e),
                }
                CommandReport::Sent { text }
            }
            Outcome::NothingPlaying => {
                self.debug.report_debug(NOTHING_PLAYING_NOTICE);
                CommandReport::NothingPlaying
            }
            Outcome::UnsupportedFormat { kind } => {
                self.debug.report_debug(UNSUPPORTED_FORMAT_NOTICE);
                CommandReport::UnsupportedFormat { kind }
            }
            Outcome::MalformedPayload { reason } => {
                tracing::warn!("Unusable session listing from {}: {}", prefs.host, reason);
                CommandReport::MalformedPayload { reason }
            }
        }
    }

    /// Fetch sessions and rebuild the client directory
    pub async fn fetch_clients(&self) -> Result<ClientDirectory> {
        let prefs = self.preferences().await;
        let body = self.source.fetch_sessions(&prefs.endpoint()).await?;
        let directory = ClientDirectory::from_payload(&body)
            .context("Failed to build client directory")?;
        Ok(directory)
    }

    async fn preferences(&self) -> Preferences {
        match self.store.load().await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!("Failed to load preferences, using defaults: {}", e);
                Preferences::default()
            }
        }
    }
}

/// Log whether the preferred client is among the active ones.
/// Returns its label when it is.
fn check_preferred_client<'a>(
    directory: &'a ClientDirectory,
    prefs: &Preferences,
) -> Option<&'a str> {
    let preferred = prefs.preferred_client()?;

    match directory.label_for(preferred) {
        Some(label) => {
            tracing::debug!("Preferred client is active: {}", label);
            Some(label)
        }
        None => {
            if !directory.is_empty() {
                tracing::warn!(
                    "Preferred client {} is not among the {} active client(s)",
                    preferred,
                    directory.len()
                );
            }
            None
        }
    }
}
