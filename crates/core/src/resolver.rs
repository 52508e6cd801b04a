use crate::error::PayloadError;
use crate::models::{MediaKind, PlayerState, Session, SessionElement, SessionListing};
use std::fmt;

/// Knobs for session resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Treat the only session in the listing as the target even when its
    /// player doesn't match the preferred client
    pub single_session_fallback: bool,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            single_session_fallback: true,
        }
    }
}

/// What a now-playing session is showing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Media {
    Episode {
        show_name: String,
        season_number: String,
        episode_number: String,
        episode_title: String,
    },
    Movie {
        title: String,
        year: String,
        studio: String,
    },
}

/// The session selected for a player, ready to render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlaying {
    pub media: Media,
    pub state: PlayerState,
    pub machine_identifier: String,
}

impl NowPlaying {
    /// Render the action line sent to the channel
    pub fn render(&self) -> String {
        let line = match &self.media {
            Media::Episode {
                show_name,
                season_number,
                episode_number,
                episode_title,
            } => format!(
                "is currently watching {} Season {} Episode {} \"{}\" on Plex",
                show_name, season_number, episode_number, episode_title
            ),
            Media::Movie {
                title,
                year,
                studio,
            } => format!(
                "is currently watching {} ({}) by {} on Plex",
                title, year, studio
            ),
        };

        if self.state.is_paused() {
            format!("{} (Paused)", line)
        } else {
            line
        }
    }
}

impl fmt::Display for NowPlaying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Result of resolving a session listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    NowPlaying(NowPlaying),
    NothingPlaying,
    /// The matched session has a `type` we can't describe
    UnsupportedFormat { kind: String },
    MalformedPayload { reason: String },
}

impl Outcome {
    /// Rendered action line, if something is playing
    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::NowPlaying(now_playing) => Some(now_playing.render()),
            _ => None,
        }
    }
}

impl From<PayloadError> for Outcome {
    fn from(err: PayloadError) -> Self {
        Outcome::MalformedPayload {
            reason: err.to_string(),
        }
    }
}

/// Resolve the now-playing session for `preferred_id` using the default policy
pub fn resolve(listing: &SessionListing, preferred_id: Option<&str>) -> Outcome {
    resolve_with(listing, preferred_id, &ResolverPolicy::default())
}

/// Resolve the now-playing session for `preferred_id`.
///
/// Sessions and their players are scanned in listing order and the first
/// player that matches wins. A player matches when its machine identifier
/// equals the preferred id, or when the listing holds exactly one session
/// and the policy allows the single-session fallback. Several sessions with
/// no matching player resolve to `NothingPlaying`.
pub fn resolve_with(
    listing: &SessionListing,
    preferred_id: Option<&str>,
    policy: &ResolverPolicy,
) -> Outcome {
    let preferred = preferred_id.filter(|id| !id.is_empty());
    let sole_session = policy.single_session_fallback && listing.sessions.len() == 1;

    for session in &listing.sessions {
        for player in session.players() {
            let Some(identifier) = player.machine_identifier.as_deref() else {
                return missing("Player", "machineIdentifier").into();
            };

            if preferred == Some(identifier) || sole_session {
                tracing::debug!(
                    "Matched player {} (preferred: {:?}, sole session: {})",
                    identifier,
                    preferred,
                    sole_session
                );
                return describe(session, player, identifier);
            }
        }
    }

    tracing::debug!(
        "No player matched among {} session(s)",
        listing.sessions.len()
    );
    Outcome::NothingPlaying
}

/// Decode a raw `/status/sessions` body and resolve it
pub fn resolve_payload(
    body: &[u8],
    preferred_id: Option<&str>,
    policy: &ResolverPolicy,
) -> Outcome {
    match SessionListing::from_slice(body) {
        Ok(listing) => resolve_with(&listing, preferred_id, policy),
        Err(e) => PayloadError::from(e).into(),
    }
}

fn describe(session: &Session, player: &SessionElement, identifier: &str) -> Outcome {
    let media = match session.media_kind() {
        None => return missing("Session", "type").into(),
        Some(MediaKind::Episode) => episode(session),
        Some(MediaKind::Movie) => movie(session),
        Some(MediaKind::Other(kind)) => {
            tracing::debug!("Unsupported session type: {}", kind);
            return Outcome::UnsupportedFormat { kind };
        }
    };

    match media {
        Ok(media) => Outcome::NowPlaying(NowPlaying {
            media,
            state: player.player_state(),
            machine_identifier: identifier.to_string(),
        }),
        Err(e) => e.into(),
    }
}

fn episode(session: &Session) -> Result<Media, PayloadError> {
    Ok(Media::Episode {
        show_name: field(&session.grandparent_title, "grandparentTitle")?,
        season_number: field(&session.parent_index, "parentIndex")?,
        episode_number: field(&session.index, "index")?,
        episode_title: field(&session.title, "title")?,
    })
}

fn movie(session: &Session) -> Result<Media, PayloadError> {
    Ok(Media::Movie {
        title: field(&session.title, "title")?,
        year: field(&session.year, "year")?,
        studio: field(&session.studio, "studio")?,
    })
}

fn field(value: &Option<String>, name: &'static str) -> Result<String, PayloadError> {
    value.clone().ok_or_else(|| missing("Session", name))
}

fn missing(element: &'static str, field: &'static str) -> PayloadError {
    PayloadError::MissingField { element, field }
}
