use crate::error::PreferenceError;
use crate::resolver::ResolverPolicy;
use crate::traits::PreferenceStore;
use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 32400;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Keys under which preferences are persisted
pub mod keys {
    pub const HOST: &str = "host";
    pub const PORT: &str = "port";
    pub const PREFERRED_CLIENT_ID: &str = "preferredClientId";
    pub const SINGLE_SESSION_FALLBACK: &str = "singleSessionFallback";
    pub const REQUEST_TIMEOUT_SECS: &str = "requestTimeoutSecs";
}

/// Connection settings and the preferred client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preferences {
    pub host: String,
    pub port: u16,
    /// Machine identifier of the preferred player; empty for no preference
    pub preferred_client_id: String,
    pub single_session_fallback: bool,
    pub request_timeout_secs: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            preferred_client_id: String::new(),
            single_session_fallback: true,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Preferences {
    pub fn preferred_client(&self) -> Option<&str> {
        Some(self.preferred_client_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            single_session_fallback: self.single_session_fallback,
        }
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint {
            host: self.host.clone(),
            port: self.port,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn set_host(&mut self, host: &str) -> Result<(), PreferenceError> {
        let host = host.trim();
        validate_host(host)?;
        self.host = host.to_string();
        Ok(())
    }

    pub fn set_port(&mut self, port: &str) -> Result<(), PreferenceError> {
        self.port = parse_port(port)?;
        Ok(())
    }

    pub fn set_request_timeout(&mut self, secs: &str) -> Result<(), PreferenceError> {
        self.request_timeout_secs = match secs.trim().parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => return Err(PreferenceError::InvalidTimeout(secs.to_string())),
        };
        Ok(())
    }

    /// Flatten into key/value pairs for a string-typed store
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::HOST, self.host.clone()),
            (keys::PORT, self.port.to_string()),
            (keys::PREFERRED_CLIENT_ID, self.preferred_client_id.clone()),
            (keys::SINGLE_SESSION_FALLBACK, self.single_session_fallback.to_string()),
            (keys::REQUEST_TIMEOUT_SECS, self.request_timeout_secs.to_string()),
        ]
    }

    /// Rebuild from stored pairs; unknown keys are ignored and unreadable
    /// values fall back to their defaults.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut prefs = Preferences::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let applied = match key {
                keys::HOST => prefs.set_host(value).is_ok(),
                keys::PORT => prefs.set_port(value).is_ok(),
                keys::PREFERRED_CLIENT_ID => {
                    prefs.preferred_client_id = value.to_string();
                    true
                }
                keys::SINGLE_SESSION_FALLBACK => match value.parse::<bool>() {
                    Ok(enabled) => {
                        prefs.single_session_fallback = enabled;
                        true
                    }
                    Err(_) => false,
                },
                keys::REQUEST_TIMEOUT_SECS => prefs.set_request_timeout(value).is_ok(),
                _ => true,
            };

            if !applied {
                tracing::warn!("Ignoring stored preference {}={:?}", key, value);
            }
        }

        prefs
    }
}

/// Where and how long to ask for sessions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl ServerEndpoint {
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    pub fn sessions_url(&self) -> String {
        format!("{}/status/sessions", self.base_url())
    }
}

/// Accept IP literals and RFC 1123 host names
pub fn validate_host(host: &str) -> Result<(), PreferenceError> {
    let invalid = || PreferenceError::InvalidHost(host.to_string());

    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if host.is_empty() || host.len() > 253 {
        return Err(invalid());
    }

    let name = host.strip_suffix('.').unwrap_or(host);
    let valid = name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    if valid {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Digits only, fewer than 7 characters, greater than 1
pub fn parse_port(value: &str) -> Result<u16, PreferenceError> {
    let invalid = || PreferenceError::InvalidPort(value.to_string());
    let trimmed = value.trim();

    if trimmed.is_empty() || trimmed.len() >= 7 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    match trimmed.parse::<u16>() {
        Ok(port) if port > 1 => Ok(port),
        _ => Err(invalid()),
    }
}

/// Process-local store, for front ends without persistence and for tests
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    prefs: RwLock<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs: RwLock::new(prefs),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Preferences> {
        Ok(self.prefs.read().await.clone())
    }

    async fn save(&self, prefs: &Preferences) -> Result<()> {
        *self.prefs.write().await = prefs.clone();
        Ok(())
    }
}
