use anyhow::Result;
use async_trait::async_trait;
use plexnp_core::{parse_port, validate_host, PreferenceStore, Preferences};
use std::sync::Arc;

/// Connection settings given on the command line for one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

impl ServerOverrides {
    /// Validate raw flag values with the same rules as stored preferences
    pub fn parse(
        host: Option<&str>,
        port: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        if let Some(host) = host {
            validate_host(host)?;
        }
        let port = port.map(parse_port).transpose()?;
        if timeout_secs == Some(0) {
            anyhow::bail!("Request timeout must be at least one second");
        }

        Ok(Self {
            host: host.map(str::to_string),
            port,
            timeout_secs,
        })
    }

    fn apply(&self, prefs: &mut Preferences) {
        if let Some(host) = &self.host {
            prefs.host = host.clone();
        }
        if let Some(port) = self.port {
            prefs.port = port;
        }
        if let Some(secs) = self.timeout_secs {
            prefs.request_timeout_secs = secs;
        }
    }
}

/// Stored preferences with command-line overrides laid over them.
/// Overrides are never written back.
pub struct OverrideStore {
    inner: Arc<dyn PreferenceStore>,
    overrides: ServerOverrides,
}

impl OverrideStore {
    pub fn new(inner: Arc<dyn PreferenceStore>, overrides: ServerOverrides) -> Self {
        Self { inner, overrides }
    }
}

#[async_trait]
impl PreferenceStore for OverrideStore {
    async fn load(&self) -> Result<Preferences> {
        let mut prefs = self.inner.load().await?;
        self.overrides.apply(&mut prefs);
        Ok(prefs)
    }

    async fn save(&self, prefs: &Preferences) -> Result<()> {
        self.inner.save(prefs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexnp_core::MemoryPreferenceStore;

    #[test]
    fn test_overrides_are_validated() {
        assert!(ServerOverrides::parse(Some("bad host"), None, None).is_err());
        assert!(ServerOverrides::parse(None, Some("1"), None).is_err());
        assert!(ServerOverrides::parse(None, None, Some(0)).is_err());

        let overrides = ServerOverrides::parse(Some("nas.lan"), Some("32401"), Some(3)).unwrap();
        assert_eq!(overrides.port, Some(32401));
    }

    #[tokio::test]
    async fn test_overrides_apply_on_load_only() {
        let inner = Arc::new(MemoryPreferenceStore::default());
        let overrides = ServerOverrides::parse(Some("nas.lan"), None, None).unwrap();
        let store = OverrideStore::new(inner.clone(), overrides);

        assert_eq!(store.load().await.unwrap().host, "nas.lan");
        assert_eq!(inner.load().await.unwrap().host, "127.0.0.1");
    }
}
