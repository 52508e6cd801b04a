use crate::error::PayloadError;
use crate::models::SessionListing;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shown in place of client labels when no players were found
pub const NO_CLIENTS_PLACEHOLDER: &str = "No clients found";

/// Display label -> machine identifier for every player in a listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientDirectory {
    clients: BTreeMap<String, String>,
}

impl ClientDirectory {
    /// Build a directory from every player in every session.
    ///
    /// Two players sharing a label collapse into one entry; the last one
    /// seen in listing order wins.
    pub fn from_listing(listing: &SessionListing) -> Result<Self, PayloadError> {
        let mut clients = BTreeMap::new();

        for session in &listing.sessions {
            for player in session.players() {
                let identifier = required(&player.machine_identifier, "machineIdentifier")?;
                let name = required(&player.title, "title")?;
                let platform = required(&player.platform, "platform")?;

                clients.insert(client_label(name, platform), identifier.to_string());
            }
        }

        tracing::debug!(
            "Found {} client(s) across {} session(s)",
            clients.len(),
            listing.sessions.len()
        );
        Ok(Self { clients })
    }

    pub fn from_payload(body: &[u8]) -> Result<Self, PayloadError> {
        Self::from_listing(&SessionListing::from_slice(body)?)
    }

    pub fn lookup(&self, label: &str) -> Option<&str> {
        self.clients.get(label).map(String::as_str)
    }

    /// Reverse lookup, used to show which label the stored preference belongs to
    pub fn label_for(&self, machine_identifier: &str) -> Option<&str> {
        self.clients
            .iter()
            .find(|(_, id)| id.as_str() == machine_identifier)
            .map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.clients.iter().map(|(label, id)| (label.as_str(), id.as_str()))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    /// Entries for a selection control: the labels, or a lone placeholder
    pub fn menu_labels(&self) -> Vec<&str> {
        if self.clients.is_empty() {
            vec![NO_CLIENTS_PLACEHOLDER]
        } else {
            self.labels()
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// `"{title} ({platform})"`
pub fn client_label(title: &str, platform: &str) -> String {
    format!("{} ({})", title, platform)
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, PayloadError> {
    value.as_deref().ok_or(PayloadError::MissingField {
        element: "Player",
        field,
    })
}

/// Client directory shared between a refresher and its readers.
///
/// Every refresh replaces the whole mapping; readers hold on to the
/// snapshot they took and never observe a partially rebuilt directory.
#[derive(Clone, Debug, Default)]
pub struct SharedClientDirectory {
    current: Arc<RwLock<Arc<ClientDirectory>>>,
}

impl SharedClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<ClientDirectory> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, directory: ClientDirectory) {
        let directory = Arc::new(directory);
        *self.current.write().await = directory;
    }

    /// Build from a listing, then swap; on error the previous directory stays
    pub async fn refresh(&self, listing: &SessionListing) -> Result<usize, PayloadError> {
        let directory = ClientDirectory::from_listing(listing)?;
        let count = directory.len();
        self.replace(directory).await;

        tracing::info!("Client directory refreshed: {} client(s)", count);
        Ok(count)
    }
}
