//! Process-wide directory of backend services
//!
//! The registry is the only shared mutable state in the core. Every mutation
//! runs under the write half of a single `RwLock`, so concurrent
//! registrations of the same name cannot lose updates, and readers always get
//! a cloned snapshot rather than a view into a collection that may change.

use crate::domain::service::{ServiceEntry, ServiceName, ServiceRegistration, ServiceStatus};
use crate::CoreError;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Whether a registration created a new entry or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationOutcome {
    /// The name was not registered before
    Created,
    /// An entry with the same name was overwritten
    Updated,
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    /// The entry as stored
    pub entry: ServiceEntry,
    /// Created or updated
    pub outcome: RegistrationOutcome,
}

/// Registry of known backend services, keyed by name, in registration order
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: RwLock<IndexMap<ServiceName, ServiceEntry>>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with seed entries.
    ///
    /// Seeds are applied in order with the same semantics as
    /// [`register_entry`](Self::register_entry); seeds without a name are
    /// rejected.
    pub fn with_seed(seed: impl IntoIterator<Item = ServiceEntry>) -> Result<Self, CoreError> {
        let mut entries = IndexMap::new();
        for entry in seed {
            entry.validate()?;
            Self::store(&mut entries, entry);
        }
        info!(count = entries.len(), "Seeded service registry");
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Validate a registration payload and store the resulting entry
    pub async fn register(&self, registration: ServiceRegistration) -> Result<Registered, CoreError> {
        let entry = registration.into_entry()?;
        self.register_entry(entry).await
    }

    /// Store an entry, replacing any entry with the same name in place
    pub async fn register_entry(&self, entry: ServiceEntry) -> Result<Registered, CoreError> {
        entry.validate()?;

        let mut entries = self.entries.write().await;
        let registered = Self::store(&mut entries, entry);

        info!(
            service = %registered.entry.name,
            address = %registered.entry.address,
            status = %registered.entry.status,
            outcome = ?registered.outcome,
            "Registered service"
        );
        Ok(registered)
    }

    /// Snapshot of every entry in first-registration order
    pub async fn list_all(&self) -> Vec<ServiceEntry> {
        let entries = self.entries.read().await;
        entries.values().cloned().collect()
    }

    /// Look up one entry by name
    pub async fn get(&self, name: &str) -> Result<ServiceEntry, CoreError> {
        let key = ServiceName::from(name);
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(key.to_string()))
    }

    /// Record an externally observed status for a registered service
    pub async fn set_status(&self, name: &str, status: ServiceStatus) -> Result<ServiceEntry, CoreError> {
        let key = ServiceName::from(name);
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&key)
            .ok_or_else(|| CoreError::NotFound(key.to_string()))?;

        entry.status = status;
        entry.updated_at = Utc::now();
        debug!(service = %key, %status, "Updated service status");
        Ok(entry.clone())
    }

    /// Remove a service, keeping the order of the remaining entries
    pub async fn deregister(&self, name: &str) -> Result<ServiceEntry, CoreError> {
        let key = ServiceName::from(name);
        let mut entries = self.entries.write().await;
        let removed = entries
            .shift_remove(&key)
            .ok_or_else(|| CoreError::NotFound(key.to_string()))?;

        info!(service = %key, "Deregistered service");
        Ok(removed)
    }

    /// Number of registered services
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no service is registered
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn store(entries: &mut IndexMap<ServiceName, ServiceEntry>, mut entry: ServiceEntry) -> Registered {
        let now = Utc::now();
        entry.updated_at = now;

        match entries.get_mut(&entry.name) {
            Some(existing) => {
                entry.registered_at = existing.registered_at;
                *existing = entry.clone();
                Registered {
                    entry,
                    outcome: RegistrationOutcome::Updated,
                }
            }
            None => {
                entry.registered_at = now;
                entries.insert(entry.name.clone(), entry.clone());
                Registered {
                    entry,
                    outcome: RegistrationOutcome::Created,
                }
            }
        }
    }
}
