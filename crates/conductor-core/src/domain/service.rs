//! Service registry domain models
//!
//! A [`ServiceEntry`] describes one backend service known to the coordinator.
//! Entries are produced from a [`ServiceRegistration`], which is the loosely
//! shaped input accepted over the wire and from seed files.

use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Value object: Service name, the registry's only key.
///
/// Surrounding whitespace is not part of the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Build a name, trimming surrounding whitespace
    pub fn new(name: &str) -> Self {
        ServiceName(name.trim().to_string())
    }

    /// Whether nothing but whitespace was given
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        ServiceName::new(name)
    }
}

impl From<String> for ServiceName {
    fn from(name: String) -> Self {
        ServiceName::new(&name)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

/// Last externally reported status of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Service reported healthy
    Healthy,

    /// Service reported unhealthy
    Unhealthy,

    /// No status reported, or a status string we do not recognise
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Unhealthy => "unhealthy",
        };
        f.write_str(label)
    }
}

/// Descriptive metadata value: either text or a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Text value such as a description or version string
    Text(String),
    /// Numeric value
    Number(serde_json::Number),
}

impl MetadataValue {
    /// Convert a JSON value, keeping only strings and numbers
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(MetadataValue::Text(text)),
            Value::Number(number) => Some(MetadataValue::Number(number)),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Text(text) => f.write_str(text),
            MetadataValue::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(text: &str) -> Self {
        MetadataValue::Text(text.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(text: String) -> Self {
        MetadataValue::Text(text)
    }
}

impl From<u64> for MetadataValue {
    fn from(number: u64) -> Self {
        MetadataValue::Number(number.into())
    }
}

impl From<i64> for MetadataValue {
    fn from(number: i64) -> Self {
        MetadataValue::Number(number.into())
    }
}

/// Entity: a backend service known to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Unique name
    pub name: ServiceName,

    /// Host and port, or a full URL
    pub address: String,

    /// Last externally supplied status
    #[serde(default)]
    pub status: ServiceStatus,

    /// Descriptive fields (description, version, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,

    /// When the name was first registered
    pub registered_at: DateTime<Utc>,

    /// When the entry was last written
    pub updated_at: DateTime<Utc>,
}

impl ServiceEntry {
    /// Create a new entry with unknown status and no metadata
    pub fn new(name: impl Into<ServiceName>, address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            address: address.into(),
            status: ServiceStatus::Unknown,
            metadata: BTreeMap::new(),
            registered_at: now,
            updated_at: now,
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: ServiceStatus) -> Self {
        self.status = status;
        self
    }

    /// Add a metadata field
    pub fn with_metadata(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The `description` metadata field, if present
    pub fn description(&self) -> Option<String> {
        self.metadata.get("description").map(|value| value.to_string())
    }

    /// Reject entries the registry cannot key
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(CoreError::InvalidEntry(
                "missing required field 'name'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Registration input as received from callers and seed files.
///
/// Every field is optional at parse time so that a payload without a name can
/// be rejected with [`CoreError::InvalidEntry`] instead of a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRegistration {
    /// Service name (required)
    #[serde(default)]
    pub name: Option<String>,

    /// Host and port, or a full URL
    #[serde(default)]
    pub address: Option<String>,

    /// Port on localhost, used when no address is given
    #[serde(default)]
    pub port: Option<u16>,

    /// Reported status
    #[serde(default)]
    pub status: Option<ServiceStatus>,

    /// Explicit metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,

    /// Any other top-level fields; strings and numbers become metadata
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ServiceRegistration {
    /// Start a registration for the given name
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Validate the input and build the entry it describes
    pub fn into_entry(self) -> Result<ServiceEntry, CoreError> {
        let name = self
            .name
            .map(ServiceName::from)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CoreError::InvalidEntry("missing required field 'name'".to_string()))?;

        let address = match (self.address, self.port) {
            (Some(address), _) => address,
            (None, Some(port)) => format!("localhost:{}", port),
            (None, None) => String::new(),
        };

        let mut metadata = BTreeMap::new();
        for (key, value) in self.extra {
            match MetadataValue::from_json(value) {
                Some(value) => {
                    metadata.insert(key, value);
                }
                None => debug!(service = %name, field = %key, "Ignoring non-scalar registration field"),
            }
        }
        metadata.extend(self.metadata);

        let mut entry = ServiceEntry::new(name, address);
        entry.status = self.status.unwrap_or_default();
        entry.metadata = metadata;
        Ok(entry)
    }
}
