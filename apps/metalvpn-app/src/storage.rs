use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{OperationRecord, MAX_AMOUNT};

pub const MAX_KEY_LEN: usize = 100;
pub const MAX_VALUE_BYTES: usize = 1_000_000;
pub const MAX_OPERATIONS: usize = 1000;

pub mod keys {
    pub const CURRENT_VIEW: &str = "currentView";
    pub const LANGUAGE: &str = "language";
    pub const CURRENCY: &str = "currency";
    pub const SELECTED_PROTOCOL: &str = "selectedProtocol";
    pub const SELECTED_LOCATION: &str = "selectedLocation";
    pub const SELECTED_DEVICES: &str = "selectedDevices";
    pub const SELECTED_PERIOD: &str = "selectedPeriod";
    pub const OPERATIONS: &str = "operations";
}

/// Small persisted key/value store for UI preferences and the operations
/// cache. Nothing in here is authoritative: every read validates the shape
/// and falls back to a default.
#[derive(Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Arc<RwLock<Map<String, Value>>>,
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().count() <= MAX_KEY_LEN
}

/// Checks the key and the serialized size before anything is written.
fn encode<T: Serialize>(key: &str, value: &T) -> Option<Value> {
    if !valid_key(key) {
        warn!("Invalid storage key");
        return None;
    }
    let value = match serde_json::to_value(value) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to serialize value for {}: {}", key, e);
            return None;
        }
    };
    if value.to_string().len() > MAX_VALUE_BYTES {
        warn!("Storage data too large for {}", key);
        return None;
    }
    Some(value)
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Arc::new(RwLock::new(Map::new())),
        }
    }

    /// Opens the store backed by `path`. A missing or unreadable file gives an
    /// empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => {
                    debug!("Loaded {} stored keys from {}", map.len(), path.display());
                    map
                }
                Ok(_) => {
                    warn!("Storage file {} is not an object, starting empty", path.display());
                    Map::new()
                }
                Err(e) => {
                    warn!("Storage file {} is corrupt ({}), starting empty", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!("Failed to read storage file {}: {}", path.display(), e);
                Map::new()
            }
        };

        Self {
            path: Some(path),
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let Some(value) = encode(key, value) else {
            return false;
        };
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    pub async fn load_raw(&self, key: &str) -> Option<Value> {
        if !valid_key(key) {
            return None;
        }
        let entries = self.entries.read().await;
        let value = entries.get(key)?;
        if value.to_string().len() > MAX_VALUE_BYTES {
            warn!("Storage data too large for {}", key);
            return None;
        }
        Some(value.clone())
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key).await?;
        match serde_json::from_value(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Stored value for {} has unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub async fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).await.unwrap_or(default)
    }

    /// Reads the cached history. A value that is not a list is wiped; entries
    /// that do not parse or carry an impossible amount are skipped.
    pub async fn load_operations(&self) -> Vec<OperationRecord> {
        let mut entries = self.entries.write().await;
        self.operations_in(&mut entries).await
    }

    /// Prepends `record` and drops whatever falls past the cap. The whole
    /// read-modify-write happens under one write lock.
    pub async fn push_operation(&self, record: OperationRecord) -> Vec<OperationRecord> {
        let mut entries = self.entries.write().await;
        let mut ops = self.operations_in(&mut entries).await;
        ops.insert(0, record);
        ops.truncate(MAX_OPERATIONS);
        if let Some(value) = encode(keys::OPERATIONS, &ops) {
            entries.insert(keys::OPERATIONS.to_string(), value);
            self.persist(&entries).await;
        }
        ops
    }

    pub async fn replace_operations(&self, mut ops: Vec<OperationRecord>) -> Vec<OperationRecord> {
        ops.truncate(MAX_OPERATIONS);
        self.save(keys::OPERATIONS, &ops).await;
        ops
    }

    async fn operations_in(&self, entries: &mut Map<String, Value>) -> Vec<OperationRecord> {
        match entries.get(keys::OPERATIONS) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| OperationRecord::deserialize(item).ok())
                .filter(|op| op.amount <= MAX_AMOUNT)
                .take(MAX_OPERATIONS)
                .collect(),
            Some(_) => {
                warn!("Invalid operations data, resetting");
                entries.insert(keys::OPERATIONS.to_string(), Value::Array(Vec::new()));
                self.persist(entries).await;
                Vec::new()
            }
        }
    }

    async fn persist(&self, entries: &Map<String, Value>) -> bool {
        let Some(path) = &self.path else {
            return true;
        };
        let body = match serde_json::to_string(entries) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize storage: {}", e);
                return false;
            }
        };
        match tokio::fs::write(path, body).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write storage file {}: {}", path.display(), e);
                false
            }
        }
    }
}
