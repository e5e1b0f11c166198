//! # Cart Persistence
//!
//! Key/value storage for the storefront cart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key "cart" ─► [ { ...productFields, "quantity": 2 }, ... ]             │
//! │                                                                         │
//! │  JsonFileStore: {data_dir}/cart.json                                    │
//! │  MemoryStore:   HashMap, for tests and private browsing                 │
//! │                                                                         │
//! │  missing   ─► empty cart                                                │
//! │  corrupt   ─► empty cart + warn!                                        │
//! │  unreadable ─► empty cart + warn!                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The POS cart is never persisted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use pharmapos_core::CartLine;

use crate::config::PosConfig;
use crate::error::{SessionError, SessionResult};

/// Raw string storage keyed by name.
pub trait CartStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> SessionResult<Option<String>>;

    fn save(&self, key: &str, value: &str) -> SessionResult<()>;

    fn remove(&self, key: &str) -> SessionResult<()>;
}

/// Keys are non-empty `[A-Za-z0-9_-]`, so they map to a single file name.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// =============================================================================
// File Store
// =============================================================================

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    /// Store under the configured data directory, or the platform default.
    pub fn from_config(config: &PosConfig) -> SessionResult<Self> {
        config
            .data_dir()
            .map(Self::new)
            .ok_or_else(|| SessionError::Storage("No data directory available".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> SessionResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(SessionError::Storage(format!("Invalid storage key: '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl CartStore for JsonFileStore {
    fn load(&self, key: &str) -> SessionResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> SessionResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write then rename so a crash never leaves a half-written cart.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for MemoryStore {
    fn load(&self, key: &str) -> SessionResult<Option<String>> {
        let entries = self.entries.lock().expect("Store mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> SessionResult<()> {
        let mut entries = self.entries.lock().expect("Store mutex poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        let mut entries = self.entries.lock().expect("Store mutex poisoned");
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Cart Serialization
// =============================================================================

/// Reads the stored cart. Never fails: anything unusable is an empty cart.
pub fn load_lines(store: &dyn CartStore, key: &str) -> Vec<CartLine> {
    let raw = match store.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored cart");
            return Vec::new();
        }
        Err(e) => {
            warn!(key, error = %e, "Stored cart unreadable, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<CartLine>>(&raw) {
        Ok(lines) => {
            debug!(key, lines = lines.len(), "Stored cart restored");
            lines
        }
        Err(e) => {
            warn!(key, error = %e, "Stored cart corrupt, starting empty");
            Vec::new()
        }
    }
}

/// Writes the cart as a JSON list of `{...product, quantity}`.
pub fn save_lines(store: &dyn CartStore, key: &str, lines: &[CartLine]) -> SessionResult<()> {
    let json = serde_json::to_string(lines)?;
    store.save(key, &json)
}

// =============================================================================
// Unit Tests
// =============================================================================
