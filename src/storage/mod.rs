//! Persistent key-value stores that hold the session fields.
//!
//! `SessionStore` never touches a backend directly; it is handed
//! something implementing [`KeyValueStore`]:
//! - `MemoryStore`: in-process map, shared between clones
//! - `FileStore`: JSON file in the cache directory, survives restarts
//! - `KeychainStore`: one OS keychain entry per key

pub mod file;
pub mod keychain;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;

pub use file::FileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// Get/set/remove by key.
///
/// Reads are infallible: a value that cannot be read is reported as absent
/// and the failure is logged by the backend.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a key that is not present succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
