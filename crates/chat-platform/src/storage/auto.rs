//! Storage backend selection.
//!
//! `Auto` priority: IndexedDB → Memory (fallback). An explicit preference
//! is honored without fallback so a misconfigured backend is visible.

use std::rc::Rc;

use chat_types::{config::StorageBackendType, Result};

use super::{IndexedDbKv, KvStore, MemoryKv};

/// Open the configured storage backend.
/// Returns a trait object so callers are backend-agnostic.
pub async fn open_kv(preference: StorageBackendType) -> Result<Rc<dyn KvStore>> {
    match preference {
        StorageBackendType::Memory => Ok(Rc::new(MemoryKv::new())),
        StorageBackendType::IndexedDb => {
            let idb = IndexedDbKv::open().await?;
            Ok(Rc::new(idb))
        }
        StorageBackendType::Auto => match IndexedDbKv::open().await {
            Ok(idb) => {
                log::info!("Storage backend: IndexedDB");
                Ok(Rc::new(idb))
            }
            Err(e) => {
                log::warn!("IndexedDB unavailable ({}), falling back to memory", e);
                Ok(Rc::new(MemoryKv::new()))
            }
        },
    }
}
