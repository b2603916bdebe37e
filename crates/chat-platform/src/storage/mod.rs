//! Byte-level key-value storage backends.

use async_trait::async_trait;
use chat_types::Result;

pub mod auto;
pub mod indexeddb;
pub mod memory;

pub use auto::open_kv;
pub use indexeddb::IndexedDbKv;
pub use memory::MemoryKv;

/// Flat key-value store beneath the session and config stores.
/// Backends differ only in persistence, never in semantics.
#[async_trait(?Send)]
pub trait KvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    fn backend_name(&self) -> &str;
}
