//! Key-value storage port.
//!
//! The kiosk keeps two instances: a session-scoped one (cleared with the
//! kiosk session) and a durable one. Values are whole JSON documents or
//! plain strings; writers always replace a key's full value.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStorePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
