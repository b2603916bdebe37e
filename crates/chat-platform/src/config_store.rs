//! Application config persistence, same KV backend as the sessions.

use chat_types::{config::AppConfig, Result};

use crate::storage::KvStore;

pub const CONFIG_KEY: &str = "chat:config";

/// Load the stored config, or the defaults when nothing (readable) is
/// stored. The default config has an empty API key, which the gateway
/// reports as a configuration error.
pub async fn load_config(kv: &dyn KvStore) -> AppConfig {
    let bytes = match kv.get(CONFIG_KEY).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return AppConfig::default(),
        Err(e) => {
            log::warn!("could not read stored config: {e}");
            return AppConfig::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("stored config is unreadable, using defaults: {e}");
            AppConfig::default()
        }
    }
}

pub async fn save_config(kv: &dyn KvStore, config: &AppConfig) -> Result<()> {
    let bytes = serde_json::to_vec(config)?;
    kv.set(CONFIG_KEY, &bytes).await
}
