//! Counter store backends.
//!
//! With `[store] url` set, counters and the heartbeat go to a Redis-compatible
//! server through [`RespStore`]. Without it they stay in process memory.

pub mod endpoint;
pub mod resp;

use std::sync::Arc;

use tracing::{info, warn};

use jabbot_core::{BoxedStore, MemoryStore, StoreResult};

use crate::config::StoreConfig;

pub use endpoint::StoreEndpoint;
pub use resp::{Reply, RespStore};

/// Builds the store described by the configuration.
pub fn select_store(config: &StoreConfig) -> StoreResult<BoxedStore> {
    match &config.url {
        Some(url) => {
            let endpoint = StoreEndpoint::parse(url)?;
            info!(%endpoint, "Using external counter store");
            let store = RespStore::new(endpoint)
                .with_connect_timeout(config.connect_timeout())
                .with_command_timeout(config.command_timeout());
            Ok(Arc::new(store))
        }
        None => {
            warn!("No store URL configured, usage counters and heartbeat are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_store() {
        assert!(select_store(&StoreConfig::default()).is_ok());

        let config = StoreConfig {
            url: Some("redis://localhost:6379".into()),
            ..Default::default()
        };
        assert!(select_store(&config).is_ok());

        let config = StoreConfig {
            url: Some("memcached://localhost".into()),
            ..Default::default()
        };
        assert!(select_store(&config).is_err());
    }
}
