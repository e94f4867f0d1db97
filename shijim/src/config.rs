//! Aggregated bootstrap configuration: every `shijim-core::config`
//! section loaded together, plus the startup jitter scalar.

use shijim_core::config::{BusConfig, ColumnarConfig, ShardEnvConfig, StorageConfig, UniverseEnvConfig};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bus: BusConfig,
    pub storage: StorageConfig,
    pub columnar: ColumnarConfig,
    pub shard: ShardEnvConfig,
    pub universe: UniverseEnvConfig,
    pub startup_jitter: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bus: BusConfig::from_env(),
            storage: StorageConfig::from_env(),
            columnar: ColumnarConfig::from_env(),
            shard: ShardEnvConfig::from_env(),
            universe: UniverseEnvConfig::from_env(),
            startup_jitter: Duration::from_secs_f64(shijim_core::config::startup_jitter_seconds().max(0.0)),
        }
    }
}
