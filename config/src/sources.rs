use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::PathBuf,
    time::Duration,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Directory of the JSON snapshot store. Falls back to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub inventory: PoolSettings,
    pub analytics: PoolSettings,
}

/// Capacity and per-query timeout of one source's connection pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub max_connections: usize,
    pub query_timeout_secs: u64,
}

impl PoolSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl SourcesConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (name, pool) in [("inventory", self.inventory), ("analytics", self.analytics)] {
            if pool.max_connections == 0 {
                return Err(format!("sources.{name}.max_connections must be at least 1"));
            }
            if pool.query_timeout_secs == 0 {
                return Err(format!("sources.{name}.query_timeout_secs must be at least 1"));
            }
        }
        Ok(())
    }
}
