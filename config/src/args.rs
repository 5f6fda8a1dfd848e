use crate::Environment;
use clap::Parser;
use std::{
    path::PathBuf,
    time::Duration,
};

/// Configuration overrides accepted on the command line.
#[derive(Parser, Debug, Clone, Default)]
pub struct Args {
    /// Additional YAML configuration file, layered over the defaults and the user config.
    #[clap(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory of the JSON snapshot store.
    #[clap(long, value_name = "DIR", env = "FLEET_ANALYTICS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Deployment environment (development or production).
    #[clap(long, value_name = "ENV", global = true)]
    pub environment: Option<Environment>,

    /// Year used as "now" when bucketing asset age.
    #[clap(long, value_name = "YEAR", global = true)]
    pub reference_year: Option<i32>,

    /// Per-query timeout for the inventory store, e.g. "30s".
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration, global = true)]
    pub inventory_timeout: Option<Duration>,

    /// Per-query timeout for the analytics store, e.g. "1m".
    #[clap(long, value_name = "DURATION", value_parser = humantime::parse_duration, global = true)]
    pub analytics_timeout: Option<Duration>,

    /// Enables debug logging.
    #[clap(short, long = "verbose", action, global = true)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(data_dir) = &self.data_dir {
                cache.insert("sources.data_dir".to_string(), data_dir.display().to_string().into());
            }
            if let Some(environment) = &self.environment {
                cache.insert("environment".to_string(), environment.to_string().into());
            }
            if let Some(year) = self.reference_year {
                cache.insert("reference_year".to_string(), i64::from(year).into());
            }
            if let Some(timeout) = self.inventory_timeout {
                cache.insert(
                    "sources.inventory.query_timeout_secs".to_string(),
                    (timeout.as_secs().max(1) as i64).into(),
                );
            }
            if let Some(timeout) = self.analytics_timeout {
                cache.insert(
                    "sources.analytics.query_timeout_secs".to_string(),
                    (timeout.as_secs().max(1) as i64).into(),
                );
            }
            Ok(cache)
        }
    }
}
