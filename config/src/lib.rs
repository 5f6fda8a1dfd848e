#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod environment;
mod rules;
mod sources;
mod thresholds;

pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::Args;
use config::builder::{
    ConfigBuilder,
    DefaultState,
};
pub use environment::Environment;
pub use rules::{
    normalize_label,
    BucketRules,
    InvalidRules,
    TypeSynonym,
};
use serde::{
    Deserialize,
    Serialize,
};
pub use sources::{
    PoolSettings,
    SourcesConfig,
};
use std::path::PathBuf;
pub use thresholds::{
    IdleStatusThresholds,
    RatioThresholds,
    Thresholds,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the current calendar year when bucketing asset age.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_year: Option<i32>,
    pub thresholds: Thresholds,
    pub rules: BucketRules,
    pub sources: SourcesConfig,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    /// Layers the embedded defaults, the user's `config.yaml`, an explicit
    /// `--config` file, `FLEET_ANALYTICS_*` environment variables and the
    /// command line, in that order.
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        let config_dir = get_config_dir();
        let mut builder = Self::defaults();

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        if let Some(path) = &args.config {
            debug!(path = %path.display(), "adding explicit configuration file");
            builder = builder.add_source(config::File::from(path.clone()).format(config::FileFormat::Yaml));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FLEET_ANALYTICS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = Self::with_args(builder, args)?;
        info!(
            environment = %cfg.environment,
            rules_version = cfg.rules.version,
            "configuration loaded"
        );
        Ok(cfg)
    }

    fn defaults() -> ConfigBuilder<DefaultState> {
        config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
    }

    /// Puts the command line on top of `builder` and validates the result.
    fn with_args(builder: ConfigBuilder<DefaultState>, args: &Args) -> Result<Self, config::ConfigError> {
        let cfg: Self = builder.add_source(args.clone()).build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.thresholds.validate().map_err(config::ConfigError::Message)?;
        self.rules
            .validate()
            .map_err(|err| config::ConfigError::Message(err.to_string()))?;
        self.sources.validate().map_err(config::ConfigError::Message)?;
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.sources.data_dir.clone().unwrap_or_else(get_data_dir)
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = get_config_dir().display().to_string();
    let data_dir_path = get_data_dir().display().to_string();

    format!(
        "\
Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}"
    )
}
