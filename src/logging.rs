use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

const CRATES: [&str; 3] = ["fleet_analytics", "fleet_analytics_engine", "fleet_analytics_config"];

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` overrides
/// the default filter.
pub fn init_logging(verbose: bool) -> eyre::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(CRATES.map(|krate| format!("{krate}={level}")).join(","))?,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}
