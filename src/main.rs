use clap::Parser;
use color_eyre::Result;
use fleet_analytics::{
    init_errors,
    init_logging,
    App,
    Cli,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let cli = Cli::parse();
    init_logging(cli.config.verbose)?;
    App::new(cli)?.run().await
}
