use crate::{
    cli::{
        Cli,
        Command,
        ExportKind,
    },
    report,
    store::SnapshotStore,
};
use color_eyre::Result;
use eyre::eyre;
use fleet_analytics_config::Config;
use fleet_analytics_engine::{
    AnalyticsSource,
    Analyzer,
    ExportOutcome,
    FilterSet,
    InventorySource,
    SourceCoordinator,
    SourcePool,
    ViewError,
};
use serde::Serialize;
use std::{
    path::Path,
    sync::Arc,
};

pub struct App {
    cli: Cli,
    config: Config,
    coordinator: SourceCoordinator,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = Config::new(&cli.config)?;
        let analyzer = Analyzer::from_config(&config)?;

        let store = Arc::new(SnapshotStore::new(config.data_dir()));
        info!(data_dir = %store.dir().display(), "opening snapshot store");
        let inventory = SourcePool::new(
            "inventory",
            store.clone() as Arc<dyn InventorySource>,
            config.sources.inventory,
        );
        let analytics = SourcePool::new("analytics", store as Arc<dyn AnalyticsSource>, config.sources.analytics);

        Ok(Self {
            coordinator: SourceCoordinator::new(inventory, analytics, analyzer),
            config,
            cli,
        })
    }

    pub async fn run(self) -> Result<()> {
        let filters = self.cli.filters.to_filter_set()?;
        debug!(?filters, command = ?self.cli.command, "running command");

        let metrics = self.coordinator.analyzer().metrics();
        let utilization = |value| metrics.utilization_status(value);
        let variance = |value| metrics.rate_variance_status(value);

        match &self.cli.command {
            Command::Summary => {
                let summary = self.view(self.coordinator.get_summary(&filters).await)?;
                self.emit(&summary, report::summary)
            }
            Command::Breakdown { dimensions } => {
                let rows = self.view(self.coordinator.get_breakdown(dimensions, &filters).await)?;
                self.emit(&rows, |rows| report::breakdown("BREAKDOWN", dimensions, rows, utilization))
            }
            Command::Matrix { rows, columns } => {
                let cells = self.view(self.coordinator.get_matrix(*rows, *columns, &filters).await)?;
                let title = format!("{} x {}", rows, columns).to_uppercase();
                self.emit(&cells, |cells| report::matrix(&title, cells))
            }
            Command::Fleet => {
                let view = self.view(self.coordinator.get_fleet_view(&filters).await)?;
                self.emit(&view, |view| report::fleet(view, utilization))
            }
            Command::Idle => {
                let view = self.view(self.coordinator.get_idle_view(&filters).await)?;
                self.emit(&view, report::idle)
            }
            Command::Revenue => {
                let view = self.view(self.coordinator.get_revenue_view(&filters).await)?;
                self.emit(&view, |view| report::revenue(view, variance))
            }
            Command::Trend { dimension, last_n } => {
                let view = self.view(self.coordinator.get_trend(*dimension, *last_n, &filters).await)?;
                self.emit(&view, |view| report::trend(view, utilization))
            }
            Command::Export { kind, output } => self.export(*kind, output.as_deref(), &filters).await,
        }
    }

    async fn export(&self, kind: ExportKind, output: Option<&Path>, filters: &FilterSet) -> Result<()> {
        match kind {
            ExportKind::Inventory => {
                let outcome = self.view(self.coordinator.export_inventory(filters).await)?;
                self.write_export(&outcome, output, report::inventory).await
            }
            ExportKind::CriticalIdle => {
                let outcome = self.coordinator.export_critical_idle(filters).await;
                self.write_export(&outcome, output, |units| report::idle_units("CRITICAL IDLE UNITS", units))
                    .await
            }
            ExportKind::NeverLeased => {
                let outcome = self.coordinator.export_never_leased(filters).await;
                self.write_export(&outcome, output, |units| report::idle_units("NEVER LEASED UNITS", units))
                    .await
            }
        }
    }

    async fn write_export<T: Serialize>(
        &self,
        outcome: &ExportOutcome<T>,
        output: Option<&Path>,
        table: impl FnOnce(&[T]) -> String,
    ) -> Result<()> {
        if let Some(path) = output {
            tokio::fs::write(path, serde_json::to_string_pretty(outcome)?).await?;
            info!(path = %path.display(), rows = outcome.rows().len(), "export written");
            return Ok(());
        }
        if self.cli.json {
            println!("{}", serde_json::to_string_pretty(outcome)?);
            return Ok(());
        }
        match outcome {
            ExportOutcome::Rows(rows) => print!("{}", table(rows)),
            ExportOutcome::NoData => println!("No rows match the selected filters."),
            ExportOutcome::Pending(unavailable) => println!("Export pending: {unavailable}"),
        }
        Ok(())
    }

    fn emit<T: Serialize>(&self, value: &T, table: impl FnOnce(&T) -> String) -> Result<()> {
        if self.cli.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", table(value));
        }
        Ok(())
    }

    /// Turns a failed view into the message appropriate for the environment.
    fn view<T>(&self, result: Result<T, ViewError>) -> Result<T> {
        result.map_err(|err| eyre!(err.user_message(self.config.environment)))
    }
}
