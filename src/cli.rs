use clap::{
    Parser,
    Subcommand,
    ValueEnum,
};
use eyre::eyre;
use fleet_analytics_config::{
    version,
    Args as ConfigArgs,
};
use fleet_analytics_engine::{
    filter::parse_option,
    AssetStatus,
    Dimension,
    FilterSet,
    IdleDurationBucket,
    Period,
    TypeBucket,
    UsageBucket,
};
use std::path::PathBuf;

/// Fleet utilization, idle and revenue analytics
#[derive(Parser, Debug, Clone)]
#[command(author, version = version(), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print JSON instead of tables.
    #[clap(long, action, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fleet totals with the idle and revenue summaries.
    Summary,
    /// Utilization grouped by one or two dimensions, e.g. `type,usage`.
    Breakdown {
        #[arg(value_delimiter = ',', required = true, num_args = 1..)]
        dimensions: Vec<Dimension>,
    },
    /// Cross-tab of two dimensions.
    Matrix { rows: Dimension, columns: Dimension },
    /// Totals, branch/type/usage breakdowns and the type x usage matrix.
    Fleet,
    /// Idle fleet analysis for the latest snapshot month.
    Idle,
    /// Billed versus card rate analysis.
    Revenue,
    /// Monthly utilization history per value of a dimension.
    Trend {
        dimension: Dimension,

        /// Number of most recent months to show.
        #[arg(long = "last", default_value_t = 12)]
        last_n: usize,
    },
    /// Classified rows for download.
    Export {
        kind: ExportKind,

        /// Write JSON rows to this file instead of printing a table.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Inventory,
    CriticalIdle,
    NeverLeased,
}

/// Request filters. Every option accepts `all` to clear it.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Branch name, matched case-insensitively. `UNASSIGNED` selects blank branches.
    #[clap(long, value_name = "BRANCH", global = true)]
    pub branch: Option<String>,

    /// Type bucket, e.g. DRY_VAN or SPECIALTY.
    #[clap(long = "type", value_name = "TYPE", global = true)]
    pub type_bucket: Option<String>,

    /// Usage bucket, e.g. OTR_1 or STORAGE.
    #[clap(long, value_name = "USAGE", global = true)]
    pub usage: Option<String>,

    /// Idle duration bucket: 0-6, 6-12, 12-24 or 24+.
    #[clap(long = "idle", value_name = "BUCKET", global = true)]
    pub idle_bucket: Option<String>,

    /// AVAILABLE, LEASED, or any other status for the audit population.
    #[clap(long, value_name = "STATUS", global = true)]
    pub status: Option<String>,

    /// Analytics window: LTM, YTD, LQA, L3M or L6M.
    #[clap(long, value_name = "PERIOD", global = true, default_value_t = Period::default())]
    pub period: Period,
}

impl FilterArgs {
    pub fn to_filter_set(&self) -> eyre::Result<FilterSet> {
        let mut filters = FilterSet {
            period: self.period,
            ..FilterSet::default()
        };
        if let Some(branch) = self.branch.as_deref().filter(|branch| !is_all(branch)) {
            filters = filters.with_branch(branch.trim());
        }
        if let Some(raw) = &self.type_bucket {
            filters.type_bucket = parse_option::<TypeBucket>(raw).map_err(|err| eyre!("invalid type '{raw}': {err}"))?;
        }
        if let Some(raw) = &self.usage {
            filters.usage = parse_option::<UsageBucket>(raw).map_err(|err| eyre!("invalid usage '{raw}': {err}"))?;
        }
        if let Some(raw) = &self.idle_bucket {
            filters.idle_bucket =
                parse_option::<IdleDurationBucket>(raw).map_err(|err| eyre!("invalid idle bucket '{raw}': {err}"))?;
        }
        if let Some(raw) = &self.status {
            filters.status = parse_option::<AssetStatus>(raw).map_err(|err| eyre!("invalid status '{raw}': {err}"))?;
        }
        Ok(filters)
    }
}

fn is_all(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("all")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fleet-analytics").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn filters_translate_to_a_filter_set() {
        let cli = parse(&[
            "breakdown",
            "type,usage",
            "--branch",
            " dallas ",
            "--type",
            "dry_van",
            "--usage",
            "otr_1",
            "--period",
            "ytd",
        ]);
        let Command::Breakdown { dimensions } = &cli.command else {
            panic!("expected a breakdown, got {:?}", cli.command);
        };
        assert_eq!(dimensions, &vec![Dimension::Type, Dimension::Usage]);

        let filters = cli.filters.to_filter_set().unwrap();
        assert_eq!(
            filters,
            FilterSet::default()
                .with_branch("dallas")
                .with_type(TypeBucket::DryVan)
                .with_usage(UsageBucket::Otr1)
                .with_period(Period::Ytd)
        );
    }

    #[test]
    fn all_clears_a_filter() {
        let cli = parse(&["summary", "--branch", "all", "--usage", "ALL", "--status", "all"]);
        assert_eq!(cli.filters.to_filter_set().unwrap(), FilterSet::default());
    }

    #[test]
    fn retired_status_selects_the_audit_population() {
        let cli = parse(&["export", "inventory", "--status", "sold"]);
        let filters = cli.filters.to_filter_set().unwrap();
        assert_eq!(filters.status, Some(AssetStatus::Other));
        assert!(matches!(
            cli.command,
            Command::Export {
                kind: ExportKind::Inventory,
                output: None
            }
        ));
    }

    #[test]
    fn unknown_usage_is_rejected() {
        let cli = parse(&["fleet", "--usage", "OTR_9"]);
        assert!(cli.filters.to_filter_set().is_err());
    }

    #[test]
    fn trend_defaults_to_a_year() {
        let cli = parse(&["trend", "branch"]);
        assert!(matches!(
            cli.command,
            Command::Trend {
                dimension: Dimension::Branch,
                last_n: 12
            }
        ));
    }
}
