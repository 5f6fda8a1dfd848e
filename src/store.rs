//! JSON snapshot store backing both sources of the command-line tool.
//!
//! The data directory holds one file per query family:
//!
//! - `inventory.json`: asset records
//! - `idle.json`: monthly idle snapshots
//! - `revenue.json`: invoice lines
//! - `series.json`: per-dimension monthly totals
//!
//! A missing or malformed file surfaces as [`SourceError::Connection`], which
//! makes the analytics views degrade the same way an unreachable database does.

use chrono::{
    Datelike,
    NaiveDate,
};
use fleet_analytics_engine::{
    AnalyticsSource,
    AssetRecord,
    Dimension,
    FilterSet,
    IdleRecord,
    InventorySource,
    Period,
    PeriodRow,
    RevenueRecord,
    SourceError,
};
use futures::{
    future::BoxFuture,
    FutureExt,
};
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    path::{
        Path,
        PathBuf,
    },
};

const INVENTORY_FILE: &str = "inventory.json";
const IDLE_FILE: &str = "idle.json";
const REVENUE_FILE: &str = "revenue.json";
const SERIES_FILE: &str = "series.json";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, SourceError> {
        let path = self.dir.join(file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| SourceError::Connection(format!("{}: {err}", path.display())))?;
        let records: Vec<T> = serde_json::from_slice(&bytes)
            .map_err(|err| SourceError::Connection(format!("{}: {err}", path.display())))?;
        trace!(path = %path.display(), records = records.len(), "loaded snapshot");
        Ok(records)
    }
}

impl InventorySource for SnapshotStore {
    fn fetch_active_fleet<'a>(&'a self, filter: &'a FilterSet) -> BoxFuture<'a, Result<Vec<AssetRecord>, SourceError>> {
        async move {
            let mut assets: Vec<AssetRecord> = self.load(INVENTORY_FILE).await?;
            assets.retain(|asset| {
                let status_matches = match filter.status {
                    Some(status) => asset.status == status,
                    None => asset.status.is_active(),
                };
                status_matches && filter.matches_branch(asset.branch.as_deref())
            });
            Ok(assets)
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "inventory"
    }
}

impl AnalyticsSource for SnapshotStore {
    fn fetch_idle_snapshot<'a>(
        &'a self,
        period: Period,
        _filter: &'a FilterSet,
    ) -> BoxFuture<'a, Result<Vec<IdleRecord>, SourceError>> {
        async move {
            let records: Vec<IdleRecord> = self.load(IDLE_FILE).await?;
            Ok(within_period(records, period, |record| record.period.as_str()))
        }
        .boxed()
    }

    fn fetch_revenue_snapshot<'a>(
        &'a self,
        period: Period,
        filter: &'a FilterSet,
    ) -> BoxFuture<'a, Result<Vec<RevenueRecord>, SourceError>> {
        async move {
            let records: Vec<RevenueRecord> = self.load(REVENUE_FILE).await?;
            let mut records = within_period(records, period, |record| record.period.as_str());
            records.retain(|record| filter.matches_branch(record.branch.as_deref()));
            Ok(records)
        }
        .boxed()
    }

    fn fetch_period_series(
        &self,
        dimension: Dimension,
        last_n: usize,
    ) -> BoxFuture<'_, Result<Vec<PeriodRow>, SourceError>> {
        async move {
            let rows: Vec<PeriodRow> = self.load(SERIES_FILE).await?;
            Ok(latest_per_value(rows, dimension, last_n))
        }
        .boxed()
    }

    fn name(&self) -> &'static str {
        "analytics"
    }
}

/// Parses a `YYYY-MM` period key into a running month index.
fn month_index(period: &str) -> Option<i32> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", period.trim()), "%Y-%m-%d").ok()?;
    Some(date.year() * 12 + date.month0() as i32)
}

/// Keeps the records inside `period`, counted back from the latest month
/// present. Records with an unreadable period key are kept.
fn within_period<T>(records: Vec<T>, period: Period, key: impl Fn(&T) -> &str) -> Vec<T> {
    let Some(latest) = records.iter().filter_map(|record| month_index(key(record))).max() else {
        return records;
    };
    let latest_month = (latest.rem_euclid(12) + 1) as u32;
    let earliest = latest - period.months(latest_month) as i32 + 1;

    records
        .into_iter()
        .filter(|record| month_index(key(record)).is_none_or(|month| month >= earliest))
        .collect()
}

/// Rows of `dimension`, limited to the `last_n` most recent periods per value.
fn latest_per_value(rows: Vec<PeriodRow>, dimension: Dimension, last_n: usize) -> Vec<PeriodRow> {
    let mut by_value = BTreeMap::<String, Vec<PeriodRow>>::new();
    for row in rows.into_iter().filter(|row| row.dimension == dimension) {
        by_value.entry(row.value.clone()).or_default().push(row);
    }
    by_value
        .into_values()
        .flat_map(|mut rows| {
            rows.sort_by(|a, b| b.period.cmp(&a.period));
            rows.truncate(last_n);
            rows
        })
        .collect()
}
