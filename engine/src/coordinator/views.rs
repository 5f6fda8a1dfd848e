use crate::{
    aggregate::{
        BreakdownRow,
        ClassifiedAsset,
        GlobalTotals,
        MatrixCell,
    },
    buckets::{
        branch_label,
        AssetStatus,
        Dimension,
        LengthBucket,
        TypeBucket,
        UsageBucket,
    },
    error::{
        serialize_secondary,
        Secondary,
        Unavailable,
    },
    idle::{
        IdleAnalysis,
        IdleSummary,
    },
    metrics::{
        PeriodDelta,
        Status,
    },
    revenue::{
        RevenueAnalysis,
        RevenueSummary,
    },
};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: u64,
    pub leased: u64,
    pub available: u64,
    pub utilization: Option<f64>,
    pub status: Option<Status>,
    #[serde(serialize_with = "serialize_secondary")]
    pub idle_summary: Secondary<IdleSummary>,
    #[serde(serialize_with = "serialize_secondary")]
    pub revenue_summary: Secondary<RevenueSummary>,
}

impl Summary {
    pub fn is_degraded(&self) -> bool {
        self.idle_summary.is_err() || self.revenue_summary.is_err()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetView {
    pub totals: GlobalTotals,
    pub utilization: Option<f64>,
    pub status: Option<Status>,
    pub by_branch: Vec<BreakdownRow>,
    pub by_type: Vec<BreakdownRow>,
    pub by_usage: Vec<BreakdownRow>,
    pub type_usage: Vec<MatrixCell>,
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleView {
    pub fleet: GlobalTotals,
    /// Idle units in the latest snapshot over the active fleet size. Not
    /// capped, so it exceeds 1.0 when the snapshot lists more idle units
    /// than the inventory has active.
    pub idle_share: Option<f64>,
    #[serde(serialize_with = "serialize_secondary")]
    pub idle: Secondary<IdleAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueView {
    pub fleet: GlobalTotals,
    #[serde(serialize_with = "serialize_secondary")]
    pub revenue: Secondary<RevenueAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub total: u64,
    pub leased: u64,
    pub utilization: Option<f64>,
}

/// Monthly utilization history of one dimension value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub value: String,
    /// Oldest first.
    pub points: Vec<TrendPoint>,
    pub latest_utilization: Option<f64>,
    pub month_over_month: Option<PeriodDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendView {
    pub dimension: Dimension,
    /// Live utilization from the inventory store.
    pub current: Vec<BreakdownRow>,
    /// Empty when the analytics store is unavailable.
    #[serde(serialize_with = "serialize_history")]
    pub history: Secondary<Vec<TrendSeries>>,
}

impl TrendView {
    pub fn series(&self) -> &[TrendSeries] {
        self.history.as_deref().unwrap_or_default()
    }
}

fn serialize_history<S>(history: &Secondary<Vec<TrendSeries>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    history.as_deref().unwrap_or_default().serialize(serializer)
}

/// Outcome of an export. Empty exports are not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "rows", rename_all = "snake_case")]
pub enum ExportOutcome<T> {
    Rows(Vec<T>),
    NoData,
    /// The analytics store could not be reached.
    #[serde(serialize_with = "serialize_pending")]
    Pending(Unavailable),
}

impl<T> ExportOutcome<T> {
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            ExportOutcome::NoData
        } else {
            ExportOutcome::Rows(rows)
        }
    }

    pub fn rows(&self) -> &[T] {
        match self {
            ExportOutcome::Rows(rows) => rows,
            ExportOutcome::NoData | ExportOutcome::Pending(_) => &[],
        }
    }
}

fn serialize_pending<S>(_: &Unavailable, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_none()
}

/// One row of the inventory export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRow {
    pub unit: String,
    pub branch: String,
    pub status: AssetStatus,
    pub raw_type: Option<String>,
    pub type_bucket: TypeBucket,
    pub model_year: Option<String>,
    pub length: Option<String>,
    pub length_bucket: LengthBucket,
    pub usage: UsageBucket,
    pub cost: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
    pub sale_date: Option<NaiveDate>,
}

impl From<&ClassifiedAsset<'_>> for InventoryRow {
    fn from(classified: &ClassifiedAsset<'_>) -> Self {
        let asset = classified.asset;
        InventoryRow {
            unit: asset.unit.clone(),
            branch: branch_label(asset.branch.as_deref()).to_string(),
            status: asset.status,
            raw_type: asset.raw_type.clone(),
            type_bucket: classified.classification.type_bucket.clone(),
            model_year: asset.model_year.clone(),
            length: asset.raw_length.clone(),
            length_bucket: classified.classification.length,
            usage: classified.classification.usage,
            cost: asset.cost,
            purchase_date: asset.purchase_date,
            sale_date: asset.sale_date,
        }
    }
}
