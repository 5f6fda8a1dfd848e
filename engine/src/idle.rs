//! Idle-fleet analytics over the analytics store's monthly idle snapshots.
//!
//! Snapshot views (summary, breakdowns, matrix, critical list) only look at
//! the latest month present in the records. The trend covers every month.

use crate::{
    analyzer::Analyzer,
    buckets::{
        branch_label,
        DimensionValue,
        IdleDurationBucket,
        LengthBucket,
        TypeBucket,
        UsageBucket,
    },
    classifier::Classification,
    filter::FilterSet,
    metrics::{
        mean,
        Status,
    },
    model::IdleRecord,
};
use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
};
use strum::IntoEnumIterator;

/// Number of units on the idle view's critical list.
pub const CRITICAL_LIST_LIMIT: usize = 25;

#[derive(Debug, Clone)]
pub struct ClassifiedIdle<'a> {
    pub record: &'a IdleRecord,
    pub classification: Classification,
    pub bucket: IdleDurationBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleSummary {
    /// Snapshot month the summary describes.
    pub period: Option<String>,
    pub total_idle: u64,
    pub total_idle_cost: f64,
    pub avg_months_idle: Option<f64>,
    pub monthly_opportunity_cost: f64,
    pub never_leased: u64,
    pub critical: u64,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleGroup {
    pub value: DimensionValue,
    pub units: u64,
    pub total_cost: f64,
    pub avg_months_idle: Option<f64>,
    pub opportunity_cost: f64,
    pub critical: u64,
    pub never_leased: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleMatrixCell {
    pub branch: String,
    pub bucket: IdleDurationBucket,
    pub units: u64,
    pub opportunity_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleTrendPoint {
    pub period: String,
    pub units: u64,
    pub avg_months_idle: Option<f64>,
    pub opportunity_cost: f64,
    pub critical: u64,
}

/// One idle unit, as listed on the critical and never-leased lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleUnit {
    pub unit: String,
    pub branch: String,
    pub period: String,
    pub type_bucket: TypeBucket,
    pub usage: UsageBucket,
    pub length: LengthBucket,
    pub bucket: IdleDurationBucket,
    pub months_idle: u32,
    pub cumulative_leases: u32,
    pub asset_cost: Option<f64>,
    pub card_rate: Option<f64>,
    pub last_active_month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleAnalysis {
    pub summary: IdleSummary,
    /// Always the four duration buckets, in order.
    pub by_duration: Vec<IdleGroup>,
    pub by_branch: Vec<IdleGroup>,
    pub by_type: Vec<IdleGroup>,
    pub by_usage: Vec<IdleGroup>,
    pub matrix: Vec<IdleMatrixCell>,
    pub trend: Vec<IdleTrendPoint>,
    pub critical: Vec<IdleUnit>,
}

#[derive(Debug, Default, Clone, Copy)]
struct IdleTally {
    units: u64,
    cost: f64,
    months: u64,
    opportunity: f64,
    critical: u64,
    never_leased: u64,
}

impl IdleTally {
    fn record(&mut self, idle: &ClassifiedIdle<'_>) {
        self.units += 1;
        self.cost += idle.record.asset_cost.unwrap_or_default();
        self.months += u64::from(idle.record.months_idle);
        self.opportunity += idle.record.card_rate.unwrap_or_default();
        if idle.bucket.is_critical() {
            self.critical += 1;
        }
        if idle.record.never_leased() {
            self.never_leased += 1;
        }
    }

    fn avg_months(&self) -> Option<f64> {
        mean(self.months as f64, self.units)
    }

    fn into_group(self, value: DimensionValue) -> IdleGroup {
        IdleGroup {
            value,
            units: self.units,
            total_cost: self.cost,
            avg_months_idle: self.avg_months(),
            opportunity_cost: self.opportunity,
            critical: self.critical,
            never_leased: self.never_leased,
        }
    }
}

/// Classifies idle records and applies the branch, type, usage and idle
/// bucket filters.
pub fn classify<'a>(analyzer: &Analyzer, records: &'a [IdleRecord], filters: &FilterSet) -> Vec<ClassifiedIdle<'a>> {
    let year = analyzer.current_year();
    let classifier = analyzer.classifier();
    records
        .iter()
        .filter(|record| filters.matches_branch(record.branch.as_deref()))
        .map(|record| ClassifiedIdle {
            record,
            classification: classifier.classify_raw(
                record.raw_type.as_deref(),
                record.raw_length.as_deref(),
                record.model_year.as_deref(),
                year,
            ),
            bucket: classifier.classify_idle(record.months_idle),
        })
        .filter(|idle| filters.matches_classification(&idle.classification) && filters.matches_idle(idle.bucket))
        .collect()
}

/// The most recent snapshot month across every record, before any filter
/// narrows them.
pub fn latest_period(records: &[IdleRecord]) -> Option<&str> {
    records.iter().map(|record| record.period.as_str()).max()
}

/// Builds every idle view in one pass over the records.
pub fn analyze(
    analyzer: &Analyzer,
    records: &[IdleRecord],
    filters: &FilterSet,
    critical_limit: Option<usize>,
) -> IdleAnalysis {
    let latest = latest_period(records).map(str::to_string);
    let classified = classify(analyzer, records, filters);

    let mut overall = IdleTally::default();
    let mut by_duration: BTreeMap<IdleDurationBucket, IdleTally> =
        IdleDurationBucket::iter().map(|bucket| (bucket, IdleTally::default())).collect();
    let mut by_branch = BTreeMap::<String, IdleTally>::new();
    let mut by_type = BTreeMap::<TypeBucket, IdleTally>::new();
    let mut by_usage = BTreeMap::<UsageBucket, IdleTally>::new();
    let mut matrix = BTreeMap::<(String, IdleDurationBucket), IdleTally>::new();
    let mut trend = BTreeMap::<&str, IdleTally>::new();
    let mut critical = Vec::new();

    for idle in &classified {
        trend.entry(idle.record.period.as_str()).or_default().record(idle);
        if latest.as_deref() != Some(idle.record.period.as_str()) {
            continue;
        }

        let branch = branch_label(idle.record.branch.as_deref()).to_string();
        overall.record(idle);
        by_duration.entry(idle.bucket).or_default().record(idle);
        by_branch.entry(branch.clone()).or_default().record(idle);
        by_type
            .entry(idle.classification.type_bucket.clone())
            .or_default()
            .record(idle);
        by_usage.entry(idle.classification.usage).or_default().record(idle);
        matrix.entry((branch, idle.bucket)).or_default().record(idle);
        if idle.bucket.is_critical() {
            critical.push(idle);
        }
    }

    let avg_months_idle = overall.avg_months();
    let summary = IdleSummary {
        period: latest,
        total_idle: overall.units,
        total_idle_cost: overall.cost,
        avg_months_idle,
        monthly_opportunity_cost: overall.opportunity,
        never_leased: overall.never_leased,
        critical: overall.critical,
        status: analyzer.metrics().idle_status(avg_months_idle),
    };

    critical.sort_by(|a, b| most_idle_first(a, b));
    if let Some(limit) = critical_limit {
        critical.truncate(limit);
    }

    debug!(
        period = ?summary.period,
        total_idle = summary.total_idle,
        critical = summary.critical,
        "analyzed idle snapshot"
    );

    IdleAnalysis {
        summary,
        by_duration: by_duration
            .into_iter()
            .map(|(bucket, tally)| tally.into_group(DimensionValue::Idle(bucket)))
            .collect(),
        by_branch: by_branch
            .into_iter()
            .map(|(branch, tally)| tally.into_group(DimensionValue::Branch(branch)))
            .collect(),
        by_type: by_type
            .into_iter()
            .map(|(bucket, tally)| tally.into_group(DimensionValue::Type(bucket)))
            .collect(),
        by_usage: by_usage
            .into_iter()
            .map(|(bucket, tally)| tally.into_group(DimensionValue::Usage(bucket)))
            .collect(),
        matrix: matrix
            .into_iter()
            .map(|((branch, bucket), tally)| IdleMatrixCell {
                branch,
                bucket,
                units: tally.units,
                opportunity_cost: tally.opportunity,
            })
            .collect(),
        trend: trend
            .into_iter()
            .map(|(period, tally)| IdleTrendPoint {
                period: period.to_string(),
                units: tally.units,
                avg_months_idle: tally.avg_months(),
                opportunity_cost: tally.opportunity,
                critical: tally.critical,
            })
            .collect(),
        critical: critical.into_iter().map(IdleUnit::from).collect(),
    }
}

/// Units idle 24 months or more in the latest snapshot, longest idle first.
pub fn critical_units(analyzer: &Analyzer, records: &[IdleRecord], filters: &FilterSet) -> Vec<IdleUnit> {
    latest_units(analyzer, records, filters, |idle| idle.bucket.is_critical())
}

/// Units in the latest snapshot that have never been leased, longest idle first.
pub fn never_leased_units(analyzer: &Analyzer, records: &[IdleRecord], filters: &FilterSet) -> Vec<IdleUnit> {
    latest_units(analyzer, records, filters, |idle| idle.record.never_leased())
}

fn latest_units(
    analyzer: &Analyzer,
    records: &[IdleRecord],
    filters: &FilterSet,
    keep: impl Fn(&ClassifiedIdle<'_>) -> bool,
) -> Vec<IdleUnit> {
    let Some(latest) = latest_period(records) else {
        return Vec::new();
    };
    let classified = classify(analyzer, records, filters);
    let mut units: Vec<&ClassifiedIdle<'_>> = classified
        .iter()
        .filter(|idle| idle.record.period == latest && keep(*idle))
        .collect();
    units.sort_by(|a, b| most_idle_first(a, b));
    units.into_iter().map(IdleUnit::from).collect()
}

/// Months idle descending, then asset cost descending, then unit.
fn most_idle_first(a: &ClassifiedIdle<'_>, b: &ClassifiedIdle<'_>) -> Ordering {
    b.record
        .months_idle
        .cmp(&a.record.months_idle)
        .then_with(|| {
            let (a_cost, b_cost) = (a.record.asset_cost.unwrap_or(f64::MIN), b.record.asset_cost.unwrap_or(f64::MIN));
            b_cost.total_cmp(&a_cost)
        })
        .then_with(|| a.record.unit.cmp(&b.record.unit))
}

impl From<&ClassifiedIdle<'_>> for IdleUnit {
    fn from(idle: &ClassifiedIdle<'_>) -> Self {
        let record = idle.record;
        IdleUnit {
            unit: record.unit.clone(),
            branch: branch_label(record.branch.as_deref()).to_string(),
            period: record.period.clone(),
            type_bucket: idle.classification.type_bucket.clone(),
            usage: idle.classification.usage,
            length: idle.classification.length,
            bucket: idle.bucket,
            months_idle: record.months_idle,
            cumulative_leases: record.cumulative_leases,
            asset_cost: record.asset_cost,
            card_rate: record.card_rate,
            last_active_month: record.last_active_month.clone(),
        }
    }
}
