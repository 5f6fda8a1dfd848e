use crate::{
    analyzer::Analyzer,
    buckets::{
        branch_label,
        DimensionValue,
        LengthBucket,
        TypeBucket,
        UsageBucket,
        VarianceBand,
    },
    classifier::Classification,
    filter::FilterSet,
    metrics::{
        at_least,
        mean,
        month_over_month,
        rate_variance_pct,
        PeriodDelta,
        Status,
    },
    model::RevenueRecord,
};
use serde::Serialize;
use std::collections::{
    BTreeMap,
    BTreeSet,
};
use strum::IntoEnumIterator;

#[derive(Debug, Clone)]
pub struct ClassifiedInvoice<'a> {
    pub record: &'a RevenueRecord,
    pub classification: Classification,
    pub variance_pct: Option<f64>,
    pub band: VarianceBand,
}

/// Totals over invoices that carry a card rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub invoices: u64,
    pub total_billed: f64,
    pub avg_billed: Option<f64>,
    pub avg_card: Option<f64>,
    pub avg_variance: Option<f64>,
    pub avg_variance_pct: Option<f64>,
    pub at_or_above_card: u64,
    pub below_card: u64,
    /// Invoices excluded above because they have no card rate.
    pub without_card_rate: u64,
    pub status: Option<Status>,
}

/// Invoices with a card rate in one group. The rest only show up in the
/// variance distribution and the missing card rate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueGroup {
    pub value: DimensionValue,
    pub invoices: u64,
    pub total_billed: f64,
    pub avg_billed: Option<f64>,
    pub avg_card: Option<f64>,
    pub avg_variance_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceBandCount {
    pub band: VarianceBand,
    pub invoices: u64,
    pub total_billed: f64,
}

/// Revenue billed on units that have no card rate to compare against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCardRate {
    pub type_bucket: TypeBucket,
    pub usage: UsageBucket,
    pub length: LengthBucket,
    pub units: u64,
    pub revenue_at_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueTrendPoint {
    pub period: String,
    pub invoices: u64,
    pub avg_billed: Option<f64>,
    pub avg_card: Option<f64>,
    pub avg_variance_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueAnalysis {
    pub summary: RevenueSummary,
    pub by_branch: Vec<RevenueGroup>,
    pub by_type: Vec<RevenueGroup>,
    pub by_usage: Vec<RevenueGroup>,
    pub variance_distribution: Vec<VarianceBandCount>,
    pub missing_card_rates: Vec<MissingCardRate>,
    pub trend: Vec<RevenueTrendPoint>,
    /// Change in average billed rate between the two latest months.
    pub month_over_month: Option<PeriodDelta>,
    pub growth_status: Option<Status>,
}

/// Running sums for one group of invoices that carry a card rate.
#[derive(Debug, Default, Clone, Copy)]
struct RevenueTally {
    invoices: u64,
    billed: f64,
    card: f64,
    variance_pct: f64,
    at_or_above: u64,
}

impl RevenueTally {
    fn record(&mut self, billed: f64, card: f64, variance_pct: f64) {
        self.invoices += 1;
        self.billed += billed;
        self.card += card;
        self.variance_pct += variance_pct;
        if at_least(variance_pct, 0.0) {
            self.at_or_above += 1;
        }
    }

    fn avg_billed(&self) -> Option<f64> {
        mean(self.billed, self.invoices)
    }

    fn avg_card(&self) -> Option<f64> {
        mean(self.card, self.invoices)
    }

    fn avg_variance_pct(&self) -> Option<f64> {
        mean(self.variance_pct, self.invoices)
    }

    fn into_group(self, value: DimensionValue) -> RevenueGroup {
        RevenueGroup {
            value,
            invoices: self.invoices,
            total_billed: self.billed,
            avg_billed: self.avg_billed(),
            avg_card: self.avg_card(),
            avg_variance_pct: self.avg_variance_pct(),
        }
    }
}

pub fn classify<'a>(
    analyzer: &Analyzer,
    records: &'a [RevenueRecord],
    filters: &FilterSet,
) -> Vec<ClassifiedInvoice<'a>> {
    let year = analyzer.current_year();
    let classifier = analyzer.classifier();
    records
        .iter()
        .filter(|record| filters.matches_branch(record.branch.as_deref()))
        .map(|record| {
            let variance_pct = rate_variance_pct(record.billed_rate, record.benchmark());
            ClassifiedInvoice {
                record,
                classification: classifier.classify_raw(
                    record.raw_type.as_deref(),
                    record.raw_length.as_deref(),
                    record.model_year.as_deref(),
                    year,
                ),
                variance_pct,
                band: classifier.classify_variance(variance_pct),
            }
        })
        .filter(|invoice| filters.matches_classification(&invoice.classification))
        .collect()
}

pub fn analyze(analyzer: &Analyzer, records: &[RevenueRecord], filters: &FilterSet) -> RevenueAnalysis {
    let classified = classify(analyzer, records, filters);
    let metrics = analyzer.metrics();

    let mut overall = RevenueTally::default();
    let mut by_branch = BTreeMap::<String, RevenueTally>::new();
    let mut by_type = BTreeMap::<TypeBucket, RevenueTally>::new();
    let mut by_usage = BTreeMap::<UsageBucket, RevenueTally>::new();
    let mut bands: BTreeMap<VarianceBand, (u64, f64)> = VarianceBand::iter().map(|band| (band, (0, 0.0))).collect();
    let mut missing = BTreeMap::<(TypeBucket, UsageBucket, LengthBucket), (BTreeSet<&str>, f64)>::new();
    let mut trend = BTreeMap::<&str, RevenueTally>::new();
    let mut without_card_rate = 0;

    for invoice in &classified {
        let band = bands.entry(invoice.band).or_default();
        band.0 += 1;
        band.1 += invoice.record.billed_rate;

        let billed = invoice.record.billed_rate;
        let Some((card, variance)) = invoice.record.benchmark().zip(invoice.variance_pct) else {
            without_card_rate += 1;
            let key = (
                invoice.classification.type_bucket.clone(),
                invoice.classification.usage,
                invoice.classification.length,
            );
            let entry = missing.entry(key).or_default();
            entry.0.insert(invoice.record.unit.as_str());
            entry.1 += billed;
            continue;
        };

        overall.record(billed, card, variance);
        by_branch
            .entry(branch_label(invoice.record.branch.as_deref()).to_string())
            .or_default()
            .record(billed, card, variance);
        by_type
            .entry(invoice.classification.type_bucket.clone())
            .or_default()
            .record(billed, card, variance);
        by_usage
            .entry(invoice.classification.usage)
            .or_default()
            .record(billed, card, variance);
        trend
            .entry(invoice.record.period.as_str())
            .or_default()
            .record(billed, card, variance);
    }

    let avg_variance_pct = overall.avg_variance_pct();
    let avg_billed = overall.avg_billed();
    let avg_card = overall.avg_card();
    let summary = RevenueSummary {
        invoices: overall.invoices,
        total_billed: overall.billed,
        avg_billed,
        avg_card,
        avg_variance: avg_billed.zip(avg_card).map(|(billed, card)| billed - card),
        avg_variance_pct,
        at_or_above_card: overall.at_or_above,
        below_card: overall.invoices - overall.at_or_above,
        without_card_rate,
        status: metrics.rate_variance_status(avg_variance_pct),
    };

    let trend: Vec<RevenueTrendPoint> = trend
        .into_iter()
        .map(|(period, tally)| RevenueTrendPoint {
            period: period.to_string(),
            invoices: tally.invoices,
            avg_billed: tally.avg_billed(),
            avg_card: tally.avg_card(),
            avg_variance_pct: tally.avg_variance_pct(),
        })
        .collect();
    let delta = month_over_month(
        trend
            .iter()
            .filter_map(|point| point.avg_billed.map(|billed| (point.period.as_str(), billed))),
    );
    let growth_status = metrics.growth_status(delta.as_ref().and_then(|delta| delta.growth));

    let mut missing_card_rates: Vec<MissingCardRate> = missing
        .into_iter()
        .map(|((type_bucket, usage, length), (units, revenue))| MissingCardRate {
            type_bucket,
            usage,
            length,
            units: units.len() as u64,
            revenue_at_risk: revenue,
        })
        .collect();
    // Stable sort keeps the key order among equal revenue.
    missing_card_rates.sort_by(|a, b| b.revenue_at_risk.total_cmp(&a.revenue_at_risk));

    debug!(
        benchmarked = overall.invoices,
        without_card_rate,
        periods = trend.len(),
        "analyzed revenue snapshot"
    );

    RevenueAnalysis {
        summary,
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
        variance_distribution: bands
            .into_iter()
            .map(|(band, (invoices, total_billed))| VarianceBandCount {
                band,
                invoices,
                total_billed,
            })
            .collect(),
        missing_card_rates,
        trend,
        month_over_month: delta,
        growth_status,
    }
}
