//! Fans view requests out to the inventory and analytics stores and merges
//! the results.
//!
//! The inventory store is the active-fleet population itself, so a failing
//! inventory query fails the request. Analytics failures are absorbed: the
//! affected part of the view becomes [`Unavailable`] and the rest renders.

mod state;
mod views;

pub use state::RequestState;
pub use views::*;

use crate::{
    aggregate::{
        aggregate,
        aggregate_many,
        branches,
        BreakdownRow,
        Grouping,
        MatrixCell,
        Population,
    },
    analyzer::Analyzer,
    buckets::{
        AssetStatus,
        Dimension,
    },
    error::{
        Secondary,
        SourceError,
        Unavailable,
        ViewError,
    },
    filter::FilterSet,
    idle::{
        self,
        IdleUnit,
        CRITICAL_LIST_LIMIT,
    },
    metrics::{
        month_over_month,
        utilization,
    },
    model::{
        AssetRecord,
        IdleRecord,
        PeriodRow,
    },
    revenue,
    source::{
        AnalyticsSource,
        InventorySource,
        SourcePool,
    },
};
use state::RequestTracker;
use std::collections::BTreeMap;

pub struct SourceCoordinator {
    inventory: SourcePool<dyn InventorySource>,
    analytics: SourcePool<dyn AnalyticsSource>,
    analyzer: Analyzer,
}

impl SourceCoordinator {
    pub fn new(
        inventory: SourcePool<dyn InventorySource>,
        analytics: SourcePool<dyn AnalyticsSource>,
        analyzer: Analyzer,
    ) -> Self {
        Self {
            inventory,
            analytics,
            analyzer,
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Flat breakdown over one dimension, or a two-dimension cross-tab
    /// flattened into rows.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_breakdown(
        &self,
        dimensions: &[Dimension],
        filters: &FilterSet,
    ) -> Result<Vec<BreakdownRow>, ViewError> {
        let grouping = Grouping::try_from(dimensions)?;
        let mut tracker = RequestTracker::new("breakdown");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let rows = aggregate(&classified, filters.population(), grouping);
        tracker.advance(RequestState::Done);
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_matrix(
        &self,
        rows: Dimension,
        columns: Dimension,
        filters: &FilterSet,
    ) -> Result<Vec<MatrixCell>, ViewError> {
        let mut tracker = RequestTracker::new("matrix");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let aggregation = aggregate_many(&classified, filters.population(), &[Grouping::Matrix(rows, columns)]);
        tracker.advance(RequestState::Done);
        Ok(aggregation.cells(0))
    }

    /// Fleet totals with the idle and revenue summaries. The two summaries are
    /// fetched concurrently once the fleet is known.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_summary(&self, filters: &FilterSet) -> Result<Summary, ViewError> {
        let mut tracker = RequestTracker::new("summary");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::FetchSecondary);
        let (idle_records, revenue_records) = futures::join!(
            self.analytics.run("fetch_idle_snapshot", |source| {
                source.fetch_idle_snapshot(filters.period, filters)
            }),
            self.analytics.run("fetch_revenue_snapshot", |source| {
                source.fetch_revenue_snapshot(filters.period, filters)
            }),
        );
        let idle_records = self.degrade(&mut tracker, "fetch_idle_snapshot", idle_records);
        let revenue_records = self.degrade(&mut tracker, "fetch_revenue_snapshot", revenue_records);

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let totals = aggregate_many(&classified, Population::ActiveFleet, &[]).totals();
        let utilization = totals.utilization();
        let summary = Summary {
            total: totals.total,
            leased: totals.leased,
            available: totals.available,
            utilization,
            status: self.analyzer.metrics().utilization_status(utilization),
            idle_summary: idle_records.map(|records| idle::analyze(&self.analyzer, &records, filters, Some(0)).summary),
            revenue_summary: revenue_records.map(|records| revenue::analyze(&self.analyzer, &records, filters).summary),
        };
        tracker.advance(RequestState::Done);

        info!(
            total = summary.total,
            leased = summary.leased,
            degraded = tracker.is_degraded(),
            "summary ready"
        );
        Ok(summary)
    }

    /// Totals, the branch/type/usage breakdowns and the type x usage matrix
    /// from a single aggregation pass.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_fleet_view(&self, filters: &FilterSet) -> Result<FleetView, ViewError> {
        let mut tracker = RequestTracker::new("fleet");
        let assets = self.fetch_fleet_with_audit(&mut tracker, filters).await?;

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let groupings = [
            Grouping::Flat(Dimension::Branch),
            Grouping::Flat(Dimension::Type),
            Grouping::Flat(Dimension::Usage),
            Grouping::Matrix(Dimension::Type, Dimension::Usage),
        ];
        let aggregation = aggregate_many(&classified, filters.population(), &groupings);
        let totals = aggregation.totals();
        let utilization = totals.utilization();
        let view = FleetView {
            totals,
            utilization,
            status: self.analyzer.metrics().utilization_status(utilization),
            by_branch: aggregation.rows(0),
            by_type: aggregation.rows(1),
            by_usage: aggregation.rows(2),
            type_usage: aggregation.cells(3),
            branches: branches(&assets),
        };
        tracker.advance(RequestState::Done);
        Ok(view)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_idle_view(&self, filters: &FilterSet) -> Result<IdleView, ViewError> {
        let mut tracker = RequestTracker::new("idle");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::FetchSecondary);
        let records = self
            .analytics
            .run("fetch_idle_snapshot", |source| {
                source.fetch_idle_snapshot(filters.period, filters)
            })
            .await;
        let records = self.degrade(&mut tracker, "fetch_idle_snapshot", records);

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let fleet = aggregate_many(&classified, Population::ActiveFleet, &[]).totals();
        let analysis =
            records.map(|records| idle::analyze(&self.analyzer, &records, filters, Some(CRITICAL_LIST_LIMIT)));
        let idle_share = analysis
            .as_ref()
            .ok()
            .filter(|_| fleet.total > 0)
            .map(|analysis| analysis.summary.total_idle as f64 / fleet.total as f64);
        tracker.advance(RequestState::Done);

        Ok(IdleView {
            fleet,
            idle_share,
            idle: analysis,
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_revenue_view(&self, filters: &FilterSet) -> Result<RevenueView, ViewError> {
        let mut tracker = RequestTracker::new("revenue");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::FetchSecondary);
        let records = self
            .analytics
            .run("fetch_revenue_snapshot", |source| {
                source.fetch_revenue_snapshot(filters.period, filters)
            })
            .await;
        let records = self.degrade(&mut tracker, "fetch_revenue_snapshot", records);

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let fleet = aggregate_many(&classified, Population::ActiveFleet, &[]).totals();
        let revenue = records.map(|records| revenue::analyze(&self.analyzer, &records, filters));
        tracker.advance(RequestState::Done);

        Ok(RevenueView { fleet, revenue })
    }

    /// Live utilization per value of `dimension`, next to its monthly history
    /// and month-over-month change.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_trend(
        &self,
        dimension: Dimension,
        last_n: usize,
        filters: &FilterSet,
    ) -> Result<TrendView, ViewError> {
        let mut tracker = RequestTracker::new("trend");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::FetchSecondary);
        let rows = self
            .analytics
            .run("fetch_period_series", |source| source.fetch_period_series(dimension, last_n))
            .await;
        let rows = self.degrade(&mut tracker, "fetch_period_series", rows);

        tracker.advance(RequestState::Merge);
        let classified = self.analyzer.classify_assets(&assets, filters);
        let current = aggregate(&classified, filters.population(), Grouping::Flat(dimension));
        let history = rows.map(|rows| trend_series(rows, dimension, last_n));
        tracker.advance(RequestState::Done);

        Ok(TrendView {
            dimension,
            current,
            history,
        })
    }

    /// Classified inventory rows ordered by branch then unit. Active fleet
    /// unless the filters name a status.
    #[instrument(level = "debug", skip(self))]
    pub async fn export_inventory(&self, filters: &FilterSet) -> Result<ExportOutcome<InventoryRow>, ViewError> {
        let mut tracker = RequestTracker::new("export_inventory");
        let assets = self.fetch_fleet(&mut tracker, filters).await?;

        tracker.advance(RequestState::Merge);
        let population = filters.population();
        let mut rows: Vec<InventoryRow> = self
            .analyzer
            .classify_assets(&assets, filters)
            .iter()
            .filter(|classified| population.includes(classified.asset.status))
            .map(InventoryRow::from)
            .collect();
        rows.sort_by(|a, b| a.branch.cmp(&b.branch).then_with(|| a.unit.cmp(&b.unit)));
        tracker.advance(RequestState::Done);

        Ok(ExportOutcome::from_rows(rows))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn export_critical_idle(&self, filters: &FilterSet) -> ExportOutcome<IdleUnit> {
        self.export_idle("export_critical_idle", filters, idle::critical_units)
            .await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn export_never_leased(&self, filters: &FilterSet) -> ExportOutcome<IdleUnit> {
        self.export_idle("export_never_leased", filters, idle::never_leased_units)
            .await
    }

    async fn export_idle(
        &self,
        view: &'static str,
        filters: &FilterSet,
        select: fn(&Analyzer, &[IdleRecord], &FilterSet) -> Vec<IdleUnit>,
    ) -> ExportOutcome<IdleUnit> {
        let mut tracker = RequestTracker::new(view);
        tracker.advance(RequestState::FetchSecondary);
        let records = self
            .analytics
            .run("fetch_idle_snapshot", |source| {
                source.fetch_idle_snapshot(filters.period, filters)
            })
            .await;
        let records = self.degrade(&mut tracker, "fetch_idle_snapshot", records);

        tracker.advance(RequestState::Merge);
        let outcome = match records {
            Ok(records) => ExportOutcome::from_rows(select(&self.analyzer, &records, filters)),
            Err(unavailable) => ExportOutcome::Pending(unavailable),
        };
        tracker.advance(RequestState::Done);
        outcome
    }

    async fn fetch_fleet(
        &self,
        tracker: &mut RequestTracker,
        filters: &FilterSet,
    ) -> Result<Vec<AssetRecord>, ViewError> {
        tracker.advance(RequestState::FetchPrimary);
        let result = self
            .inventory
            .run("fetch_active_fleet", |source| source.fetch_active_fleet(filters))
            .await;
        self.require(tracker, "fetch_active_fleet", result)
    }

    /// The filtered population plus, without a status filter, the assets in
    /// other statuses so the totals can count them. Both queries run
    /// concurrently.
    async fn fetch_fleet_with_audit(
        &self,
        tracker: &mut RequestTracker,
        filters: &FilterSet,
    ) -> Result<Vec<AssetRecord>, ViewError> {
        if filters.status.is_some() {
            return self.fetch_fleet(tracker, filters).await;
        }

        tracker.advance(RequestState::FetchPrimary);
        let audit_filters = filters.clone().with_status(AssetStatus::Other);
        let (active, other) = futures::join!(
            self.inventory
                .run("fetch_active_fleet", |source| source.fetch_active_fleet(filters)),
            self.inventory
                .run("fetch_active_fleet", |source| source.fetch_active_fleet(&audit_filters)),
        );
        let mut active = self.require(tracker, "fetch_active_fleet", active)?;
        let other = self.require(tracker, "fetch_active_fleet", other)?;

        // Sources may return more than asked for; keep each half disjoint.
        active.retain(|asset| asset.status.is_active());
        active.extend(other.into_iter().filter(|asset| asset.status == AssetStatus::Other));
        Ok(active)
    }

    fn require<T>(
        &self,
        tracker: &mut RequestTracker,
        query: &'static str,
        result: Result<T, SourceError>,
    ) -> Result<T, ViewError> {
        result.map_err(|error| {
            error!(store = self.inventory.name(), query, %error, "primary source failed");
            tracker.advance(RequestState::Error);
            ViewError::PrimaryUnavailable {
                store: self.inventory.name().to_string(),
                query,
                error,
            }
        })
    }

    fn degrade<T>(
        &self,
        tracker: &mut RequestTracker,
        query: &'static str,
        result: Result<T, SourceError>,
    ) -> Secondary<T> {
        result.map_err(|reason| {
            warn!(store = self.analytics.name(), query, %reason, "secondary source unavailable, degrading");
            tracker.mark_degraded();
            Unavailable {
                store: self.analytics.name().to_string(),
                query,
                reason,
            }
        })
    }
}

/// Groups series rows by value, keeps the `last_n` most recent periods of each
/// and derives the month-over-month change in utilization.
fn trend_series(rows: Vec<PeriodRow>, dimension: Dimension, last_n: usize) -> Vec<TrendSeries> {
    let mut by_value = BTreeMap::<String, Vec<PeriodRow>>::new();
    for row in rows.into_iter().filter(|row| row.dimension == dimension) {
        by_value.entry(row.value.clone()).or_default().push(row);
    }

    by_value
        .into_iter()
        .map(|(value, mut rows)| {
            rows.sort_by(|a, b| b.period.cmp(&a.period));
            rows.truncate(last_n);
            rows.reverse();

            let points: Vec<TrendPoint> = rows
                .into_iter()
                .map(|row| TrendPoint {
                    utilization: utilization(row.total, row.leased),
                    period: row.period,
                    total: row.total,
                    leased: row.leased,
                })
                .collect();
            let month_over_month = match points.as_slice() {
                [.., previous, latest] => latest
                    .utilization
                    .zip(previous.utilization)
                    .and_then(|(now, before)| {
                        month_over_month([(latest.period.as_str(), now), (previous.period.as_str(), before)])
                    }),
                _ => None,
            };
            TrendSeries {
                value,
                latest_utilization: points.last().and_then(|point| point.utilization),
                points,
                month_over_month,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(value: &str, period: &str, total: u64, leased: u64) -> PeriodRow {
        PeriodRow {
            dimension: Dimension::Branch,
            value: value.to_string(),
            period: period.to_string(),
            total,
            leased,
        }
    }

    #[test]
    fn trend_series_keeps_latest_periods_per_value() {
        let rows = vec![
            row("DALLAS", "2024-03", 10, 5),
            row("DALLAS", "2024-05", 10, 8),
            row("DALLAS", "2024-04", 10, 6),
            row("HOUSTON", "2024-05", 4, 4),
            PeriodRow {
                dimension: Dimension::Type,
                ..row("DRY_VAN", "2024-05", 1, 1)
            },
        ];
        let series = trend_series(rows, Dimension::Branch, 2);
        assert_eq!(series.len(), 2);

        let dallas = &series[0];
        let periods: Vec<&str> = dallas.points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-04", "2024-05"]);
        assert_eq!(dallas.latest_utilization, Some(0.8));
        let delta = dallas.month_over_month.as_ref().unwrap();
        assert!((delta.delta - 0.2).abs() < 1e-12);

        let houston = &series[1];
        assert_eq!(houston.latest_utilization, Some(1.0));
        assert_eq!(houston.month_over_month, None);
    }

    #[test]
    fn empty_latest_period_has_no_month_over_month() {
        let rows = vec![
            row("DALLAS", "2024-03", 10, 5),
            row("DALLAS", "2024-04", 10, 6),
            row("DALLAS", "2024-05", 0, 0),
        ];
        let series = trend_series(rows, Dimension::Branch, 3);
        let dallas = &series[0];
        assert_eq!(dallas.points.len(), 3);
        assert_eq!(dallas.latest_utilization, None);
        assert_eq!(dallas.month_over_month, None);

        let rows = vec![
            row("DALLAS", "2024-03", 10, 5),
            row("DALLAS", "2024-04", 0, 0),
            row("DALLAS", "2024-05", 10, 6),
        ];
        let series = trend_series(rows, Dimension::Branch, 3);
        assert_eq!(series[0].latest_utilization, Some(0.6));
        assert_eq!(series[0].month_over_month, None);
    }
}
