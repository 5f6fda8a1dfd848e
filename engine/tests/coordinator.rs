use fleet_analytics_config::{
    Environment,
    PoolSettings,
};
use fleet_analytics_engine::{
    Analyzer,
    AnalyticsSource,
    AssetRecord,
    AssetStatus,
    Classifier,
    Dimension,
    DimensionValue,
    ExportOutcome,
    FilterSet,
    IdleRecord,
    InventorySource,
    Metrics,
    Period,
    PeriodRow,
    RevenueRecord,
    SourceCoordinator,
    SourceError,
    SourcePool,
    Status,
    TypeBucket,
    UsageBucket,
    ViewError,
};
use futures::{
    future::BoxFuture,
    FutureExt,
};
use pretty_assertions::assert_eq;
use std::{
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

#[derive(Clone, Copy)]
enum Behavior {
    Healthy,
    Failing,
    Slow(Duration),
}

async fn respond<T>(behavior: Behavior, rows: T) -> Result<T, SourceError> {
    match behavior {
        Behavior::Healthy => Ok(rows),
        Behavior::Failing => Err(SourceError::Connection("connection refused".to_string())),
        Behavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Ok(rows)
        }
    }
}

struct FakeInventory {
    assets: Vec<AssetRecord>,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl InventorySource for FakeInventory {
    fn fetch_active_fleet<'a>(&'a self, _filter: &'a FilterSet) -> BoxFuture<'a, Result<Vec<AssetRecord>, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        respond(self.behavior, self.assets.clone()).boxed()
    }

    fn name(&self) -> &'static str {
        "inventory"
    }
}

struct FakeAnalytics {
    idle: Vec<IdleRecord>,
    revenue: Vec<RevenueRecord>,
    series: Vec<PeriodRow>,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl AnalyticsSource for FakeAnalytics {
    fn fetch_idle_snapshot<'a>(
        &'a self,
        _period: Period,
        _filter: &'a FilterSet,
    ) -> BoxFuture<'a, Result<Vec<IdleRecord>, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        respond(self.behavior, self.idle.clone()).boxed()
    }

    fn fetch_revenue_snapshot<'a>(
        &'a self,
        _period: Period,
        _filter: &'a FilterSet,
    ) -> BoxFuture<'a, Result<Vec<RevenueRecord>, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        respond(self.behavior, self.revenue.clone()).boxed()
    }

    fn fetch_period_series(
        &self,
        _dimension: Dimension,
        _last_n: usize,
    ) -> BoxFuture<'_, Result<Vec<PeriodRow>, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        respond(self.behavior, self.series.clone()).boxed()
    }

    fn name(&self) -> &'static str {
        "analytics"
    }
}

fn asset(unit: &str, branch: &str, status: &str, raw_type: Option<&str>, year: &str) -> AssetRecord {
    AssetRecord {
        unit: unit.to_string(),
        branch: Some(branch.to_string()),
        status: AssetStatus::from(status),
        raw_type: raw_type.map(str::to_string),
        raw_length: Some("53'".to_string()),
        model_year: Some(year.to_string()),
        cost: Some(30_000.0),
        purchase_date: None,
        sale_date: None,
    }
}

/// Ten vans, six leased, plus one sold unit.
fn vans() -> Vec<AssetRecord> {
    let mut assets: Vec<AssetRecord> = (0..10)
        .map(|i| {
            let status = if i < 6 { "LEASED" } else { "AVAILABLE" };
            asset(&format!("V-{i:02}"), "ATLANTA", status, Some("VAN"), "2021")
        })
        .collect();
    assets.push(asset("S-01", "ATLANTA", "SOLD", Some("VAN"), "2009"));
    assets
}

fn idle_records() -> Vec<IdleRecord> {
    vec![
        IdleRecord {
            unit: "V-08".to_string(),
            branch: Some("ATLANTA".to_string()),
            period: "2024-05".to_string(),
            raw_type: Some("VAN".to_string()),
            raw_length: Some("53".to_string()),
            model_year: Some("2021".to_string()),
            months_idle: 26,
            cumulative_leases: 0,
            asset_cost: Some(30_000.0),
            card_rate: Some(650.0),
            last_active_month: None,
        },
        IdleRecord {
            unit: "V-09".to_string(),
            branch: Some("ATLANTA".to_string()),
            period: "2024-05".to_string(),
            raw_type: Some("VAN".to_string()),
            raw_length: Some("53".to_string()),
            model_year: Some("2021".to_string()),
            months_idle: 2,
            cumulative_leases: 4,
            asset_cost: Some(30_000.0),
            card_rate: Some(650.0),
            last_active_month: Some("2024-03".to_string()),
        },
    ]
}

fn revenue_records() -> Vec<RevenueRecord> {
    vec![RevenueRecord {
        invoice: "INV-1".to_string(),
        unit: "V-00".to_string(),
        branch: Some("ATLANTA".to_string()),
        period: "2024-05".to_string(),
        raw_type: Some("VAN".to_string()),
        raw_length: Some("53".to_string()),
        model_year: Some("2021".to_string()),
        billed_rate: 900.0,
        card_rate: Some(1000.0),
    }]
}

fn series() -> Vec<PeriodRow> {
    vec![PeriodRow {
        dimension: Dimension::Branch,
        value: "ATLANTA".to_string(),
        period: "2024-05".to_string(),
        total: 10,
        leased: 6,
    }]
}

struct Harness {
    coordinator: SourceCoordinator,
    inventory: Arc<FakeInventory>,
    analytics: Arc<FakeAnalytics>,
}

fn harness(assets: Vec<AssetRecord>, primary: Behavior, secondary: Behavior) -> Harness {
    let inventory = Arc::new(FakeInventory {
        assets,
        behavior: primary,
        calls: AtomicUsize::new(0),
    });
    let analytics = Arc::new(FakeAnalytics {
        idle: idle_records(),
        revenue: revenue_records(),
        series: series(),
        behavior: secondary,
        calls: AtomicUsize::new(0),
    });
    let settings = PoolSettings {
        max_connections: 2,
        query_timeout_secs: 1,
    };
    let coordinator = SourceCoordinator::new(
        SourcePool::new("inventory", inventory.clone() as Arc<dyn InventorySource>, settings),
        SourcePool::new("analytics", analytics.clone() as Arc<dyn AnalyticsSource>, settings),
        Analyzer::new(Classifier::default(), Metrics::default(), Some(2024)),
    );
    Harness {
        coordinator,
        inventory,
        analytics,
    }
}

#[tokio::test]
async fn scenario_a_van_breakdown() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let rows = h
        .coordinator
        .get_breakdown(&[Dimension::Type], &FilterSet::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, vec![DimensionValue::Type(TypeBucket::DryVan)]);
    assert_eq!((rows[0].total, rows[0].leased), (10, 6));
    assert_eq!(rows[0].utilization, Some(0.6));
    let status = h.coordinator.analyzer().metrics().utilization_status(rows[0].utilization);
    assert_eq!(status, Some(Status::Warning));
}

#[tokio::test]
async fn scenario_b_unknown_attributes_are_kept() {
    let assets = vec![asset("X-1", "ATLANTA", "AVAILABLE", None, "n/a")];
    let h = harness(assets, Behavior::Healthy, Behavior::Healthy);
    let cells = h
        .coordinator
        .get_matrix(Dimension::Type, Dimension::Usage, &FilterSet::default())
        .await
        .unwrap();
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].row, DimensionValue::Type(TypeBucket::Specialty));
    assert_eq!(cells[0].column, DimensionValue::Usage(UsageBucket::Storage));
    assert_eq!(cells[0].total, 1);
}

#[tokio::test]
async fn summary_merges_both_sources() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let summary = h.coordinator.get_summary(&FilterSet::default()).await.unwrap();
    assert_eq!((summary.total, summary.leased, summary.available), (10, 6, 4));
    assert!(!summary.is_degraded());

    let idle = summary.idle_summary.unwrap();
    assert_eq!(idle.total_idle, 2);
    assert_eq!(idle.critical, 1);
    assert_eq!(idle.never_leased, 1);

    let revenue = summary.revenue_summary.unwrap();
    assert_eq!(revenue.invoices, 1);
    assert_eq!(revenue.status, Some(Status::Warning));
    assert_eq!(h.analytics.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_c_failing_secondary_degrades() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Failing);
    let summary = h.coordinator.get_summary(&FilterSet::default()).await.unwrap();
    assert_eq!((summary.total, summary.leased, summary.available), (10, 6, 4));
    assert_eq!(summary.utilization, Some(0.6));
    assert!(summary.is_degraded());
    let unavailable = summary.idle_summary.as_ref().unwrap_err();
    assert_eq!(unavailable.query, "fetch_idle_snapshot");
    assert_eq!(unavailable.store, "analytics");
    assert!(summary.revenue_summary.is_err());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["idle_summary"], serde_json::Value::Null);
    assert_eq!(json["revenue_summary"], serde_json::Value::Null);
    assert_eq!(json["total"], 10);
}

#[tokio::test]
async fn idle_share_is_not_capped_by_fleet_size() {
    let assets = vec![asset("V-00", "ATLANTA", "AVAILABLE", Some("VAN"), "2021")];
    let h = harness(assets, Behavior::Healthy, Behavior::Healthy);
    let view = h.coordinator.get_idle_view(&FilterSet::default()).await.unwrap();
    assert_eq!(view.fleet.total, 1);
    assert_eq!(view.idle.as_ref().unwrap().summary.total_idle, 2);
    assert_eq!(view.idle_share, Some(2.0));

    let h = harness(Vec::new(), Behavior::Healthy, Behavior::Healthy);
    let view = h.coordinator.get_idle_view(&FilterSet::default()).await.unwrap();
    assert_eq!(view.idle_share, None);
}

#[tokio::test(start_paused = true)]
async fn slow_secondary_times_out_and_degrades() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Slow(Duration::from_secs(30)));
    let view = h.coordinator.get_idle_view(&FilterSet::default()).await.unwrap();
    assert_eq!(view.fleet.total, 10);
    assert_eq!(view.idle_share, None);
    assert_eq!(
        view.idle.unwrap_err().reason,
        SourceError::Timeout(Duration::from_secs(1))
    );
}

#[tokio::test]
async fn failing_primary_fails_the_request() {
    let h = harness(vans(), Behavior::Failing, Behavior::Healthy);
    let err = h.coordinator.get_summary(&FilterSet::default()).await.unwrap_err();
    assert!(matches!(
        err,
        ViewError::PrimaryUnavailable {
            query: "fetch_active_fleet",
            ..
        }
    ));
    assert_eq!(err.user_message(Environment::Production), "Could not connect to the fleet database");
    // The request stops before touching the analytics store.
    assert_eq!(h.analytics.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_primary_is_a_failure() {
    let h = harness(vans(), Behavior::Slow(Duration::from_secs(30)), Behavior::Healthy);
    let err = h.coordinator.get_fleet_view(&FilterSet::default()).await.unwrap_err();
    assert_eq!(
        err,
        ViewError::PrimaryUnavailable {
            store: "inventory".to_string(),
            query: "fetch_active_fleet",
            error: SourceError::Timeout(Duration::from_secs(1)),
        }
    );
}

#[tokio::test]
async fn fleet_view_counts_other_statuses_separately() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let view = h.coordinator.get_fleet_view(&FilterSet::default()).await.unwrap();
    assert_eq!(view.totals.total, 10);
    assert_eq!(view.totals.other, 1);
    assert_eq!(view.status, Some(Status::Warning));
    assert_eq!(view.branches, vec!["ATLANTA".to_string()]);
    for rows in [&view.by_branch, &view.by_type, &view.by_usage] {
        assert_eq!(rows.iter().map(|row| row.total).sum::<u64>(), 10);
    }
    assert_eq!(view.type_usage.iter().map(|cell| cell.total).sum::<u64>(), 10);
    // Active and audit populations are fetched as two queries.
    assert_eq!(h.inventory.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_e_single_period_trend() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let view = h
        .coordinator
        .get_trend(Dimension::Branch, 12, &FilterSet::default())
        .await
        .unwrap();
    assert_eq!(view.current[0].utilization, Some(0.6));
    let series = view.series();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].latest_utilization, Some(0.6));
    assert_eq!(series[0].month_over_month, None);
}

#[tokio::test]
async fn trend_degrades_to_empty_history() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Failing);
    let view = h
        .coordinator
        .get_trend(Dimension::Branch, 12, &FilterSet::default())
        .await
        .unwrap();
    assert!(view.series().is_empty());
    assert!(view.history.is_err());
    assert_eq!(serde_json::to_value(&view).unwrap()["history"], serde_json::json!([]));
}

#[tokio::test]
async fn exports_distinguish_no_data_from_failure() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let filters = FilterSet::default().with_branch("DENVER");
    let outcome = h.coordinator.export_inventory(&filters).await.unwrap();
    assert_eq!(outcome, ExportOutcome::NoData);

    let outcome = h.coordinator.export_critical_idle(&FilterSet::default()).await;
    let units: Vec<&str> = outcome.rows().iter().map(|unit| unit.unit.as_str()).collect();
    assert_eq!(units, vec!["V-08"]);

    let outcome = h.coordinator.export_never_leased(&filters).await;
    assert_eq!(outcome, ExportOutcome::NoData);

    let h = harness(vans(), Behavior::Healthy, Behavior::Failing);
    let outcome = h.coordinator.export_never_leased(&FilterSet::default()).await;
    assert!(matches!(outcome, ExportOutcome::Pending(_)));
}

#[tokio::test]
async fn inventory_export_is_sorted_and_scoped_to_status() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let outcome = h.coordinator.export_inventory(&FilterSet::default()).await.unwrap();
    let rows = outcome.rows();
    assert_eq!(rows.len(), 10);
    assert!(rows.windows(2).all(|pair| pair[0].unit < pair[1].unit));
    assert_eq!(rows[0].type_bucket, TypeBucket::DryVan);
    assert_eq!(rows[0].usage, UsageBucket::Otr0);

    let sold = FilterSet::default().with_status(AssetStatus::Other);
    let outcome = h.coordinator.export_inventory(&sold).await.unwrap();
    let units: Vec<&str> = outcome.rows().iter().map(|row| row.unit.as_str()).collect();
    assert_eq!(units, vec!["S-01"]);
}

#[tokio::test]
async fn invalid_grouping_is_rejected() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let err = h
        .coordinator
        .get_breakdown(&[], &FilterSet::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ViewError::InvalidGrouping(_)));
    assert_eq!(h.inventory.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let h = harness(vans(), Behavior::Healthy, Behavior::Healthy);
    let filters = FilterSet::default();
    let first = h.coordinator.get_fleet_view(&filters).await.unwrap();
    let second = h.coordinator.get_fleet_view(&filters).await.unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
