use fleet_analytics_config::{
    RatioThresholds,
    Thresholds,
};
use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumString,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Good,
    Warning,
    Critical,
}

/// `leased / total`, or `None` for an empty population.
///
/// Leased counts above the total are clamped so the ratio stays within [0, 1].
pub fn utilization(total: u64, leased: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(leased.min(total) as f64 / total as f64)
}

/// `(billed - benchmark) / benchmark`, or `None` without a positive benchmark.
pub fn rate_variance_pct(billed: f64, benchmark: Option<f64>) -> Option<f64> {
    benchmark
        .filter(|benchmark| *benchmark > 0.0 && benchmark.is_finite())
        .map(|benchmark| (billed - benchmark) / benchmark)
}

/// Plain average, `None` when there is nothing to average.
pub fn mean(sum: f64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Status derivation with injected thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    thresholds: Thresholds,
}

impl Metrics {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn utilization_status(&self, utilization: Option<f64>) -> Option<Status> {
        utilization.map(|value| grade_ratio(value, self.thresholds.utilization))
    }

    pub fn rate_variance_status(&self, variance_pct: Option<f64>) -> Option<Status> {
        variance_pct.map(|value| grade_ratio(value, self.thresholds.rate_variance))
    }

    pub fn growth_status(&self, growth: Option<f64>) -> Option<Status> {
        growth.map(|value| grade_ratio(value, self.thresholds.revenue_growth))
    }

    pub fn idle_status(&self, avg_months_idle: Option<f64>) -> Option<Status> {
        let table = self.thresholds.idle_status;
        avg_months_idle.map(|months| {
            if months <= table.good_max_months {
                Status::Good
            } else if months <= table.warning_max_months {
                Status::Warning
            } else {
                Status::Critical
            }
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

// Small tolerance so boundary values like (900 - 1000) / 1000 grade inclusively.
const EPSILON: f64 = 1e-9;

/// `value >= floor`, tolerant of floating point noise at the boundary.
pub fn at_least(value: f64, floor: f64) -> bool {
    value + EPSILON >= floor
}

fn grade_ratio(value: f64, thresholds: RatioThresholds) -> Status {
    if at_least(value, thresholds.good) {
        Status::Good
    } else if at_least(value, thresholds.warning) {
        Status::Warning
    } else {
        Status::Critical
    }
}

/// A latest-versus-previous comparison between two periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodDelta {
    pub latest_period: String,
    pub previous_period: String,
    pub latest: f64,
    pub previous: f64,
    pub delta: f64,
    /// `delta / previous`, `None` when the previous value is zero.
    pub growth: Option<f64>,
}

/// Compares the two most recent periods.
///
/// Periods are ordered by descending key and paired positionally, so a gap in
/// the series compares non-adjacent months. Fewer than two periods yield `None`.
pub fn month_over_month<'a, I>(series: I) -> Option<PeriodDelta>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut series: Vec<(&str, f64)> = series.into_iter().collect();
    series.sort_by(|a, b| b.0.cmp(a.0));

    let [(latest_period, latest), (previous_period, previous), ..] = series.as_slice() else {
        return None;
    };
    let delta = latest - previous;
    Some(PeriodDelta {
        latest_period: latest_period.to_string(),
        previous_period: previous_period.to_string(),
        latest: *latest,
        previous: *previous,
        delta,
        growth: (*previous != 0.0).then(|| delta / previous),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn utilization_of_empty_population_is_none() {
        assert_eq!(utilization(0, 0), None);
        assert_eq!(utilization(0, 3), None);
        assert_eq!(utilization(10, 6), Some(0.6));
    }

    #[test]
    fn utilization_status_boundaries() {
        let metrics = Metrics::default();
        assert_eq!(metrics.utilization_status(Some(0.8)), Some(Status::Good));
        assert_eq!(metrics.utilization_status(Some(0.6)), Some(Status::Warning));
        assert_eq!(metrics.utilization_status(Some(0.59)), Some(Status::Critical));
        assert_eq!(metrics.utilization_status(None), None);
    }

    #[test]
    fn scenario_d_variance_boundary_is_inclusive() {
        let metrics = Metrics::default();
        let variance = rate_variance_pct(900.0, Some(1000.0));
        assert_eq!(variance, Some(-0.1));
        assert_eq!(metrics.rate_variance_status(variance), Some(Status::Warning));
        assert_eq!(metrics.rate_variance_status(Some(0.0)), Some(Status::Good));
        assert_eq!(metrics.rate_variance_status(Some(-0.1001)), Some(Status::Critical));
    }

    #[test]
    fn variance_without_benchmark_is_none() {
        assert_eq!(rate_variance_pct(900.0, None), None);
        assert_eq!(rate_variance_pct(900.0, Some(0.0)), None);
        assert_eq!(Metrics::default().rate_variance_status(None), None);
    }

    #[test]
    fn idle_status_uses_its_own_table() {
        let metrics = Metrics::default();
        assert_eq!(metrics.idle_status(Some(6.0)), Some(Status::Good));
        assert_eq!(metrics.idle_status(Some(6.5)), Some(Status::Warning));
        assert_eq!(metrics.idle_status(Some(12.0)), Some(Status::Warning));
        assert_eq!(metrics.idle_status(Some(12.1)), Some(Status::Critical));
    }

    #[test]
    fn growth_status() {
        let metrics = Metrics::default();
        assert_eq!(metrics.growth_status(Some(0.05)), Some(Status::Good));
        assert_eq!(metrics.growth_status(Some(0.0)), Some(Status::Warning));
        assert_eq!(metrics.growth_status(Some(-0.01)), Some(Status::Critical));
    }

    #[test]
    fn month_over_month_pairs_latest_two() {
        let delta = month_over_month([("2024-03", 0.7), ("2024-05", 0.8), ("2024-04", 0.5)]).unwrap();
        assert_eq!(delta.latest_period, "2024-05");
        assert_eq!(delta.previous_period, "2024-04");
        assert!((delta.delta - 0.3).abs() < 1e-12);
        assert!((delta.growth.unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn month_over_month_skips_gaps_positionally() {
        let delta = month_over_month([("2024-01", 100.0), ("2024-05", 120.0)]).unwrap();
        assert_eq!(delta.previous_period, "2024-01");
        assert_eq!(delta.delta, 20.0);
    }

    #[test]
    fn scenario_e_single_period_has_no_delta() {
        assert_eq!(month_over_month([("2024-05", 0.8)]), None);
        assert_eq!(month_over_month(std::iter::empty()), None);
    }

    #[test]
    fn zero_previous_has_no_growth() {
        let delta = month_over_month([("2024-05", 5.0), ("2024-04", 0.0)]).unwrap();
        assert_eq!(delta.growth, None);
    }

    proptest! {
        #[test]
        fn utilization_is_bounded_or_none(total in 0u64..1_000_000, leased in 0u64..1_000_000) {
            match utilization(total, leased) {
                None => prop_assert_eq!(total, 0),
                Some(value) => {
                    prop_assert!(total > 0);
                    prop_assert!(!value.is_nan());
                    prop_assert!((0.0..=1.0).contains(&value));
                }
            }
        }
    }
}
