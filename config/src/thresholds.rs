use serde::{
    Deserialize,
    Serialize,
};

/// Status thresholds used by the metrics engine.
///
/// The idle status table is deliberately separate from the idle-duration
/// bucket boundaries in [`crate::BucketRules`]: one grades an average, the
/// other segments a population.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub utilization: RatioThresholds,
    pub rate_variance: RatioThresholds,
    pub idle_status: IdleStatusThresholds,
    pub revenue_growth: RatioThresholds,
}

/// Lower bounds, inclusive: `value >= good` is good, `value >= warning` is a warning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioThresholds {
    pub good: f64,
    pub warning: f64,
}

/// Upper bounds in months, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdleStatusThresholds {
    pub good_max_months: f64,
    pub warning_max_months: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            utilization: RatioThresholds {
                good: 0.80,
                warning: 0.60,
            },
            rate_variance: RatioThresholds {
                good: 0.0,
                warning: -0.10,
            },
            idle_status: IdleStatusThresholds {
                good_max_months: 6.0,
                warning_max_months: 12.0,
            },
            revenue_growth: RatioThresholds {
                good: 0.05,
                warning: 0.0,
            },
        }
    }
}

impl Thresholds {
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (name, pair) in [
            ("utilization", self.utilization),
            ("rate_variance", self.rate_variance),
            ("revenue_growth", self.revenue_growth),
        ] {
            if pair.warning > pair.good {
                return Err(format!(
                    "thresholds.{name}: warning ({}) must not exceed good ({})",
                    pair.warning, pair.good
                ));
            }
        }
        if self.idle_status.good_max_months > self.idle_status.warning_max_months {
            return Err(format!(
                "thresholds.idle_status: good_max_months ({}) must not exceed warning_max_months ({})",
                self.idle_status.good_max_months, self.idle_status.warning_max_months
            ));
        }
        Ok(())
    }
}
