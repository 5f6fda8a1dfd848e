use crate::buckets::{
    AssetStatus,
    Dimension,
};
use chrono::NaiveDate;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};

/// One asset row from the inventory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub unit: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub status: AssetStatus,
    #[serde(default, rename = "type")]
    pub raw_type: Option<String>,
    #[serde(default, rename = "length", deserialize_with = "lenient_string")]
    pub raw_length: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model_year: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub sale_date: Option<NaiveDate>,
}

/// Per-asset, per-month idle snapshot from the analytics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleRecord {
    pub unit: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// Snapshot month, `YYYY-MM`.
    pub period: String,
    #[serde(default, rename = "type")]
    pub raw_type: Option<String>,
    #[serde(default, rename = "length", deserialize_with = "lenient_string")]
    pub raw_length: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model_year: Option<String>,
    pub months_idle: u32,
    #[serde(default)]
    pub cumulative_leases: u32,
    #[serde(default)]
    pub asset_cost: Option<f64>,
    /// Monthly opportunity cost of the idle unit.
    #[serde(default)]
    pub card_rate: Option<f64>,
    #[serde(default)]
    pub last_active_month: Option<String>,
}

impl IdleRecord {
    pub fn never_leased(&self) -> bool {
        self.cumulative_leases == 0
    }
}

/// One invoice line from the analytics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    pub invoice: String,
    pub unit: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub period: String,
    #[serde(default, rename = "type")]
    pub raw_type: Option<String>,
    #[serde(default, rename = "length", deserialize_with = "lenient_string")]
    pub raw_length: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model_year: Option<String>,
    pub billed_rate: f64,
    #[serde(default)]
    pub card_rate: Option<f64>,
}

impl RevenueRecord {
    /// Card rates of zero are treated as missing.
    pub fn benchmark(&self) -> Option<f64> {
        self.card_rate.filter(|rate| *rate > 0.0)
    }
}

/// A pre-aggregated row of the analytics store's monthly series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub dimension: Dimension,
    pub value: String,
    pub period: String,
    pub total: u64,
    pub leased: u64,
}

/// Accepts strings, numbers or null for the free-form columns that the stores
/// export inconsistently (`"2019"` vs `2019`, `53` vs `"53'"`).
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Int(value) => value.to_string(),
        Raw::Float(value) => value.to_string(),
    }))
}
