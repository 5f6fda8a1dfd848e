use crate::{
    aggregate::Population,
    buckets::{
        branch_label,
        AssetStatus,
        IdleDurationBucket,
        TypeBucket,
        UsageBucket,
    },
    classifier::Classification,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use std::str::FromStr;
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// Time window applied to the analytics fetches.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Period {
    /// Last twelve months.
    #[default]
    Ltm,
    /// Year to date.
    Ytd,
    /// Last quarter annualized.
    Lqa,
    L3m,
    L6m,
}

impl Period {
    /// Number of monthly periods the window spans, given the latest month (1-12).
    pub fn months(&self, latest_month: u32) -> u32 {
        match self {
            Period::Ltm => 12,
            Period::Ytd => latest_month.clamp(1, 12),
            Period::Lqa | Period::L3m => 3,
            Period::L6m => 6,
        }
    }
}

/// Request filters. `None` means unconstrained; "all" and blank values
/// deserialize to `None`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, deserialize_with = "unless_all")]
    pub branch: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "unless_all")]
    pub type_bucket: Option<TypeBucket>,
    #[serde(default, deserialize_with = "unless_all")]
    pub usage: Option<UsageBucket>,
    #[serde(default, deserialize_with = "unless_all")]
    pub idle_bucket: Option<IdleDurationBucket>,
    #[serde(default)]
    pub period: Period,
    #[serde(default, deserialize_with = "unless_all")]
    pub status: Option<AssetStatus>,
}

impl FilterSet {
    /// Filtering on a status other than the active ones switches to the
    /// all-status audit population.
    pub fn population(&self) -> Population {
        match self.status {
            Some(AssetStatus::Other) => Population::AllStatuses,
            _ => Population::ActiveFleet,
        }
    }

    pub fn matches_branch(&self, branch: Option<&str>) -> bool {
        self.branch
            .as_deref()
            .is_none_or(|wanted| wanted.trim().eq_ignore_ascii_case(branch_label(branch)))
    }

    pub fn matches_status(&self, status: AssetStatus) -> bool {
        self.status.is_none_or(|wanted| wanted == status)
    }

    pub fn matches_classification(&self, classification: &Classification) -> bool {
        self.type_bucket
            .as_ref()
            .is_none_or(|wanted| *wanted == classification.type_bucket)
            && self.usage.is_none_or(|wanted| wanted == classification.usage)
    }

    pub fn matches_idle(&self, bucket: IdleDurationBucket) -> bool {
        self.idle_bucket.is_none_or(|wanted| wanted == bucket)
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_type(mut self, bucket: TypeBucket) -> Self {
        self.type_bucket = Some(bucket);
        self
    }

    pub fn with_usage(mut self, usage: UsageBucket) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_idle_bucket(mut self, bucket: IdleDurationBucket) -> Self {
        self.idle_bucket = Some(bucket);
        self
    }

    pub fn with_status(mut self, status: AssetStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }
}

/// Parses a filter option, treating "all" and blank as unconstrained.
pub fn parse_option<T>(raw: &str) -> Result<Option<T>, T::Err>
where
    T: FromStr,
{
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    raw.parse().map(Some)
}

fn unless_all<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_option(&raw).map_err(serde::de::Error::custom),
    }
}
