use fleet_analytics_config::normalize_label;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};
use strum::{
    Display,
    EnumIter,
    EnumString,
};

/// Canonical trailer type. Unknown raw types pass through as [`TypeBucket::Other`]
/// carrying their normalized spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum TypeBucket {
    #[display("DRY_VAN")]
    DryVan,
    #[display("DRY_VAN_LIFTGATE")]
    DryVanLiftgate,
    #[display("REEFER_LIFTGATE")]
    ReeferLiftgate,
    #[display("SPECIALTY")]
    Specialty,
    #[display("{_0}")]
    Other(String),
}

impl TypeBucket {
    /// Resolves a canonical bucket name, falling back to a pass-through bucket.
    pub fn from_label(label: &str) -> Self {
        let label = normalize_label(label);
        match label.as_str() {
            "DRY_VAN" => TypeBucket::DryVan,
            "DRY_VAN_LIFTGATE" => TypeBucket::DryVanLiftgate,
            "REEFER_LIFTGATE" => TypeBucket::ReeferLiftgate,
            "SPECIALTY" | "" => TypeBucket::Specialty,
            _ => TypeBucket::Other(label),
        }
    }
}

impl Serialize for TypeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeBucket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(TypeBucket::from_label(&label))
    }
}

impl FromStr for TypeBucket {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(TypeBucket::from_label(raw))
    }
}

impl FromStr for AssetStatus {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(AssetStatus::from(raw))
    }
}

/// Age bracket of an asset, in the order the brackets are checked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum UsageBucket {
    #[strum(to_string = "OTR_0")]
    #[serde(rename = "OTR_0")]
    Otr0,
    #[strum(to_string = "OTR_1")]
    #[serde(rename = "OTR_1")]
    Otr1,
    #[strum(to_string = "OTR_2")]
    #[serde(rename = "OTR_2")]
    Otr2,
    #[strum(to_string = "CART_1")]
    #[serde(rename = "CART_1")]
    Cart1,
    #[strum(to_string = "CART_2")]
    #[serde(rename = "CART_2")]
    Cart2,
    #[strum(to_string = "STORAGE")]
    #[serde(rename = "STORAGE")]
    Storage,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum LengthBucket {
    #[strum(to_string = "20")]
    #[serde(rename = "20")]
    Ft20,
    #[strum(to_string = "28-32")]
    #[serde(rename = "28-32")]
    Ft28To32,
    #[strum(to_string = "40")]
    #[serde(rename = "40")]
    Ft40,
    #[strum(to_string = "48")]
    #[serde(rename = "48")]
    Ft48,
    #[strum(to_string = "53")]
    #[serde(rename = "53")]
    Ft53,
}

/// Segment of consecutive non-leased time. Ordered by months idle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum IdleDurationBucket {
    #[strum(to_string = "0-6", serialize = "0-6 Months")]
    #[serde(rename = "0-6", alias = "0-6 Months")]
    UpTo6,
    #[strum(to_string = "6-12", serialize = "6-12 Months")]
    #[serde(rename = "6-12", alias = "6-12 Months")]
    SixTo12,
    #[strum(to_string = "12-24", serialize = "12-24 Months")]
    #[serde(rename = "12-24", alias = "12-24 Months")]
    TwelveTo24,
    #[strum(to_string = "24+", serialize = "24+ Months")]
    #[serde(rename = "24+", alias = "24+ Months")]
    Over24,
}

impl IdleDurationBucket {
    pub fn label(&self) -> &'static str {
        match self {
            IdleDurationBucket::UpTo6 => "0-6 Months",
            IdleDurationBucket::SixTo12 => "6-12 Months",
            IdleDurationBucket::TwelveTo24 => "12-24 Months",
            IdleDurationBucket::Over24 => "24+ Months",
        }
    }

    /// The segment flagged for sale or transfer.
    pub fn is_critical(&self) -> bool {
        matches!(self, IdleDurationBucket::Over24)
    }
}

/// Rate variance distribution band of one invoice.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum VarianceBand {
    #[strum(to_string = "No Card Rate")]
    #[serde(rename = "No Card Rate")]
    NoCardRate,
    #[strum(to_string = "At or Above Card")]
    #[serde(rename = "At or Above Card")]
    AtOrAboveCard,
    #[strum(to_string = "Within 10%")]
    #[serde(rename = "Within 10%")]
    Within10,
    #[strum(to_string = "10-20% Below")]
    #[serde(rename = "10-20% Below")]
    TenTo20Below,
    #[strum(to_string = "More than 20% Below")]
    #[serde(rename = "More than 20% Below")]
    MoreThan20Below,
}

/// Lease status as reported by the inventory store. Anything other than
/// AVAILABLE or LEASED (sold, retired, in shop...) collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Available,
    Leased,
    Other,
}

impl AssetStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AssetStatus::Available | AssetStatus::Leased)
    }
}

impl From<&str> for AssetStatus {
    fn from(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "AVAILABLE" => AssetStatus::Available,
            "LEASED" => AssetStatus::Leased,
            _ => AssetStatus::Other,
        }
    }
}

impl From<String> for AssetStatus {
    fn from(raw: String) -> Self {
        AssetStatus::from(raw.as_str())
    }
}

/// A grouping dimension over classified records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dimension {
    Branch,
    Type,
    Usage,
    Length,
    Status,
}

/// Label used for assets without a branch, so blank branches still count
/// towards the branch partition.
pub const UNASSIGNED_BRANCH: &str = "UNASSIGNED";

/// The value of one record along one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum DimensionValue {
    Branch(String),
    Type(TypeBucket),
    Usage(UsageBucket),
    Length(LengthBucket),
    Status(AssetStatus),
    Idle(IdleDurationBucket),
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Branch(branch) => f.write_str(branch),
            DimensionValue::Type(bucket) => bucket.fmt(f),
            DimensionValue::Usage(bucket) => bucket.fmt(f),
            DimensionValue::Length(bucket) => bucket.fmt(f),
            DimensionValue::Status(status) => status.fmt(f),
            DimensionValue::Idle(bucket) => bucket.fmt(f),
        }
    }
}

/// Branch label for grouping: trimmed, blank becomes [`UNASSIGNED_BRANCH`].
pub fn branch_label(branch: Option<&str>) -> &str {
    match branch.map(str::trim) {
        Some(branch) if !branch.is_empty() => branch,
        _ => UNASSIGNED_BRANCH,
    }
}
