use crate::{
    buckets::{
        IdleDurationBucket,
        LengthBucket,
        TypeBucket,
        UsageBucket,
        VarianceBand,
    },
    metrics::at_least,
    model::AssetRecord,
};
use fleet_analytics_config::{
    normalize_label,
    BucketRules,
    InvalidRules,
};
use serde::Serialize;
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Arc,
};

/// Lookup tables compiled once from a validated [`BucketRules`].
#[derive(Debug)]
struct RuleTable {
    version: u32,
    synonyms: HashMap<String, TypeBucket>,
    specialty: HashSet<String>,
    usage_max_age: [i32; 5],
    length_upper_bounds: [i64; 4],
    idle_boundaries: [u32; 3],
    variance_floors: [f64; 3],
}

/// Maps raw asset attributes to canonical buckets.
///
/// Every method is total: whatever the input, a bucket comes back. Cloning is
/// cheap, all clones share the same rule table.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleTable>,
}

/// The buckets of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    pub type_bucket: TypeBucket,
    pub usage: UsageBucket,
    pub length: LengthBucket,
}

const USAGE_ORDER: [UsageBucket; 5] = [
    UsageBucket::Otr0,
    UsageBucket::Otr1,
    UsageBucket::Otr2,
    UsageBucket::Cart1,
    UsageBucket::Cart2,
];

const LENGTH_ORDER: [LengthBucket; 4] = [
    LengthBucket::Ft20,
    LengthBucket::Ft28To32,
    LengthBucket::Ft40,
    LengthBucket::Ft48,
];

const BAND_ORDER: [VarianceBand; 3] = [
    VarianceBand::AtOrAboveCard,
    VarianceBand::Within10,
    VarianceBand::TenTo20Below,
];

const IDLE_ORDER: [IdleDurationBucket; 3] = [
    IdleDurationBucket::UpTo6,
    IdleDurationBucket::SixTo12,
    IdleDurationBucket::TwelveTo24,
];

impl Classifier {
    pub fn new(rules: &BucketRules) -> Result<Self, InvalidRules> {
        rules.validate()?;

        let synonyms = rules
            .type_synonyms
            .iter()
            .flat_map(|synonym| {
                let bucket = TypeBucket::from_label(&synonym.bucket);
                synonym
                    .variants
                    .iter()
                    .map(move |variant| (normalize_label(variant), bucket.clone()))
            })
            .collect();
        let specialty = rules.specialty_keywords.iter().map(|k| normalize_label(k)).collect();

        debug!(version = rules.version, "compiled bucket rules");

        Ok(Self {
            rules: Arc::new(RuleTable {
                version: rules.version,
                synonyms,
                specialty,
                usage_max_age: rules.usage_max_age,
                length_upper_bounds: rules.length_upper_bounds,
                idle_boundaries: rules.idle_boundaries_months,
                variance_floors: rules.variance_band_floors,
            }),
        })
    }

    pub fn rules_version(&self) -> u32 {
        self.rules.version
    }

    /// Blank, missing and specialty types are SPECIALTY; synonyms map to their
    /// canonical bucket; anything else passes through normalized.
    pub fn classify_type(&self, raw: Option<&str>) -> TypeBucket {
        let label = normalize_label(raw.unwrap_or_default());
        if label.is_empty() || self.rules.specialty.contains(&label) {
            return TypeBucket::Specialty;
        }
        match self.rules.synonyms.get(&label) {
            Some(bucket) => bucket.clone(),
            None => TypeBucket::from_label(&label),
        }
    }

    /// Buckets `current_year - model_year`. Missing or unparseable years and
    /// ages outside every bracket land in STORAGE.
    pub fn classify_usage(&self, model_year: Option<&str>, current_year: i32) -> UsageBucket {
        let Some(year) = model_year.and_then(parse_year) else {
            return UsageBucket::Storage;
        };
        let age = current_year.saturating_sub(year);
        if age < 0 {
            return UsageBucket::Storage;
        }
        self.rules
            .usage_max_age
            .iter()
            .zip(USAGE_ORDER)
            .find(|(max_age, _)| age <= **max_age)
            .map(|(_, bucket)| bucket)
            .unwrap_or(UsageBucket::Storage)
    }

    /// Strips foot/inch marks before parsing. Unparseable lengths are 53.
    pub fn classify_length(&self, raw: Option<&str>) -> LengthBucket {
        let Some(feet) = raw.and_then(parse_length) else {
            return LengthBucket::Ft53;
        };
        self.rules
            .length_upper_bounds
            .iter()
            .zip(LENGTH_ORDER)
            .find(|(upper, _)| feet <= **upper)
            .map(|(_, bucket)| bucket)
            .unwrap_or(LengthBucket::Ft53)
    }

    /// Buckets are half-open: exactly 6 months idle is "6-12".
    pub fn classify_idle(&self, months_idle: u32) -> IdleDurationBucket {
        self.rules
            .idle_boundaries
            .iter()
            .zip(IDLE_ORDER)
            .find(|(boundary, _)| months_idle < **boundary)
            .map(|(_, bucket)| bucket)
            .unwrap_or(IdleDurationBucket::Over24)
    }

    /// Floors are inclusive. Invoices without a benchmark get their own band.
    pub fn classify_variance(&self, variance_pct: Option<f64>) -> VarianceBand {
        let Some(variance) = variance_pct else {
            return VarianceBand::NoCardRate;
        };
        self.rules
            .variance_floors
            .iter()
            .zip(BAND_ORDER)
            .find(|(floor, _)| at_least(variance, **floor))
            .map(|(_, band)| band)
            .unwrap_or(VarianceBand::MoreThan20Below)
    }

    pub fn classify_raw(
        &self,
        raw_type: Option<&str>,
        raw_length: Option<&str>,
        model_year: Option<&str>,
        current_year: i32,
    ) -> Classification {
        Classification {
            type_bucket: self.classify_type(raw_type),
            usage: self.classify_usage(model_year, current_year),
            length: self.classify_length(raw_length),
        }
    }

    pub fn classify_asset(&self, asset: &AssetRecord, current_year: i32) -> Classification {
        self.classify_raw(
            asset.raw_type.as_deref(),
            asset.raw_length.as_deref(),
            asset.model_year.as_deref(),
            current_year,
        )
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let rules = fleet_analytics_config::Config::default().rules;
        Self::new(&rules).expect("embedded bucket rules are valid")
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|y| y.is_finite() && y.fract() == 0.0).map(|y| y as i32))
}

fn parse_length(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != '\'' && *c != '"').collect();
    cleaned.trim().parse::<i64>().ok()
}
