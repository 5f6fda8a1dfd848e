use serde::{
    Deserialize,
    Serialize,
};

/// The versioned bucket rule set shared by every classification path.
///
/// Bracket tables hold inclusive upper bounds; the bucket after the last bound
/// is open-ended. Bucket names themselves are owned by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketRules {
    pub version: u32,
    #[serde(default)]
    pub type_synonyms: Vec<TypeSynonym>,
    #[serde(default)]
    pub specialty_keywords: Vec<String>,
    /// Upper age bounds for OTR_0, OTR_1, OTR_2, CART_1 and CART_2.
    pub usage_max_age: [i32; 5],
    /// Upper length bounds for the 20, 28-32, 40 and 48 foot buckets.
    pub length_upper_bounds: [i64; 4],
    /// Months idle at which the 6-12, 12-24 and 24+ buckets start.
    pub idle_boundaries_months: [u32; 3],
    /// Variance floors for "At or Above Card", "Within 10%" and "10-20% Below".
    pub variance_band_floors: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeSynonym {
    pub bucket: String,
    pub variants: Vec<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidRules {
    #[error("rules.usage_max_age must start at or above zero and be strictly increasing, got {0:?}")]
    UsageBrackets([i32; 5]),
    #[error("rules.length_upper_bounds must be strictly increasing, got {0:?}")]
    LengthBrackets([i64; 4]),
    #[error("rules.idle_boundaries_months must be positive and strictly increasing, got {0:?}")]
    IdleBoundaries([u32; 3]),
    #[error("rules.variance_band_floors must be strictly decreasing, got {0:?}")]
    VarianceBands([f64; 3]),
    #[error("rules.type_synonyms maps `{variant}` to both `{first}` and `{second}`")]
    ConflictingSynonym {
        variant: String,
        first: String,
        second: String,
    },
}

impl BucketRules {
    pub fn validate(&self) -> Result<(), InvalidRules> {
        if self.usage_max_age[0] < 0 || !strictly_increasing(&self.usage_max_age) {
            return Err(InvalidRules::UsageBrackets(self.usage_max_age));
        }
        if !strictly_increasing(&self.length_upper_bounds) {
            return Err(InvalidRules::LengthBrackets(self.length_upper_bounds));
        }
        if self.idle_boundaries_months[0] == 0 || !strictly_increasing(&self.idle_boundaries_months) {
            return Err(InvalidRules::IdleBoundaries(self.idle_boundaries_months));
        }
        if !self.variance_band_floors.windows(2).all(|w| w[0] > w[1]) {
            return Err(InvalidRules::VarianceBands(self.variance_band_floors));
        }

        let mut seen: Vec<(String, &str)> = Vec::new();
        for synonym in &self.type_synonyms {
            for variant in &synonym.variants {
                let variant = normalize_label(variant);
                match seen.iter().find(|(existing, _)| *existing == variant) {
                    Some((_, first)) if *first != synonym.bucket => {
                        return Err(InvalidRules::ConflictingSynonym {
                            variant,
                            first: first.to_string(),
                            second: synonym.bucket.clone(),
                        });
                    }
                    Some(_) => {}
                    None => seen.push((variant, synonym.bucket.as_str())),
                }
            }
        }
        Ok(())
    }
}

/// Trim and uppercase, the normalization applied to raw type strings.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn strictly_increasing<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}
