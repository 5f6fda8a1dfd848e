use crate::{
    aggregate::ClassifiedAsset,
    classifier::Classifier,
    filter::FilterSet,
    metrics::Metrics,
    model::AssetRecord,
};
use chrono::Datelike;
use fleet_analytics_config::{
    Config,
    InvalidRules,
};

/// The pure half of every view: classification rules, status thresholds and
/// the year asset age is measured against.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    classifier: Classifier,
    metrics: Metrics,
    reference_year: Option<i32>,
}

impl Analyzer {
    pub fn new(classifier: Classifier, metrics: Metrics, reference_year: Option<i32>) -> Self {
        Self {
            classifier,
            metrics,
            reference_year,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, InvalidRules> {
        Ok(Self::new(
            Classifier::new(&config.rules)?,
            Metrics::new(config.thresholds.clone()),
            config.reference_year,
        ))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The configured reference year, or the current calendar year.
    pub fn current_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| chrono::Local::now().year())
    }

    /// Classifies `assets` and keeps those matching `filters`. Status is only
    /// filtered when the filter names one; population selection is left to
    /// the aggregation.
    pub fn classify_assets<'a>(&self, assets: &'a [AssetRecord], filters: &FilterSet) -> Vec<ClassifiedAsset<'a>> {
        let year = self.current_year();
        assets
            .iter()
            .filter(|asset| filters.matches_branch(asset.branch.as_deref()) && filters.matches_status(asset.status))
            .map(|asset| ClassifiedAsset {
                asset,
                classification: self.classifier.classify_asset(asset, year),
            })
            .filter(|classified| filters.matches_classification(&classified.classification))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::{
        AssetStatus,
        TypeBucket,
        UsageBucket,
    };
    use pretty_assertions::assert_eq;

    fn asset(unit: &str, branch: &str, status: AssetStatus, raw_type: &str, year: &str) -> AssetRecord {
        AssetRecord {
            unit: unit.to_string(),
            branch: Some(branch.to_string()),
            status,
            raw_type: Some(raw_type.to_string()),
            raw_length: None,
            model_year: Some(year.to_string()),
            cost: None,
            purchase_date: None,
            sale_date: None,
        }
    }

    #[test]
    fn reference_year_overrides_the_clock() {
        let mut config = Config::default();
        config.reference_year = Some(2020);
        let analyzer = Analyzer::from_config(&config).unwrap();
        assert_eq!(analyzer.current_year(), 2020);
        assert!(Analyzer::default().current_year() >= 2024);
    }

    #[test]
    fn filters_apply_after_classification() {
        let analyzer = Analyzer::new(Classifier::default(), Metrics::default(), Some(2024));
        let assets = vec![
            asset("1", "DALLAS", AssetStatus::Leased, "VAN", "2023"),
            asset("2", "DALLAS", AssetStatus::Available, "VAN", "2000"),
            asset("3", "HOUSTON", AssetStatus::Leased, "VAN", "2023"),
            asset("4", "DALLAS", AssetStatus::Other, "LIFTGATE", "2023"),
        ];

        let filters = FilterSet::default()
            .with_branch("Dallas")
            .with_type(TypeBucket::DryVan)
            .with_usage(UsageBucket::Otr0);
        let units: Vec<&str> = analyzer
            .classify_assets(&assets, &filters)
            .iter()
            .map(|c| c.asset.unit.as_str())
            .collect();
        assert_eq!(units, vec!["1"]);

        let units: Vec<&str> = analyzer
            .classify_assets(&assets, &FilterSet::default().with_status(AssetStatus::Other))
            .iter()
            .map(|c| c.asset.unit.as_str())
            .collect();
        assert_eq!(units, vec!["4"]);
        assert_eq!(analyzer.classify_assets(&assets, &FilterSet::default()).len(), 4);
    }
}
