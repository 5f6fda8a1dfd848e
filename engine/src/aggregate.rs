//! Single-pass, multi-dimension grouping over classified assets.
//!
//! Every requested grouping is accumulated into its own ordered map during
//! one scan of the records. Ordered maps keep the output independent of the
//! input order, so aggregating the same records twice always yields the same
//! rows.

use crate::{
    buckets::{
        branch_label,
        AssetStatus,
        Dimension,
        DimensionValue,
    },
    classifier::Classification,
    error::InvalidGrouping,
    metrics::utilization,
    model::AssetRecord,
};
use serde::Serialize;
use std::collections::{
    BTreeMap,
    BTreeSet,
};

/// Which statuses take part in an aggregation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Population {
    /// AVAILABLE and LEASED only.
    #[default]
    ActiveFleet,
    /// Every status, for audits.
    AllStatuses,
}

impl Population {
    pub fn includes(&self, status: AssetStatus) -> bool {
        match self {
            Population::ActiveFleet => status.is_active(),
            Population::AllStatuses => true,
        }
    }
}

/// One or two grouping dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Flat(Dimension),
    Matrix(Dimension, Dimension),
}

impl Grouping {
    pub fn dimensions(&self) -> Vec<Dimension> {
        match self {
            Grouping::Flat(dim) => vec![*dim],
            Grouping::Matrix(rows, columns) => vec![*rows, *columns],
        }
    }
}

impl TryFrom<&[Dimension]> for Grouping {
    type Error = InvalidGrouping;

    fn try_from(dimensions: &[Dimension]) -> Result<Self, Self::Error> {
        match dimensions {
            [dim] => Ok(Grouping::Flat(*dim)),
            [rows, columns] => Ok(Grouping::Matrix(*rows, *columns)),
            _ => Err(InvalidGrouping(dimensions.len())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: u64,
    pub leased: u64,
}

impl Tally {
    pub fn record(&mut self, status: AssetStatus) {
        self.total += 1;
        if status == AssetStatus::Leased {
            self.leased += 1;
        }
    }

    pub fn utilization(&self) -> Option<f64> {
        utilization(self.total, self.leased)
    }
}

/// Counts over the fetched records, regardless of the requested groupings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalTotals {
    /// Active fleet size.
    pub total: u64,
    pub leased: u64,
    pub available: u64,
    /// Assets in any other status.
    pub other: u64,
}

impl GlobalTotals {
    pub fn record(&mut self, status: AssetStatus) {
        match status {
            AssetStatus::Leased => {
                self.total += 1;
                self.leased += 1;
            }
            AssetStatus::Available => {
                self.total += 1;
                self.available += 1;
            }
            AssetStatus::Other => self.other += 1,
        }
    }

    pub fn utilization(&self) -> Option<f64> {
        utilization(self.total, self.leased)
    }
}

/// An asset together with its buckets.
#[derive(Debug, Clone)]
pub struct ClassifiedAsset<'a> {
    pub asset: &'a AssetRecord,
    pub classification: Classification,
}

impl ClassifiedAsset<'_> {
    pub fn value(&self, dimension: Dimension) -> DimensionValue {
        match dimension {
            Dimension::Branch => DimensionValue::Branch(branch_label(self.asset.branch.as_deref()).to_string()),
            Dimension::Type => DimensionValue::Type(self.classification.type_bucket.clone()),
            Dimension::Usage => DimensionValue::Usage(self.classification.usage),
            Dimension::Length => DimensionValue::Length(self.classification.length),
            Dimension::Status => DimensionValue::Status(self.asset.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub values: Vec<DimensionValue>,
    pub total: u64,
    pub leased: u64,
    pub utilization: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    pub row: DimensionValue,
    pub column: DimensionValue,
    pub total: u64,
    pub leased: u64,
    pub utilization: Option<f64>,
}

/// The result of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    groupings: Vec<Grouping>,
    tables: Vec<BTreeMap<Vec<DimensionValue>, Tally>>,
    totals: GlobalTotals,
}

impl Aggregation {
    pub fn totals(&self) -> GlobalTotals {
        self.totals
    }

    pub fn groupings(&self) -> &[Grouping] {
        &self.groupings
    }

    /// Rows of the grouping at `index`, in key order. Groups with no records
    /// are absent.
    pub fn rows(&self, index: usize) -> Vec<BreakdownRow> {
        self.tables
            .get(index)
            .into_iter()
            .flatten()
            .map(|(values, tally)| BreakdownRow {
                values: values.clone(),
                total: tally.total,
                leased: tally.leased,
                utilization: tally.utilization(),
            })
            .collect()
    }

    /// Cells of a matrix grouping. Flat groupings yield no cells.
    pub fn cells(&self, index: usize) -> Vec<MatrixCell> {
        self.rows(index)
            .into_iter()
            .filter_map(|row| {
                let [row_value, column_value]: [DimensionValue; 2] = row.values.try_into().ok()?;
                Some(MatrixCell {
                    row: row_value,
                    column: column_value,
                    total: row.total,
                    leased: row.leased,
                    utilization: row.utilization,
                })
            })
            .collect()
    }
}

/// Groups `records` by every grouping in one scan.
///
/// Records outside `population` only count towards [`GlobalTotals::other`].
pub fn aggregate_many<'r, 'a: 'r, I>(records: I, population: Population, groupings: &[Grouping]) -> Aggregation
where
    I: IntoIterator<Item = &'r ClassifiedAsset<'a>>,
{
    let dimensions: Vec<Vec<Dimension>> = groupings.iter().map(Grouping::dimensions).collect();
    let mut tables = vec![BTreeMap::<Vec<DimensionValue>, Tally>::new(); groupings.len()];
    let mut totals = GlobalTotals::default();

    for record in records {
        let status = record.asset.status;
        totals.record(status);
        if !population.includes(status) {
            continue;
        }
        for (table, dims) in tables.iter_mut().zip(&dimensions) {
            let key = dims.iter().map(|dim| record.value(*dim)).collect();
            table.entry(key).or_default().record(status);
        }
    }

    trace!(
        groupings = groupings.len(),
        total = totals.total,
        other = totals.other,
        "aggregated assets"
    );

    Aggregation {
        groupings: groupings.to_vec(),
        tables,
        totals,
    }
}

/// Groups `records` by a single grouping.
pub fn aggregate<'r, 'a: 'r, I>(records: I, population: Population, grouping: Grouping) -> Vec<BreakdownRow>
where
    I: IntoIterator<Item = &'r ClassifiedAsset<'a>>,
{
    aggregate_many(records, population, &[grouping]).rows(0)
}

/// Distinct non-blank branches, sorted.
pub fn branches<'a, I>(assets: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a AssetRecord>,
{
    assets
        .into_iter()
        .filter_map(|asset| asset.branch.as_deref().map(str::trim))
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buckets::{
            TypeBucket,
            UsageBucket,
        },
        classifier::Classifier,
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const YEAR: i32 = 2024;

    fn asset(unit: &str, branch: Option<&str>, status: &str, raw_type: Option<&str>, year: &str) -> AssetRecord {
        AssetRecord {
            unit: unit.to_string(),
            branch: branch.map(str::to_string),
            status: AssetStatus::from(status),
            raw_type: raw_type.map(str::to_string),
            raw_length: Some("53".to_string()),
            model_year: Some(year.to_string()),
            cost: None,
            purchase_date: None,
            sale_date: None,
        }
    }

    fn classify<'a>(classifier: &Classifier, assets: &'a [AssetRecord]) -> Vec<ClassifiedAsset<'a>> {
        assets
            .iter()
            .map(|asset| ClassifiedAsset {
                asset,
                classification: classifier.classify_asset(asset, YEAR),
            })
            .collect()
    }

    fn fleet() -> Vec<AssetRecord> {
        vec![
            asset("1", Some("DALLAS"), "LEASED", Some("VAN"), "2022"),
            asset("2", Some("DALLAS"), "AVAILABLE", Some("Reefer Liftgate"), "2010"),
            asset("3", Some("HOUSTON"), "LEASED", Some("CHASSIS"), "2019"),
            asset("4", Some(" "), "AVAILABLE", None, "n/a"),
            asset("5", None, "LEASED", Some("dry van"), "2005"),
            asset("6", Some("HOUSTON"), "SOLD", Some("VAN"), "2001"),
        ]
    }

    #[test]
    fn scenario_a_all_vans() {
        let assets: Vec<AssetRecord> = (0..10)
            .map(|i| {
                let status = if i < 6 { "LEASED" } else { "AVAILABLE" };
                asset(&i.to_string(), Some("ATLANTA"), status, Some("VAN"), "2020")
            })
            .collect();
        let classified = classify(&Classifier::default(), &assets);
        let rows = aggregate(&classified, Population::ActiveFleet, Grouping::Flat(Dimension::Type));
        assert_eq!(
            rows,
            vec![BreakdownRow {
                values: vec![DimensionValue::Type(TypeBucket::DryVan)],
                total: 10,
                leased: 6,
                utilization: Some(0.6),
            }]
        );
    }

    #[test]
    fn partition_invariant_holds_for_every_dimension() {
        let assets = fleet();
        let classified = classify(&Classifier::default(), &assets);
        let groupings = [
            Grouping::Flat(Dimension::Type),
            Grouping::Flat(Dimension::Usage),
            Grouping::Flat(Dimension::Branch),
            Grouping::Matrix(Dimension::Type, Dimension::Usage),
        ];
        let aggregation = aggregate_many(&classified, Population::ActiveFleet, &groupings);
        assert_eq!(
            aggregation.totals(),
            GlobalTotals {
                total: 5,
                leased: 3,
                available: 2,
                other: 1,
            }
        );
        for index in 0..groupings.len() {
            let sum: u64 = aggregation.rows(index).iter().map(|row| row.total).sum();
            assert_eq!(sum, 5, "grouping {:?}", groupings[index]);
        }
    }

    #[test]
    fn blank_branches_group_as_unassigned() {
        let assets = fleet();
        let classified = classify(&Classifier::default(), &assets);
        let rows = aggregate(&classified, Population::ActiveFleet, Grouping::Flat(Dimension::Branch));
        let labels: Vec<String> = rows.iter().map(|row| row.values[0].to_string()).collect();
        assert_eq!(labels, vec!["DALLAS", "HOUSTON", "UNASSIGNED"]);
        assert_eq!(rows[2].total, 2);
    }

    #[test]
    fn scenario_b_unknowns_are_counted_once() {
        let assets = vec![asset("9", Some("DALLAS"), "AVAILABLE", None, "n/a")];
        let classified = classify(&Classifier::default(), &assets);
        let aggregation = aggregate_many(
            &classified,
            Population::ActiveFleet,
            &[Grouping::Flat(Dimension::Type), Grouping::Flat(Dimension::Usage)],
        );
        assert_eq!(aggregation.rows(0)[0].values, vec![DimensionValue::Type(TypeBucket::Specialty)]);
        assert_eq!(aggregation.rows(0)[0].total, 1);
        assert_eq!(aggregation.rows(1)[0].values, vec![DimensionValue::Usage(UsageBucket::Storage)]);
        assert_eq!(aggregation.rows(1)[0].total, 1);
    }

    #[test]
    fn audit_population_includes_other_statuses() {
        let assets = fleet();
        let classified = classify(&Classifier::default(), &assets);
        let rows = aggregate(&classified, Population::AllStatuses, Grouping::Flat(Dimension::Status));
        let counts: Vec<(String, u64)> = rows.iter().map(|row| (row.values[0].to_string(), row.total)).collect();
        assert_eq!(
            counts,
            vec![
                ("AVAILABLE".to_string(), 2),
                ("LEASED".to_string(), 3),
                ("OTHER".to_string(), 1)
            ]
        );
    }

    #[test]
    fn matrix_cells_are_sparse() {
        let assets = fleet();
        let classified = classify(&Classifier::default(), &assets);
        let aggregation = aggregate_many(
            &classified,
            Population::ActiveFleet,
            &[Grouping::Matrix(Dimension::Type, Dimension::Usage)],
        );
        let cells = aggregation.cells(0);
        assert_eq!(cells.len(), 5);
        assert!(cells.iter().all(|cell| cell.total > 0));
        assert!(aggregation.cells(1).is_empty());
    }

    #[test]
    fn grouping_accepts_one_or_two_dimensions() {
        assert_eq!(Grouping::try_from(&[Dimension::Type][..]), Ok(Grouping::Flat(Dimension::Type)));
        assert_eq!(
            Grouping::try_from(&[Dimension::Branch, Dimension::Usage][..]),
            Ok(Grouping::Matrix(Dimension::Branch, Dimension::Usage))
        );
        assert_eq!(Grouping::try_from(&[] as &[Dimension]), Err(InvalidGrouping(0)));
        assert_eq!(
            Grouping::try_from(&[Dimension::Type, Dimension::Usage, Dimension::Branch][..]),
            Err(InvalidGrouping(3))
        );
    }

    #[test]
    fn branch_list_is_sorted_and_distinct() {
        assert_eq!(branches(&fleet()), vec!["DALLAS".to_string(), "HOUSTON".to_string()]);
    }

    fn arbitrary_asset() -> impl Strategy<Value = AssetRecord> {
        (
            "[A-Z]{1,4}",
            proptest::option::of(prop_oneof!["DALLAS", "HOUSTON", " "]),
            prop_oneof!["LEASED", "AVAILABLE", "SOLD"],
            proptest::option::of(prop_oneof!["VAN", "LIFTGATE", "PUP", "REEFER", ""]),
            prop_oneof!["2023", "2015", "1999", "n/a"],
        )
            .prop_map(|(unit, branch, status, raw_type, year)| {
                asset(&unit, branch.as_deref(), &status, raw_type.as_deref(), &year)
            })
    }

    proptest! {
        #[test]
        fn aggregation_ignores_input_order(mut assets in proptest::collection::vec(arbitrary_asset(), 0..40)) {
            let classifier = Classifier::default();
            let groupings = [
                Grouping::Flat(Dimension::Branch),
                Grouping::Matrix(Dimension::Type, Dimension::Usage),
            ];
            let forward = aggregate_many(&classify(&classifier, &assets), Population::ActiveFleet, &groupings);
            assets.reverse();
            let backward = aggregate_many(&classify(&classifier, &assets), Population::ActiveFleet, &groupings);
            prop_assert_eq!(&forward, &backward);

            let active = assets.iter().filter(|a| a.status.is_active()).count() as u64;
            for index in 0..groupings.len() {
                let sum: u64 = forward.rows(index).iter().map(|row| row.total).sum();
                prop_assert_eq!(sum, active);
            }
        }
    }
}
