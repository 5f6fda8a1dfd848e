#[macro_use]
extern crate tracing;

pub mod aggregate;
pub mod analyzer;
pub mod buckets;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod idle;
pub mod metrics;
pub mod model;
pub mod revenue;
pub mod source;

pub use aggregate::{
    BreakdownRow,
    GlobalTotals,
    Grouping,
    MatrixCell,
    Population,
};
pub use analyzer::Analyzer;
pub use buckets::{
    AssetStatus,
    Dimension,
    DimensionValue,
    IdleDurationBucket,
    LengthBucket,
    TypeBucket,
    UsageBucket,
    VarianceBand,
};
pub use classifier::Classifier;
pub use coordinator::{
    ExportOutcome,
    FleetView,
    IdleView,
    InventoryRow,
    RequestState,
    RevenueView,
    SourceCoordinator,
    Summary,
    TrendView,
};
pub use error::{
    Secondary,
    SourceError,
    Unavailable,
    ViewError,
};
pub use filter::{
    FilterSet,
    Period,
};
pub use metrics::{
    Metrics,
    Status,
};
pub use model::{
    AssetRecord,
    IdleRecord,
    PeriodRow,
    RevenueRecord,
};
pub use source::{
    AnalyticsSource,
    InventorySource,
    SourcePool,
};
