//! Data-access seams. The engine never talks to a database directly; the
//! process entry point hands it implementations of these traits wrapped in
//! bounded [`SourcePool`]s.

mod pool;

pub use pool::SourcePool;

use crate::{
    buckets::Dimension,
    error::SourceError,
    filter::{
        FilterSet,
        Period,
    },
    model::{
        AssetRecord,
        IdleRecord,
        PeriodRow,
        RevenueRecord,
    },
};
use futures::future::BoxFuture;

pub type SourceResult<T> = Result<T, SourceError>;

/// The primary store. Every view needs it.
pub trait InventorySource: Send + Sync {
    /// Assets matching `filter`'s branch and status. Without a status filter
    /// only AVAILABLE and LEASED assets need to be returned; the engine
    /// re-applies every filter, so returning more is harmless.
    fn fetch_active_fleet<'a>(&'a self, filter: &'a FilterSet) -> BoxFuture<'a, SourceResult<Vec<AssetRecord>>>;

    fn name(&self) -> &'static str;
}

/// The secondary store. Views degrade when it is unavailable.
pub trait AnalyticsSource: Send + Sync {
    /// Idle records inside `period`, counted back from the latest month of
    /// the whole snapshot. Records of every branch must be returned since
    /// the current month is found before the branch filter applies.
    fn fetch_idle_snapshot<'a>(
        &'a self,
        period: Period,
        filter: &'a FilterSet,
    ) -> BoxFuture<'a, SourceResult<Vec<IdleRecord>>>;

    /// Invoices inside `period`, counted back from the latest month of the
    /// whole snapshot.
    fn fetch_revenue_snapshot<'a>(
        &'a self,
        period: Period,
        filter: &'a FilterSet,
    ) -> BoxFuture<'a, SourceResult<Vec<RevenueRecord>>>;

    /// Up to `last_n` most recent monthly rows per value of `dimension`.
    fn fetch_period_series(&self, dimension: Dimension, last_n: usize) -> BoxFuture<'_, SourceResult<Vec<PeriodRow>>>;

    fn name(&self) -> &'static str;
}
