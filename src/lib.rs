//! Data layer for a single-user ride-hailing analytics dashboard.
//!
//! Loads a rides CSV into an embedded parquet-backed store on first run,
//! serves a fixed menu of analytical queries with a TTL result cache, and
//! provides the per-section aggregations behind the BI view. Rendering is
//! the caller's concern; everything here returns plain DataFrames or small
//! summary structs.

mod aggregation;
mod config;
mod dashboard;
mod error;
mod query;
mod schema;
mod store;

pub use aggregation::{
    cancelled, date_between, group_agg, payment_is, rate, status_is, success_only, top_n,
    vehicle_is, AggSpec,
};
pub use config::DashboardConfig;
pub use dashboard::{CancellationSummary, CancelledBy, Dashboard, OverallSummary};
pub use error::InsightsError;
pub use query::{QueryExecutor, QueryKind, QueryParams};
pub use schema::{date_format, derived, incomplete_flag, ride, status};
pub use store::{LoadOutcome, Store};
