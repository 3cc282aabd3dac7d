use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use log::debug;
use polars::prelude::*;

use crate::aggregation::{date_between, payment_is, status_is, success_only, vehicle_is};
use crate::error::InsightsError;
use crate::schema::{derived, incomplete_flag, ride, status};
use crate::store::Store;

/// The fixed menu of analytical queries. No free-form filter text; each
/// variant maps to one parametrized read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    SuccessfulBookings,
    AvgDistancePerVehicle,
    CustomerCancelledCount,
    TopCustomersByRides,
    DriverCancelPersonalCarIssue,
    PrimeSedanRatingBounds,
    UpiPayments,
    AvgCustomerRatingPerVehicle,
    TotalSuccessfulValue,
    IncompleteRides,
}

impl QueryKind {
    pub const ALL: [QueryKind; 10] = [
        QueryKind::SuccessfulBookings,
        QueryKind::AvgDistancePerVehicle,
        QueryKind::CustomerCancelledCount,
        QueryKind::TopCustomersByRides,
        QueryKind::DriverCancelPersonalCarIssue,
        QueryKind::PrimeSedanRatingBounds,
        QueryKind::UpiPayments,
        QueryKind::AvgCustomerRatingPerVehicle,
        QueryKind::TotalSuccessfulValue,
        QueryKind::IncompleteRides,
    ];

    /// Menu label, stable across releases.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SuccessfulBookings => "Retrieve all successful bookings",
            Self::AvgDistancePerVehicle => "Average ride distance per vehicle type",
            Self::CustomerCancelledCount => "Rides cancelled by customers",
            Self::TopCustomersByRides => "Top 5 customers by number of rides",
            Self::DriverCancelPersonalCarIssue => {
                "Driver cancellations for personal and car-related issues"
            }
            Self::PrimeSedanRatingBounds => "Max and min driver rating for Prime Sedan",
            Self::UpiPayments => "Rides paid via UPI",
            Self::AvgCustomerRatingPerVehicle => "Average customer rating per vehicle type",
            Self::TotalSuccessfulValue => "Total booking value of successful rides",
            Self::IncompleteRides => "Incomplete rides with reason",
        }
    }
}

/// Optional bound parameters: an inclusive calendar date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl QueryParams {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

struct CacheEntry {
    at: Instant,
    df: DataFrame,
}

/// Read-only executor over one store table, with a TTL result cache.
///
/// Results are cached per (query, params); entries older than the TTL are
/// recomputed transparently on the next access. The store is read scoped
/// per call, never held open between queries, and never written.
pub struct QueryExecutor {
    store: Store,
    table: String,
    ttl: Duration,
    cache: RefCell<HashMap<String, CacheEntry>>,
}

impl QueryExecutor {
    pub fn new(store: Store, table: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            table: table.into(),
            ttl,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn run(&self, kind: QueryKind, params: QueryParams) -> Result<DataFrame, InsightsError> {
        let key = cache_key(kind, params);
        if let Some(entry) = self.cache.borrow().get(&key) {
            if entry.at.elapsed() < self.ttl {
                debug!("cache hit: {key}");
                return Ok(entry.df.clone());
            }
        }

        let rides = self.store.read_table(&self.table)?;
        let result = execute(kind, rides, params)?;

        self.cache.borrow_mut().insert(
            key,
            CacheEntry {
                at: Instant::now(),
                df: result.clone(),
            },
        );
        Ok(result)
    }

    /// Drop every cached result, expired or not.
    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

fn cache_key(kind: QueryKind, params: QueryParams) -> String {
    format!("{kind:?}|{:?}|{:?}", params.start, params.end)
}

fn execute(
    kind: QueryKind,
    rides: DataFrame,
    params: QueryParams,
) -> Result<DataFrame, InsightsError> {
    let lf = rides.lazy().filter(date_between(params.start, params.end));

    let out = match kind {
        QueryKind::SuccessfulBookings => lf.filter(success_only()),
        QueryKind::AvgDistancePerVehicle => lf
            .filter(success_only())
            .group_by([col(ride::VEHICLE_TYPE)])
            .agg([col(ride::RIDE_DISTANCE).mean().alias(derived::AVG_DISTANCE)])
            .sort([ride::VEHICLE_TYPE], SortMultipleOptions::default()),
        QueryKind::CustomerCancelledCount => lf
            .filter(status_is(status::CANCELED_BY_CUSTOMER))
            .select([len().alias(derived::COUNT)]),
        QueryKind::TopCustomersByRides => lf
            .group_by([col(ride::CUSTOMER_ID)])
            .agg([col(ride::BOOKING_ID).count().alias(derived::TOTAL_RIDES)])
            .sort(
                [derived::TOTAL_RIDES],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(5),
        QueryKind::DriverCancelPersonalCarIssue => lf
            .filter(
                col(ride::CANCELED_BY_DRIVER_REASON).eq(lit("Personal & Car related issue")),
            )
            .select([len().alias(derived::COUNT)]),
        QueryKind::PrimeSedanRatingBounds => lf.filter(vehicle_is("Prime Sedan")).select([
            col(ride::DRIVER_RATINGS)
                .max()
                .alias(derived::MAX_DRIVER_RATING),
            col(ride::DRIVER_RATINGS)
                .min()
                .alias(derived::MIN_DRIVER_RATING),
        ]),
        QueryKind::UpiPayments => lf.filter(payment_is("UPI")),
        QueryKind::AvgCustomerRatingPerVehicle => lf
            .group_by([col(ride::VEHICLE_TYPE)])
            .agg([col(ride::CUSTOMER_RATING)
                .mean()
                .alias(derived::AVG_CUSTOMER_RATING)])
            .sort([ride::VEHICLE_TYPE], SortMultipleOptions::default()),
        QueryKind::TotalSuccessfulValue => lf
            .filter(success_only())
            .select([col(ride::BOOKING_VALUE).sum().alias(derived::TOTAL_VALUE)]),
        QueryKind::IncompleteRides => lf
            .filter(col(ride::INCOMPLETE_RIDES).eq(lit(incomplete_flag::YES)))
            .select([
                col(ride::BOOKING_ID),
                col(ride::INCOMPLETE_RIDES),
                col(ride::INCOMPLETE_RIDES_REASON),
            ]),
    };

    Ok(out.collect()?)
}
