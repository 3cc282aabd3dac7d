use chrono::NaiveDate;
use polars::prelude::*;

use crate::aggregation::{
    cancelled, date_between, group_agg, rate, status_is, success_only, top_n, AggSpec,
};
use crate::error::InsightsError;
use crate::schema::{derived, ride, status};
use crate::store::Store;

/// Headline figures for the overall section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverallSummary {
    pub total_bookings: usize,
    /// Booking value summed over booking_id-deduplicated rows; ids are not
    /// guaranteed unique in the source.
    pub total_value: f64,
    pub success_value: f64,
}

/// Cancellation figures; `cancellation_rate` is a fraction of all
/// bookings and NaN when the snapshot is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CancellationSummary {
    pub total: usize,
    pub succeeded: usize,
    pub cancelled: usize,
    pub cancellation_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelledBy {
    Customer,
    Driver,
}

/// Immutable in-memory snapshot of the rides table, with the section
/// producers behind the BI view. Every method is a pure read; a date
/// filter yields a new snapshot rather than mutating this one.
pub struct Dashboard {
    rides: DataFrame,
}

impl Dashboard {
    pub fn new(rides: DataFrame) -> Self {
        Self { rides }
    }

    pub fn from_store(store: &Store, table: &str) -> Result<Self, InsightsError> {
        Ok(Self::new(store.read_table(table)?))
    }

    pub fn rides(&self) -> &DataFrame {
        &self.rides
    }

    /// Restrict the snapshot to an inclusive date range. An inverted range
    /// yields an empty snapshot, not an error.
    pub fn filter_dates(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, InsightsError> {
        let filtered = self
            .rides
            .clone()
            .lazy()
            .filter(date_between(start, end))
            .collect()?;
        Ok(Self::new(filtered))
    }

    // ── Overall ─────────────────────────────────────────────────────────

    pub fn overall_summary(&self) -> Result<OverallSummary, InsightsError> {
        let total_value = self
            .rides
            .clone()
            .lazy()
            .group_by([col(ride::BOOKING_ID)])
            .agg([col(ride::BOOKING_VALUE).first()])
            .select([col(ride::BOOKING_VALUE).sum()])
            .collect()?;

        let success_value = self
            .rides
            .clone()
            .lazy()
            .filter(success_only())
            .select([col(ride::BOOKING_VALUE).sum()])
            .collect()?;

        Ok(OverallSummary {
            total_bookings: self.rides.height(),
            total_value: scalar_f64(&total_value, ride::BOOKING_VALUE),
            success_value: scalar_f64(&success_value, ride::BOOKING_VALUE),
        })
    }

    /// Booking count per status.
    pub fn status_breakdown(&self) -> Result<DataFrame, InsightsError> {
        group_agg(
            &self.rides,
            ride::BOOKING_STATUS,
            &[AggSpec::count(derived::COUNT)],
        )
    }

    /// Distinct bookings per day, ordered by date.
    pub fn ride_volume_by_date(&self) -> Result<DataFrame, InsightsError> {
        group_agg(
            &self.rides,
            ride::DATE,
            &[AggSpec::distinct_count(ride::BOOKING_ID).with_alias(derived::BOOKING_COUNT)],
        )
    }

    // ── Vehicle type ────────────────────────────────────────────────────

    /// Per vehicle type: total booking value over all rides, plus value,
    /// average distance and total distance over successful rides only.
    pub fn vehicle_type_summary(&self) -> Result<DataFrame, InsightsError> {
        let totals = self
            .rides
            .clone()
            .lazy()
            .group_by([col(ride::VEHICLE_TYPE)])
            .agg([col(ride::BOOKING_VALUE).sum().alias(derived::TOTAL_VALUE)]);

        let success = self
            .rides
            .clone()
            .lazy()
            .filter(success_only())
            .group_by([col(ride::VEHICLE_TYPE)])
            .agg([
                col(ride::BOOKING_VALUE).sum().alias(derived::SUCCESS_VALUE),
                col(ride::RIDE_DISTANCE).mean().alias(derived::AVG_DISTANCE),
                col(ride::RIDE_DISTANCE)
                    .sum()
                    .alias(derived::TOTAL_DISTANCE),
            ]);

        let out = totals
            .join(
                success,
                [col(ride::VEHICLE_TYPE)],
                [col(ride::VEHICLE_TYPE)],
                JoinArgs::new(JoinType::Left),
            )
            .sort([ride::VEHICLE_TYPE], SortMultipleOptions::default())
            .collect()?;
        Ok(out)
    }

    // ── Revenue ─────────────────────────────────────────────────────────

    /// Successful booking value per payment method, highest first.
    pub fn revenue_by_payment_method(&self) -> Result<DataFrame, InsightsError> {
        let out = self
            .rides
            .clone()
            .lazy()
            .filter(success_only())
            .group_by([col(ride::PAYMENT_METHOD)])
            .agg([col(ride::BOOKING_VALUE).sum().alias(derived::TOTAL_VALUE)])
            .sort(
                [derived::TOTAL_VALUE],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .collect()?;
        Ok(out)
    }

    /// Top 5 customers by total booking value.
    pub fn top_customers_by_value(&self) -> Result<DataFrame, InsightsError> {
        let per_customer = group_agg(
            &self.rides,
            ride::CUSTOMER_ID,
            &[AggSpec::sum(ride::BOOKING_VALUE).with_alias(derived::TOTAL_VALUE)],
        )?;
        top_n(&per_customer, derived::TOTAL_VALUE, 5)
    }

    /// Total ride distance per day, ordered by date.
    pub fn distance_per_day(&self) -> Result<DataFrame, InsightsError> {
        group_agg(
            &self.rides,
            ride::DATE,
            &[AggSpec::sum(ride::RIDE_DISTANCE).with_alias(derived::TOTAL_DISTANCE)],
        )
    }

    // ── Cancellation ────────────────────────────────────────────────────

    pub fn cancellation_summary(&self) -> Result<CancellationSummary, InsightsError> {
        let total = self.rides.height();
        let succeeded = self
            .rides
            .clone()
            .lazy()
            .filter(success_only())
            .collect()?
            .height();
        let cancelled_rows = self
            .rides
            .clone()
            .lazy()
            .filter(cancelled())
            .collect()?
            .height();

        Ok(CancellationSummary {
            total,
            succeeded,
            cancelled: cancelled_rows,
            cancellation_rate: rate(cancelled_rows, total),
        })
    }

    /// Cancellation reason counts for one side, highest first. Empty when
    /// no such cancellations exist in the snapshot.
    pub fn cancellation_reasons(&self, by: CancelledBy) -> Result<DataFrame, InsightsError> {
        let (status_value, reason_col) = match by {
            CancelledBy::Customer => (
                status::CANCELED_BY_CUSTOMER,
                ride::CANCELED_BY_CUSTOMER_REASON,
            ),
            CancelledBy::Driver => {
                (status::CANCELED_BY_DRIVER, ride::CANCELED_BY_DRIVER_REASON)
            }
        };

        let out = self
            .rides
            .clone()
            .lazy()
            .filter(status_is(status_value).and(col(reason_col).is_not_null()))
            .group_by([col(reason_col)])
            .agg([len().alias(derived::COUNT)])
            .sort(
                [derived::COUNT],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .rename([reason_col], [derived::REASON], true)
            .collect()?;
        Ok(out)
    }

    // ── Ratings ─────────────────────────────────────────────────────────

    /// Average driver and customer rating per vehicle type. Null ratings
    /// (non-completed rides) do not drag the averages down.
    pub fn ratings_by_vehicle(&self) -> Result<DataFrame, InsightsError> {
        group_agg(
            &self.rides,
            ride::VEHICLE_TYPE,
            &[
                AggSpec::mean(ride::DRIVER_RATINGS).with_alias(derived::AVG_DRIVER_RATING),
                AggSpec::mean(ride::CUSTOMER_RATING).with_alias(derived::AVG_CUSTOMER_RATING),
            ],
        )
    }
}

fn scalar_f64(df: &DataFrame, column: &str) -> f64 {
    df.column(column)
        .ok()
        .and_then(|c| c.f64().ok())
        .and_then(|c| c.get(0))
        .unwrap_or(0.0)
}
