/// Column-name constants for the ride-insights schema.
/// Single source of truth for every module that touches the rides table.

// ── Ride record columns ─────────────────────────────────────────────────────
pub mod ride {
    pub const BOOKING_ID: &str = "booking_id";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const VEHICLE_TYPE: &str = "vehicle_type";
    pub const DATE: &str = "date";
    pub const BOOKING_STATUS: &str = "booking_status";
    pub const BOOKING_VALUE: &str = "booking_value";
    pub const RIDE_DISTANCE: &str = "ride_distance";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const DRIVER_RATINGS: &str = "driver_ratings";
    pub const CUSTOMER_RATING: &str = "customer_rating";
    pub const CANCELED_BY_CUSTOMER_REASON: &str = "canceled_rides_by_customer";
    pub const CANCELED_BY_DRIVER_REASON: &str = "canceled_rides_by_driver";
    pub const INCOMPLETE_RIDES: &str = "incomplete_rides";
    pub const INCOMPLETE_RIDES_REASON: &str = "incomplete_rides_reason";

    /// A row without these is not a usable ride record.
    pub const REQUIRED: [&str; 3] = [BOOKING_ID, BOOKING_STATUS, DATE];

    /// Columns cast to Float64 on load when present.
    pub const NUMERIC: [&str; 4] = [
        BOOKING_VALUE,
        RIDE_DISTANCE,
        DRIVER_RATINGS,
        CUSTOMER_RATING,
    ];
}

// ── Booking status values ───────────────────────────────────────────────────
pub mod status {
    pub const SUCCESS: &str = "Success";
    pub const CANCELED_BY_CUSTOMER: &str = "Canceled by Customer";
    pub const CANCELED_BY_DRIVER: &str = "Canceled by Driver";
    pub const DRIVER_NOT_FOUND: &str = "Driver Not Found";
    pub const INCOMPLETE: &str = "Incomplete";

    /// Statuses excluded when counting cancellations.
    pub const NOT_CANCELLED: [&str; 2] = [SUCCESS, DRIVER_NOT_FOUND];
}

// ── Incomplete-ride flag values ─────────────────────────────────────────────
pub mod incomplete_flag {
    pub const YES: &str = "Yes";
}

// ── Derived / output columns ────────────────────────────────────────────────
pub mod derived {
    pub const COUNT: &str = "count";
    pub const BOOKING_COUNT: &str = "booking_count";
    pub const TOTAL_RIDES: &str = "total_rides";
    pub const TOTAL_VALUE: &str = "total_value";
    pub const SUCCESS_VALUE: &str = "success_value";
    pub const AVG_DISTANCE: &str = "avg_distance";
    pub const TOTAL_DISTANCE: &str = "total_distance";
    pub const MAX_DRIVER_RATING: &str = "max_driver_rating";
    pub const MIN_DRIVER_RATING: &str = "min_driver_rating";
    pub const AVG_DRIVER_RATING: &str = "avg_driver_rating";
    pub const AVG_CUSTOMER_RATING: &str = "avg_customer_rating";
    pub const REASON: &str = "reason";
}

// ── Date handling ───────────────────────────────────────────────────────────
pub mod date_format {
    /// Source files carry calendar dates; stored as Datetime(us) at midnight.
    pub const DATE: &str = "%Y-%m-%d";
}
