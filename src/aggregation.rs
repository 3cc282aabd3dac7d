use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;

use crate::error::InsightsError;
use crate::schema::{ride, status};

const MICROS_PER_DAY: i64 = 86_400_000_000;

// ── Named filter predicates ─────────────────────────────────────────────────
//
// Each predicate is a plain polars expression, applied before grouping so
// aggregations never reach back into the unfiltered table.

pub fn status_is(value: &str) -> Expr {
    col(ride::BOOKING_STATUS).eq(lit(value))
}

pub fn success_only() -> Expr {
    status_is(status::SUCCESS)
}

/// A ride counts as cancelled unless it succeeded or no driver was found.
pub fn cancelled() -> Expr {
    let kept = Series::new("".into(), &status::NOT_CANCELLED);
    col(ride::BOOKING_STATUS).is_in(lit(kept), false).not()
}

pub fn vehicle_is(value: &str) -> Expr {
    col(ride::VEHICLE_TYPE).eq(lit(value))
}

pub fn payment_is(value: &str) -> Expr {
    col(ride::PAYMENT_METHOD).eq(lit(value))
}

/// Inclusive calendar date range over the stored Datetime(us) column.
/// Open bounds are allowed; an inverted range simply matches nothing.
pub fn date_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Expr {
    let mut expr = lit(true);
    if let Some(s) = start {
        expr = expr.and(col(ride::DATE).gt_eq(lit(day_start_micros(s))));
    }
    if let Some(e) = end {
        expr = expr.and(col(ride::DATE).lt_eq(lit(day_start_micros(e) + MICROS_PER_DAY - 1)));
    }
    expr
}

fn day_start_micros(d: NaiveDate) -> i64 {
    d.and_time(NaiveTime::MIN).and_utc().timestamp_micros()
}

// ── Declarative aggregation specs ───────────────────────────────────────────

/// One aggregate to compute per group.
#[derive(Debug, Clone)]
pub enum AggSpec {
    Count {
        alias: String,
    },
    DistinctCount {
        column: String,
        alias: Option<String>,
    },
    Sum {
        column: String,
        alias: Option<String>,
    },
    Mean {
        column: String,
        alias: Option<String>,
    },
    Min {
        column: String,
        alias: Option<String>,
    },
    Max {
        column: String,
        alias: Option<String>,
    },
}

impl AggSpec {
    pub fn count(alias: &str) -> Self {
        Self::Count {
            alias: alias.to_string(),
        }
    }

    pub fn distinct_count(column: &str) -> Self {
        Self::DistinctCount {
            column: column.to_string(),
            alias: None,
        }
    }

    pub fn sum(column: &str) -> Self {
        Self::Sum {
            column: column.to_string(),
            alias: None,
        }
    }

    pub fn mean(column: &str) -> Self {
        Self::Mean {
            column: column.to_string(),
            alias: None,
        }
    }

    pub fn min(column: &str) -> Self {
        Self::Min {
            column: column.to_string(),
            alias: None,
        }
    }

    pub fn max(column: &str) -> Self {
        Self::Max {
            column: column.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(self, alias: &str) -> Self {
        let alias = Some(alias.to_string());
        match self {
            Self::Count { .. } => Self::Count {
                alias: alias.unwrap_or_default(),
            },
            Self::DistinctCount { column, .. } => Self::DistinctCount { column, alias },
            Self::Sum { column, .. } => Self::Sum { column, alias },
            Self::Mean { column, .. } => Self::Mean { column, alias },
            Self::Min { column, .. } => Self::Min { column, alias },
            Self::Max { column, .. } => Self::Max { column, alias },
        }
    }

    fn expr(&self) -> Expr {
        match self {
            Self::Count { alias } => len().alias(alias.as_str()),
            Self::DistinctCount { column, alias } => {
                let name = named(alias, column, "distinct");
                col(column.as_str()).n_unique().alias(name)
            }
            Self::Sum { column, alias } => {
                let name = named(alias, column, "sum");
                col(column.as_str()).sum().alias(name)
            }
            Self::Mean { column, alias } => {
                let name = named(alias, column, "avg");
                col(column.as_str()).mean().alias(name)
            }
            Self::Min { column, alias } => {
                let name = named(alias, column, "min");
                col(column.as_str()).min().alias(name)
            }
            Self::Max { column, alias } => {
                let name = named(alias, column, "max");
                col(column.as_str()).max().alias(name)
            }
        }
    }
}

fn named(alias: &Option<String>, column: &str, suffix: &str) -> String {
    alias
        .clone()
        .unwrap_or_else(|| format!("{column}_{suffix}"))
}

// ── Grouping and ordering ───────────────────────────────────────────────────

/// Group by `key` and compute the given aggregates, one output row per
/// group, sorted by the key for deterministic output.
pub fn group_agg(df: &DataFrame, key: &str, specs: &[AggSpec]) -> Result<DataFrame, InsightsError> {
    let exprs: Vec<Expr> = specs.iter().map(AggSpec::expr).collect();
    let out = df
        .clone()
        .lazy()
        .group_by([col(key)])
        .agg(exprs)
        .sort([key], SortMultipleOptions::default())
        .collect()?;
    Ok(out)
}

/// The `n` highest rows by `sort_key`, non-increasing. Ties keep their
/// original relative order (stable sort).
pub fn top_n(df: &DataFrame, sort_key: &str, n: usize) -> Result<DataFrame, InsightsError> {
    let out = df
        .clone()
        .lazy()
        .sort(
            [sort_key],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .collect()?;
    Ok(out)
}

/// part / whole as a fraction; undefined (NaN) on an empty denominator.
pub fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        f64::NAN
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::derived;

    fn sample() -> DataFrame {
        df!(
            ride::BOOKING_ID => ["B1", "B2", "B3"],
            ride::BOOKING_STATUS => [status::SUCCESS, status::CANCELED_BY_CUSTOMER, status::SUCCESS],
            ride::BOOKING_VALUE => [100.0, 0.0, 50.0],
        )
        .unwrap()
    }

    #[test]
    fn success_counts_and_sums() {
        let df = sample();
        let total = df.height();
        let success = df
            .clone()
            .lazy()
            .filter(success_only())
            .collect()
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(success.height(), 2);

        let sum = success
            .column(ride::BOOKING_VALUE)
            .unwrap()
            .f64()
            .unwrap()
            .sum()
            .unwrap_or(0.0);
        assert_eq!(sum, 150.0);

        let cancelled_rows = df.lazy().filter(cancelled()).collect().unwrap().height();
        let r = rate(cancelled_rows, total);
        assert!((r - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn group_counts_sum_to_total() {
        let df = sample();
        let grouped = group_agg(
            &df,
            ride::BOOKING_STATUS,
            &[AggSpec::count(derived::COUNT)],
        )
        .unwrap();

        assert_eq!(grouped.height(), 2);
        let total: u32 = grouped
            .column(derived::COUNT)
            .unwrap()
            .u32()
            .unwrap()
            .into_no_null_iter()
            .sum();
        assert_eq!(total as usize, df.height());
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let df = df!(
            ride::BOOKING_ID => ["B1", "B2", "B3", "B4"],
            ride::BOOKING_VALUE => [50.0, 100.0, 50.0, 25.0],
        )
        .unwrap();

        let top = top_n(&df, ride::BOOKING_VALUE, 3).unwrap();
        let ids: Vec<&str> = top
            .column(ride::BOOKING_ID)
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        // B1 and B3 tie at 50; B1 came first in the input.
        assert_eq!(ids, vec!["B2", "B1", "B3"]);
    }

    #[test]
    fn zero_denominator_is_nan() {
        assert!(rate(0, 0).is_nan());
        assert!(rate(5, 0).is_nan());
        assert_eq!(rate(1, 4), 0.25);
    }

    #[test]
    fn distinct_count_and_bounds() {
        let df = df!(
            ride::CUSTOMER_ID => ["C1", "C1", "C2"],
            ride::VEHICLE_TYPE => ["Mini", "Mini", "Mini"],
            ride::DRIVER_RATINGS => [4.0, 3.0, 5.0],
        )
        .unwrap();

        let out = group_agg(
            &df,
            ride::VEHICLE_TYPE,
            &[
                AggSpec::distinct_count(ride::CUSTOMER_ID),
                AggSpec::min(ride::DRIVER_RATINGS),
                AggSpec::max(ride::DRIVER_RATINGS),
            ],
        )
        .unwrap();

        assert_eq!(out.height(), 1);
        let min = out
            .column("driver_ratings_min")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        let max = out
            .column("driver_ratings_max")
            .unwrap()
            .f64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_eq!((min, max), (3.0, 5.0));
    }
}
