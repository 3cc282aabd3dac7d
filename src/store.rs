use std::fs::File;
use std::path::{Path, PathBuf};

use log::{info, warn};
use polars::datatypes::TimeUnit;
use polars::prelude::StrptimeOptions;
use polars::prelude::*;

use crate::error::InsightsError;
use crate::schema::{date_format, ride};

/// Outcome of [`Store::load_csv_if_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Table already held rows; nothing was read.
    AlreadyLoaded(usize),
    /// Source file absent; table left untouched.
    SourceMissing,
    /// Rows appended to the table. `skipped` counts rows dropped for a
    /// missing required field.
    Loaded { rows: usize, skipped: usize },
}

/// Embedded store: one parquet file per table under a base directory.
///
/// The handle is cheap; each operation opens the backing file, does its
/// work, and releases it before returning. Nothing is pinned to a thread
/// or kept open between calls.
pub struct Store {
    base_path: PathBuf,
}

impl Store {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.base_path.join(format!("{table}.parquet"))
    }

    /// Row count of a table. An absent table counts as empty, not an error.
    pub fn row_count(&self, table: &str) -> Result<usize, InsightsError> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(0);
        }
        let file = File::open(&path)?;
        let df = ParquetReader::new(file).finish()?;
        Ok(df.height())
    }

    /// Read a full table into memory.
    pub fn read_table(&self, table: &str) -> Result<DataFrame, InsightsError> {
        let path = self.table_path(table);
        if !path.exists() {
            return Err(InsightsError::NotLoaded(table.to_string()));
        }
        let file = File::open(&path)?;
        Ok(ParquetReader::new(file).finish()?)
    }

    /// Drop a table. The only way to replace a loaded dataset.
    pub fn clear(&self, table: &str) -> Result<(), InsightsError> {
        let path = self.table_path(table);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Load a rides CSV into `table` unless the table already holds rows.
    ///
    /// Column names are trimmed and lower-cased to the schema in
    /// [`crate::schema::ride`]. Numeric columns are cast to Float64 and the
    /// date column parsed to Datetime(us); values that fail to parse become
    /// null. Rows with a null required column are skipped rather than
    /// aborting the load. The append is a single bulk parquet write.
    pub fn load_csv_if_empty(
        &self,
        table: &str,
        csv_path: &Path,
    ) -> Result<LoadOutcome, InsightsError> {
        let existing = self.row_count(table)?;
        if existing > 0 {
            return Ok(LoadOutcome::AlreadyLoaded(existing));
        }
        if !csv_path.exists() {
            warn!(
                "source file {} not found; table '{table}' left empty",
                csv_path.display()
            );
            return Ok(LoadOutcome::SourceMissing);
        }

        let raw = read_csv_as_strings(csv_path)?;
        require_columns(&raw, &ride::REQUIRED)?;

        let typed = normalize_types(raw)?;
        let total = typed.height();

        let required = cols(ride::REQUIRED.iter().copied());
        let mut clean = typed.lazy().drop_nulls(Some(required)).collect()?;
        let skipped = total - clean.height();
        if skipped > 0 {
            warn!("skipped {skipped} malformed rows while loading '{table}'");
        }

        if let Some(parent) = self.table_path(table).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(self.table_path(table))?;
        ParquetWriter::new(file).finish(&mut clean)?;

        let rows = clean.height();
        info!("loaded {rows} rows into '{table}' from {}", csv_path.display());
        Ok(LoadOutcome::Loaded { rows, skipped })
    }
}

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names and lower-cases them.
fn read_csv_as_strings(path: &Path) -> Result<DataFrame, InsightsError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let normalized: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    df.set_column_names(normalized.as_slice())?;

    Ok(df)
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), InsightsError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(InsightsError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Cast numeric columns and parse the date column on an all-strings frame.
/// Unparseable values become null; the caller decides what to drop.
fn normalize_types(raw: DataFrame) -> Result<DataFrame, InsightsError> {
    let schema = raw.schema().clone();
    let mut lazy = raw.lazy();

    let casts: Vec<Expr> = ride::NUMERIC
        .iter()
        .copied()
        .filter(|c| schema.contains(c))
        .map(|c| {
            col(c)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)
        })
        .collect();
    if !casts.is_empty() {
        lazy = lazy.with_columns(casts);
    }

    lazy = lazy.with_columns([col(ride::DATE)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .str()
        .to_datetime(
            Some(TimeUnit::Microseconds),
            None,
            StrptimeOptions {
                format: Some(date_format::DATE.into()),
                strict: false,
                ..Default::default()
            },
            lit("raise"),
        )]);

    Ok(lazy.collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    const SAMPLE: &str = "\
Booking_ID,Customer_ID,Vehicle_Type,Date,Booking_Status,Booking_Value,Ride_Distance,Payment_Method
B1,C1,Mini,2024-07-01,Success,100,5.2,UPI
B2,C2,Auto,2024-07-01,Canceled by Customer,0,0,Cash
B3,C1,Mini,2024-07-02,Success,50,3.1,UPI
";

    #[test]
    fn load_populates_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "rides.csv", SAMPLE);
        let store = Store::new(dir.path());

        let outcome = store.load_csv_if_empty("rides", &csv).unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 3, skipped: 0 });
        assert_eq!(store.row_count("rides").unwrap(), 3);

        let df = store.read_table("rides").unwrap();
        assert!(df.column(ride::BOOKING_VALUE).unwrap().dtype().is_float());
    }

    #[test]
    fn load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "rides.csv", SAMPLE);
        let store = Store::new(dir.path());

        store.load_csv_if_empty("rides", &csv).unwrap();
        let second = store.load_csv_if_empty("rides", &csv).unwrap();
        assert_eq!(second, LoadOutcome::AlreadyLoaded(3));
        assert_eq!(store.row_count("rides").unwrap(), 3);
    }

    #[test]
    fn missing_source_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());

        let outcome = store
            .load_csv_if_empty("rides", &dir.path().join("absent.csv"))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::SourceMissing);
        assert_eq!(store.row_count("rides").unwrap(), 0);
        assert!(matches!(
            store.read_table("rides"),
            Err(InsightsError::NotLoaded(_))
        ));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let csv_text = "\
Booking_ID,Customer_ID,Vehicle_Type,Date,Booking_Status,Booking_Value,Ride_Distance,Payment_Method
B1,C1,Mini,2024-07-01,Success,100,5.2,UPI
,C2,Auto,2024-07-01,Canceled by Customer,0,0,Cash
B3,C1,Mini,not-a-date,Success,50,3.1,UPI
";
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "rides.csv", csv_text);
        let store = Store::new(dir.path());

        let outcome = store.load_csv_if_empty("rides", &csv).unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 1, skipped: 2 });
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv_text = "Customer_ID,Vehicle_Type\nC1,Mini\n";
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "rides.csv", csv_text);
        let store = Store::new(dir.path());

        assert!(matches!(
            store.load_csv_if_empty("rides", &csv),
            Err(InsightsError::MissingColumn(_))
        ));
    }

    #[test]
    fn clear_allows_reload() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "rides.csv", SAMPLE);
        let store = Store::new(dir.path());

        store.load_csv_if_empty("rides", &csv).unwrap();
        store.clear("rides").unwrap();
        assert_eq!(store.row_count("rides").unwrap(), 0);

        let outcome = store.load_csv_if_empty("rides", &csv).unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 3, skipped: 0 });
    }
}
