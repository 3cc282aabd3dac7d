use std::path::PathBuf;
use std::time::Duration;

use crate::error::InsightsError;
use crate::query::QueryExecutor;
use crate::store::{LoadOutcome, Store};

/// Startup configuration for the dashboard data layer. File locations are
/// injected here rather than baked into the core; nothing reads the
/// environment.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Directory holding the embedded store's table files.
    pub data_dir: PathBuf,
    /// Table the rides dataset lives in.
    pub table: String,
    /// CSV read on first run when the table is empty.
    pub source_csv: PathBuf,
    /// How long query results stay served from cache.
    pub cache_ttl: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            table: "rides".to_string(),
            source_csv: PathBuf::from("rides.csv"),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

impl DashboardConfig {
    pub fn store(&self) -> Store {
        Store::new(self.data_dir.clone())
    }

    /// Run the first-load-if-empty step and hand back a query executor.
    /// A missing source CSV leaves the table empty; queries against it
    /// report `NotLoaded` rather than failing the startup.
    pub fn open(&self) -> Result<(QueryExecutor, LoadOutcome), InsightsError> {
        let store = self.store();
        let outcome = store.load_csv_if_empty(&self.table, &self.source_csv)?;
        Ok((
            QueryExecutor::new(store, self.table.clone(), self.cache_ttl),
            outcome,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn open_loads_once_and_tolerates_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("rides.csv");
        File::create(&csv)
            .unwrap()
            .write_all(
                b"Booking_ID,Customer_ID,Vehicle_Type,Date,Booking_Status\n\
                  B1,C1,Mini,2024-07-01,Success\n",
            )
            .unwrap();

        let config = DashboardConfig {
            data_dir: dir.path().to_path_buf(),
            source_csv: csv,
            ..DashboardConfig::default()
        };

        let (_, outcome) = config.open().unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { rows: 1, skipped: 0 });

        let (_, again) = config.open().unwrap();
        assert_eq!(again, LoadOutcome::AlreadyLoaded(1));

        let missing = DashboardConfig {
            data_dir: dir.path().join("other"),
            source_csv: dir.path().join("nope.csv"),
            ..DashboardConfig::default()
        };
        let (_, outcome) = missing.open().unwrap();
        assert_eq!(outcome, LoadOutcome::SourceMissing);
    }
}
