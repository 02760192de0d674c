//! Session state around the engine: file ingestion, ad-hoc query execution,
//! and the data source the grid fetches row blocks through.

use std::fs;
use std::path::Path;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::DataFrame;

use crate::engine::{ColumnInfo, Engine};
use crate::sql::{build_sql, RowFetchRequest};

/// View over the registered file's full contents.
pub const FILE_VIEW: &str = "parquet_file";
/// View over the most recent ad-hoc query's result.
pub const QUERY_VIEW: &str = "query_view";

const QUOTING_TIP: &str = " \nTip: Double check your quotes. String literals in SQL must be wrapped in single quotes (e.g. 'value'), not double quotes.";

/// Which kind of view the grid is currently reading from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    File,
    Query,
}

/// One answered block fetch: the rows for the requested range plus the total
/// count matching the request's filters.
#[derive(Debug, Clone)]
pub struct RowBlock {
    pub df: DataFrame,
    pub total_rows: usize,
}

/// The grid boundary: the grid widget pulls row blocks on demand through
/// this trait, so it can be driven by a stub in tests.
pub trait DataSource {
    fn fetch_rows(&mut self, request: &RowFetchRequest) -> Result<RowBlock>;
}

/// Owns the engine, the active view name, and the schema of whatever the
/// grid is currently paginating over. All mutation happens on the UI event
/// thread; there is exactly one active view at a time.
pub struct Session {
    engine: Engine,
    active_view: String,
    columns: Vec<ColumnInfo>,
    file_name: Option<String>,
    view_mode: ViewMode,
}

impl Session {
    pub fn initialize() -> Result<Session> {
        let engine = Engine::initialize()
            .map_err(|e| eyre!("Failed to initialize database engine: {e}"))?;
        Ok(Session {
            engine,
            active_view: FILE_VIEW.to_string(),
            columns: Vec::new(),
            file_name: None,
            view_mode: ViewMode::File,
        })
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn active_view(&self) -> &str {
        &self.active_view
    }

    pub fn has_file(&self) -> bool {
        self.file_name.is_some()
    }

    pub fn column_is_numeric(&self, col_id: &str) -> bool {
        self.columns
            .iter()
            .find(|c| c.name == col_id)
            .map(|c| {
                let dtype = c.dtype.to_lowercase();
                dtype.starts_with('i')
                    || dtype.starts_with('u')
                    || dtype.starts_with('f')
                    || dtype.contains("decimal")
            })
            .unwrap_or(false)
    }

    /// Ingest a file: register its bytes, rebuild the file view, invalidate
    /// any query view, and introspect the new schema. The file name and view
    /// mode flip before the fallible part so the UI reflects what was
    /// attempted even when ingestion fails.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| eyre!("Not a file: {}", path.display()))?;
        if !name.to_lowercase().ends_with(".parquet") {
            return Err(eyre!("Only .parquet files are supported, got: {name}"));
        }

        self.file_name = Some(name.clone());
        self.view_mode = ViewMode::File;
        self.columns.clear();

        let bytes =
            fs::read(path).map_err(|e| eyre!("Failed to read {}: {e}", path.display()))?;
        self.ingest(&name, bytes)
            .map_err(|e| eyre!("Failed to process parquet file: {e}"))
    }

    fn ingest(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.engine.register_file_buffer(name, bytes)?;
        self.engine.drop_view(FILE_VIEW);
        self.engine
            .create_view(FILE_VIEW, &format!("SELECT * FROM \"{name}\""))?;
        // A new file invalidates any prior ad-hoc query view.
        self.engine.drop_view(QUERY_VIEW);
        self.columns = self.engine.describe(FILE_VIEW)?;
        self.active_view = FILE_VIEW.to_string();
        Ok(())
    }

    /// Run arbitrary SQL by wrapping it in the query view and pointing the
    /// grid at it. The SQL is passed to the engine verbatim; on failure the
    /// engine's message is surfaced, with a quoting tip appended when it
    /// looks like a mis-quoted string literal was read as a column name.
    pub fn run_query(&mut self, sql: &str) -> Result<()> {
        self.engine.drop_view(QUERY_VIEW);
        match self.engine.create_view(QUERY_VIEW, sql) {
            Ok(()) => {}
            Err(e) => {
                let mut message = format!("Query error: {e}");
                if looks_like_unknown_column(&e.to_string()) {
                    message.push_str(QUOTING_TIP);
                }
                return Err(eyre!(message));
            }
        }
        self.active_view = QUERY_VIEW.to_string();
        self.view_mode = ViewMode::Query;
        self.columns = self.engine.describe(QUERY_VIEW)?;
        Ok(())
    }

    /// Forget the loaded file (the "load another file" action). Engine-side
    /// views are rebuilt on the next ingestion, so only UI state is cleared.
    pub fn clear_file(&mut self) {
        self.file_name = None;
        self.columns.clear();
        self.view_mode = ViewMode::File;
        self.active_view = FILE_VIEW.to_string();
    }
}

impl DataSource for Session {
    /// Answer one grid block fetch against the current active view: run the
    /// count query, then the bounded query. No retries; a fetch issued after
    /// a view switch targets the new view by construction.
    fn fetch_rows(&mut self, request: &RowFetchRequest) -> Result<RowBlock> {
        let built = build_sql(&self.active_view, request);
        let count_df = self.engine.query(&built.count_query)?;
        let total_rows = count_df
            .column("total")?
            .get(0)?
            .try_extract::<u64>()? as usize;
        let df = self.engine.query(&built.query)?;
        Ok(RowBlock { df, total_rows })
    }
}

/// Substring heuristic over the raw engine error text, mirroring the
/// engine's unknown-column wording. Not a parser.
fn looks_like_unknown_column(message: &str) -> bool {
    message.contains("ColumnNotFound")
        || (message.to_lowercase().contains("olumn") && message.contains("not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_column_heuristic() {
        assert!(looks_like_unknown_column(
            "ColumnNotFound: \"value\" not found"
        ));
        assert!(looks_like_unknown_column("column 'x' not found in schema"));
        assert!(!looks_like_unknown_column(
            "sql parser error: expected an expression"
        ));
    }

    #[test]
    fn rejects_non_parquet_extension() {
        let mut session = Session::initialize().unwrap();
        let err = session
            .load_file(Path::new("/tmp/data.csv"))
            .unwrap_err();
        assert!(err.to_string().contains(".parquet"));
    }
}
