//! Thin wrapper around the embedded analytical engine (polars + its SQL
//! context). The rest of the application talks to this boundary only:
//! register a file's bytes, create/drop named views, run SQL, introspect a
//! view's schema. Query planning and Parquet decoding stay inside polars.

use std::io::Cursor;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use polars_sql::SQLContext;

/// One column of the active view, as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
}

impl ColumnInfo {
    /// Heuristic used by the schema panel to flag time-like columns: the
    /// dtype names a timestamp/datetime/date, or the column name ends with
    /// `_time`/`Time`/`_date`, or is exactly `date`.
    pub fn looks_temporal(&self) -> bool {
        let dtype = self.dtype.to_lowercase();
        if dtype.contains("timestamp") || dtype.contains("datetime") || dtype.contains("date") {
            return true;
        }
        self.name.ends_with("_time")
            || self.name.ends_with("Time")
            || self.name.ends_with("_date")
            || self.name == "date"
    }
}

/// The engine connection. One per session, owned by the application root;
/// executes one query at a time.
pub struct Engine {
    ctx: SQLContext,
}

impl Engine {
    pub fn initialize() -> Result<Engine> {
        Ok(Engine {
            ctx: SQLContext::new(),
        })
    }

    /// Decode `bytes` as Parquet and register the result under `name`, so
    /// SQL can reference the file as `"<name>"`.
    pub fn register_file_buffer(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let df = ParquetReader::new(Cursor::new(bytes))
            .finish()
            .map_err(|e| eyre!("failed to decode parquet data: {e}"))?;
        self.ctx.register(name, df.lazy());
        Ok(())
    }

    /// `CREATE VIEW <name> AS <sql>`: plan the statement and register the
    /// lazy result under `name`. The plan's schema is resolved eagerly so
    /// bad column references fail here, not at the first block fetch.
    pub fn create_view(&mut self, name: &str, sql: &str) -> Result<()> {
        let lf = self.ctx.execute(sql)?;
        lf.clone().collect_schema()?;
        self.ctx.register(name, lf);
        Ok(())
    }

    /// `DROP VIEW IF EXISTS <name>`; dropping an unknown view is a no-op.
    pub fn drop_view(&mut self, name: &str) {
        self.ctx.unregister(name);
    }

    /// Execute SQL and materialize the result.
    pub fn query(&mut self, sql: &str) -> Result<DataFrame> {
        let df = self.ctx.execute(sql)?.collect()?;
        Ok(df)
    }

    /// Schema introspection for a registered view (the `DESCRIBE` contract).
    /// Resolves the plan's schema without materializing any rows.
    pub fn describe(&mut self, view: &str) -> Result<Vec<ColumnInfo>> {
        let lf = self.ctx.execute(&format!("SELECT * FROM \"{view}\""))?;
        let schema = lf.clone().collect_schema()?;
        Ok(schema
            .iter()
            .map(|(name, dtype)| ColumnInfo {
                name: name.to_string(),
                dtype: dtype.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parquet_bytes() -> Vec<u8> {
        let mut df = df!(
            "id" => [1i64, 2, 3],
            "name" => ["ann", "bob", "cal"],
        )
        .unwrap();
        let mut buf = Vec::new();
        ParquetWriter::new(&mut buf).finish(&mut df).unwrap();
        buf
    }

    #[test]
    fn register_and_query_file_buffer() {
        let mut engine = Engine::initialize().unwrap();
        engine
            .register_file_buffer("people.parquet", parquet_bytes())
            .unwrap();
        let df = engine
            .query("SELECT * FROM \"people.parquet\"")
            .unwrap();
        assert_eq!(df.shape(), (3, 2));
    }

    #[test]
    fn view_lifecycle() {
        let mut engine = Engine::initialize().unwrap();
        engine
            .register_file_buffer("people.parquet", parquet_bytes())
            .unwrap();
        engine
            .create_view("parquet_file", "SELECT * FROM \"people.parquet\"")
            .unwrap();
        let df = engine.query("SELECT COUNT(*) AS total FROM parquet_file").unwrap();
        assert_eq!(df.height(), 1);

        engine.drop_view("parquet_file");
        assert!(engine.query("SELECT * FROM parquet_file").is_err());
        // Dropping a view that no longer exists is fine.
        engine.drop_view("parquet_file");
    }

    #[test]
    fn describe_reports_name_and_dtype() {
        let mut engine = Engine::initialize().unwrap();
        engine
            .register_file_buffer("people.parquet", parquet_bytes())
            .unwrap();
        engine
            .create_view("parquet_file", "SELECT * FROM \"people.parquet\"")
            .unwrap();
        let columns = engine.describe("parquet_file").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[1].name, "name");
        assert_eq!(columns[1].dtype, "str");
    }

    #[test]
    fn create_view_fails_on_unknown_column() {
        let mut engine = Engine::initialize().unwrap();
        engine
            .register_file_buffer("people.parquet", parquet_bytes())
            .unwrap();
        engine
            .create_view("parquet_file", "SELECT * FROM \"people.parquet\"")
            .unwrap();
        assert!(engine
            .create_view("query_view", "SELECT nope FROM parquet_file")
            .is_err());
    }

    #[test]
    fn temporal_heuristic() {
        let temporal = ["sale_time", "startTime", "trade_date", "date"];
        for name in temporal {
            let col = ColumnInfo {
                name: name.to_string(),
                dtype: "str".to_string(),
            };
            assert!(col.looks_temporal(), "{name} should look temporal");
        }
        let col = ColumnInfo {
            name: "id".to_string(),
            dtype: "datetime[μs]".to_string(),
        };
        assert!(col.looks_temporal());
        let col = ColumnInfo {
            name: "name".to_string(),
            dtype: "str".to_string(),
        };
        assert!(!col.looks_temporal());
    }
}
