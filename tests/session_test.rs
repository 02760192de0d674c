use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tempfile::TempDir;

use parqtui::sql::{FilterSpec, RowFetchRequest, SortSpec, TextFilterOp};
use parqtui::{DataSource, Session, ViewMode, FILE_VIEW, QUERY_VIEW};

/// 250 rows of (id, name, sale_time); a few names contain an apostrophe.
fn sales_df() -> DataFrame {
    let ids: Vec<i64> = (1..=250).collect();
    let names: Vec<String> = (1..=250)
        .map(|i| {
            if i % 50 == 0 {
                "O'Brien".to_string()
            } else {
                format!("customer_{i}")
            }
        })
        .collect();
    let times: Vec<i64> = (0..250).map(|i| 1_700_000_000_000i64 + i * 60_000).collect();
    let df = df!(
        "id" => ids,
        "name" => names,
        "sale_time" => times,
    )
    .unwrap();
    df.lazy()
        .with_column(col("sale_time").cast(DataType::Datetime(TimeUnit::Milliseconds, None)))
        .collect()
        .unwrap()
}

fn write_parquet(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut df = sales_df();
    let mut file = File::create(&path).unwrap();
    ParquetWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

fn loaded_session(dir: &TempDir) -> Session {
    let path = write_parquet(dir.path(), "sales.parquet");
    let mut session = Session::initialize().unwrap();
    session.load_file(&path).unwrap();
    session
}

#[test]
fn loading_a_file_exposes_schema_and_rows() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    assert_eq!(session.file_name(), Some("sales.parquet"));
    assert_eq!(session.view_mode(), ViewMode::File);
    assert_eq!(session.active_view(), FILE_VIEW);

    let columns = session.columns();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[1].name, "name");
    assert_eq!(columns[2].name, "sale_time");
    assert!(columns[2].dtype.to_lowercase().contains("datetime"));
    assert!(columns[2].looks_temporal());
    assert!(!columns[1].looks_temporal());

    let block = session
        .fetch_rows(&RowFetchRequest::range(0, 100))
        .unwrap();
    assert_eq!(block.total_rows, 250);
    assert_eq!(block.df.height(), 100);
    assert_eq!(block.df.width(), 3);
}

#[test]
fn reingesting_the_same_file_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_parquet(dir.path(), "sales.parquet");
    let mut session = Session::initialize().unwrap();

    session.load_file(&path).unwrap();
    let first_schema: Vec<String> = session.columns().iter().map(|c| c.name.clone()).collect();

    session.load_file(&path).unwrap();
    let second_schema: Vec<String> = session.columns().iter().map(|c| c.name.clone()).collect();

    assert_eq!(first_schema, second_schema);
    assert_eq!(session.active_view(), FILE_VIEW);
    let block = session.fetch_rows(&RowFetchRequest::range(0, 10)).unwrap();
    assert_eq!(block.total_rows, 250);
}

#[test]
fn custom_query_retargets_the_grid() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    session
        .run_query("SELECT name FROM parquet_file WHERE id > 10")
        .unwrap();

    assert_eq!(session.view_mode(), ViewMode::Query);
    assert_eq!(session.active_view(), QUERY_VIEW);
    let columns = session.columns();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].name, "name");

    // Subsequent fetches go to the query view, not the file view.
    let block = session
        .fetch_rows(&RowFetchRequest::range(0, 100))
        .unwrap();
    assert_eq!(block.total_rows, 240);
    assert_eq!(block.df.width(), 1);
}

#[test]
fn loading_a_file_resets_a_prior_query_view() {
    let dir = TempDir::new().unwrap();
    let path = write_parquet(dir.path(), "sales.parquet");
    let mut session = Session::initialize().unwrap();
    session.load_file(&path).unwrap();
    session.run_query("SELECT name FROM parquet_file").unwrap();
    assert_eq!(session.view_mode(), ViewMode::Query);

    session.load_file(&path).unwrap();
    assert_eq!(session.view_mode(), ViewMode::File);
    assert_eq!(session.active_view(), FILE_VIEW);
    assert_eq!(session.columns().len(), 3);
}

#[test]
fn text_filter_with_embedded_quote() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    let mut request = RowFetchRequest::range(0, 100);
    request.filter_model.insert(
        "name".to_string(),
        FilterSpec::Text {
            op: TextFilterOp::Contains,
            value: "O'Brien".to_string(),
        },
    );
    let block = session.fetch_rows(&request).unwrap();
    // Every 50th of 250 rows.
    assert_eq!(block.total_rows, 5);
    assert_eq!(block.df.height(), 5);
}

#[test]
fn sorted_fetch_orders_the_block() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    let mut request = RowFetchRequest::range(0, 10);
    request.sort_model = vec![SortSpec::desc("id")];
    let block = session.fetch_rows(&request).unwrap();
    let first = block.df.column("id").unwrap().get(0).unwrap();
    assert_eq!(first.try_extract::<i64>().unwrap(), 250);
    assert_eq!(block.total_rows, 250);
}

#[test]
fn paginated_fetch_honors_offset() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    let block = session
        .fetch_rows(&RowFetchRequest::range(200, 300))
        .unwrap();
    assert_eq!(block.total_rows, 250);
    assert_eq!(block.df.height(), 50);
    let first = block.df.column("id").unwrap().get(0).unwrap();
    assert_eq!(first.try_extract::<i64>().unwrap(), 201);
}

#[test]
fn unknown_column_query_appends_quoting_tip() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    let err = session
        .run_query("SELECT nope FROM parquet_file")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Query error:"), "{message}");
    assert!(
        message.contains("Tip: Double check your quotes"),
        "{message}"
    );
    // The failed query leaves the file view active.
    let block = session.fetch_rows(&RowFetchRequest::range(0, 5)).unwrap();
    assert_eq!(block.total_rows, 250);
}

#[test]
fn syntax_error_query_reports_raw_message_without_tip() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);

    let err = session.run_query("SELEC * FRM parquet_file").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Query error:"), "{message}");
    assert!(
        !message.contains("Tip: Double check your quotes"),
        "{message}"
    );
}

#[test]
fn corrupt_parquet_keeps_attempted_file_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.parquet");
    std::fs::write(&path, b"not parquet at all").unwrap();

    let mut session = Session::initialize().unwrap();
    let err = session.load_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to process parquet file"));
    // The UI reflects what was attempted even though ingestion failed.
    assert_eq!(session.file_name(), Some("bad.parquet"));
    assert!(session.columns().is_empty());
}

#[test]
fn clear_file_forgets_schema_and_name() {
    let dir = TempDir::new().unwrap();
    let mut session = loaded_session(&dir);
    session.clear_file();
    assert!(!session.has_file());
    assert!(session.columns().is_empty());
    assert_eq!(session.view_mode(), ViewMode::File);
}
