//! CSV serialization of query results.
//!
//! Files are staged in a uniquely named hidden sibling (`.{name}.XXXXXX.tmp`)
//! and renamed over the destination once fully written, so a reader never
//! observes a partial export, even with concurrent writers to one path.
//! Existing destinations are replaced; the last rename wins.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::WarehouseError;
use crate::result::{CellValue, QueryResult};

/// Default base name for generated export files.
pub const DEFAULT_BASE_NAME: &str = "bigquery_export";

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvExport {
    pub path: PathBuf,
    pub row_count: usize,
}

impl fmt::Display for CsvExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully saved {} rows to {}",
            self.row_count,
            self.path.display()
        )
    }
}

/// `{base_name}_{YYYYMMDD_HHMMSS}.csv` for the given local time.
pub fn csv_filename(base_name: &str, now: DateTime<Local>) -> String {
    format!("{base_name}_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Unique hidden staging file in the destination's directory.
fn staging_file(path: &Path) -> io::Result<NamedTempFile> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path does not name a file")
    })?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    tempfile::Builder::new()
        .prefix(&format!(".{}.", name.to_string_lossy()))
        .suffix(".tmp")
        .tempfile_in(dir)
}

/// Column order for the export: the result schema, or the first row's keys
/// when the schema is empty.
fn header(result: &QueryResult) -> Vec<&str> {
    if !result.columns.is_empty() {
        return result.column_names();
    }
    result
        .rows
        .first()
        .map(|r| r.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn write_records(result: &QueryResult, temp: &mut NamedTempFile) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(temp.as_file_mut());

    let columns = header(result);
    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }
    for row in &result.rows {
        writer.write_record(columns.iter().map(|c| {
            row.get(*c)
                .map(CellValue::to_csv_field)
                .unwrap_or_default()
        }))?;
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// Write `result` to `path` synchronously. Parent directories are created.
///
/// The staging file is deleted on every error path when it is dropped.
pub fn write_csv_blocking(result: &QueryResult, path: &Path) -> Result<CsvExport, WarehouseError> {
    let mut temp = staging_file(path).map_err(|e| WarehouseError::io_write(path, e))?;
    debug!(path = %path.display(), temp = %temp.path().display(), "Staging CSV export");

    if let Err(e) = write_records(result, &mut temp) {
        warn!(path = %path.display(), error = %e, "CSV write failed");
        return Err(WarehouseError::io_write(path, e));
    }

    if let Err(e) = temp.persist(path) {
        warn!(path = %path.display(), error = %e.error, "CSV rename failed");
        return Err(WarehouseError::io_write(path, e.error));
    }

    info!(path = %path.display(), rows = result.row_count(), "CSV export written");
    Ok(CsvExport {
        path: path.to_path_buf(),
        row_count: result.row_count(),
    })
}

/// Write `result` to `path` on tokio's blocking pool.
pub async fn write_csv(result: Arc<QueryResult>, path: PathBuf) -> Result<CsvExport, WarehouseError> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_csv_blocking(&result, &path))
        .await
        .map_err(|e| WarehouseError::io_write(target, e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Record, SchemaField};
    use chrono::TimeZone;
    use indexmap::IndexMap;

    fn sample() -> QueryResult {
        let mut nested = IndexMap::new();
        nested.insert("a".to_string(), CellValue::Integer(1));

        let mut r1 = Record::new();
        r1.insert("id".into(), CellValue::Integer(1));
        r1.insert("name".into(), CellValue::from("Smith, Ada"));
        r1.insert("score".into(), CellValue::Float(3.0));
        r1.insert("extra".into(), CellValue::Struct(nested));

        let mut r2 = Record::new();
        r2.insert("id".into(), CellValue::Integer(2));
        r2.insert("name".into(), CellValue::Null);
        r2.insert("score".into(), CellValue::Float(0.25));
        r2.insert(
            "extra".into(),
            CellValue::List(vec![CellValue::Integer(1), CellValue::Integer(2)]),
        );

        QueryResult::new(
            vec![
                SchemaField::new("id", "INTEGER"),
                SchemaField::new("name", "STRING"),
                SchemaField::new("score", "FLOAT"),
                SchemaField::new("extra", "JSON"),
            ],
            vec![r1, r2],
        )
    }

    #[test]
    fn writes_header_and_encoded_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let export = write_csv_blocking(&sample(), &path).unwrap();
        assert_eq!(export.row_count, 2);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "id,name,score,extra\n\
             1,\"Smith, Ada\",3.0,\"{\"\"a\"\":1}\"\n\
             2,,0.25,\"[1,2]\"\n"
        );
    }

    #[test]
    fn empty_result_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let result = QueryResult::new(vec![SchemaField::new("x", "INTEGER")], Vec::new());

        let export = write_csv_blocking(&result, &path).unwrap();
        assert_eq!(export.row_count, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "x\n");
    }

    #[test]
    fn overwrite_is_byte_identical_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.csv");

        write_csv_blocking(&sample(), &path).unwrap();
        let first = fs::read(&path).unwrap();
        write_csv_blocking(&sample(), &path).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(entries(dir.path()), vec!["same.csv"]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.csv");

        write_csv_blocking(&sample(), &path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn unwritable_destination_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a dir").unwrap();
        let path = blocker.join("out.csv");

        let err = write_csv_blocking(&sample(), &path).unwrap_err();
        assert!(matches!(err, WarehouseError::IoWrite { .. }));
        assert!(err.to_string().contains("out.csv"));
    }

    #[test]
    fn directory_destination_keeps_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();

        let err = write_csv_blocking(&sample(), &path).unwrap_err();
        assert!(matches!(err, WarehouseError::IoWrite { .. }));
        assert_eq!(entries(dir.path()), vec!["taken"]);
    }

    fn numbered(tag: &str, rows: usize) -> QueryResult {
        let rows = (0..rows)
            .map(|i| {
                let mut r = Record::new();
                r.insert("id".into(), CellValue::Integer(i as i64));
                r.insert("tag".into(), CellValue::from(tag));
                r
            })
            .collect();
        QueryResult::new(
            vec![SchemaField::new("id", "INTEGER"), SchemaField::new("tag", "STRING")],
            rows,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_to_one_path_leave_a_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = Arc::new(numbered("left", 50_000));
        let b = Arc::new(numbered("right", 50_000));

        let expected_a = dir.path().join("a.csv");
        let expected_b = dir.path().join("b.csv");
        write_csv_blocking(&a, &expected_a).unwrap();
        write_csv_blocking(&b, &expected_b).unwrap();
        let expected_a = fs::read(expected_a).unwrap();
        let expected_b = fs::read(expected_b).unwrap();

        let shared = dir.path().join("shared.csv");
        for _ in 0..5 {
            let (ra, rb) = tokio::join!(
                write_csv(Arc::clone(&a), shared.clone()),
                write_csv(Arc::clone(&b), shared.clone())
            );
            assert_eq!(ra.unwrap().row_count, 50_000);
            assert_eq!(rb.unwrap().row_count, 50_000);

            let written = fs::read(&shared).unwrap();
            assert!(written == expected_a || written == expected_b);
        }
        assert_eq!(entries(dir.path()), vec!["a.csv", "b.csv", "shared.csv"]);
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn async_write_runs_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("async.csv");

        let export = write_csv(Arc::new(sample()), path.clone()).await.unwrap();
        assert_eq!(export.path, path);
        assert_eq!(
            export.to_string(),
            format!("Successfully saved 2 rows to {}", path.display())
        );
    }

    #[test]
    fn filename_uses_local_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).single().unwrap();
        assert_eq!(
            csv_filename(DEFAULT_BASE_NAME, now),
            "bigquery_export_20240305_140709.csv"
        );
        assert_eq!(csv_filename("daily", now), "daily_20240305_140709.csv");
    }
}
