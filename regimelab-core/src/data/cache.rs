//! Parquet cache layer with Hive-style partitioning.
//!
//! Layout: `{root}/symbol={SYMBOL}/year={YYYY}/month={MM}/part-{ts}.parquet`
//!
//! - Writes are atomic: each part is written to a hidden `.tmp` file and
//!   renamed into place.
//! - `Append` adds a new part next to the existing ones.
//! - `UpsertLatest` renames the new part into place first and only then
//!   removes the partition's other parts, so a partition is never empty.
//! - Reads return the concatenation of every part, in path order, with no
//!   deduplication. Non-Parquet files are ignored.

use super::provider::DataError;
use super::schema::FrameCodec;
use crate::domain::ids::part_timestamp;
use crate::domain::{normalize_symbol, Keyed};
use chrono::{DateTime, Datelike, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A row type that can be stored in a partitioned cache.
pub trait PartitionRecord: Keyed + FrameCodec {}

impl<T: Keyed + FrameCodec> PartitionRecord for T {}

/// How a write treats parts already present in a touched partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Keep existing parts; add one more.
    #[default]
    Append,
    /// Leave exactly one part: the one just written.
    UpsertLatest,
}

/// A cache tree rooted at one directory.
#[derive(Debug, Clone)]
pub struct PartitionedStore {
    root: PathBuf,
}

impl PartitionedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/symbol={SYMBOL}/`
    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("symbol={symbol}"))
    }

    /// `{root}/symbol={SYMBOL}/year={YYYY}/month={MM}/`
    pub fn partition_dir(&self, symbol: &str, year: i32, month: u32) -> PathBuf {
        self.symbol_dir(symbol)
            .join(format!("year={year:04}"))
            .join(format!("month={month:02}"))
    }

    /// Write rows grouped by (symbol, year, month), one part per partition.
    ///
    /// Returns the written part paths sorted. An empty input writes nothing.
    pub fn write<R: PartitionRecord>(
        &self,
        rows: &[R],
        mode: WriteMode,
        written_at: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, DataError> {
        let mut partitions: BTreeMap<(String, i32, u32), Vec<&R>> = BTreeMap::new();
        for row in rows {
            let date = row.date();
            partitions
                .entry((row.symbol().to_string(), date.year(), date.month()))
                .or_default()
                .push(row);
        }

        let stamp = part_timestamp(written_at);
        let mut written = Vec::with_capacity(partitions.len());
        for ((symbol, year, month), part_rows) in &partitions {
            let dir = self.partition_dir(symbol, *year, *month);
            fs::create_dir_all(&dir)
                .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

            let mut df = R::to_frame(part_rows)?;
            let path = match mode {
                WriteMode::Append => unique_part_path(&dir, &stamp),
                WriteMode::UpsertLatest => dir.join(format!("part-{stamp}.parquet")),
            };
            write_atomic(&mut df, &path)?;

            if mode == WriteMode::UpsertLatest {
                remove_other_parts(&dir, &path)?;
            }
            debug!(
                path = %path.display(),
                rows = part_rows.len(),
                ?mode,
                "wrote cache part"
            );
            written.push(path);
        }

        written.sort();
        Ok(written)
    }

    /// Every row stored for `symbols`, concatenated in path order.
    ///
    /// Symbols with no directory contribute nothing.
    pub fn read<R: PartitionRecord>(&self, symbols: &[String]) -> Result<Vec<R>, DataError> {
        let mut rows = Vec::new();
        for symbol in symbols {
            for path in self.part_files(&normalize_symbol(symbol))? {
                let df = read_parquet(&path)?;
                rows.extend(R::from_frame(&df)?);
            }
        }
        Ok(rows)
    }

    /// All `*.parquet` files under a symbol's directory, sorted.
    pub fn part_files(&self, symbol: &str) -> Result<Vec<PathBuf>, DataError> {
        let dir = self.symbol_dir(symbol);
        let mut files = Vec::new();
        if dir.is_dir() {
            collect_parquet(&dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn is_parquet(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("parquet")
}

fn collect_parquet(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DataError> {
    let entries =
        fs::read_dir(dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
    for entry in entries {
        let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
        let path = entry.path();
        if path.is_dir() {
            collect_parquet(&path, out)?;
        } else if is_parquet(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// `part-{stamp}.parquet`, or `part-{stamp}-NN.parquet` if that is taken.
fn unique_part_path(dir: &Path, stamp: &str) -> PathBuf {
    let first = dir.join(format!("part-{stamp}.parquet"));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("part-{stamp}-{n:02}.parquet")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

fn write_atomic(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DataError::CacheError(format!("bad part path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let file = fs::File::create(&tmp_path)
        .map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    if let Err(e) = ParquetWriter::new(file).finish(df) {
        let _ = fs::remove_file(&tmp_path);
        return Err(DataError::ParquetError(format!("write parquet: {e}")));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::CacheError(format!("atomic rename failed: {e}"))
    })
}

fn remove_other_parts(dir: &Path, keep: &Path) -> Result<(), DataError> {
    let entries =
        fs::read_dir(dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
    for entry in entries {
        let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
        let path = entry.path();
        if path != keep && path.is_file() && is_parquet(&path) {
            fs::remove_file(&path)
                .map_err(|e| DataError::CacheError(format!("remove stale part: {e}")))?;
        }
    }
    Ok(())
}

fn read_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{cleaned, temp_cache_dir};
    use crate::domain::CleanedRow;
    use chrono::{NaiveDate, TimeZone};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 14, 30, secs).unwrap()
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn write_splits_by_month() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(&dir);
        let rows = vec![
            cleaned("SPY", d(1, 30), 100.0),
            cleaned("SPY", d(2, 2), 101.0),
            cleaned("QQQ", d(2, 2), 50.0),
        ];

        let paths = store.write(&rows, WriteMode::Append, at(0)).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths
            .iter()
            .any(|p| p.starts_with(dir.join("symbol=SPY/year=2026/month=01"))));
        assert!(paths
            .iter()
            .all(|p| p.file_name().unwrap().to_str().unwrap() == "part-20260210T143000000000Z.parquet"));

        let spy: Vec<CleanedRow> = store.read(&["SPY".to_string()]).unwrap();
        assert_eq!(spy.len(), 2);
        assert_eq!(spy[0].adj_close, Some(100.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_write_creates_nothing() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(dir.join("cache"));
        let rows: Vec<CleanedRow> = Vec::new();
        assert!(store.write(&rows, WriteMode::Append, at(0)).unwrap().is_empty());
        assert!(!dir.join("cache").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_keeps_both_parts_even_at_same_instant() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(&dir);
        let rows = vec![cleaned("SPY", d(2, 2), 100.0)];

        store.write(&rows, WriteMode::Append, at(0)).unwrap();
        let second = store.write(&rows, WriteMode::Append, at(0)).unwrap();
        assert!(second[0].to_str().unwrap().ends_with("-01.parquet"));

        let back: Vec<CleanedRow> = store.read(&["SPY".to_string()]).unwrap();
        assert_eq!(back.len(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn upsert_leaves_single_part() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(&dir);

        store
            .write(&[cleaned("SPY", d(2, 2), 100.0)], WriteMode::Append, at(0))
            .unwrap();
        store
            .write(&[cleaned("SPY", d(2, 3), 101.0)], WriteMode::Append, at(1))
            .unwrap();
        store
            .write(&[cleaned("SPY", d(2, 2), 105.0)], WriteMode::UpsertLatest, at(2))
            .unwrap();

        let parts = store.part_files("SPY").unwrap();
        assert_eq!(parts.len(), 1);
        let back: Vec<CleanedRow> = store.read(&["SPY".to_string()]).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].adj_close, Some(105.0));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn upsert_only_touches_written_partitions() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(&dir);
        store
            .write(&[cleaned("SPY", d(1, 5), 90.0)], WriteMode::Append, at(0))
            .unwrap();
        store
            .write(&[cleaned("SPY", d(2, 5), 95.0)], WriteMode::UpsertLatest, at(1))
            .unwrap();

        let back: Vec<CleanedRow> = store.read(&["SPY".to_string()]).unwrap();
        assert_eq!(back.len(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_ignores_foreign_files_and_missing_symbols() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(&dir);
        store
            .write(&[cleaned("SPY", d(2, 2), 100.0)], WriteMode::Append, at(0))
            .unwrap();
        let month = store.partition_dir("SPY", 2026, 2);
        fs::write(month.join("notes.txt"), "not parquet").unwrap();
        fs::write(month.join(".part-x.parquet.tmp"), "partial").unwrap();

        let back: Vec<CleanedRow> = store
            .read(&["SPY".to_string(), "NOPE".to_string()])
            .unwrap();
        assert_eq!(back.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_reports_missing_required_columns() {
        let dir = temp_cache_dir();
        let store = PartitionedStore::new(&dir);
        let month = store.partition_dir("SPY", 2026, 2);
        fs::create_dir_all(&month).unwrap();

        let mut df = df!(
            "symbol" => ["SPY"],
            "open" => [1.0f64],
        )
        .unwrap();
        let file = fs::File::create(month.join("part-x.parquet")).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();

        let err = store.read::<CleanedRow>(&["SPY".to_string()]).unwrap_err();
        match err {
            DataError::MissingColumns { columns } => {
                assert!(columns.contains(&"adj_close".to_string()));
                assert!(columns.contains(&"date".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }
}
