//! JSONL storage
//!
//! Tasks and dependency edges are stored one JSON object per line, in
//! `.taskdeps/tasks.jsonl` and `.taskdeps/dependencies.jsonl`.
//! Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{Dependency, Task};

/// A file of JSON records, one per line
pub struct JsonlFile<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

/// Task records
pub type TaskFile = JsonlFile<Task>;

/// Dependency edge records
pub type DependencyFile = JsonlFile<Dependency>;

impl<T> JsonlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records, in file order
    ///
    /// A missing file reads as empty. Blank lines are skipped.
    pub fn read_all(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .with_context(|| format!("Failed to acquire read lock on {}", self.path.display()))?;

        let reader = BufReader::new(&file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: T = serde_json::from_str(&line).with_context(|| {
                format!(
                    "Failed to parse record at {}:{}",
                    self.path.display(),
                    line_num + 1
                )
            })?;

            records.push(record);
        }

        // Lock is released when file is dropped
        Ok(records)
    }

    /// Writes all records (full rewrite)
    pub fn write_all<'a>(&self, records: impl IntoIterator<Item = &'a T>) -> Result<()>
    where
        T: 'a,
    {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive().with_context(|| {
                format!("Failed to acquire write lock on {}", temp_path.display())
            })?;

            let mut writer = BufWriter::new(&file);

            for record in records {
                let line = serde_json::to_string(record).context("Failed to serialize record")?;
                writeln!(writer, "{}", line).context("Failed to write record")?;
            }

            writer.flush().context("Failed to flush store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TaskStatus};
    use tempfile::TempDir;

    fn make_task(n: u64) -> Task {
        Task::new(TaskId::new(n), format!("Task {}", n))
    }

    #[test]
    fn read_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = TaskFile::new(dir.path().join("tasks.jsonl"));

        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn write_and_read_tasks() {
        let dir = TempDir::new().unwrap();
        let store = TaskFile::new(dir.path().join("tasks.jsonl"));

        let mut task2 = make_task(2);
        task2.set_status(TaskStatus::Blocked);
        let tasks = vec![make_task(1), task2.clone()];

        store.write_all(&tasks).unwrap();

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1], task2);
    }

    #[test]
    fn write_and_read_edges() {
        let dir = TempDir::new().unwrap();
        let store = DependencyFile::new(dir.path().join("dependencies.jsonl"));

        let edge = Dependency::new(TaskId::new(2), TaskId::new(1));
        store.write_all([&edge]).unwrap();

        assert_eq!(store.read_all().unwrap(), vec![edge]);
    }

    #[test]
    fn skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        let line = serde_json::to_string(&make_task(1)).unwrap();
        fs::write(&path, format!("\n{}\n\n", line)).unwrap();

        let loaded = TaskFile::new(&path).read_all().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn reports_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(&path, "{not json}\n").unwrap();

        let err = TaskFile::new(&path).read_all().unwrap_err();
        assert!(format!("{:#}", err).contains(":1"));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = TaskFile::new(dir.path().join("nested").join("dir").join("tasks.jsonl"));

        store.write_all(&[make_task(1)]).unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn atomic_write() {
        let dir = TempDir::new().unwrap();
        let store = TaskFile::new(dir.path().join("tasks.jsonl"));

        store.write_all(&[make_task(1)]).unwrap();

        // Temp file should not exist after write
        let temp_path = store.path().with_extension("jsonl.tmp");
        assert!(!temp_path.exists());
    }
}
