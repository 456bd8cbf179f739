//! Append-only per-device log files and the reader for them.
//!
//! Layout:
//!
//! ```text
//! logs/
//! ├── pixel/
//! │   ├── 2026-10-15.jsonl
//! │   └── 2026-10-16.jsonl
//! └── tablet/
//!     └── 2026-10-16.jsonl
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::LogEntry;

/// Appends entries for one device to today's file
pub struct DeviceLogWriter {
    device: String,
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl DeviceLogWriter {
    pub fn new(log_dir: impl AsRef<Path>, device: impl Into<String>) -> io::Result<Self> {
        let device = device.into();
        let dir = log_dir.as_ref().join(&device);
        fs::create_dir_all(&dir)?;

        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = dir.join(format!("{}.jsonl", date));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            device,
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one entry as one line and flush
    pub fn write(&self, entry: &LogEntry) -> io::Result<()> {
        let line = serde_json::to_string(entry).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

impl Drop for DeviceLogWriter {
    fn drop(&mut self) {
        let _ = self.writer.lock().flush();
    }
}

/// Which entries [`read_entries`] returns
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Only this device
    pub device: Option<String>,
    /// Only files for this date (`YYYY-MM-DD`)
    pub date: Option<String>,
    /// Only entries at this level
    pub level: Option<String>,
}

impl LogQuery {
    fn wants_device(&self, device: &str) -> bool {
        self.device.as_deref().map_or(true, |d| d == device)
    }

    fn wants_file(&self, path: &Path) -> bool {
        let is_jsonl = path.extension().is_some_and(|e| e == "jsonl");
        let date_ok = match (&self.date, path.file_stem().and_then(|s| s.to_str())) {
            (Some(date), Some(stem)) => stem == date,
            (Some(_), None) => false,
            (None, _) => true,
        };
        is_jsonl && date_ok
    }

    fn wants_entry(&self, entry: &LogEntry) -> bool {
        self.level.as_deref().map_or(true, |l| l.eq_ignore_ascii_case(&entry.level))
    }
}

/// Read matching entries from every device directory, oldest first.
/// Lines that do not parse are skipped.
pub fn read_entries(log_dir: impl AsRef<Path>, query: &LogQuery) -> io::Result<Vec<LogEntry>> {
    let log_dir = log_dir.as_ref();
    if !log_dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for device_dir in fs::read_dir(log_dir)? {
        let device_dir = device_dir?.path();
        let Some(device) = device_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !device_dir.is_dir() || !query.wants_device(device) {
            continue;
        }

        for file in fs::read_dir(&device_dir)? {
            let path = file?.path();
            if !query.wants_file(&path) {
                continue;
            }
            for line in BufReader::new(File::open(&path)?).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
                    if query.wants_entry(&entry) {
                        entries.push(entry);
                    }
                }
            }
        }
    }

    entries.sort_by(|a, b| a.ts.cmp(&b.ts));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writer_creates_device_directory() {
        let temp = TempDir::new().unwrap();
        let writer = DeviceLogWriter::new(temp.path(), "pixel").unwrap();
        assert!(temp.path().join("pixel").is_dir());
        assert!(writer.path().exists());
        assert_eq!(writer.device(), "pixel");
    }

    #[test]
    fn test_read_filters_by_device_and_level() {
        let temp = TempDir::new().unwrap();
        let pixel = DeviceLogWriter::new(temp.path(), "pixel").unwrap();
        let tablet = DeviceLogWriter::new(temp.path(), "tablet").unwrap();

        pixel.write(&LogEntry::new("info", "pixel", "nav", "Showing view")).unwrap();
        pixel.write(&LogEntry::new("error", "pixel", "social", "Follow step failed")).unwrap();
        tablet.write(&LogEntry::new("info", "tablet", "nav", "Showing view")).unwrap();

        let all = read_entries(temp.path(), &LogQuery::default()).unwrap();
        assert_eq!(all.len(), 3);

        let query = LogQuery {
            device: Some("pixel".into()),
            level: Some("ERROR".into()),
            ..Default::default()
        };
        let errors = read_entries(temp.path(), &query).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].msg, "Follow step failed");
    }

    #[test]
    fn test_read_skips_garbage_and_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(read_entries(temp.path().join("nope"), &LogQuery::default())
            .unwrap()
            .is_empty());

        let writer = DeviceLogWriter::new(temp.path(), "pixel").unwrap();
        writer.write(&LogEntry::new("info", "pixel", "t", "ok")).unwrap();
        fs::write(temp.path().join("pixel").join("notes.jsonl"), "not json\n").unwrap();

        let entries = read_entries(temp.path(), &LogQuery::default()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_by_date() {
        let temp = TempDir::new().unwrap();
        let writer = DeviceLogWriter::new(temp.path(), "pixel").unwrap();
        writer.write(&LogEntry::new("info", "pixel", "t", "today")).unwrap();

        let other_day = LogQuery {
            date: Some("1999-01-01".into()),
            ..Default::default()
        };
        assert!(read_entries(temp.path(), &other_day).unwrap().is_empty());
    }
}
