//! Handing finished artifacts to the host.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;

/// The host's save mechanism.
pub trait SaveTarget {
    /// Stores `bytes` under `filename`.
    fn save(&mut self, filename: &str, bytes: &[u8]) -> io::Result<()>;
}

/// Writes artifacts into a directory, creating it when needed.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    /// Creates a sink writing into `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The target directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl SaveTarget for DirectorySink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(filename);
        fs::write(&path, bytes)?;
        info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Keeps artifacts in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    saved: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every artifact saved so far, in order.
    pub fn saved(&self) -> &[(String, Vec<u8>)] {
        &self.saved
    }

    /// Returns `true` when nothing was saved.
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

impl SaveTarget for MemorySink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        self.saved.push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Builds `<title>_<YYYY-MM-DD>.<extension>`.
///
/// Characters that cannot appear in a file name on common platforms are replaced by `_`. A
/// title that is blank after trimming falls back to `report`.
pub fn report_filename(title: &str, date: NaiveDate, extension: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if cleaned.is_empty() {
        "report"
    } else {
        cleaned.as_str()
    };
    format!(
        "{}_{}.{}",
        stem,
        date.format("%Y-%m-%d"),
        extension.trim_start_matches('.')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn filename_uses_title_and_iso_date() {
        assert_eq!(
            report_filename("Sales Report", date(), "pdf"),
            "Sales Report_2024-03-07.pdf"
        );
    }

    #[test]
    fn filename_replaces_path_characters() {
        assert_eq!(
            report_filename("Q1/Q2: North", date(), ".pdf"),
            "Q1_Q2_ North_2024-03-07.pdf"
        );
    }

    #[test]
    fn blank_title_falls_back() {
        assert_eq!(report_filename("   ", date(), "pdf"), "report_2024-03-07.pdf");
    }

    #[test]
    fn memory_sink_records_saves() {
        let mut sink = MemorySink::new();
        sink.save("a.pdf", b"%PDF").unwrap();
        assert_eq!(sink.saved(), &[("a.pdf".to_string(), b"%PDF".to_vec())]);
    }

    #[test]
    fn directory_sink_creates_directory() {
        let directory = std::env::temp_dir().join("report_composer_sink_test/nested");
        let _ = fs::remove_dir_all(&directory);
        let mut sink = DirectorySink::new(&directory);
        sink.save("out.pdf", b"data").unwrap();
        assert_eq!(fs::read(directory.join("out.pdf")).unwrap(), b"data");
        let _ = fs::remove_dir_all(&directory);
    }
}
