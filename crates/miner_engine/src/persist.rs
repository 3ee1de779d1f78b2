use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use miner_core::{DownloadDescriptor, MiningResult};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// File name for a downloaded result.
///
/// Uses the last path segment of an explicit reference when it looks like a
/// file name, otherwise `{job}_patterns.json`. Characters that are unsafe on
/// common filesystems become `_`.
pub fn result_filename(result: &MiningResult) -> String {
    let from_reference = match &result.download {
        DownloadDescriptor::Explicit(reference) => reference
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|segment| segment.contains('.') && !segment.starts_with('.'))
            .map(sanitize),
        DownloadDescriptor::ForJob(_) => None,
    };
    from_reference.unwrap_or_else(|| format!("{}_patterns.json", sanitize(result.job.as_str())))
}

fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes mining results into a directory, replacing files atomically.
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writes `bytes` to `{dir}/{filename}` via a temp file and rename.
    pub fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    pub fn write_result(&self, result: &MiningResult, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        self.write(&result_filename(result), bytes)
    }
}
