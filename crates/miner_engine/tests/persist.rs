use std::fs;

use miner_core::{DownloadDescriptor, JobHandle, MiningResult, ResultSource};
use miner_engine::{ensure_output_dir, ResultWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn rewriting_a_result_replaces_it() {
    let temp = TempDir::new().unwrap();
    let writer = ResultWriter::new(temp.path().to_path_buf());
    let result = MiningResult {
        job: JobHandle::new("nx-1"),
        download: DownloadDescriptor::Explicit("/dl/patterns.json".to_string()),
        patterns_count: None,
        source: ResultSource::Poll,
    };

    let first = writer.write_result(&result, b"[1]").unwrap();
    assert_eq!(first.file_name().unwrap(), "patterns.json");
    assert_eq!(fs::read(&first).unwrap(), b"[1]");

    let second = writer.write_result(&result, b"[1,2]").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"[1,2]");
}

#[test]
fn no_partial_file_when_target_is_not_a_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = ResultWriter::new(file_path.clone());
    assert!(writer.write("patterns.json", b"data").is_err());
    assert!(!file_path.with_file_name("patterns.json").exists());
}
