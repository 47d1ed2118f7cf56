use std::fs;

use courseware_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_cache_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("cache").join("gen");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("entry.body", b"hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "entry.body");
    assert_eq!(fs::read(&first).unwrap(), b"hello");

    let second = writer.write("entry.body", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("entry.body", b"data").is_err());
    assert!(!file_path.with_file_name("entry.body").exists());
}
