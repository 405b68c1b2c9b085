use std::fs;

use blogwalk_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("alice");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn write_bytes_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    assert!(!writer.exists("1.jpg"));

    let first = writer.write_bytes("1.jpg", &[1, 2, 3]).unwrap();
    assert_eq!(first.file_name().unwrap(), "1.jpg");
    assert_eq!(fs::read(&first).unwrap(), vec![1, 2, 3]);
    assert!(writer.exists("1.jpg"));

    let second = writer.write_bytes("1.jpg", &[9]).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), vec![9]);
}

#[test]
fn no_partial_file_when_target_is_not_a_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write_bytes("1.jpg", b"data").is_err());
    assert!(!file_path.with_file_name("1.jpg").exists());
}

#[test]
fn write_error_names_the_target() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    fs::create_dir(writer.path_for("taken.jpg")).unwrap();

    let err = writer.write_bytes("taken.jpg", b"x").unwrap_err();
    assert!(matches!(err, PersistError::Write { ref path, .. } if path.ends_with("taken.jpg")));
}
