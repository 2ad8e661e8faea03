mod common;

use std::io::Write;

use archive_republish_core::archive::ArchiveHandle;
use archive_republish_core::contract::SourceReference;
use archive_republish_core::error::EntryError;
use archive_republish_core::staging::{stage, staging_location};
use common::{files_under, sample_archive, understate_first_entry_size, zip_bytes};
use tempfile::{tempdir, NamedTempFile};

fn staged_with(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_entries_come_out_in_archive_order() {
    let mut archive = ArchiveHandle::open(staged_with(&sample_archive())).expect("valid archive");
    assert_eq!(archive.len(), 3);

    let mut names = Vec::new();
    while let Some(entry) = archive.next_entry() {
        names.push(entry.name().to_string());
    }
    assert_eq!(names, vec!["img.png", "readme.txt", "sub/x.PNG"]);
    assert!(archive.next_entry().is_none(), "cursor stays exhausted");
}

#[test]
fn test_entry_read_returns_decompressed_content() {
    let mut archive = ArchiveHandle::open(staged_with(&sample_archive())).unwrap();
    let entry = archive.next_entry().unwrap();
    assert_eq!(entry.index(), 0);
    assert_eq!(entry.read(1024).unwrap(), b"png-one");

    archive.next_entry().unwrap();
    let nested = archive.next_entry().unwrap();
    assert_eq!(nested.name(), "sub/x.PNG");
    assert_eq!(nested.read(1024).unwrap(), b"png-two");
}

#[test]
fn test_entry_over_limit_is_rejected() {
    let big = vec![7u8; 4096];
    let bytes = zip_bytes(&[("big.png", big.as_slice())]);
    let mut archive = ArchiveHandle::open(staged_with(&bytes)).unwrap();
    let entry = archive.next_entry().unwrap();
    match entry.read(100) {
        Err(EntryError::TooLarge { size, limit }) => {
            assert_eq!(size, 4096);
            assert_eq!(limit, 100);
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[test]
fn test_understated_size_is_still_capped_while_reading() {
    let big = vec![7u8; 4096];
    let bytes = understate_first_entry_size(zip_bytes(&[("big.png", big.as_slice())]), 10);
    let mut archive = ArchiveHandle::open(staged_with(&bytes)).unwrap();
    let entry = archive.next_entry().unwrap();
    assert_eq!(
        entry.read(100),
        Err(EntryError::TooLarge {
            size: 101,
            limit: 100
        })
    );
}

#[test]
fn test_overstated_size_does_not_decide_the_read() {
    let bytes = understate_first_entry_size(zip_bytes(&[("small.png", b"tiny")]), 0xC000_0000);
    let mut archive = ArchiveHandle::open(staged_with(&bytes)).unwrap();
    let entry = archive.next_entry().unwrap();
    match entry.read(u64::MAX) {
        Ok(content) => assert_eq!(content, b"tiny"),
        Err(EntryError::Read { .. }) => {}
        other => panic!("expected content or a read error, got {other:?}"),
    }
}

#[test]
fn test_entry_exactly_at_limit_is_accepted() {
    let bytes = zip_bytes(&[("edge.png", b"12345")]);
    let mut archive = ArchiveHandle::open(staged_with(&bytes)).unwrap();
    assert_eq!(archive.next_entry().unwrap().read(5).unwrap(), b"12345");
}

#[test]
fn test_empty_archive_has_no_entries() {
    let mut archive = ArchiveHandle::open(staged_with(&zip_bytes(&[]))).unwrap();
    assert!(archive.is_empty());
    assert!(archive.next_entry().is_none());
}

#[test]
fn test_invalid_archive_fails_and_removes_staging_file() {
    let staged = staged_with(b"this is certainly not a zip file");
    let path = staged.path().to_path_buf();
    assert!(ArchiveHandle::open(staged).is_err());
    assert!(!path.exists(), "staging file must be gone after a failed open");
}

#[test]
fn test_close_and_drop_remove_staging_file() {
    let archive = ArchiveHandle::open(staged_with(&sample_archive())).unwrap();
    let path = archive.path().to_path_buf();
    assert!(path.exists());
    archive.close().expect("close succeeds");
    assert!(!path.exists());

    let archive = ArchiveHandle::open(staged_with(&sample_archive())).unwrap();
    let path = archive.path().to_path_buf();
    drop(archive);
    assert!(!path.exists());
}

#[test]
fn test_staging_location_mirrors_source_and_drops_escapes() {
    let base = std::path::Path::new("/stage");
    let (dir, name) = staging_location(base, &SourceReference::new("b", "folder/1.zip"));
    assert_eq!(dir, base.join("b").join("folder"));
    assert_eq!(name, "1.zip");

    let (dir, name) = staging_location(base, &SourceReference::new("b", "../../etc/passwd"));
    assert_eq!(dir, base.join("b").join("etc"));
    assert_eq!(name, "passwd");

    let (dir, name) = staging_location(base, &SourceReference::new("..", "/"));
    assert_eq!(dir, base.join("_"));
    assert_eq!(name, "archive");
}

#[test]
fn test_stage_creates_directories_and_unique_files() {
    let base = tempdir().unwrap();
    let source = SourceReference::new("b", "deep/er/1.zip");

    let first = stage(base.path(), &source).expect("stage");
    let second = stage(base.path(), &source).expect("stage again");
    assert_ne!(first.path(), second.path());
    assert!(first.path().starts_with(base.path().join("b").join("deep").join("er")));
    assert_eq!(files_under(base.path()).len(), 2);

    drop(first);
    drop(second);
    assert!(files_under(base.path()).is_empty());
}
