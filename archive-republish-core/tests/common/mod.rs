#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build an in-memory ZIP. Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_bytes_with(CompressionMethod::Deflated, entries)
}

/// Same as [`zip_bytes`] but without compression, so entry data sits verbatim in the file.
pub fn stored_zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_bytes_with(CompressionMethod::Stored, entries)
}

fn zip_bytes_with(method: CompressionMethod, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// The archive used throughout the docs: two PNGs (one nested, upper-case) and a text file.
pub fn sample_archive() -> Vec<u8> {
    zip_bytes(&[
        ("img.png", b"png-one"),
        ("readme.txt", b"not an image"),
        ("sub/x.PNG", b"png-two"),
    ])
}

/// Every regular file below `dir`, recursively.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                found.extend(files_under(&path));
            } else {
                found.push(path);
            }
        }
    }
    found
}

/// Flip one byte of the first occurrence of `needle`, leaving the recorded CRC stale.
pub fn corrupt(mut archive: Vec<u8>, needle: &[u8]) -> Vec<u8> {
    let at = archive
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present in archive");
    archive[at] ^= 0xFF;
    archive
}

/// Rewrite the uncompressed size recorded for the first entry, in both its local header
/// and its central directory record.
pub fn understate_first_entry_size(mut archive: Vec<u8>, size: u32) -> Vec<u8> {
    let eocd = archive
        .windows(4)
        .rposition(|w| w == b"PK\x05\x06")
        .expect("end of central directory");
    let cd_offset = u32::from_le_bytes(archive[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
    assert_eq!(&archive[cd_offset..cd_offset + 4], b"PK\x01\x02");
    assert_eq!(&archive[0..4], b"PK\x03\x04");

    let bytes = size.to_le_bytes();
    archive[22..26].copy_from_slice(&bytes);
    archive[cd_offset + 24..cd_offset + 28].copy_from_slice(&bytes);
    archive
}
