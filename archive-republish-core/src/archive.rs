//! ZIP archive access over a staged local copy.
//!
//! # Invariants
//! - The handle owns the staging file; dropping or closing the handle removes it.
//! - The central directory is read once in [`ArchiveHandle::open`]; entry data is only
//!   decompressed when an [`Entry`] is read.
//! - An [`Entry`] borrows the handle mutably and is consumed by [`Entry::read`], so at most
//!   one entry is being read at a time and no entry is read twice in one pass.
//! - Reads are capped at the configured limit even if the directory under-reports a size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::EntryError;

const PREALLOCATE_LIMIT: u64 = 64 * 1024;

/// Open archive plus the staging file backing it.
pub struct ArchiveHandle {
    // Declared before `staging` so the reader is closed before the file is removed.
    archive: ZipArchive<File>,
    staging: NamedTempFile,
    cursor: usize,
}

impl ArchiveHandle {
    /// Parse the staged file as a ZIP archive.
    ///
    /// On failure the staging file is dropped, and with it removed.
    pub fn open(staging: NamedTempFile) -> Result<Self, ZipError> {
        let file = staging.reopen()?;
        let archive = ZipArchive::new(file)?;
        Ok(Self {
            archive,
            staging,
            cursor: 0,
        })
    }

    /// Number of entries listed in the central directory.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Advance to the next entry in the archive's native order.
    pub fn next_entry(&mut self) -> Option<Entry<'_>> {
        if self.cursor >= self.archive.len() {
            return None;
        }
        let index = self.cursor;
        self.cursor += 1;
        let name = self
            .archive
            .name_for_index(index)
            .map(str::to_owned)
            .unwrap_or_default();
        Some(Entry {
            archive: &mut self.archive,
            index,
            name,
        })
    }

    /// Close the reader and delete the staging file, reporting deletion errors.
    pub fn close(self) -> io::Result<()> {
        let ArchiveHandle {
            archive, staging, ..
        } = self;
        drop(archive);
        staging.close()
    }
}

/// One archive entry, valid for a single iteration step.
pub struct Entry<'a> {
    archive: &'a mut ZipArchive<File>,
    index: usize,
    name: String,
}

impl Entry<'_> {
    /// Relative, forward-slash separated path inside the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Decompress the whole entry into memory, refusing anything over `limit` bytes.
    pub fn read(self, limit: u64) -> Result<Vec<u8>, EntryError> {
        let mut file = self.archive.by_index(self.index).map_err(|e| EntryError::Read {
            message: e.to_string(),
        })?;

        let size = file.size();
        if size > limit {
            return Err(EntryError::TooLarge { size, limit });
        }

        // The header size is untrusted; grow past this as data actually arrives.
        let mut content = Vec::with_capacity(size.min(PREALLOCATE_LIMIT) as usize);
        file.by_ref()
            .take(limit.saturating_add(1))
            .read_to_end(&mut content)
            .map_err(|e| EntryError::Read {
                message: e.to_string(),
            })?;

        let read = content.len() as u64;
        if read > limit {
            return Err(EntryError::TooLarge { size: read, limit });
        }
        Ok(content)
    }
}
