#![allow(unused)]

//! # contract: object store interface and the references it moves data between
//!
//! The pipeline never constructs a store client. Callers inject any [`ObjectStore`]
//! implementation: the S3 client in the binary crate, [`crate::memory::InMemoryStore`],
//! or a `mockall` mock.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; `MockObjectStore` is exported with the
//!   `test-export-mocks` feature so integration tests can script failures.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The archive a run processes: a bucket and an (unescaped) object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceReference {
    pub bucket: String,
    pub key: String,
}

impl SourceReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Where a single entry gets published, and with which content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationReference {
    pub bucket: String,
    pub key: String,
    pub media_type: String,
}

impl fmt::Display for DestinationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Trait for fetching archives from and publishing entries to an object store.
///
/// Implementations must give `upload` overwrite semantics: publishing the same
/// destination twice replaces the object and is not an error.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write the object identified by `source` to the local file at `destination`.
    ///
    /// The file already exists (empty) when this is called; implementors truncate it.
    async fn download(
        &self,
        source: &SourceReference,
        destination: &Path,
    ) -> Result<(), StoreError>;

    /// Store `content` at `destination` with its declared media type.
    async fn upload(
        &self,
        content: Vec<u8>,
        destination: &DestinationReference,
    ) -> Result<(), StoreError>;
}
