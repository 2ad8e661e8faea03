//! Destination key derivation.
//!
//! `folder/1.zip` + `sub/x.png` publishes to `folder/1/sub/x.png`. Derivation is pure so
//! retries and repeated runs always target the same keys.

use crate::contract::{DestinationReference, SourceReference};
use crate::filter::extension;

/// Maps (source archive, entry name) to the entry's destination.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    media_type: String,
    destination_bucket: Option<String>,
}

impl KeyDeriver {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            destination_bucket: None,
        }
    }

    /// Publish into `bucket` rather than the source archive's bucket.
    pub fn with_destination_bucket(mut self, bucket: Option<String>) -> Self {
        self.destination_bucket = bucket;
        self
    }

    pub fn derive(&self, source: &SourceReference, entry_name: &str) -> DestinationReference {
        DestinationReference {
            bucket: self
                .destination_bucket
                .clone()
                .unwrap_or_else(|| source.bucket.clone()),
            key: derive_key(&source.key, entry_name),
            media_type: self.media_type.clone(),
        }
    }
}

/// Strip the archive extension from `source_key` and append the normalised entry path.
pub fn derive_key(source_key: &str, entry_name: &str) -> String {
    let prefix = strip_extension(source_key).trim_end_matches('/');
    let entry = normalise_entry_path(entry_name);
    match (prefix.is_empty(), entry.is_empty()) {
        (true, _) => entry,
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{entry}"),
    }
}

/// Remove the final extension of the last path component, if any.
pub fn strip_extension(key: &str) -> &str {
    match extension(key) {
        Some(ext) => &key[..key.len() - ext.len()],
        None => key,
    }
}

// Empty and `.` segments are dropped; `..` only pops segments of the entry itself.
fn normalise_entry_path(entry_name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in entry_name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
