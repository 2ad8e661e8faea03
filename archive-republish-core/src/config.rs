use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Default cap on a single entry's uncompressed size (100 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 100 * 1024 * 1024;

/// Everything a [`crate::pipeline::Pipeline`] needs besides its store client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Writable base directory for staging copies of downloaded archives.
    pub staging_dir: PathBuf,
    pub filter: FilterConfig,
    /// Entries larger than this are recorded as too large and not published.
    pub max_entry_bytes: u64,
    /// Stop the run after the first publish failure instead of attempting every entry.
    pub fail_fast: bool,
    /// Publish into this bucket instead of the source archive's bucket.
    pub destination_bucket: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            filter: FilterConfig::default(),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            fail_fast: false,
            destination_bucket: None,
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            staging_dir = %self.staging_dir.display(),
            extensions = ?self.filter.extensions,
            media_type = %self.filter.media_type,
            max_entry_bytes = self.max_entry_bytes,
            fail_fast = self.fail_fast,
            destination_bucket = self.destination_bucket.as_deref().unwrap_or("<source bucket>"),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

/// Which entries get republished, and the content type they are published with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Allowed extensions, with or without the leading dot. Matching ignores case.
    pub extensions: Vec<String>,
    pub media_type: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".png".to_string()],
            media_type: "image/png".to_string(),
        }
    }
}
