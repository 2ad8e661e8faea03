/// `event` module: decodes the triggering event into a [`SourceReference`].
///
/// Two shapes are accepted:
/// - an S3 notification with a `Records` array; the first record's bucket name and
///   object key are used, and the key is query-unescaped since notifications deliver it
///   URL-encoded;
/// - a direct test event `{"bucket": "...", "key": "..."}`, used verbatim.
///
/// Only one archive is processed per invocation; extra records are logged and ignored.
use anyhow::{anyhow, bail, Context, Result};
use archive_republish_core::contract::SourceReference;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

/// Read and decode an event JSON file.
pub fn load_event<P: AsRef<Path>>(path: P) -> Result<SourceReference> {
    let path_ref = path.as_ref();
    let raw = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read event file {:?}", path_ref))?;
    parse_event(&raw)
}

/// Decode an event JSON document.
pub fn parse_event(raw: &str) -> Result<SourceReference> {
    let event: TriggerEvent =
        serde_json::from_str(raw).map_err(|e| anyhow!("Failed to parse event JSON: {e}"))?;
    source_from_event(event)
}

pub fn source_from_event(event: TriggerEvent) -> Result<SourceReference> {
    let mut records = event.records.into_iter();
    if let Some(record) = records.next() {
        let ignored = records.count();
        if ignored > 0 {
            warn!(ignored, "Event carries more than one record; only the first is processed");
        }
        let key = unescape_key(&record.s3.object.key)?;
        info!(bucket = %record.s3.bucket.name, key = %key, "Decoded S3 notification record");
        return Ok(SourceReference::new(record.s3.bucket.name, key));
    }

    match (event.bucket, event.key) {
        (Some(bucket), Some(key)) if !bucket.is_empty() && !key.is_empty() => {
            info!(bucket = %bucket, key = %key, "Decoded direct test event");
            Ok(SourceReference::new(bucket, key))
        }
        _ => bail!("Event has neither Records nor a bucket/key pair"),
    }
}

/// Query-unescape an object key: `+` becomes a space and `%XX` sequences are decoded.
pub fn unescape_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| anyhow!("Object key {raw:?} is not valid UTF-8 once unescaped: {e}"))
}
