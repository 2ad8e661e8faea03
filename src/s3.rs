//! S3 implementation of the core [`ObjectStore`] trait.
//!
//! The client is built once per process from [`StoreSettings`] and handed to the pipeline;
//! the core never touches credentials or regions.

use std::path::Path;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use archive_republish_core::contract::{DestinationReference, ObjectStore, SourceReference};
use archive_republish_core::error::StoreError;

/// Region used when neither the config file nor the environment names one.
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// `store` section of the config file. Credentials are injected from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    #[serde(skip)]
    pub credentials: Option<StaticCredentials>,
}

#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration, overridden by `settings`.
    pub async fn connect(settings: &StoreSettings) -> Self {
        let region = RegionProviderChain::first_try(settings.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(creds) = &settings.credentials {
            info!(
                access_key_id = %creds.access_key_id,
                "Using static S3 credentials from environment"
            );
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                "archive-republish-static",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(settings.force_path_style);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        info!(
            region = ?shared.region(),
            endpoint = settings.endpoint_url.as_deref().unwrap_or("<aws>"),
            "S3 client constructed"
        );
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(
        &self,
        source: &SourceReference,
        destination: &Path,
    ) -> Result<(), StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&source.bucket)
            .key(&source.key)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| local_io(destination, e))?;
        let mut body = output.body;
        let mut written: u64 = 0;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StoreError::Transient(format!("reading {source}: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| local_io(destination, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| local_io(destination, e))?;

        debug!(
            archive = %source,
            bytes = written,
            path = %destination.display(),
            "Downloaded object"
        );
        Ok(())
    }

    async fn upload(
        &self,
        content: Vec<u8>,
        destination: &DestinationReference,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .content_type(&destination.media_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| classify(&e))?;
        Ok(())
    }
}

fn local_io(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Transient(format!("writing {}: {e}", path.display()))
}

/// Map an SDK failure onto the store error kinds by error code, then HTTP status.
fn classify<E>(err: &SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = DisplayErrorContext(err).to_string();
    let status = err.raw_response().map(|r| r.status().as_u16());
    store_error_kind(err.code(), status, message)
}

/// Classification shared by every S3 operation.
///
/// A recognised service error code decides the kind; the HTTP status is only consulted
/// when the code is missing or unknown.
pub fn store_error_kind(code: Option<&str>, status: Option<u16>, message: String) -> StoreError {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => StoreError::NotFound(message),
        Some(
            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AllAccessDisabled",
        ) => StoreError::AccessDenied(message),
        Some("QuotaExceeded" | "ServiceQuotaExceeded" | "TooManyBuckets") => {
            StoreError::QuotaExceeded(message)
        }
        _ => match status {
            Some(404) => StoreError::NotFound(message),
            Some(401 | 403) => StoreError::AccessDenied(message),
            _ => StoreError::Transient(message),
        },
    }
}
