/// `load_config` module: loads the static YAML config and injects secrets and overrides
/// from the environment.
///
/// This is the only place where user-supplied YAML is parsed into the pipeline and store
/// settings.
///
/// # Responsibilities
/// - Parse the `pipeline` and `store` sections (both optional, every field defaulted)
/// - Inject static S3 credentials from `S3_ACCESS_KEY_ID` / `S3_SECRET_ACCESS_KEY`
///   (and optional `S3_SESSION_TOKEN`); secrets never live in the YAML file
/// - Apply `ARCHIVE_REPUBLISH_STAGING_DIR` over the configured staging directory
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use crate::s3::{StaticCredentials, StoreSettings};
use anyhow::Result;
use archive_republish_core::config::PipelineConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const STAGING_DIR_ENV: &str = "ARCHIVE_REPUBLISH_STAGING_DIR";
pub const ACCESS_KEY_ENV: &str = "S3_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "S3_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "S3_SESSION_TOKEN";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub pipeline: PipelineConfig,
    pub store: StoreSettings,
}

/// Loads a YAML config file (no secrets) and merges in the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str::<Option<CliConfig>>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf.unwrap_or_default()
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    apply_env(config)
}

/// Defaults plus environment, for runs without a config file.
pub fn default_config() -> Result<CliConfig> {
    info!("No config file given, using defaults");
    apply_env(CliConfig::default())
}

fn apply_env(mut config: CliConfig) -> Result<CliConfig> {
    if let Ok(dir) = std::env::var(STAGING_DIR_ENV) {
        if !dir.is_empty() {
            info!(staging_dir = %dir, "Staging directory overridden from env");
            config.pipeline.staging_dir = PathBuf::from(dir);
        }
    }

    let access_key = std::env::var(ACCESS_KEY_ENV).ok().filter(|v| !v.is_empty());
    let secret_key = std::env::var(SECRET_KEY_ENV).ok().filter(|v| !v.is_empty());
    config.store.credentials = match (access_key, secret_key) {
        (Some(access_key_id), Some(secret_access_key)) => {
            info!("{ACCESS_KEY_ENV} and {SECRET_KEY_ENV} found in env");
            Some(StaticCredentials {
                access_key_id,
                secret_access_key,
                session_token: std::env::var(SESSION_TOKEN_ENV).ok().filter(|v| !v.is_empty()),
            })
        }
        (None, None) => None,
        _ => {
            error!("Only one of {ACCESS_KEY_ENV} / {SECRET_KEY_ENV} is set");
            anyhow::bail!(
                "{ACCESS_KEY_ENV} and {SECRET_KEY_ENV} must be set together or not at all"
            );
        }
    };

    config.pipeline.trace_loaded();
    info!(
        region = config.store.region.as_deref().unwrap_or("<default chain>"),
        endpoint_url = config.store.endpoint_url.as_deref().unwrap_or("<aws>"),
        static_credentials = config.store.credentials.is_some(),
        "Config loaded and merged successfully"
    );
    Ok(config)
}
