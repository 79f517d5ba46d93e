//! Configuration module
//!
//! All settings are read once at startup into an immutable [`Config`] that is
//! shared by reference with every component. Variable names keep the
//! `WA_CRAWLERS_*` prefix used by existing deployments.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_S3_REGION;
use crate::storage_types::StorageBackend;

pub const ENV_PORT: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_PORT";
pub const ENV_MINIO_URL: &str = "WA_CRAWLERS_MINIO_URL";
pub const ENV_MINIO_ACCESS_KEY_ID: &str = "WA_CRAWLERS_MINIO_ACCESS_KEY_ID";
pub const ENV_MINIO_SECRET_ACCESS_KEY: &str = "WA_CRAWLERS_MINIO_SECRET_ACCESS_KEY";
pub const ENV_BUCKET_NAME: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_MINIO_BUCKET_NAME";
pub const ENV_CALLBACK_URL: &str = "WA_CRAWLERS_IMAGE_CALLBACK_RESOURCE";
pub const ENV_MINIO_USE_SSL: &str = "WA_CRAWLERS_MINIO_USE_SSL";
pub const ENV_MINIO_REGION: &str = "WA_CRAWLERS_MINIO_REGION";
pub const ENV_STORAGE_BACKEND: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_STORAGE_BACKEND";
pub const ENV_LOCAL_STORAGE_PATH: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_LOCAL_STORAGE_PATH";
pub const ENV_WORK_DIR: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_WORK_DIR";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_FETCH_TIMEOUT_SECS";
pub const ENV_UPLOAD_TIMEOUT_SECS: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_UPLOAD_TIMEOUT_SECS";
pub const ENV_CALLBACK_TIMEOUT_SECS: &str = "WA_CRAWLERS_IMAGE_CALLBACK_TIMEOUT_SECS";
pub const ENV_DETACHED: &str = "WA_CRAWLERS_IMAGE_DOWNLOADER_DETACHED";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

const FETCH_TIMEOUT_SECS: u64 = 60;
const UPLOAD_TIMEOUT_SECS: u64 = 120;
const CALLBACK_TIMEOUT_SECS: u64 = 30;

/// Console output format for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("Invalid log format: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub log_format: LogFormat,
}

/// Object store settings. `endpoint` is `host[:port]` as MinIO clients
/// expect; a value that already carries a scheme is used verbatim.
#[derive(Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub use_ssl: bool,
    pub local_storage_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Endpoint with scheme, without trailing slash.
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            let scheme = if self.use_ssl { "https" } else { "http" };
            format!("{}://{}", scheme, endpoint)
        }
    }

    /// Base for internal object URLs: `{scheme}://{endpoint}/{bucket}`.
    pub fn bucket_url(&self) -> String {
        format!("{}/{}", self.endpoint_url(), self.bucket)
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("use_ssl", &self.use_ssl)
            .field("local_storage_path", &self.local_storage_path)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct CallbackConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory holding in-flight temp files.
    pub work_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub upload_timeout: Duration,
    /// Respond before the pipeline runs instead of after it finishes.
    pub detached: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub callback: CallbackConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load from the process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup and validate the result.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow::anyhow!("{} must be set", key))
        };

        let backend = match get(ENV_STORAGE_BACKEND) {
            Some(value) => value.parse()?,
            None => StorageBackend::S3,
        };

        // Credentials only matter when talking to an actual object store.
        let credential = |key: &str| match backend {
            StorageBackend::S3 => required(key),
            StorageBackend::Local => Ok(get(key).unwrap_or_default()),
        };

        let server = ServerConfig {
            port: required(ENV_PORT)?
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a valid port number", ENV_PORT))?,
            log_format: match get(ENV_LOG_FORMAT) {
                Some(value) => value.parse()?,
                None => LogFormat::default(),
            },
        };

        let storage = StorageConfig {
            backend,
            endpoint: required(ENV_MINIO_URL)?.trim().to_string(),
            bucket: required(ENV_BUCKET_NAME)?.trim().to_string(),
            access_key_id: credential(ENV_MINIO_ACCESS_KEY_ID)?,
            secret_access_key: credential(ENV_MINIO_SECRET_ACCESS_KEY)?,
            region: get(ENV_MINIO_REGION).unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            use_ssl: parse_bool(ENV_MINIO_USE_SSL, get(ENV_MINIO_USE_SSL), false)?,
            local_storage_path: get(ENV_LOCAL_STORAGE_PATH).map(PathBuf::from),
        };

        let callback = CallbackConfig {
            url: required(ENV_CALLBACK_URL)?.trim().to_string(),
            timeout: parse_secs(
                ENV_CALLBACK_TIMEOUT_SECS,
                get(ENV_CALLBACK_TIMEOUT_SECS),
                CALLBACK_TIMEOUT_SECS,
            )?,
        };

        let pipeline = PipelineConfig {
            work_dir: get(ENV_WORK_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            fetch_timeout: parse_secs(
                ENV_FETCH_TIMEOUT_SECS,
                get(ENV_FETCH_TIMEOUT_SECS),
                FETCH_TIMEOUT_SECS,
            )?,
            upload_timeout: parse_secs(
                ENV_UPLOAD_TIMEOUT_SECS,
                get(ENV_UPLOAD_TIMEOUT_SECS),
                UPLOAD_TIMEOUT_SECS,
            )?,
            detached: parse_bool(ENV_DETACHED, get(ENV_DETACHED), false)?,
        };

        let config = Config {
            server,
            storage,
            callback,
            pipeline,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.callback.url.starts_with("http://") || self.callback.url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "{} must be an http:// or https:// URL",
                ENV_CALLBACK_URL
            ));
        }

        if self.storage.bucket.contains('/') {
            return Err(anyhow::anyhow!(
                "{} must be a bare bucket name",
                ENV_BUCKET_NAME
            ));
        }

        if self.storage.backend == StorageBackend::Local && self.storage.local_storage_path.is_none()
        {
            return Err(anyhow::anyhow!(
                "{} must be set when using the local storage backend",
                ENV_LOCAL_STORAGE_PATH
            ));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, anyhow::Error> {
    match value.map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(anyhow::anyhow!("{} must be true or false", key)),
        },
    }
}

fn parse_secs(key: &str, value: Option<String>, default: u64) -> Result<Duration, anyhow::Error> {
    let secs = match value {
        None => default,
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", key))?,
    };
    if secs == 0 {
        return Err(anyhow::anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_secs(secs))
}
