//! MediaStack configuration.
//!
//! Provides [`MediaStackConfig`], loaded from environment variables via
//! [`MediaStackConfig::from_env`].

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use mediastack_http::DispatchConfig;

/// Configuration errors detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The S3 backend was selected without its required settings.
    #[error("S3_REGION, S3_ACCESS_KEY, S3_SECRET_KEY, and S3_BUCKET_NAME must be set")]
    MissingS3Settings,
    /// The Postgres metadata store was selected without a connection URL.
    #[error("DATABASE_URL must be set for the postgres metadata backend")]
    MissingDatabaseUrl,
    /// The listen address does not parse.
    #[error("invalid listen address {addr}: {source}")]
    InvalidListenAddr {
        /// The rejected value.
        addr: String,
        /// Why it was rejected.
        source: std::net::AddrParseError,
    },
}

/// Which object storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// An S3-compatible service reached through the AWS SDK.
    #[default]
    S3,
    /// A process-local store, for development and tests.
    Memory,
}

impl FromStr for StorageBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Where media metadata records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackendKind {
    /// The `media_metadata` table in PostgreSQL.
    Postgres,
    /// A process-local store, for development and tests.
    #[default]
    Memory,
}

impl FromStr for MetadataBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown metadata backend: {other}")),
        }
    }
}

/// Connection settings for the S3 backend, all required.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    /// Custom endpoint. When set, path-style addressing is used.
    pub endpoint: Option<String>,
    /// Region.
    pub region: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Bucket holding every media object.
    pub bucket: String,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// MediaStack server configuration.
///
/// # Examples
///
/// ```
/// use mediastack_core::config::{MediaStackConfig, StorageBackendKind};
///
/// let config = MediaStackConfig::builder()
///     .storage_backend(StorageBackendKind::Memory)
///     .build();
/// assert_eq!(config.listen_addr, "0.0.0.0:3000");
/// assert_eq!(config.presign_expires_secs, 3600);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct MediaStackConfig {
    /// Bind address.
    #[builder(default = String::from("0.0.0.0:3000"))]
    pub listen_addr: String,

    /// Log filter used when `RUST_LOG` is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Object storage backend.
    #[builder(default)]
    pub storage_backend: StorageBackendKind,

    /// Custom S3 endpoint.
    #[builder(default, setter(strip_option))]
    pub s3_endpoint: Option<String>,

    /// S3 region.
    #[builder(default, setter(strip_option))]
    pub s3_region: Option<String>,

    /// S3 access key id.
    #[builder(default, setter(strip_option))]
    pub s3_access_key: Option<String>,

    /// S3 secret access key.
    #[builder(default, setter(strip_option))]
    pub s3_secret_key: Option<String>,

    /// S3 bucket name.
    #[builder(default, setter(strip_option))]
    pub s3_bucket_name: Option<String>,

    /// Metadata store.
    #[builder(default)]
    pub metadata_backend: MetadataBackendKind,

    /// Postgres connection URL for the metadata store.
    #[builder(default, setter(strip_option))]
    pub database_url: Option<String>,

    /// Lifetime of every presigned URL, in seconds.
    #[builder(default = 3600)]
    pub presign_expires_secs: u64,

    /// Request body cap, in bytes.
    #[builder(default = 1_048_576)]
    pub max_body_bytes: usize,

    /// Deadline for body read plus handler, in seconds. `0` disables it.
    #[builder(default = 30)]
    pub request_timeout_secs: u64,
}

impl Default for MediaStackConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for MediaStackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStackConfig")
            .field("listen_addr", &self.listen_addr)
            .field("log_level", &self.log_level)
            .field("storage_backend", &self.storage_backend)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_region", &self.s3_region)
            .field("s3_access_key", &self.s3_access_key)
            .field("s3_secret_key", &self.s3_secret_key.as_ref().map(|_| "***"))
            .field("s3_bucket_name", &self.s3_bucket_name)
            .field("metadata_backend", &self.metadata_backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "***"))
            .field("presign_expires_secs", &self.presign_expires_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl MediaStackConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LISTEN_ADDR` | `0.0.0.0:3000` |
    /// | `PORT` | replaces the port of `LISTEN_ADDR` |
    /// | `LOG_LEVEL` | `info` |
    /// | `STORAGE_BACKEND` | `s3` |
    /// | `S3_ENDPOINT` | unset |
    /// | `S3_REGION` | unset |
    /// | `S3_ACCESS_KEY` | unset |
    /// | `S3_SECRET_KEY` | unset |
    /// | `S3_BUCKET_NAME` | unset |
    /// | `DATABASE_URL` | unset |
    /// | `METADATA_BACKEND` | `postgres` when `DATABASE_URL` is set, else `memory` |
    /// | `PRESIGN_EXPIRES_SECS` | `3600` |
    /// | `MAX_BODY_BYTES` | `1048576` |
    /// | `REQUEST_TIMEOUT_SECS` | `30` |
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("PORT") {
            match v.parse::<u16>() {
                Ok(port) => config.listen_addr = with_port(&config.listen_addr, port),
                Err(_) => tracing::warn!(value = %v, "ignoring invalid PORT"),
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("STORAGE_BACKEND") {
            match v.parse() {
                Ok(kind) => config.storage_backend = kind,
                Err(e) => tracing::warn!(error = %e, "ignoring STORAGE_BACKEND"),
            }
        }
        config.s3_endpoint = non_empty(lookup("S3_ENDPOINT"));
        config.s3_region = non_empty(lookup("S3_REGION"));
        config.s3_access_key = non_empty(lookup("S3_ACCESS_KEY"));
        config.s3_secret_key = non_empty(lookup("S3_SECRET_KEY"));
        config.s3_bucket_name = non_empty(lookup("S3_BUCKET_NAME"));
        config.database_url = non_empty(lookup("DATABASE_URL"));
        if config.database_url.is_some() {
            config.metadata_backend = MetadataBackendKind::Postgres;
        }
        if let Some(v) = lookup("METADATA_BACKEND") {
            match v.parse() {
                Ok(kind) => config.metadata_backend = kind,
                Err(e) => tracing::warn!(error = %e, "ignoring METADATA_BACKEND"),
            }
        }
        if let Some(n) = parse_number(&lookup, "PRESIGN_EXPIRES_SECS") {
            config.presign_expires_secs = n;
        }
        if let Some(n) = parse_number(&lookup, "MAX_BODY_BYTES") {
            config.max_body_bytes = n;
        }
        if let Some(n) = parse_number(&lookup, "REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = n;
        }

        config
    }

    /// The bind address as a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddr {
                addr: self.listen_addr.clone(),
                source,
            })
    }

    /// The S3 connection settings, if all required values are present.
    pub fn s3_settings(&self) -> Result<S3Settings, ConfigError> {
        match (
            &self.s3_region,
            &self.s3_access_key,
            &self.s3_secret_key,
            &self.s3_bucket_name,
        ) {
            (Some(region), Some(access_key), Some(secret_key), Some(bucket)) => Ok(S3Settings {
                endpoint: self.s3_endpoint.clone(),
                region: region.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                bucket: bucket.clone(),
            }),
            _ => Err(ConfigError::MissingS3Settings),
        }
    }

    /// The metadata database URL, required by the Postgres store.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }

    /// Lifetime of presigned URLs.
    #[must_use]
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expires_secs)
    }

    /// Limits for the request dispatcher.
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            max_body_bytes: self.max_body_bytes,
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }
}

fn with_port(addr: &str, port: u16) -> String {
    match addr.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{addr}:{port}"),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        tracing::warn!(variable = name, value = %raw, "ignoring non-numeric value");
    }
    parsed
}
