//! MediaStack business logic.
//!
//! - [`config`]: environment configuration
//! - [`metadata`]: the media metadata store
//! - [`storage`]: object storage backends (S3 and in-memory)
//! - [`media`] / [`upload`]: the services behind the HTTP routes
//! - [`routes`]: the route table served by the binary

pub mod config;
pub mod error;
pub mod media;
pub mod metadata;
pub mod routes;
pub mod storage;
pub mod upload;

pub use config::MediaStackConfig;
pub use error::MediaError;
pub use media::MediaService;
pub use routes::{AppState, route_table};
pub use upload::UploadService;
