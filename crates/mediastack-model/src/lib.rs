//! Wire types for MediaStack.
//!
//! This crate holds everything that crosses the HTTP boundary:
//!
//! - [`ApiError`]: a typed failure carrying its own status code and message
//! - [`MediaType`]: the closed set of accepted media file extensions
//! - [`input`]: request bodies and path parameters for every route
//! - [`output`]: response DTOs

pub mod error;
pub mod input;
pub mod output;
pub mod types;

pub use error::ApiError;
pub use types::MediaType;
