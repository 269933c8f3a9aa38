//! Request routing and schema-validated dispatch for MediaStack.
//!
//! This crate turns a raw HTTP request into a handler-ready
//! [`RequestContext`] and a handler's result back into a JSON response:
//!
//! - **Route table**: ordered registry of [`Route`] definitions
//! - **Path matcher**: first structural match wins, see [`router::match_route`]
//! - **Body reader**: buffers the body under a size cap and decodes JSON
//! - **Schema validation**: pluggable [`Shape`] capability, with [`Schema`]
//!   as the built-in structural description
//! - **Dispatcher**: the per-request state machine and error translation
//! - **Service**: hyper `Service` wrapping the dispatcher

pub mod body;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod reader;
pub mod response;
pub mod route;
pub mod router;
pub mod schema;
pub mod service;

pub use body::MediaResponseBody;
pub use context::{Params, RequestContext};
pub use dispatch::{DispatchConfig, Dispatcher, Handler, HandlerFuture};
pub use error::{DispatchError, HandlerError};
pub use response::HandlerResponse;
pub use route::{HttpMethod, Route, RoutePattern, Segment};
pub use router::{RouteMatch, RouteTable};
pub use schema::{Schema, Shape, ValidationError};
pub use service::MediaHttpService;
