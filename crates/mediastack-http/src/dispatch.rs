//! Handler trait and the per-request dispatch state machine.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use http_body::Body;
use tokio::time::Instant;

use crate::body::MediaResponseBody;
use crate::context::{RequestContext, params_to_value};
use crate::error::{DispatchError, HandlerError};
use crate::reader::read_json_body;
use crate::response::{HandlerResponse, error_to_response, json_response};
use crate::route::HttpMethod;
use crate::router::{RouteTable, match_route};

/// Boxed future returned by a [`Handler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HandlerResponse, HandlerError>> + Send>>;

/// Business logic behind a route.
///
/// Implemented for every `Fn(RequestContext) -> impl Future` closure, so a
/// route is usually registered with an `async move` block capturing the
/// services it needs.
pub trait Handler: Send + Sync + 'static {
    /// Handle a validated request.
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse, HandlerError>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin(self(ctx))
    }
}

/// Limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Largest accepted body, in bytes.
    pub max_body_bytes: usize,
    /// Deadline shared by body read and handler. `None` disables it.
    pub request_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Drives a request through matching, validation and the handler.
///
/// The route table is shared read-only across concurrent requests.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher over a finished route table.
    #[must_use]
    pub fn new(routes: RouteTable, config: DispatchConfig) -> Self {
        Self {
            routes: Arc::new(routes),
            config,
        }
    }

    /// The route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The limits in effect.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Handle one request and render the response, success or failure.
    pub async fn dispatch<B>(
        &self,
        req: http::Request<B>,
        request_id: &str,
    ) -> http::Response<MediaResponseBody>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.execute(req).await {
            Ok(resp) => json_response(resp.status, &resp.body, request_id),
            Err(err) => {
                let api = err.to_api_error();
                if err.is_internal() {
                    tracing::error!(request_id, error = ?err, "request failed");
                } else {
                    tracing::debug!(request_id, status = %api.status_code, error = %err, "request rejected");
                }
                error_to_response(&api, request_id)
            }
        }
    }

    /// Run the request state machine, returning the handler's response or
    /// the first failure.
    pub async fn execute<B>(&self, req: http::Request<B>) -> Result<HandlerResponse, DispatchError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        // 1. The target must be an absolute path.
        let path = parts.uri.path();
        if path.is_empty() || !path.starts_with('/') {
            return Err(DispatchError::BadRequest);
        }

        // 2. Structural match. Methods no route can use never match.
        let method = HttpMethod::from_method(&parts.method).ok_or(DispatchError::RouteNotFound)?;
        let matched =
            match_route(self.routes.all(), method, path).ok_or(DispatchError::RouteNotFound)?;
        let route = matched.route;
        tracing::debug!(%method, path, pattern = %route.pattern, "matched route");

        // 3. Parameters, before the body is touched.
        if let Some(shape) = route.params_shape() {
            shape
                .validate(params_to_value(&matched.params))
                .map_err(DispatchError::InvalidParams)?;
        }

        let deadline = self.config.request_timeout.map(|t| Instant::now() + t);

        // 4. Body: size cap, then read and decode under the deadline.
        if declared_length(&parts.headers).is_some_and(|len| len > self.config.max_body_bytes as u64) {
            return Err(DispatchError::PayloadTooLarge);
        }
        let read = read_json_body(body, self.config.max_body_bytes);
        let body = match deadline {
            Some(at) => tokio::time::timeout_at(at, read)
                .await
                .map_err(|_| DispatchError::BodyTimeout)??,
            None => read.await?,
        };

        // 5. Body shape.
        let body = match route.body_shape() {
            Some(shape) => shape.validate(body).map_err(DispatchError::InvalidBody)?,
            None => body,
        };

        // 6. Handler.
        let ctx = RequestContext {
            method,
            url: parts.uri.to_string(),
            headers: parts.headers,
            params: matched.params,
            body,
        };
        let handler = route.handler();
        let call = AssertUnwindSafe(async move { handler.call(ctx).await }).catch_unwind();
        let outcome = match deadline {
            Some(at) => tokio::time::timeout_at(at, call)
                .await
                .map_err(|_| DispatchError::HandlerTimeout)?,
            None => call.await,
        };

        // 7. Translate.
        match outcome {
            Ok(result) => Ok(result?),
            Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref())).into()),
        }
    }
}

fn declared_length(headers: &http::HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
