//! MediaStack HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Incoming;
use tracing::Instrument;

use crate::body::MediaResponseBody;
use crate::dispatch::Dispatcher;
use crate::response::{CONTENT_TYPE, REQUEST_ID_HEADER};

/// Hyper `Service` that hands every request to a shared [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct MediaHttpService {
    dispatcher: Arc<Dispatcher>,
}

impl MediaHttpService {
    /// Create a new `MediaHttpService`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// The dispatcher behind this service.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl hyper::service::Service<http::Request<Incoming>> for MediaHttpService {
    type Response = http::Response<MediaResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let response = dispatcher.dispatch(req, &request_id).await;
                let response = add_common_headers(response, &request_id);
                tracing::info!(
                    status = response.status().as_u16(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "handled request"
                );
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Add common response headers to every MediaStack response.
fn add_common_headers(
    mut response: http::Response<MediaResponseBody>,
    request_id: &str,
) -> http::Response<MediaResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    headers
        .entry("content-type")
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    headers.insert("server", http::HeaderValue::from_static("MediaStack"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_add_common_headers() {
        let response = http::Response::new(MediaResponseBody::empty());
        let response = add_common_headers(response, "req-9");
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-9");
        assert_eq!(response.headers().get("content-type").unwrap(), CONTENT_TYPE);
        assert_eq!(response.headers().get("server").unwrap(), "MediaStack");
    }

    #[test]
    fn test_should_keep_existing_request_id() {
        let response = http::Response::builder()
            .header(REQUEST_ID_HEADER, "from-dispatcher")
            .body(MediaResponseBody::empty())
            .unwrap();
        let response = add_common_headers(response, "other");
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "from-dispatcher"
        );
    }
}
