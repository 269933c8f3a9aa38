//! Response body: one fully buffered JSON document.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::Full;

/// Body of every MediaStack response.
///
/// The dispatcher always renders a complete JSON document before responding,
/// so the body is a [`Full`] buffer. Empty data yields no frames at all.
#[derive(Debug, Default)]
pub struct MediaResponseBody(Full<Bytes>);

impl MediaResponseBody {
    /// A body holding `data`.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self(Full::new(data.into()))
    }

    /// A body with no payload.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Body for MediaResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().0).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }
}
