//! Request body ingestion and JSON decoding.

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;

use crate::error::DispatchError;

/// Buffer the whole body, failing once more than `limit` bytes arrive.
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, DispatchError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(body, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                DispatchError::PayloadTooLarge
            } else {
                DispatchError::BodyRead(e.to_string())
            }
        })
}

/// Decode a buffered body. An empty payload is `null`; anything else must be
/// a JSON document.
pub fn decode_json(bytes: &[u8]) -> Result<Value, DispatchError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(DispatchError::InvalidJson)
}

/// Buffer and decode the body.
pub async fn read_json_body<B>(body: B, limit: usize) -> Result<Value, DispatchError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = read_body(body, limit).await?;
    tracing::trace!(len = bytes.len(), "read request body");
    decode_json(&bytes)
}

#[cfg(test)]
mod tests {
    use http_body_util::{Empty, Full, StreamBody};

    use super::*;

    #[tokio::test]
    async fn test_should_decode_empty_body_as_null() {
        let value = read_json_body(Empty::<Bytes>::new(), 1024).await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_should_decode_json_body() {
        let body = Full::new(Bytes::from_static(br#"{"type":"mp4"}"#));
        let value = read_json_body(body, 1024).await.unwrap();
        assert_eq!(value, serde_json::json!({"type": "mp4"}));
    }

    #[tokio::test]
    async fn test_should_concatenate_chunks_before_decoding() {
        let chunks: Vec<Result<http_body::Frame<Bytes>, std::io::Error>> = vec![
            Ok(http_body::Frame::data(Bytes::from_static(br#"{"ke"#))),
            Ok(http_body::Frame::data(Bytes::from_static(br#"y":"media/a.png"}"#))),
        ];
        let body = StreamBody::new(futures::stream::iter(chunks));
        let value = read_json_body(body, 1024).await.unwrap();
        assert_eq!(value, serde_json::json!({"key": "media/a.png"}));
    }

    #[tokio::test]
    async fn test_should_reject_malformed_json() {
        let body = Full::new(Bytes::from_static(b"{bad"));
        let err = read_json_body(body, 1024).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_should_treat_whitespace_only_body_as_malformed() {
        let body = Full::new(Bytes::from_static(b"   "));
        let err = read_json_body(body, 1024).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_should_stop_at_size_limit() {
        let body = Full::new(Bytes::from(vec![b' '; 64]));
        let err = read_body(body, 16).await.unwrap_err();
        assert!(matches!(err, DispatchError::PayloadTooLarge));
    }

    #[tokio::test]
    async fn test_should_surface_stream_failure() {
        let chunks: Vec<Result<http_body::Frame<Bytes>, std::io::Error>> = vec![
            Ok(http_body::Frame::data(Bytes::from_static(b"{"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let body = StreamBody::new(futures::stream::iter(chunks));
        let err = read_body(body, 1024).await.unwrap_err();
        assert!(matches!(err, DispatchError::BodyRead(_)));
    }
}
