//! Bounded request body reading
//!
//! Oversized bodies are still read to the end so the connection stays in
//! sync for the next keep-alive request; only the first `limit` bytes are
//! ever buffered.

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tracing::warn;

use super::error::ApiError;

/// Read `body` completely, failing with [`ApiError::PayloadTooLarge`] if
/// it is longer than `limit` bytes.
pub async fn read_limited(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    let mut received: usize = 0;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| ApiError::BadRequest(format!("failed to read body: {}", e)))?;
        received = received.saturating_add(chunk.len());

        if received <= limit {
            buf.extend_from_slice(&chunk);
        } else if !buf.is_empty() {
            buf = BytesMut::new();
        }
    }

    if received > limit {
        warn!("Rejected {} byte body (limit {})", received, limit);
        return Err(ApiError::PayloadTooLarge { limit });
    }

    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_within_limit() {
        let bytes = read_limited(Body::from("hello"), 5).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_over_limit() {
        let err = read_limited(Body::from("hello!"), 5).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { limit: 5 }));
    }

    #[tokio::test]
    async fn test_chunked_over_limit_is_consumed() {
        let chunks: Vec<Result<&'static str, std::io::Error>> =
            vec![Ok("aaaa"), Ok("bbbb"), Ok("cccc")];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let err = read_limited(body, 6).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_empty_body() {
        assert!(read_limited(Body::empty(), 5).await.unwrap().is_empty());
    }
}
