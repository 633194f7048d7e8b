use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::store::single_chunk;
use crate::{ArtifactError, ArtifactResult, ByteStream};

/// One upload held in memory until its checksum is verified.
///
/// The body is gathered into a single buffer, so every `replay()` yields the
/// same refcounted `Bytes` and backends that need one contiguous body (S3,
/// the memory tiers) take it without copying.
#[derive(Debug, Clone, Default)]
pub struct Spool {
    data: Bytes,
}

impl Spool {
    /// Gather a stream, failing once more than `max_bytes` arrived
    pub async fn collect(mut stream: ByteStream, max_bytes: u64) -> ArtifactResult<Self> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (buf.len() + chunk.len()) as u64 > max_bytes {
                return Err(ArtifactError::TooLarge { limit: max_bytes });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(Self { data: buf.freeze() })
    }

    /// A fresh single-chunk stream over the spooled body
    pub fn replay(&self) -> ByteStream {
        single_chunk(self.data.clone())
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<Result<Bytes, std::io::Error>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_replays_are_independent() {
        let spool = Spool::collect(body(&[b"abc", b"", b"def"]), 1024).await.unwrap();
        assert_eq!(spool.len(), 6);

        let first: Vec<Bytes> = spool.replay().map(|c| c.unwrap()).collect().await;
        let second: Vec<Bytes> = spool.replay().map(|c| c.unwrap()).collect().await;

        assert_eq!(first, second);
        assert_eq!(first, vec![Bytes::from_static(b"abcdef")]);
        // replays share the spooled allocation
        assert_eq!(first[0].as_ptr(), second[0].as_ptr());
    }

    #[tokio::test]
    async fn test_limit_is_enforced_while_reading() {
        let err = Spool::collect(body(&[b"12345", b"6"]), 5).await.unwrap_err();
        assert!(matches!(err, ArtifactError::TooLarge { limit: 5 }));

        let exact = Spool::collect(body(&[b"12345"]), 5).await.unwrap();
        assert_eq!(exact.len(), 5);
    }
}
