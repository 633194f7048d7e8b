use futures_util::StreamExt;
use sha2::{Digest, Sha256};

use crate::{ArtifactResult, ByteStream};

/// Drain `stream` and return the lowercase hex SHA-256 of everything it yielded
pub async fn sha256_hex(mut stream: ByteStream) -> ArtifactResult<String> {
    let mut hasher = Sha256::new();
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase hex SHA-256 of an in-memory buffer
pub fn sha256_hex_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
