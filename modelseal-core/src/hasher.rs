//! File content hashing
//!
//! SHA-256 only, streamed in fixed-size chunks so memory use never scales
//! with file size. The whole system uses this one algorithm; a manifest
//! declaring anything else is rejected at load time, never negotiated.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for streaming reads.
const CHUNK_SIZE: usize = 8192;

/// Compute the lowercase hex SHA-256 digest of a file's contents.
pub fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the lowercase hex SHA-256 digest of an in-memory byte slice.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
