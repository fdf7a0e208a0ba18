//! Streaming SHA-256 over an uploaded file, so the whole file is never
//! buffered twice.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 64 * 1024;

/// Hash a reader in fixed-size chunks, returning the hex digest and the
/// total byte count observed.
pub fn sha256_streaming(mut reader: impl Read) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    Ok((hex::encode(hasher.finalize()), total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_direct_digest() {
        let data = b"hello staging row";
        let (streamed, len) = sha256_streaming(&data[..]).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(data);
        assert_eq!(streamed, hex::encode(hasher.finalize()));
        assert_eq!(len, data.len() as u64);
    }
}
