//! Gzip encoding for flatten responses over the auto-compression
//! threshold. The transport layer decides how to signal
//! `Content-Encoding`; this module only produces the bytes.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

/// Which compression tier a flatten result landed in, given its row
/// count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    AutoGzip,
    ForcedGzip,
}

impl Compression {
    pub fn for_row_count(count: usize, auto_threshold: usize, warn_threshold: usize) -> Self {
        if count <= auto_threshold {
            Compression::None
        } else if count <= warn_threshold {
            Compression::AutoGzip
        } else {
            Compression::ForcedGzip
        }
    }

    pub fn is_gzip(self) -> bool {
        !matches!(self, Compression::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::AutoGzip => "auto_gzip",
            Compression::ForcedGzip => "forced_gzip",
        }
    }
}

pub fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_match_documented_boundaries() {
        assert_eq!(Compression::for_row_count(200, 200, 1500), Compression::None);
        assert_eq!(Compression::for_row_count(201, 200, 1500), Compression::AutoGzip);
        assert_eq!(Compression::for_row_count(1500, 200, 1500), Compression::AutoGzip);
        assert_eq!(Compression::for_row_count(1501, 200, 1500), Compression::ForcedGzip);
        assert_eq!(Compression::for_row_count(3000, 200, 1500), Compression::ForcedGzip);
    }

    #[test]
    fn gzip_roundtrips_via_flate2_reader() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let compressed = gzip(b"hello world").unwrap();
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }
}
