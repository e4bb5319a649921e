// crates/core/src/compress.rs
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Error;

/// Gzip-compresses `bytes`. Used by the pipeline to turn a decoded file
/// snapshot into the blob stored alongside an edit row.
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|err| Error::invalid(format!("gzip encode failed: {err}")))?;
    encoder
        .finish()
        .map_err(|err| Error::invalid(format!("gzip encode failed: {err}")))
}

/// Inverse of [`gzip`]. Readers that surface file content to callers are
/// responsible for calling this; the store never inspects blob bytes.
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| Error::corrupt(format!("gzip decode failed: {err}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let original = b"package x\n// long body\n".to_vec();
        let compressed = gzip(&original).expect("compress");
        let decompressed = gunzip(&compressed).expect("decompress");
        assert_eq!(original, decompressed);
    }

    #[test]
    fn rejects_garbage_as_corrupt() {
        let err = gunzip(b"not gzip").unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }
}
