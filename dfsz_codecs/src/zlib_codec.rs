use std::io::{Read, Write};

use dfsz_core::codec::{Codec, CodecError, CodecKind};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Zlib (deflate with zlib header and adler32 trailer) via flate2.
///
/// Every chunk is encoded as its own zlib stream and finished before the next
/// one starts.
pub struct ZlibCodec {
    level: Compression,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self::new(6)
    }
}

impl ZlibCodec {
    /// `level` 0..=9; anything else falls back to the default.
    pub fn new(level: u32) -> Self {
        let level = match level {
            0..=9 => Compression::new(level),
            _ => Compression::default(),
        };
        Self { level }
    }
}

impl Codec for ZlibCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zlib
    }

    fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut enc = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), self.level);
        enc.write_all(raw)
            .map_err(|e| CodecError::new(CodecKind::Zlib, e))?;
        enc.finish().map_err(|e| CodecError::new(CodecKind::Zlib, e))
    }

    fn decompress_chunk(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(raw_len);
        ZlibDecoder::new(compressed)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::new(CodecKind::Zlib, e))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let codec = ZlibCodec::default();
        let raw: Vec<u8> = (0..10_000u32).map(|i| (i % 17) as u8).collect();
        let packed = codec.compress_chunk(&raw).unwrap();
        assert_eq!(&packed[..1], &[0x78]); // zlib CMF byte
        assert_eq!(codec.decompress_chunk(&packed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn out_of_range_level_uses_default() {
        let codec = ZlibCodec::new(42);
        assert_eq!(codec.level, Compression::default());
    }
}
