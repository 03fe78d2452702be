use dfsz_core::codec::{Codec, CodecError, CodecKind};

/// Zstandard codec.
///
/// Each chunk becomes one complete zstd frame at the configured level
/// (default: 3), so any chunk decodes without its neighbours.
///
/// Best for: general text, JSON, logs, mixed structured data.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Codec for ZstdCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::bulk::compress(raw, self.level).map_err(|e| CodecError::new(CodecKind::Zstd, e))
    }

    fn decompress_chunk(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>, CodecError> {
        zstd::bulk::decompress(compressed, raw_len).map_err(|e| CodecError::new(CodecKind::Zstd, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_at_high_level() {
        let codec = ZstdCodec::new(19);
        let raw = b"the quick brown fox jumps over the lazy dog. ".repeat(50);
        let packed = codec.compress_chunk(&raw).unwrap();
        assert!(packed.len() < raw.len() / 4);
        assert_eq!(codec.decompress_chunk(&packed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn frame_is_self_contained() {
        let codec = ZstdCodec::default();
        let packed = codec.compress_chunk(b"standalone").unwrap();
        // A complete frame decodes with the streaming API as well.
        assert_eq!(zstd::decode_all(packed.as_slice()).unwrap(), b"standalone");
    }
}
