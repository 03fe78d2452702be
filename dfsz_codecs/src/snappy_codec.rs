use dfsz_core::codec::{Codec, CodecError, CodecKind};

/// Snappy raw block codec (no framing format; the frame header carries lengths).
pub struct SnappyCodec;

impl Codec for SnappyCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Snappy
    }

    fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        snap::raw::Encoder::new()
            .compress_vec(raw)
            .map_err(|e| CodecError::new(CodecKind::Snappy, e))
    }

    fn decompress_chunk(&self, compressed: &[u8], _raw_len: usize) -> Result<Vec<u8>, CodecError> {
        snap::raw::Decoder::new()
            .decompress_vec(compressed)
            .map_err(|e| CodecError::new(CodecKind::Snappy, e))
    }
}
