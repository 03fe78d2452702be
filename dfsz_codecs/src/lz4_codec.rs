use dfsz_core::codec::{Codec, CodecError, CodecKind};

/// LZ4 block codec.
///
/// Fastest of the bundled codecs on both sides. The raw length lives in the
/// frame header, so blocks are stored without lz4_flex's size prefix.
///
/// Best for: hot data where decode latency matters more than size.
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn kind(&self) -> CodecKind {
        CodecKind::Lz4
    }

    fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::compress(raw))
    }

    fn decompress_chunk(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>, CodecError> {
        lz4_flex::decompress(compressed, raw_len).map_err(|e| CodecError::new(CodecKind::Lz4, e))
    }
}
