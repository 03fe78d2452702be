use std::io::{Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use dfsz_core::codec::{Codec, CodecError, CodecKind};

/// Bzip2 codec. Slowest of the set, usually the smallest output on text.
///
/// Each chunk is a complete bzip2 stream.
pub struct Bzip2Codec {
    level: Compression,
}

impl Default for Bzip2Codec {
    fn default() -> Self {
        Self::new(9)
    }
}

impl Bzip2Codec {
    /// Block-size level 1..=9; out-of-range values are clamped.
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.clamp(1, 9)),
        }
    }
}

impl Codec for Bzip2Codec {
    fn kind(&self) -> CodecKind {
        CodecKind::Bzip2
    }

    fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut enc = BzEncoder::new(Vec::with_capacity(raw.len() / 2), self.level);
        enc.write_all(raw)
            .map_err(|e| CodecError::new(CodecKind::Bzip2, e))?;
        enc.finish().map_err(|e| CodecError::new(CodecKind::Bzip2, e))
    }

    fn decompress_chunk(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(raw_len);
        BzDecoder::new(compressed)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::new(CodecKind::Bzip2, e))?;
        Ok(out)
    }
}
