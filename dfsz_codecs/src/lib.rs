mod bzip2_codec;
mod lz4_codec;
mod snappy_codec;
mod zlib_codec;
mod zstd_codec;

pub use bzip2_codec::Bzip2Codec;
pub use lz4_codec::Lz4Codec;
pub use snappy_codec::SnappyCodec;
pub use zlib_codec::ZlibCodec;
pub use zstd_codec::ZstdCodec;

use dfsz_core::{Codec, CodecKind};

/// Build the codec for `kind` at its default level.
///
/// The match is exhaustive over [`CodecKind`], so a new variant cannot ship
/// without an implementation here. Plugs into `Replacer::new` as the resolver.
pub fn codec_for(kind: CodecKind) -> Box<dyn Codec> {
    match kind {
        CodecKind::Lz4 => Box::new(Lz4Codec),
        CodecKind::Bzip2 => Box::new(Bzip2Codec::default()),
        CodecKind::Zlib => Box::new(ZlibCodec::default()),
        CodecKind::Snappy => Box::new(SnappyCodec),
        CodecKind::Zstd => Box::new(ZstdCodec::default()),
    }
}
