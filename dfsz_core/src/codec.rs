use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names accepted for `--codec`, in the order they are listed to users.
///
/// Owned by this module and never mutated; kept in step with [`CodecKind::ALL`].
pub const SUPPORTED_CODECS: &[&str] = &["lz4", "bzip2", "zlib", "snappy", "zstd"];

/// The closed set of compression algorithms a run may use.
///
/// Adding an algorithm means adding a variant here; the exhaustive match in
/// `dfsz_codecs::codec_for` then refuses to compile until it is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    Lz4,
    Bzip2,
    Zlib,
    #[default]
    Snappy,
    Zstd,
}

impl CodecKind {
    pub const ALL: [CodecKind; 5] = [
        CodecKind::Lz4,
        CodecKind::Bzip2,
        CodecKind::Zlib,
        CodecKind::Snappy,
        CodecKind::Zstd,
    ];

    /// Canonical lowercase name, as stored in the compression state record.
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Lz4 => "lz4",
            CodecKind::Bzip2 => "bzip2",
            CodecKind::Zlib => "zlib",
            CodecKind::Snappy => "snappy",
            CodecKind::Zstd => "zstd",
        }
    }

    /// Case-insensitive lookup, so `Lz4`, `Bzip2` and `snappy` all resolve.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = UnsupportedCodec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnsupportedCodec {
            name: s.to_string(),
        })
    }
}

/// A codec name outside [`SUPPORTED_CODECS`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported codec '{name}' (supported: {})", SUPPORTED_CODECS.join(", "))]
pub struct UnsupportedCodec {
    pub name: String,
}

/// Failure inside a codec while compressing or decompressing one chunk.
#[derive(Debug, Error)]
#[error("{codec} codec failed: {msg}")]
pub struct CodecError {
    pub codec: CodecKind,
    pub msg: String,
}

impl CodecError {
    pub fn new(codec: CodecKind, msg: impl fmt::Display) -> Self {
        Self {
            codec,
            msg: msg.to_string(),
        }
    }
}

/// Per-chunk compression abstraction.
///
/// Each implementation must turn a chunk into a self-contained unit: no
/// dictionary or window state may carry over from one chunk to the next.
/// That is what lets every position-index entry serve as an independent
/// decompression start point.
pub trait Codec: Send + Sync {
    fn kind(&self) -> CodecKind;

    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Compress a single independent chunk.
    fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decompress a single unit produced by [`Codec::compress_chunk`].
    ///
    /// `raw_len` is the original chunk length recorded in the frame header.
    fn decompress_chunk(&self, compressed: &[u8], raw_len: usize) -> Result<Vec<u8>, CodecError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_table_matches_enum() {
        let names: Vec<&str> = CodecKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, SUPPORTED_CODECS);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(CodecKind::parse("Lz4"), Some(CodecKind::Lz4));
        assert_eq!(CodecKind::parse("BZIP2"), Some(CodecKind::Bzip2));
        assert_eq!(CodecKind::parse(" snappy "), Some(CodecKind::Snappy));
        assert_eq!(CodecKind::parse("gzip2"), None);
    }

    #[test]
    fn unsupported_error_lists_choices() {
        let err = "gzip2".parse::<CodecKind>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gzip2"));
        assert!(msg.contains("lz4, bzip2, zlib, snappy, zstd"), "got: {msg}");
    }

    #[test]
    fn default_is_snappy() {
        assert_eq!(CodecKind::default(), CodecKind::Snappy);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&CodecKind::Bzip2).unwrap();
        assert_eq!(json, "\"bzip2\"");
        let back: CodecKind = serde_json::from_str("\"zlib\"").unwrap();
        assert_eq!(back, CodecKind::Zlib);
    }
}
