use std::fmt;
use std::io;

use thiserror::Error;

use crate::codec::{CodecError, UnsupportedCodec};
use crate::frame::FrameError;

pub type ReplaceResult<T> = Result<T, ReplaceError>;

/// Stages of one replacement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Validating,
    Compressing,
    Finalizing,
    Swapping,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Validating => "validating",
            Phase::Compressing => "compressing",
            Phase::Finalizing => "finalizing",
            Phase::Swapping => "swapping",
            Phase::Done => "done",
        })
    }
}

/// Terminal failure of a replacement run.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("source path parameter is missing")]
    MissingSource,

    #[error(transparent)]
    UnsupportedCodec(#[from] UnsupportedCodec),

    #[error("source file {path} does not exist")]
    SourceNotFound { path: String },

    #[error("chunk size {chunk_size} exceeds the frame limit of {max} bytes")]
    ChunkSizeTooLarge { chunk_size: u64, max: u64 },

    /// The temporary file cannot be renamed onto the source; caught before
    /// the source is touched.
    #[error(
        "temporary file {temp_path} is on a different volume than {path}; \
         set temp_dir to a directory on the same filesystem"
    )]
    CrossVolume { path: String, temp_path: String },

    #[error("I/O error while {phase} {path}: {source}")]
    Io {
        phase: Phase,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("codec error while {phase}: {source}")]
    Codec {
        phase: Phase,
        #[source]
        source: CodecError,
    },

    #[error("framing error while {phase}: {source}")]
    Frame {
        phase: Phase,
        #[source]
        source: FrameError,
    },

    /// The source was deleted but the compressed file could not be renamed
    /// into its place. The data survives only at `temp_path`.
    #[error(
        "swap window: {path} was deleted but renaming {temp_path} into its place failed: {source}; \
         the compressed data remains at {temp_path}"
    )]
    SwapWindow {
        path: String,
        temp_path: String,
        #[source]
        source: io::Error,
    },
}

impl ReplaceError {
    /// Phase the run was in when it failed.
    pub fn phase(&self) -> Phase {
        match self {
            ReplaceError::MissingSource
            | ReplaceError::UnsupportedCodec(_)
            | ReplaceError::SourceNotFound { .. } => Phase::Validating,
            ReplaceError::ChunkSizeTooLarge { .. } | ReplaceError::CrossVolume { .. } => {
                Phase::Compressing
            }
            ReplaceError::Io { phase, .. }
            | ReplaceError::Codec { phase, .. }
            | ReplaceError::Frame { phase, .. } => *phase,
            ReplaceError::SwapWindow { .. } => Phase::Swapping,
        }
    }

    /// True when the logical file may currently be missing.
    pub fn is_swap_window(&self) -> bool {
        matches!(self, ReplaceError::SwapWindow { .. })
    }

    pub(crate) fn io(phase: Phase, path: &str) -> impl FnOnce(io::Error) -> ReplaceError + '_ {
        move |source| ReplaceError::Io {
            phase,
            path: path.to_string(),
            source,
        }
    }
}
