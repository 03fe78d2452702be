//! Replace a file with its compressed form.
//!
//! # Run sequence
//! 1. **Validating**: source path given, codec supported, source exists. No side effects.
//! 2. **Compressing**: pick the chunk size, stream the source through the
//!    engine into a temporary file.
//! 3. **Finalizing**: read back the temporary file's length and freeze the record.
//! 4. **Swapping**: delete the source, rename the temporary file into its place
//!    (or one atomic replace when the filesystem offers it).
//! 5. **Done**: hand the record back.
//!
//! Until step 4 the source is untouched and any failure removes the temporary
//! file. Between the delete and the rename no file exists at the source path;
//! a rename failure there is reported as [`ReplaceError::SwapWindow`].

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::{Codec, CodecKind};
use crate::config::{ReplaceConfig, SwapMode};
use crate::engine::{compress_stream, EngineError, StreamSummary};
use crate::error::{Phase, ReplaceError, ReplaceResult};
use crate::frame::MAX_CHUNK_SIZE;
use crate::fs::{FileInfo, FileSystem};
use crate::policy::plan_chunk_size;
use crate::state::{CompressionState, CompressionStateBuilder};

/// Suffix of in-flight compressed files.
pub const TEMP_SUFFIX: &str = "dfsz_compression";

/// Builds the codec for a validated [`CodecKind`]. `dfsz_codecs::codec_for`
/// is the usual choice.
pub type CodecResolver = fn(CodecKind) -> Box<dyn Codec>;

/// Caller parameters for one run, as handed over by the invoking harness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressRequest {
    pub source_path: Option<String>,
    /// Preferred chunk size in bytes.
    pub buffer_size: Option<u64>,
    /// Codec name; the configured default when absent.
    pub codec: Option<String>,
}

impl CompressRequest {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: Some(source_path.into()),
            ..Self::default()
        }
    }

    pub fn buffer_size(mut self, bytes: u64) -> Self {
        self.buffer_size = Some(bytes);
        self
    }

    pub fn codec(mut self, name: impl Into<String>) -> Self {
        self.codec = Some(name.into());
        self
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub source_path: String,
    pub codec: CodecKind,
    pub buffer_size: u64,
}

/// Drives compress-and-replace runs against one filesystem.
pub struct Replacer<F> {
    fs: F,
    config: ReplaceConfig,
    resolve: CodecResolver,
}

impl<F: FileSystem> Replacer<F> {
    pub fn new(fs: F, config: ReplaceConfig, resolve: CodecResolver) -> Self {
        Self {
            fs,
            config,
            resolve,
        }
    }

    /// Check the request against the filesystem without touching it.
    ///
    /// Calling this twice with unchanged inputs gives the same answer.
    pub fn validate(&self, request: &CompressRequest) -> ReplaceResult<ValidatedRequest> {
        let source_path = match request.source_path.as_deref() {
            Some(path) if !path.trim().is_empty() => path.to_string(),
            _ => return Err(ReplaceError::MissingSource),
        };

        let codec = match request.codec.as_deref() {
            Some(name) => name.parse::<CodecKind>()?,
            None => self.config.default_codec,
        };

        let exists = self
            .fs
            .exists(&source_path)
            .map_err(ReplaceError::io(Phase::Validating, &source_path))?;
        if !exists {
            return Err(ReplaceError::SourceNotFound { path: source_path });
        }

        Ok(ValidatedRequest {
            source_path,
            codec,
            buffer_size: request.buffer_size.unwrap_or(0),
        })
    }

    /// Run with a run id taken from the wall clock (Unix milliseconds).
    pub fn run(&self, request: &CompressRequest) -> ReplaceResult<CompressionState> {
        let run_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.run_with_id(request, run_id)
    }

    /// Compress the source and swap it into place. `run_id` names the
    /// temporary file; see [`temp_path_for`](Self::temp_path_for).
    pub fn run_with_id(
        &self,
        request: &CompressRequest,
        run_id: u64,
    ) -> ReplaceResult<CompressionState> {
        let span = tracing::info_span!("compress", path = request.source_path.as_deref().unwrap_or(""), run_id);
        let _guard = span.enter();

        tracing::debug!(phase = %Phase::Validating, "phase");
        let validated = self.validate(request)?;
        tracing::info!(codec = %validated.codec, "compression run starting");

        let temp_path = self.temp_path_for(&validated.source_path, run_id);
        let state = match self.compress_to_temp(&validated, &temp_path) {
            Ok(state) => state,
            Err(err) => {
                self.discard_temp(&temp_path);
                return Err(err);
            }
        };

        self.swap(&validated.source_path, &temp_path)?;

        tracing::debug!(phase = %Phase::Done, "phase");
        tracing::info!(
            original_length = state.original_length(),
            compressed_length = state.compressed_length(),
            chunk_size = state.chunk_size(),
            index_entries = state.position_index().len(),
            "compression run finished"
        );
        Ok(state)
    }

    /// `{temp_dir}{source_path}.{run_id}.dfsz_compression`
    pub fn temp_path_for(&self, source_path: &str, run_id: u64) -> String {
        let dir = self.config.temp_dir.trim_end_matches('/');
        let sep = if source_path.starts_with('/') { "" } else { "/" };
        format!("{dir}{sep}{source_path}.{run_id}.{TEMP_SUFFIX}")
    }

    /// Compressing and Finalizing: everything up to a frozen record.
    fn compress_to_temp(
        &self,
        validated: &ValidatedRequest,
        temp_path: &str,
    ) -> ReplaceResult<CompressionState> {
        tracing::debug!(phase = %Phase::Compressing, "phase");
        let path = validated.source_path.as_str();
        let source = self
            .fs
            .file_info(path)
            .map_err(ReplaceError::io(Phase::Compressing, path))?;

        let plan = plan_chunk_size(
            source.length,
            validated.buffer_size,
            self.config.default_chunk_size,
            self.config.index_capacity as u64,
        );
        if let Some(note) = plan.override_note() {
            tracing::warn!(
                requested = plan.requested,
                chunk_size = plan.chunk_size,
                reason = ?plan.source,
                "{note}"
            );
        }
        if plan.chunk_size > MAX_CHUNK_SIZE {
            return Err(ReplaceError::ChunkSizeTooLarge {
                chunk_size: plan.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }

        let codec = (self.resolve)(validated.codec);
        let mut builder = CompressionStateBuilder::new(
            path,
            validated.codec,
            plan.chunk_size,
            source.length,
            self.config.index_capacity,
        );

        let summary = self.stream_to_temp(path, temp_path, &source, plan.chunk_size, codec.as_ref(), &mut builder)?;
        builder.set_chunk_count(summary.chunk_count);
        if summary.original_length != source.length {
            tracing::warn!(
                expected = source.length,
                read = summary.original_length,
                "source length changed during compression"
            );
        }

        tracing::debug!(phase = %Phase::Finalizing, "phase");
        let written = self
            .fs
            .file_info(temp_path)
            .map_err(ReplaceError::io(Phase::Finalizing, temp_path))?;
        if written.length != summary.compressed_length {
            return Err(ReplaceError::Io {
                phase: Phase::Finalizing,
                path: temp_path.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "temporary file holds {} bytes but {} were written",
                        written.length, summary.compressed_length
                    ),
                ),
            });
        }

        Ok(builder.freeze(written.length))
    }

    /// Open both streams and run the engine. Both are closed on return.
    ///
    /// The swap renames the temporary file onto the source, so both must sit
    /// on one volume; that is checked here, before any data is compressed.
    fn stream_to_temp(
        &self,
        path: &str,
        temp_path: &str,
        source: &FileInfo,
        chunk_size: u64,
        codec: &dyn Codec,
        builder: &mut CompressionStateBuilder,
    ) -> ReplaceResult<StreamSummary> {
        let mut input = self
            .fs
            .open(path)
            .map_err(ReplaceError::io(Phase::Compressing, path))?;
        let mut output = self
            .fs
            .create(temp_path, true, source.replication, source.block_size)
            .map_err(ReplaceError::io(Phase::Compressing, temp_path))?;

        let same_volume = self
            .fs
            .same_volume(path, temp_path)
            .map_err(ReplaceError::io(Phase::Compressing, temp_path))?;
        if !same_volume {
            return Err(ReplaceError::CrossVolume {
                path: path.to_string(),
                temp_path: temp_path.to_string(),
            });
        }

        tracing::debug!(temp_path, chunk_size, codec = codec.name(), "streaming source");
        compress_stream(&mut input, &mut output, chunk_size, codec, builder.index_mut()).map_err(
            |err| match err {
                EngineError::Read(source) => ReplaceError::Io {
                    phase: Phase::Compressing,
                    path: path.to_string(),
                    source,
                },
                EngineError::Write(source) => ReplaceError::Io {
                    phase: Phase::Compressing,
                    path: temp_path.to_string(),
                    source,
                },
                EngineError::Codec(source) => ReplaceError::Codec {
                    phase: Phase::Compressing,
                    source,
                },
                EngineError::Frame(source) => ReplaceError::Frame {
                    phase: Phase::Compressing,
                    source,
                },
                EngineError::ChunkSize(chunk_size) => ReplaceError::ChunkSizeTooLarge {
                    chunk_size,
                    max: MAX_CHUNK_SIZE,
                },
            },
        )
    }

    fn swap(&self, path: &str, temp_path: &str) -> ReplaceResult<()> {
        tracing::debug!(phase = %Phase::Swapping, "phase");

        if self.config.swap_mode == SwapMode::Auto && self.fs.supports_atomic_replace() {
            if let Err(source) = self.fs.replace(temp_path, path) {
                self.discard_temp(temp_path);
                return Err(ReplaceError::Io {
                    phase: Phase::Swapping,
                    path: path.to_string(),
                    source,
                });
            }
            return Ok(());
        }

        if let Err(source) = self.fs.delete(path) {
            self.discard_temp(temp_path);
            return Err(ReplaceError::Io {
                phase: Phase::Swapping,
                path: path.to_string(),
                source,
            });
        }

        if let Err(source) = self.fs.rename(temp_path, path) {
            tracing::error!(
                path,
                temp_path,
                error = %source,
                "source deleted but rename failed; compressed data left at temp path"
            );
            return Err(ReplaceError::SwapWindow {
                path: path.to_string(),
                temp_path: temp_path.to_string(),
                source,
            });
        }
        Ok(())
    }

    /// Best-effort removal of a temporary file after a failure.
    fn discard_temp(&self, temp_path: &str) {
        match self.fs.exists(temp_path) {
            Ok(false) => {}
            Ok(true) => {
                if let Err(e) = self.fs.delete(temp_path) {
                    tracing::warn!(temp_path, error = %e, "could not remove temporary file");
                }
            }
            Err(e) => {
                tracing::warn!(temp_path, error = %e, "could not check for temporary file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use crate::fs::MemoryFs;

    struct Verbatim;

    impl Codec for Verbatim {
        fn kind(&self) -> CodecKind {
            CodecKind::Snappy
        }

        fn compress_chunk(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
            Ok(raw.to_vec())
        }

        fn decompress_chunk(&self, compressed: &[u8], _raw_len: usize) -> Result<Vec<u8>, CodecError> {
            Ok(compressed.to_vec())
        }
    }

    fn verbatim(_: CodecKind) -> Box<dyn Codec> {
        Box::new(Verbatim)
    }

    #[test]
    fn temp_path_is_derived_from_source() {
        let replacer = Replacer::new(MemoryFs::new(), ReplaceConfig::default(), verbatim);
        assert_eq!(
            replacer.temp_path_for("/data/a.log", 42),
            "/tmp/dfsz/data/a.log.42.dfsz_compression"
        );
        assert_eq!(
            replacer.temp_path_for("rel.log", 7),
            "/tmp/dfsz/rel.log.7.dfsz_compression"
        );
    }

    #[test]
    fn blank_path_is_missing() {
        let replacer = Replacer::new(MemoryFs::new(), ReplaceConfig::default(), verbatim);
        let err = replacer.validate(&CompressRequest::new("  ")).unwrap_err();
        assert!(matches!(err, ReplaceError::MissingSource));
        let err = replacer.validate(&CompressRequest::default()).unwrap_err();
        assert!(matches!(err, ReplaceError::MissingSource));
    }

    #[test]
    fn codec_is_checked_before_existence() {
        // The source is missing too, but the codec error must win: no lookup happens.
        let fs = MemoryFs::new();
        fs.fail_on(crate::fs::FsOp::Exists);
        let replacer = Replacer::new(fs, ReplaceConfig::default(), verbatim);
        let err = replacer
            .validate(&CompressRequest::new("/nope").codec("gzip2"))
            .unwrap_err();
        assert!(matches!(err, ReplaceError::UnsupportedCodec(_)));
    }

    #[test]
    fn default_codec_comes_from_config() {
        let fs = MemoryFs::new();
        fs.insert("/f", b"x".to_vec());
        let config = ReplaceConfig {
            default_codec: CodecKind::Zlib,
            ..ReplaceConfig::default()
        };
        let replacer = Replacer::new(fs, config, verbatim);
        let validated = replacer.validate(&CompressRequest::new("/f")).unwrap();
        assert_eq!(validated.codec, CodecKind::Zlib);
        assert_eq!(validated.buffer_size, 0);
    }

    #[test]
    fn empty_source_produces_empty_record() {
        let fs = MemoryFs::new();
        fs.insert("/empty", Vec::new());
        let replacer = Replacer::new(fs.clone(), ReplaceConfig::default(), verbatim);
        let state = replacer.run_with_id(&CompressRequest::new("/empty"), 1).unwrap();
        assert_eq!(state.original_length(), 0);
        assert_eq!(state.compressed_length(), 0);
        assert!(state.position_index().is_empty());
        assert_eq!(fs.read("/empty").unwrap(), Vec::<u8>::new());
        assert_eq!(fs.paths(), vec!["/empty".to_string()]);
    }
}
