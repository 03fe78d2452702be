pub mod codec;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod frame;
pub mod fs;
pub mod index;
pub mod policy;
pub mod replace;
pub mod state;

pub use codec::{Codec, CodecError, CodecKind, UnsupportedCodec, SUPPORTED_CODECS};
pub use config::{ReplaceConfig, SwapMode};
pub use decoder::{decompress_all, decompress_stream, DecodeSummary};
pub use engine::{compress_stream, EngineError, StreamSummary};
pub use error::{Phase, ReplaceError, ReplaceResult};
pub use frame::{FrameHeader, FRAME_HEADER_SIZE};
pub use fs::{FileInfo, FileSystem, LocalFs, MemoryFs};
pub use index::{IndexEntry, PositionIndex, INDEX_CAPACITY};
pub use policy::{compute_chunk_size, plan_chunk_size, ChunkPlan, ChunkSizeSource, DEFAULT_CHUNK_SIZE};
pub use replace::{CompressRequest, Replacer, ValidatedRequest};
pub use state::{CompressionState, CompressionStateBuilder};
