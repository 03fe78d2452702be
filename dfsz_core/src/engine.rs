use std::io::{self, Read, Write};

use thiserror::Error;

use crate::codec::{Codec, CodecError};
use crate::frame::{FrameError, FrameHeader, MAX_CHUNK_SIZE};
use crate::index::PositionIndex;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Reading the input stream failed.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing the output stream failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("chunk size {0} is outside the supported range 1..={}", MAX_CHUNK_SIZE)]
    ChunkSize(u64),
}

/// Byte counts from one pass of [`compress_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    pub original_length: u64,
    pub compressed_length: u64,
    pub chunk_count: u64,
}

/// Compress `input` into `output` one independent frame per chunk.
///
/// # Protocol
/// For each chunk of up to `chunk_size` bytes:
/// 1. note the original offset before the read,
/// 2. compress the chunk with `codec`,
/// 3. note the compressed offset before the write and record the pair in `index`,
/// 4. write the frame header and payload.
///
/// Chunks are exactly `chunk_size` bytes except the last. Reads and writes are
/// forward-only. Any read, write or codec failure aborts the pass; nothing is
/// retried here because a half-written stream cannot be resumed.
pub fn compress_stream<R, W>(
    input: &mut R,
    output: &mut W,
    chunk_size: u64,
    codec: &dyn Codec,
    index: &mut PositionIndex,
) -> Result<StreamSummary, EngineError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(EngineError::ChunkSize(chunk_size));
    }
    let chunk_len = usize::try_from(chunk_size).map_err(|_| EngineError::ChunkSize(chunk_size))?;

    let mut buf = vec![0u8; chunk_len];
    let mut summary = StreamSummary::default();

    loop {
        let n = read_full(input, &mut buf).map_err(EngineError::Read)?;
        if n == 0 {
            break;
        }

        let raw = &buf[..n];
        let payload = codec.compress_chunk(raw)?;
        let header = FrameHeader::for_payload(n, &payload)?;

        index.record(summary.original_length, summary.compressed_length);
        output
            .write_all(&header.to_bytes())
            .map_err(EngineError::Write)?;
        output.write_all(&payload).map_err(EngineError::Write)?;

        summary.original_length += n as u64;
        summary.compressed_length += header.frame_len();
        summary.chunk_count += 1;

        tracing::trace!(
            chunk = summary.chunk_count,
            raw_len = n,
            compressed_len = payload.len(),
            "chunk written"
        );

        // A short read means the source is exhausted.
        if n < chunk_len {
            break;
        }
    }

    output.flush().map_err(EngineError::Write)?;
    Ok(summary)
}

/// Read until `buf` is full or the stream ends. Returns the bytes read.
///
/// `Read::read` may legally return fewer bytes than asked for mid-stream, so a
/// single call is not enough to keep chunk boundaries at exact multiples.
pub(crate) fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecKind;
    use crate::frame::FRAME_HEADER_SIZE;

    /// Stores chunks verbatim so offsets are easy to predict.
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

    /// Hands out at most 3 bytes per `read` call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(3).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn offsets_track_frames() {
        let data = vec![7u8; 250];
        let mut out = Vec::new();
        let mut index = PositionIndex::new();
        let summary = compress_stream(&mut data.as_slice(), &mut out, 100, &Verbatim, &mut index).unwrap();

        assert_eq!(summary.chunk_count, 3);
        assert_eq!(summary.original_length, 250);
        assert_eq!(summary.compressed_length, out.len() as u64);
        assert_eq!(out.len(), 250 + 3 * FRAME_HEADER_SIZE);

        let pairs: Vec<(u64, u64)> = index
            .entries()
            .iter()
            .map(|e| (e.original_offset, e.compressed_offset))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (100, 116), (200, 232)]);
    }

    #[test]
    fn short_reads_do_not_shift_boundaries() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut out = Vec::new();
        let mut index = PositionIndex::new();
        let summary = compress_stream(&mut Trickle(&data), &mut out, 64, &Verbatim, &mut index).unwrap();

        assert_eq!(summary.chunk_count, 16); // 15 full + 1 partial
        for (i, entry) in index.entries().iter().enumerate() {
            assert_eq!(entry.original_offset, i as u64 * 64);
        }
    }

    #[test]
    fn empty_input_writes_nothing() {
        let mut out = Vec::new();
        let mut index = PositionIndex::new();
        let summary = compress_stream(&mut io::empty(), &mut out, 1024, &Verbatim, &mut index).unwrap();
        assert_eq!(summary, StreamSummary::default());
        assert!(out.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let data = vec![1u8; 300];
        let mut out = Vec::new();
        let mut index = PositionIndex::new();
        let summary = compress_stream(&mut data.as_slice(), &mut out, 100, &Verbatim, &mut index).unwrap();
        assert_eq!(summary.chunk_count, 3);
        assert_eq!(index.len(), 3);
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk gone"))
        }
    }

    impl Write for Failing {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn read_and_write_failures_are_told_apart() {
        let mut index = PositionIndex::new();
        let mut sink: Vec<u8> = Vec::new();
        let err = compress_stream(&mut Failing, &mut sink, 16, &Verbatim, &mut index).unwrap_err();
        assert!(matches!(err, EngineError::Read(_)), "got {err:?}");

        let data = [5u8; 40];
        let err = compress_stream(&mut data.as_slice(), &mut Failing, 16, &Verbatim, &mut index).unwrap_err();
        assert!(matches!(err, EngineError::Write(_)), "got {err:?}");
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut out = Vec::new();
        let mut index = PositionIndex::new();
        let err = compress_stream(&mut io::empty(), &mut out, 0, &Verbatim, &mut index).unwrap_err();
        assert!(matches!(err, EngineError::ChunkSize(0)));
    }
}
