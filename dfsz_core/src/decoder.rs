use std::io::{self, Read, Write};

use crate::codec::Codec;
use crate::engine::{read_full, EngineError};
use crate::frame::{FrameHeader, FRAME_HEADER_SIZE};

/// Totals from one pass of [`decompress_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeSummary {
    pub frames: u64,
    pub raw_length: u64,
}

/// Decode frames from the current position of `input` until it ends.
///
/// `input` may start at any frame boundary: the beginning of the stream, or
/// any `compressed_offset` taken from a position index. Each payload is
/// checksummed and its decoded length checked against the header before it
/// is written to `output`.
pub fn decompress_stream<R, W>(
    input: &mut R,
    output: &mut W,
    codec: &dyn Codec,
) -> Result<DecodeSummary, EngineError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut summary = DecodeSummary::default();
    let mut header_buf = [0u8; FRAME_HEADER_SIZE];

    loop {
        match read_full(input, &mut header_buf).map_err(EngineError::Read)? {
            0 => break,
            FRAME_HEADER_SIZE => {}
            n => {
                return Err(truncated(format!(
                    "truncated frame header: {n} of {FRAME_HEADER_SIZE} bytes"
                )))
            }
        }
        let header = FrameHeader::from_bytes(&header_buf);

        // The length field is not covered by the checksum; grow the buffer
        // only as far as the stream actually goes.
        let expected = header.compressed_len as u64;
        let mut payload = Vec::new();
        let got = Read::take(&mut *input, expected)
            .read_to_end(&mut payload)
            .map_err(EngineError::Read)? as u64;
        if got < expected {
            return Err(truncated(format!(
                "truncated frame payload: {got} of {expected} bytes"
            )));
        }
        header.verify(&payload)?;

        let raw = codec.decompress_chunk(&payload, header.raw_len as usize)?;
        header.verify_raw_len(&raw)?;
        output.write_all(&raw).map_err(EngineError::Write)?;

        summary.frames += 1;
        summary.raw_length += raw.len() as u64;
    }

    output.flush().map_err(EngineError::Write)?;
    Ok(summary)
}

fn truncated(msg: String) -> EngineError {
    EngineError::Read(io::Error::new(io::ErrorKind::UnexpectedEof, msg))
}

/// Decode a whole in-memory compressed stream.
pub fn decompress_all(compressed: &[u8], codec: &dyn Codec) -> Result<Vec<u8>, EngineError> {
    let mut out = Vec::with_capacity(compressed.len() * 2);
    decompress_stream(&mut &compressed[..], &mut out, codec)?;
    Ok(out)
}
