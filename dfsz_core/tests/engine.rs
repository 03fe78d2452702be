/// Integration tests for the chunked compression engine: every codec round
/// trips, and every position-index entry is an independent decode start point.
use dfsz_codecs::codec_for;
use dfsz_core::{
    compress_stream, decompress_all, decompress_stream, CodecKind, EngineError, PositionIndex,
    FRAME_HEADER_SIZE,
};
use proptest::prelude::*;

/// Generate `len` deterministic bytes using a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

/// Generate `len` highly compressible bytes (repeating pattern).
fn compressible_bytes(len: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

// ── helpers ───────────────────────────────────────────────────────────────

fn compress(data: &[u8], chunk_size: u64, kind: CodecKind, capacity: usize) -> (Vec<u8>, PositionIndex) {
    let codec = codec_for(kind);
    let mut out = Vec::new();
    let mut index = PositionIndex::with_capacity(capacity);
    let summary = compress_stream(&mut &data[..], &mut out, chunk_size, codec.as_ref(), &mut index).unwrap();
    assert_eq!(summary.original_length, data.len() as u64);
    assert_eq!(summary.compressed_length, out.len() as u64);
    (out, index)
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_every_codec() {
    let data = compressible_bytes(5 * 4096 + 1234);
    for kind in CodecKind::ALL {
        let (compressed, index) = compress(&data, 4096, kind, 5000);
        assert_eq!(index.len(), 6, "{kind}: 5 full chunks + 1 partial");
        assert!(
            compressed.len() < data.len(),
            "{kind} should compress compressible data"
        );

        let codec = codec_for(kind);
        let restored = decompress_all(&compressed, codec.as_ref()).unwrap();
        assert_eq!(restored, data, "{kind} round trip should be byte-exact");
    }
}

#[test]
fn test_roundtrip_incompressible() {
    let data = pseudo_random_bytes(3 * 8192 + 17, 0xDEAD_BEEF);
    for kind in CodecKind::ALL {
        let (compressed, _) = compress(&data, 8192, kind, 5000);
        let codec = codec_for(kind);
        assert_eq!(decompress_all(&compressed, codec.as_ref()).unwrap(), data, "{kind}");
    }
}

/// Decoding from any recorded compressed offset reproduces the original
/// stream from the paired original offset onward, without touching earlier
/// frames.
#[test]
fn test_every_index_entry_is_a_decode_start() {
    let data = pseudo_random_bytes(16 * 1024, 0x1234_5678)
        .into_iter()
        .zip(compressible_bytes(16 * 1024))
        .map(|(a, b)| if a < 64 { a } else { b })
        .collect::<Vec<u8>>();

    for kind in CodecKind::ALL {
        let (compressed, index) = compress(&data, 1000, kind, 5000);
        let codec = codec_for(kind);
        assert_eq!(index.entries()[0].original_offset, 0);
        assert_eq!(index.entries()[0].compressed_offset, 0);

        for entry in index.entries() {
            let tail = &compressed[entry.compressed_offset as usize..];
            let restored = decompress_all(tail, codec.as_ref()).unwrap();
            assert_eq!(
                restored.as_slice(),
                &data[entry.original_offset as usize..],
                "{kind}: entry {entry:?}"
            );
        }
    }
}

#[test]
fn test_index_is_strictly_increasing() {
    let data = compressible_bytes(50_000);
    let (_, index) = compress(&data, 777, CodecKind::Snappy, 5000);
    for pair in index.entries().windows(2) {
        assert!(pair[1].original_offset > pair[0].original_offset);
        assert!(pair[1].compressed_offset > pair[0].compressed_offset);
        assert_eq!(pair[1].original_offset - pair[0].original_offset, 777);
    }
}

#[test]
fn test_index_never_exceeds_capacity() {
    // Chunk size far too small for the capacity: the index truncates, the
    // stream stays complete.
    let data = compressible_bytes(10_000);
    let (compressed, index) = compress(&data, 10, CodecKind::Lz4, 50);
    assert_eq!(index.len(), 50);
    assert!(index.is_truncated());

    let codec = codec_for(CodecKind::Lz4);
    assert_eq!(decompress_all(&compressed, codec.as_ref()).unwrap(), data);
}

#[test]
fn test_single_partial_chunk() {
    let data = b"a small payload that fits in one partial chunk";
    let (compressed, index) = compress(data, 1024 * 1024, CodecKind::Zstd, 5000);
    assert_eq!(index.len(), 1);
    let codec = codec_for(CodecKind::Zstd);
    assert_eq!(decompress_all(&compressed, codec.as_ref()).unwrap(), data);
}

#[test]
fn test_corrupt_payload_is_detected() {
    let data = compressible_bytes(4096);
    let (mut compressed, _) = compress(&data, 1024, CodecKind::Zlib, 5000);
    let last = compressed.len() - 1;
    compressed[last] ^= 0x55;

    let codec = codec_for(CodecKind::Zlib);
    let err = decompress_all(&compressed, codec.as_ref()).unwrap_err();
    assert!(matches!(err, EngineError::Frame(_)), "got {err:?}");
}

#[test]
fn test_truncated_stream_is_an_error() {
    let data = compressible_bytes(4096);
    let (compressed, _) = compress(&data, 1024, CodecKind::Snappy, 5000);
    let codec = codec_for(CodecKind::Snappy);

    // Cut inside a header.
    let cut = &compressed[..FRAME_HEADER_SIZE / 2];
    assert!(matches!(
        decompress_all(cut, codec.as_ref()),
        Err(EngineError::Read(_))
    ));

    // Cut inside a payload.
    let cut = &compressed[..compressed.len() - 1];
    assert!(matches!(
        decompress_all(cut, codec.as_ref()),
        Err(EngineError::Read(_))
    ));
}

#[test]
fn test_decompress_stream_reports_totals() {
    let data = compressible_bytes(10_000);
    let (compressed, _) = compress(&data, 3000, CodecKind::Bzip2, 5000);
    let codec = codec_for(CodecKind::Bzip2);
    let mut out = Vec::new();
    let summary = decompress_stream(&mut compressed.as_slice(), &mut out, codec.as_ref()).unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.raw_length, 10_000);
    assert_eq!(out, data);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn roundtrip_any_input(
        data in proptest::collection::vec(any::<u8>(), 0..=20_000),
        chunk_size in 1u64..=4096,
        codec_idx in 0usize..5,
    ) {
        let kind = CodecKind::ALL[codec_idx];
        let (compressed, index) = compress(&data, chunk_size, kind, 5000);
        let codec = codec_for(kind);
        prop_assert_eq!(decompress_all(&compressed, codec.as_ref()).unwrap(), data.clone());
        prop_assert!(index.len() <= 5000);
        prop_assert_eq!(index.is_empty(), data.is_empty());
    }
}
