use doboz::compress::{compress_into, max_compressed_size};
use doboz::decompress::decompress_into;
use doboz::dictionary::Dictionary;
use proptest::collection::vec;
use proptest::prelude::*;

fn round_trip(src: &[u8]) -> Vec<u8> {
    let mut dict = Dictionary::new();
    let mut dst = vec![0u8; max_compressed_size(src.len())];
    let written = compress_into(src, &mut dst, &mut dict).expect("compression failed");
    dst.truncate(written);

    let mut restored = vec![0u8; src.len()];
    let restored_len = decompress_into(&dst, &mut restored).expect("decompression failed");
    assert_eq!(restored_len, src.len());
    restored
}

proptest! {
    #[test]
    fn round_trips_arbitrary_bytes(src in vec(any::<u8>(), 1..4096)) {
        prop_assert_eq!(round_trip(&src), src);
    }

    #[test]
    fn round_trips_low_entropy_bytes(byte in any::<u8>(), len in 1usize..4096) {
        let src = vec![byte; len];
        prop_assert_eq!(round_trip(&src), src);
    }

    #[test]
    fn compressed_size_stays_within_its_budget(src in vec(any::<u8>(), 1..4096)) {
        let mut dict = Dictionary::new();
        let mut dst = vec![0u8; max_compressed_size(src.len())];
        let written = compress_into(&src, &mut dst, &mut dict).expect("compression failed");
        prop_assert!(written <= max_compressed_size(src.len()));
    }
}

#[test]
fn empty_input_is_rejected() {
    let mut dict = Dictionary::new();
    let mut dst = vec![0u8; max_compressed_size(0)];
    assert_eq!(compress_into(b"", &mut dst, &mut dict), Err(doboz::Error::BufferTooSmall));
}

#[test]
fn round_trips_all_zeros() {
    let src = vec![0u8; 8192];
    assert_eq!(round_trip(&src), src);
}

#[test]
fn round_trips_repeating_one_byte_pattern() {
    let src: Vec<u8> = [0xAB].iter().cycle().take(5000).copied().collect();
    assert_eq!(round_trip(&src), src);
}

#[test]
fn round_trips_repeating_two_byte_pattern() {
    let src: Vec<u8> = [0x12, 0x34].iter().cycle().take(5000).copied().collect();
    assert_eq!(round_trip(&src), src);
}

#[test]
fn round_trips_repeating_eight_byte_pattern() {
    let pattern = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let src: Vec<u8> = pattern.iter().cycle().take(5000).copied().collect();
    assert_eq!(round_trip(&src), src);
}

#[test]
fn round_trips_high_entropy_bytes() {
    // Small xorshift PRNG, deterministic across runs.
    let mut state: u32 = 0x9E37_79B9;
    let mut src = Vec::with_capacity(16 * 1024);
    for _ in 0..16 * 1024 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        src.push((state >> 16) as u8);
    }
    assert_eq!(round_trip(&src), src);
}

#[test]
fn round_trips_every_length_up_to_512() {
    let source: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    for len in 1..=512usize {
        let src = &source[..len];
        assert_eq!(round_trip(src), src);
    }
}

#[test]
fn overlap_matches_decode_correctly() {
    // `abc` followed by 200 repeats of the same byte forces matches with
    // offset < WORD_SIZE (the encoder finds `c` repeating against itself).
    let mut src = b"abc".to_vec();
    src.extend(core::iter::repeat(b'c').take(200));
    assert_eq!(round_trip(&src), src);
}

#[test]
fn single_bit_flip_in_compressed_payload_never_panics() {
    let src: Vec<u8> = b"the quick brown fox jumps over the lazy dog, repeatedly, "
        .iter()
        .cycle()
        .take(4096)
        .copied()
        .collect();

    let mut dict = Dictionary::new();
    let mut compressed = vec![0u8; max_compressed_size(src.len())];
    let written = compress_into(&src, &mut compressed, &mut dict).unwrap();
    compressed.truncate(written);

    for byte_index in 0..compressed.len() {
        for bit in 0..8u8 {
            let mut corrupted = compressed.clone();
            corrupted[byte_index] ^= 1 << bit;

            let mut dst = vec![0u8; src.len()];
            // Must either succeed (with possibly different output) or return
            // a structured error; must never read/write outside the buffers
            // it was given, which in safe Rust shows up as a panic if violated.
            let _ = decompress_into(&corrupted, &mut dst);
        }
    }
}

#[test]
fn compression_info_matches_what_decompress_reports() {
    let src: Vec<u8> = b"abcabcabcabc".iter().cycle().take(4096).copied().collect();
    let mut dict = Dictionary::new();
    let mut dst = vec![0u8; max_compressed_size(src.len())];
    let written = compress_into(&src, &mut dst, &mut dict).unwrap();
    dst.truncate(written);

    let info = doboz::decompress::compression_info(&dst).unwrap();
    assert_eq!(info.uncompressed_size, src.len() as u64);
    assert_eq!(info.compressed_size, dst.len() as u64);
    assert_eq!(info.version, doboz::VERSION);
}

#[test]
fn unsupported_version_is_rejected() {
    let src = b"some input data to compress";
    let mut dict = Dictionary::new();
    let mut dst = vec![0u8; max_compressed_size(src.len())];
    let written = compress_into(src, &mut dst, &mut dict).unwrap();
    dst[0] |= 0x01;

    let mut restored = vec![0u8; src.len()];
    assert_eq!(decompress_into(&dst[..written], &mut restored), Err(doboz::Error::UnsupportedVersion));
}
