//! # Decompression routines
//!
//! Available with feature `decompress`. Parses the container header, then —
//! unless the stream is stored verbatim — walks 31-bit-wide control words,
//! emitting literal bytes in runs of up to 4 and matches via an
//! overlap-aware, word-sized copy loop.
//!
//! # Examples
//!
//! ```
//! use doboz::compress::compress;
//! use doboz::decompress::decompress_into;
//!
//! # #[cfg(feature = "alloc")] {
//! let compressed = compress(b"hello hello hello")?;
//! let mut dst = [0u8; 18];
//! let written = decompress_into(&compressed, &mut dst)?;
//! assert_eq!(&dst[..written], b"hello hello hello");
//! # }
//! # Ok::<(), doboz::Error>(())
//! ```

use crate::common::{decode_header, fast_read, fast_write, CompressionInfo, Error, Match, TAIL_LENGTH, VERSION, WORD_SIZE};

/// Maps the low 4 bits of a control word to how many consecutive literals
/// were just written by the 4-byte fast-write in the literal run path.
const LITERAL_RUN_LENGTH: [u8; 16] = [4, 0, 1, 0, 2, 0, 1, 0, 3, 0, 1, 0, 2, 0, 1, 0];

/// One row of the match-decoding lookup table, keyed by the low 3 bits of
/// the encoded match word. Rows 4-6 (tags `100`/`101`/`110`) alias rows
/// 0-2 — the encoder never emits those tags, but any 3-bit pattern is a
/// valid decode-time index.
struct MatchLut {
    mask: u32,
    offset_shift: u32,
    length_mask: u32,
    length_shift: u32,
    size: usize,
}

const MATCH_LUT: [MatchLut; 8] = [
    MatchLut { mask: 0xff, offset_shift: 2, length_mask: 0, length_shift: 0, size: 1 }, // 000
    MatchLut { mask: 0xffff, offset_shift: 2, length_mask: 0, length_shift: 0, size: 2 }, // 001
    MatchLut { mask: 0xffff, offset_shift: 6, length_mask: 15, length_shift: 2, size: 2 }, // 010
    MatchLut { mask: 0xffffff, offset_shift: 8, length_mask: 31, length_shift: 3, size: 3 }, // 011
    MatchLut { mask: 0xff, offset_shift: 2, length_mask: 0, length_shift: 0, size: 1 },  // 100 = 000
    MatchLut { mask: 0xffff, offset_shift: 2, length_mask: 0, length_shift: 0, size: 2 }, // 101 = 001
    MatchLut { mask: 0xffff, offset_shift: 6, length_mask: 15, length_shift: 2, size: 2 }, // 110 = 010
    MatchLut { mask: 0xffff_ffff, offset_shift: 11, length_mask: 255, length_shift: 3, size: 4 }, // 111
];

/// Decode the match word at `payload[pos..]`, returning the match and its
/// encoded size in bytes.
fn decode_match(payload: &[u8], pos: usize) -> (Match, usize) {
    let word = fast_read(payload, pos, WORD_SIZE);
    let row = &MATCH_LUT[(word & 7) as usize];
    let offset = (word & row.mask) >> row.offset_shift;
    let length = ((word >> row.length_shift) & row.length_mask) + crate::common::MIN_MATCH_LENGTH as u32;
    (Match { offset, length }, row.size)
}

/// Decompress `src` into `dst`, returning the number of bytes written.
/// `dst` must be at least as large as the declared uncompressed size.
pub fn decompress_into(src: &[u8], dst: &mut [u8]) -> Result<usize, Error> {
    let (header, header_len) = decode_header(src)?;

    if header.version != VERSION {
        return Err(Error::UnsupportedVersion);
    }

    if (src.len() as u64) < header.compressed_size || (dst.len() as u64) < header.uncompressed_size {
        return Err(Error::BufferTooSmall);
    }

    if header.compressed_size < header_len as u64 {
        return Err(Error::CorruptedData);
    }

    let uncompressed_size = header.uncompressed_size as usize;
    let payload_end = header.compressed_size as usize;
    let payload = &src[header_len..payload_end];

    if header.is_stored {
        dst[..uncompressed_size].copy_from_slice(&payload[..uncompressed_size]);
        return Ok(uncompressed_size);
    }

    decode_tokens(payload, &mut dst[..uncompressed_size])?;
    Ok(uncompressed_size)
}

/// Parse just the header and report the stream's declared sizes and version,
/// without decompressing the payload.
pub fn compression_info(src: &[u8]) -> Result<CompressionInfo, Error> {
    let (header, _) = decode_header(src)?;
    Ok(CompressionInfo {
        uncompressed_size: header.uncompressed_size,
        compressed_size: header.compressed_size,
        version: header.version,
    })
}

fn decode_tokens(payload: &[u8], dst: &mut [u8]) -> Result<(), Error> {
    let uncompressed_size = dst.len();
    let in_end = payload.len();
    // Fast writes during the literal-run and match-copy paths may overshoot
    // by up to a word; stop using them this close to the end.
    let out_tail = uncompressed_size.saturating_sub(TAIL_LENGTH);

    let mut in_pos = 0usize;
    let mut out_pos = 0usize;
    // `1` can never appear as a real control word (its guard bit would have
    // to be bit 0), so it doubles as the "must reload" sentinel.
    let mut control_word: u32 = 1;

    loop {
        if in_pos + 2 * WORD_SIZE > in_end {
            return Err(Error::CorruptedData);
        }

        if control_word == 1 {
            control_word = fast_read(payload, in_pos, WORD_SIZE);
            in_pos += WORD_SIZE;
        }

        if control_word & 1 == 0 {
            if out_pos < out_tail {
                let word = fast_read(payload, in_pos, 4);
                fast_write(dst, out_pos, word, 4);

                let run_length = LITERAL_RUN_LENGTH[(control_word & 0xf) as usize] as usize;
                in_pos += run_length;
                out_pos += run_length;
                control_word >>= run_length;
            } else {
                // Too close to the end for 4-wide fast writes; finish one
                // byte at a time.
                while out_pos < uncompressed_size {
                    if in_pos + WORD_SIZE + 1 > in_end {
                        return Err(Error::CorruptedData);
                    }
                    if control_word == 1 {
                        control_word = fast_read(payload, in_pos, WORD_SIZE);
                        in_pos += WORD_SIZE;
                    }
                    dst[out_pos] = payload[in_pos];
                    out_pos += 1;
                    in_pos += 1;
                    control_word >>= 1;
                }
                return Ok(());
            }
        } else {
            let (m, size) = decode_match(payload, in_pos);
            in_pos += size;

            let offset = m.offset as usize;
            let length = m.length as usize;
            if offset > out_pos || out_pos + length > out_tail {
                return Err(Error::CorruptedData);
            }

            let mut i = 0usize;
            let mut match_base = out_pos - offset;

            if offset < WORD_SIZE {
                // The source and destination regions may overlap; copy the
                // first three bytes one at a time, then widen the gap
                // between them so the word-sized loop below never reads
                // bytes this same call hasn't written yet.
                while i < 3 {
                    dst[out_pos + i] = dst[match_base + i];
                    i += 1;
                }
                match_base = match_base + 1 - (offset & 1);
            }

            while i < length {
                let word = fast_read(dst, match_base + i, WORD_SIZE);
                fast_write(dst, out_pos + i, word, WORD_SIZE);
                i += WORD_SIZE;
            }

            out_pos += length;
            control_word >>= 1;
        }
    }
}
