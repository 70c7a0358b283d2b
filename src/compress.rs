//! # Compression routines
//!
//! Available with feature `compress`. A lazy-match encoder walks the input
//! with a [`Dictionary`], choosing at each position between a literal byte
//! and the longest match that is cheaper to code than the literals it
//! replaces, then packs the resulting literal/match flags into 31-bit-wide
//! control words.
//!
//! [`compress`] and [`compress_with_dict`] are available when the `alloc`
//! feature is enabled.
//!
//! # Examples
//!
//! Compressing a buffer into a heap-allocated vector:
//! ```
//! use doboz::compress::compress;
//!
//! # #[cfg(feature = "alloc")] {
//! let dst = compress(b"hello hello hello")?;
//! assert!(dst.len() <= doboz::compress::max_compressed_size(18));
//! # }
//! # Ok::<(), doboz::Error>(())
//! ```
//!
//! `#![no_std]`-compatible compression with caller-owned storage:
//! ```
//! use doboz::compress::{compress_into, max_compressed_size};
//! use doboz::dictionary::Dictionary;
//!
//! let input = b"hello hello hello";
//! let mut dst = vec![0u8; max_compressed_size(input.len())];
//! let mut dictionary = Dictionary::new();
//! let size = compress_into(input, &mut dst, &mut dictionary)?;
//! # let _ = size;
//! # Ok::<(), doboz::Error>(())
//! ```

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

#[cfg(all(feature = "alloc", not(feature = "std")))]
use alloc::{vec, vec::Vec};
#[cfg(all(feature = "alloc", feature = "std"))]
use std::vec::Vec;

use crate::common::{
    encode_header, fast_write, header_size, max_compressed_size as resolved_max_compressed_size, Error, Header,
    Match, MAX_MATCH_CANDIDATE_COUNT, MIN_MATCH_LENGTH, TRAILING_DUMMY_SIZE, VERSION, WORD_SIZE,
};
use crate::dictionary::Dictionary;

/// Number of flag bits packed into one control word; the remaining top bit
/// is the "another word follows" guard bit.
const CONTROL_WORD_BIT_COUNT: usize = WORD_SIZE * 8 - 1;
const CONTROL_WORD_GUARD_BIT: u32 = 1 << (WORD_SIZE * 8 - 1);

/// Worst-case size of the compressed stream for `uncompressed_size` input
/// bytes. `dst` passed to [`compress_into`] must be at least this large.
pub fn max_compressed_size(uncompressed_size: usize) -> usize { resolved_max_compressed_size(uncompressed_size) }

/// Compress `src` into `dst`, using `dictionary` as scratch space for the
/// match finder. `dst` must be at least
/// [`max_compressed_size(src.len())`](max_compressed_size) bytes long.
/// Returns the number of bytes written at the front of `dst`.
pub fn compress_into(src: &[u8], dst: &mut [u8], dictionary: &mut Dictionary) -> Result<usize, Error> {
    if src.is_empty() {
        return Err(Error::BufferTooSmall);
    }

    let max_size = max_compressed_size(src.len());
    if dst.len() < max_size {
        return Err(Error::BufferTooSmall);
    }

    match encode_compressed(src, dst, max_size, dictionary) {
        Some(written) => Ok(written),
        None => encode_stored(src, dst, max_size),
    }
}

/// Runs the lazy-match encoder, returning `None` if the compressed stream
/// would overflow `max_size` so the caller can fall back to
/// [`encode_stored`].
fn encode_compressed(src: &[u8], dst: &mut [u8], max_size: usize, dictionary: &mut Dictionary) -> Option<usize> {
    let mut pos = header_size(max_size as u64);

    dictionary.reset(src.len());

    let mut control_word: u32 = CONTROL_WORD_GUARD_BIT;
    let mut control_word_bit = 0usize;
    let mut control_word_pos = pos;
    pos += WORD_SIZE;

    let mut candidates = [Match::NONE; MAX_MATCH_CANDIDATE_COUNT];

    // The match finder's look-ahead is one character; prime it before the
    // main loop starts. There is nothing behind position 0 to match yet, so
    // `next_match` starts empty.
    dictionary.skip(src);
    let mut next_match = Match::NONE;

    while dictionary.position() - 1 < src.len() {
        // Up to two words may be written this iteration, plus the trailing
        // dummy bytes at the very end.
        if pos + 2 * WORD_SIZE + TRAILING_DUMMY_SIZE > max_size {
            return None;
        }

        if control_word_bit == CONTROL_WORD_BIT_COUNT {
            fast_write(dst, control_word_pos, control_word, WORD_SIZE);
            control_word = CONTROL_WORD_GUARD_BIT;
            control_word_bit = 0;
            control_word_pos = pos;
            pos += WORD_SIZE;
        }

        let mut current_match = next_match;

        let count = dictionary.find_matches(src, &mut candidates);
        next_match = best_match(&candidates[..count]);

        // Lazy evaluation: coding a literal now and the (typically longer)
        // match starting one byte later can pack tighter than committing to
        // the current match immediately.
        if current_match.is_some()
            && (1 + next_match.length as usize) * encoded_size(current_match)
                > current_match.length as usize * (1 + encoded_size(next_match))
        {
            current_match = Match::NONE;
        }

        if !current_match.is_some() {
            // The literal flag (0) differs from the control word's guard bit
            // (1), so runs of literals decode without extra bookkeeping.
            dst[pos] = src[dictionary.position() - 2];
            pos += 1;
        } else {
            control_word |= 1 << control_word_bit;
            pos += encode_match(dst, pos, current_match);

            for _ in 0..current_match.length - 2 {
                dictionary.skip(src);
            }

            let count = dictionary.find_matches(src, &mut candidates);
            next_match = best_match(&candidates[..count]);
        }

        control_word_bit += 1;
    }

    fast_write(dst, control_word_pos, control_word, WORD_SIZE);
    fast_write(dst, pos, 0, TRAILING_DUMMY_SIZE);
    pos += TRAILING_DUMMY_SIZE;

    let header =
        Header { uncompressed_size: src.len() as u64, compressed_size: pos as u64, version: VERSION, is_stored: false };
    encode_header(&header, max_size as u64, dst).ok()?;

    Some(pos)
}

/// Writes the header followed by a verbatim copy of `src`, for inputs the
/// compressed encoding can't beat (or can't fit in the worst-case budget).
fn encode_stored(src: &[u8], dst: &mut [u8], max_size: usize) -> Result<usize, Error> {
    let head = header_size(max_size as u64);
    let compressed_size = (head + src.len()) as u64;

    let header = Header { uncompressed_size: src.len() as u64, compressed_size, version: VERSION, is_stored: true };
    encode_header(&header, max_size as u64, dst)?;

    dst[head..head + src.len()].copy_from_slice(src);

    Ok(compressed_size as usize)
}

/// Packs `m` into its wire word, returning `(word, size_in_bytes)`. Which of
/// the 5 encodings is chosen depends on how large `m.length` and `m.offset`
/// are; each encoding's low 2-3 bits are its tag.
fn pack_match(m: Match) -> (u32, usize) {
    let length_code = m.length - MIN_MATCH_LENGTH as u32;
    let offset = m.offset;

    if length_code == 0 && offset < 64 {
        (offset << 2, 1) // tag 00
    } else if length_code == 0 && offset < 16384 {
        ((offset << 2) | 1, 2) // tag 001
    } else if length_code < 16 && offset < 1024 {
        ((offset << 6) | (length_code << 2) | 2, 2) // tag 010
    } else if length_code < 32 && offset < 65536 {
        ((offset << 8) | (length_code << 3) | 3, 3) // tag 011
    } else {
        ((offset << 11) | (length_code << 3) | 7, 4) // tag 111
    }
}

/// Number of bytes `m` would take up encoded, or 0 for [`Match::NONE`].
fn encoded_size(m: Match) -> usize {
    if !m.is_some() {
        return 0;
    }
    pack_match(m).1
}

fn encode_match(dst: &mut [u8], pos: usize, m: Match) -> usize {
    let (word, size) = pack_match(m);
    fast_write(dst, pos, word, size);
    size
}

/// The longest candidate whose match token is cheaper than the literal run
/// it would replace, or [`Match::NONE`] if none clears that bar.
/// `candidates` is ascending by length, so the best one (if any) is found by
/// scanning from the end.
fn best_match(candidates: &[Match]) -> Match {
    for &m in candidates.iter().rev() {
        if m.length as usize > encoded_size(m) {
            return m;
        }
    }
    Match::NONE
}

/// Allocate a heap-backed dictionary and compress `src`, returning an
/// exactly sized `Vec`.
#[cfg(feature = "alloc")]
pub fn compress(src: &[u8]) -> Result<Vec<u8>, Error> {
    let mut dictionary = Dictionary::new();
    compress_with_dict(src, &mut dictionary)
}

/// Compress `src` with a caller-supplied (and reusable across calls)
/// dictionary, returning an exactly sized `Vec`.
#[cfg(feature = "alloc")]
pub fn compress_with_dict(src: &[u8], dictionary: &mut Dictionary) -> Result<Vec<u8>, Error> {
    let mut dst = zeroed_vec(max_compressed_size(src.len()));
    let written = compress_into(src, &mut dst, dictionary)?;
    dst.truncate(written);
    Ok(dst)
}

#[cfg(feature = "alloc")]
fn zeroed_vec(len: usize) -> Vec<u8> {
    let mut v = Vec::with_capacity(len);
    v.resize(len, 0);
    v
}
