//! Cyclic binary-search-tree match finder.
//!
//! For each position in the input, [`Dictionary::find_matches`] returns an
//! ascending-length list of prior occurrences of the bytes starting there,
//! by walking (and simultaneously rebuilding) a binary search tree keyed
//! lexicographically by the strings starting at each buffered position.
//! [`Dictionary::skip`] performs the same insertion without recording
//! candidates, for positions the encoder has already committed to a match.

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

#[cfg(all(feature = "alloc", not(feature = "std")))]
use alloc::boxed::Box;
#[cfg(all(feature = "alloc", feature = "std"))]
use std::boxed::Box;

use core::cmp;

use crate::common::{Match, DICTIONARY_SIZE, MAX_MATCH_CANDIDATE_COUNT, MAX_MATCH_LENGTH, MIN_MATCH_LENGTH, TAIL_LENGTH};

#[cfg(feature = "alloc")]
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

const HASH_TABLE_SIZE: usize = 1 << 20;
const CHILD_COUNT: usize = DICTIONARY_SIZE * 2;
const INVALID_POSITION: i32 = -1;

/// `(i32::MAX - DICTIONARY_SIZE + 1) / DICTIONARY_SIZE * DICTIONARY_SIZE`,
/// the largest relative position reachable before stored positions would
/// stop fitting in a signed 32-bit integer.
const REBASE_THRESHOLD: i64 =
    (((i32::MAX as i64) - (DICTIONARY_SIZE as i64) + 1) / (DICTIONARY_SIZE as i64)) * (DICTIONARY_SIZE as i64);

/// Owns the hash table and binary-tree child pointers that index a single
/// input buffer during one compression call. Large (~20 MiB): construct it
/// once with [`Dictionary::new`] (heap) or [`Dictionary::new_const`] (static
/// storage for `no_std` callers without an allocator) and reuse it across
/// calls via [`Dictionary::reset`].
#[cfg_attr(feature = "alloc", derive(FromBytes, IntoBytes, KnownLayout, Immutable))]
pub struct Dictionary {
    hash_table: [i32; HASH_TABLE_SIZE],
    children: [i32; CHILD_COUNT],
    base_offset: usize,
    absolute_position: usize,
    matchable_buffer_length: usize,
    buffer_length: usize,
}

impl Dictionary {
    /// Allocate a zeroed dictionary on the heap. Call [`Dictionary::reset`]
    /// before using it; the hash table only becomes valid (filled with the
    /// "no match" sentinel) after a reset.
    #[cfg(feature = "alloc")]
    pub fn new() -> Box<Self> { Self::new_box_zeroed().expect("dictionary allocation failed") }

    /// A const, all-zero dictionary suitable for placing in a `static` when
    /// no allocator is available. As with [`Dictionary::new`], call
    /// [`Dictionary::reset`] before use.
    pub const fn new_const() -> Self {
        Dictionary {
            hash_table: [0; HASH_TABLE_SIZE],
            children: [0; CHILD_COUNT],
            base_offset: 0,
            absolute_position: 0,
            matchable_buffer_length: 0,
            buffer_length: 0,
        }
    }

    /// Forget any previous buffer and prepare to index a new one of length
    /// `input_len`, starting at absolute position 0.
    pub(crate) fn reset(&mut self, input_len: usize) {
        self.base_offset = 0;
        self.absolute_position = 0;
        self.buffer_length = input_len;
        self.matchable_buffer_length = input_len.saturating_sub(TAIL_LENGTH + MIN_MATCH_LENGTH);
        self.hash_table.fill(INVALID_POSITION);
    }

    /// Absolute position the next call to `find_matches`/`skip` will examine.
    pub(crate) fn position(&self) -> usize { self.absolute_position }

    /// Report match candidates at the current position (ascending by
    /// length) and advance to the next position.
    pub(crate) fn find_matches(&mut self, buf: &[u8], out: &mut [Match; MAX_MATCH_CANDIDATE_COUNT]) -> usize {
        self.advance(buf, Some(out))
    }

    /// Advance past the current position, inserting it into the tree
    /// without reporting any candidates.
    pub(crate) fn skip(&mut self, buf: &[u8]) { self.advance(buf, None); }

    #[inline]
    fn abs_index(&self, relative_position: i32) -> usize { self.base_offset + relative_position as usize }

    fn advance(&mut self, buf: &[u8], mut out: Option<&mut [Match; MAX_MATCH_CANDIDATE_COUNT]>) -> usize {
        if self.absolute_position >= self.matchable_buffer_length {
            self.absolute_position += 1;
            return 0;
        }

        let max_match_length =
            cmp::min(self.buffer_length - TAIL_LENGTH - self.absolute_position, MAX_MATCH_LENGTH) as i32;

        let position = self.compute_relative_position();
        let min_match_position =
            if position < DICTIONARY_SIZE as i32 { 0 } else { position - DICTIONARY_SIZE as i32 + 1 };

        let hash_value = (hash3(buf, self.abs_index(position)) as usize) % HASH_TABLE_SIZE;

        let mut match_position = self.hash_table[hash_value];
        self.hash_table[hash_value] = position;

        let cyclic_input_position = (position as usize) % DICTIONARY_SIZE;
        let mut left_subtree_leaf = cyclic_input_position * 2;
        let mut right_subtree_leaf = cyclic_input_position * 2 + 1;

        let mut low_match_length = 0i32;
        let mut high_match_length = 0i32;
        let mut longest_match_length = 0i32;
        let mut match_count = 0usize;
        let mut candidate_count = 0usize;

        loop {
            if match_position < min_match_position || match_count == MAX_MATCH_CANDIDATE_COUNT {
                self.children[left_subtree_leaf] = INVALID_POSITION;
                self.children[right_subtree_leaf] = INVALID_POSITION;
                break;
            }
            match_count += 1;

            let cyclic_match_position = (match_position as usize) % DICTIONARY_SIZE;
            let mut match_length = cmp::min(low_match_length, high_match_length);

            while match_length < max_match_length
                && buf[self.abs_index(position + match_length)] == buf[self.abs_index(match_position + match_length)]
            {
                match_length += 1;
            }

            let match_offset = position - match_position;

            if match_length > longest_match_length && match_length >= MIN_MATCH_LENGTH as i32 {
                longest_match_length = match_length;

                if let Some(out) = out.as_deref_mut() {
                    out[candidate_count] = Match { length: match_length as u32, offset: match_offset as u32 };
                    candidate_count += 1;
                }

                if match_length == max_match_length {
                    // `match_position` is already rooted at this node (it was
                    // just inserted as the current position above it in the
                    // call chain); splice its subtrees into our leaves and stop.
                    self.children[left_subtree_leaf] = self.children[cyclic_match_position * 2];
                    self.children[right_subtree_leaf] = self.children[cyclic_match_position * 2 + 1];
                    break;
                }
            }

            if buf[self.abs_index(position + match_length)] < buf[self.abs_index(match_position + match_length)] {
                self.children[right_subtree_leaf] = match_position;
                right_subtree_leaf = cyclic_match_position * 2;
                match_position = self.children[right_subtree_leaf];
                high_match_length = match_length;
            } else {
                self.children[left_subtree_leaf] = match_position;
                left_subtree_leaf = cyclic_match_position * 2 + 1;
                match_position = self.children[left_subtree_leaf];
                low_match_length = match_length;
            }
        }

        self.absolute_position += 1;
        candidate_count
    }

    /// Translate the absolute position into one relative to `base_offset`,
    /// rebasing (and shifting every stored position) if the threshold has
    /// been reached.
    fn compute_relative_position(&mut self) -> i32 {
        let mut position = (self.absolute_position - self.base_offset) as i64;

        if position == REBASE_THRESHOLD {
            let rebase_delta = REBASE_THRESHOLD - DICTIONARY_SIZE as i64;
            debug_assert!(rebase_delta % DICTIONARY_SIZE as i64 == 0);

            self.base_offset += rebase_delta as usize;
            position -= rebase_delta;

            for slot in self.hash_table.iter_mut() {
                *slot = rebase_slot(*slot, rebase_delta);
            }
            for slot in self.children.iter_mut() {
                *slot = rebase_slot(*slot, rebase_delta);
            }
        }

        position as i32
    }
}

#[inline]
fn rebase_slot(slot: i32, delta: i64) -> i32 {
    if slot as i64 >= delta {
        (slot as i64 - delta) as i32
    } else {
        INVALID_POSITION
    }
}

/// FNV-1a over the 3 bytes starting at `idx`.
#[inline]
fn hash3(buf: &[u8], idx: usize) -> u32 {
    const PRIME: u32 = 16_777_619;
    let mut result: u32 = 2_166_136_261;
    result = (result ^ buf[idx] as u32).wrapping_mul(PRIME);
    result = (result ^ buf[idx + 1] as u32).wrapping_mul(PRIME);
    result = (result ^ buf[idx + 2] as u32).wrapping_mul(PRIME);
    result
}
