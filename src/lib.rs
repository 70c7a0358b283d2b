#![cfg_attr(not(feature = "std"), no_std)]
//! # doboz
//!
//! Pure-Rust port of [Doboz](https://github.com/nemequ/doboz), an LZ77-family
//! byte compressor tuned for fast decompression at a ratio close to zlib's
//! maximum setting.
//!
//! ### Features
//!
//! - Simple block-at-once compression and decompression
//! - `#![no_std]` compatible
//!
//! ### Usage
//!
//! See the [`compress`] or [`decompress`] module documentation for reference.
//!
//! In `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! doboz = "0.1.0"
//! ```
//!
//! Or, to only enable certain features:
//!
//! ```toml
//! [dependencies.doboz]
//! version = "0.1.0"
//! default-features = false
//! features = ["decompress", "compress"]
//! ```
//!
//! - `decompress`: Enables decompression functions.
//! - `compress`: Enables compression functions and the [`dictionary`] module.
//! - `alloc`: Enables allocating convenience wrappers over the non-allocating
//!   primitives. Without `std`, this uses `extern crate alloc`.
//! - `std`: Enables use of `std`. Implies `alloc`.
//!
//! All features are enabled by default.

pub mod common;
#[cfg(feature = "compress")]
pub mod compress;
#[cfg(feature = "compress")]
pub mod dictionary;

#[cfg(feature = "decompress")]
pub mod decompress;

pub use common::{CompressionInfo, Error, Header, Match, MAX_MATCH_CANDIDATE_COUNT, MAX_MATCH_LENGTH, MIN_MATCH_LENGTH, VERSION};
