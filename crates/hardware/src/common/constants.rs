//! Global Controller Constants.
//!
//! This module defines constants shared by the cache storage, the FSMs and the
//! configuration validator. It includes:
//! 1. **Word Constants:** Bus word width and the byte-offset field of an address.
//! 2. **Geometry Limits:** Upper bounds on sets, words per line and ways.
//! 3. **Byte Enables:** Canonical byte-enable masks for single-word writes.

/// Size of a bus word in bytes.
pub const WORD_BYTES: u32 = 4;

/// Number of address bits selecting a byte inside a word.
pub const WORD_SHIFT: u32 = 2;

/// Largest supported number of sets per cache.
pub const MAX_SETS: u32 = 1024;

/// Largest supported number of words per cache line.
pub const MAX_WORDS: u32 = 32;

/// Largest supported associativity.
pub const MAX_WAYS: u32 = 8;

/// Byte-enable mask selecting all four bytes of a word.
pub const BE_WORD: u8 = 0b1111;

/// Largest number of address MSBs the cached-address table can decode.
pub const MAX_MSB_BITS: u32 = 16;
