//! Reference memory target.
//!
//! A sparse word-addressed memory sitting behind the reference bus. It provides:
//! 1. **Storage:** Words materialized on first write; unwritten words read as zero.
//! 2. **Timing:** A fixed number of wait cycles before each word is acknowledged.
//! 3. **Faults:** Address ranges answered with an error acknowledge, used to
//!    exercise bus error reporting.

use std::collections::HashMap;
use std::ops::Range;

use crate::common::constants::BE_WORD;
use crate::common::data::merge_bytes;
use crate::soc::signals::Ack;

/// Sparse memory slave.
#[derive(Clone, Debug, Default)]
pub struct MemorySlave {
    words: HashMap<u32, u32>,
    latency: u32,
    faults: Vec<Range<u32>>,
}

impl MemorySlave {
    /// Creates an empty memory with `latency` wait cycles per word.
    pub fn new(latency: u32) -> Self {
        Self {
            words: HashMap::new(),
            latency,
            faults: Vec::new(),
        }
    }

    /// Wait cycles inserted before each acknowledge.
    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Makes every access in `range` fail with `Ack::Error`.
    pub fn add_fault(&mut self, range: Range<u32>) {
        self.faults.push(range);
    }

    /// Removes every fault range.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Returns true if `addr` lies in a fault range.
    pub fn is_fault(&self, addr: u32) -> bool {
        self.faults.iter().any(|r| r.contains(&addr))
    }

    /// Reads the word holding `addr` without timing or faults.
    pub fn peek(&self, addr: u32) -> u32 {
        self.words.get(&(addr & !3)).copied().unwrap_or(0)
    }

    /// Writes the word holding `addr` under byte enables, without timing or faults.
    pub fn poke(&mut self, addr: u32, data: u32, be: u8) {
        let slot = self.words.entry(addr & !3).or_insert(0);
        *slot = merge_bytes(*slot, data, be);
    }

    /// Loads consecutive words starting at `base`.
    pub fn load(&mut self, base: u32, data: &[u32]) {
        for (i, &word) in data.iter().enumerate() {
            self.poke(base.wrapping_add(4 * i as u32), word, BE_WORD);
        }
    }

    /// Performs a bus read: `(ack, rdata)`.
    pub fn read(&self, addr: u32) -> (Ack, u32) {
        if self.is_fault(addr) {
            (Ack::Error, 0)
        } else {
            (Ack::Ready, self.peek(addr))
        }
    }

    /// Performs a bus write.
    pub fn write(&mut self, addr: u32, data: u32, be: u8) -> Ack {
        if self.is_fault(addr) {
            return Ack::Error;
        }
        self.poke(addr, data, be);
        Ack::Ready
    }
}
