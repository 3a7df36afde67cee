//! Processor-Facing Request and Response Types.
//!
//! This module defines the per-cycle contract between the instruction-set
//! simulator and the cache controller. It provides:
//! 1. **Requests:** The data request kinds (READ, WRITE, LL, SC, line invalidate).
//! 2. **Responses:** Instruction and data responses, including stalls, SC outcomes
//!    and precise or deferred bus errors.
//!
//! A request answered with a stall must be presented again, unchanged, on the
//! following cycle until it is answered.

use crate::common::constants::BE_WORD;

/// Kind of a processor data request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Word read.
    Read,
    /// Word write with byte enables.
    Write,
    /// Load-linked: a read that sets the LL/SC reservation.
    LinkedLoad,
    /// Store-conditional: a write performed only if the reservation holds.
    StoreConditional,
    /// Invalidate the line holding the address, if present.
    InvalidateLine,
}

impl DataKind {
    /// Returns true for the read-type requests (READ and LL).
    #[inline]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::LinkedLoad)
    }
}

/// A processor data request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataRequest {
    /// Request kind.
    pub kind: DataKind,
    /// Byte address of the access.
    pub addr: u32,
    /// Write data (WRITE and SC only).
    pub wdata: u32,
    /// Byte-enable mask, bit `i` selecting byte `i` of the word (WRITE and SC only).
    pub be: u8,
}

impl DataRequest {
    /// A word read.
    pub const fn read(addr: u32) -> Self {
        Self {
            kind: DataKind::Read,
            addr,
            wdata: 0,
            be: 0,
        }
    }

    /// A full-word write.
    pub const fn write(addr: u32, wdata: u32) -> Self {
        Self {
            kind: DataKind::Write,
            addr,
            wdata,
            be: BE_WORD,
        }
    }

    /// A partial write selecting bytes with `be`.
    pub const fn write_bytes(addr: u32, wdata: u32, be: u8) -> Self {
        Self {
            kind: DataKind::Write,
            addr,
            wdata,
            be,
        }
    }

    /// A load-linked.
    pub const fn load_linked(addr: u32) -> Self {
        Self {
            kind: DataKind::LinkedLoad,
            addr,
            wdata: 0,
            be: 0,
        }
    }

    /// A full-word store-conditional.
    pub const fn store_conditional(addr: u32, wdata: u32) -> Self {
        Self {
            kind: DataKind::StoreConditional,
            addr,
            wdata,
            be: BE_WORD,
        }
    }

    /// A line invalidate command.
    pub const fn invalidate(addr: u32) -> Self {
        Self {
            kind: DataKind::InvalidateLine,
            addr,
            wdata: 0,
            be: 0,
        }
    }
}

/// Instruction-side response for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InstructionResponse {
    /// No request was presented.
    #[default]
    Idle,
    /// The request is refused this cycle; present it again.
    Stall,
    /// The instruction word.
    Word(u32),
    /// Precise bus error for this fetch.
    BusError,
}

/// Data-side response for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataResponse {
    /// No request was presented.
    #[default]
    Idle,
    /// The request is refused this cycle; present it again.
    Stall,
    /// Read or LL data.
    Word(u32),
    /// WRITE or line invalidate accepted.
    Done,
    /// Store-conditional outcome.
    StoreConditional {
        /// Whether the store was performed.
        success: bool,
    },
    /// Bus error: precise for reads, or a deferred write error surfaced here.
    BusError,
}

impl InstructionResponse {
    /// Returns true if the request was refused this cycle.
    #[inline]
    pub const fn is_stall(self) -> bool {
        matches!(self, Self::Stall)
    }
}

impl DataResponse {
    /// Returns true if the request was refused this cycle.
    #[inline]
    pub const fn is_stall(self) -> bool {
        matches!(self, Self::Stall)
    }
}

/// Both responses produced by one controller cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ProcessorResponse {
    /// Instruction-side response.
    pub instruction: InstructionResponse,
    /// Data-side response.
    pub data: DataResponse,
}

/// Merges a 32-bit word with new data under a byte-enable mask.
///
/// Bytes whose enable bit is clear keep the value from `old`.
#[inline]
pub const fn merge_bytes(old: u32, new: u32, be: u8) -> u32 {
    let mut mask = 0u32;
    let mut i = 0;
    while i < 4 {
        if be & (1 << i) != 0 {
            mask |= 0xFF << (i * 8);
        }
        i += 1;
    }
    (old & !mask) | (new & mask)
}
