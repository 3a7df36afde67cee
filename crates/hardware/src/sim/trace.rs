//! Request traces.
//!
//! A trace is a JSON document describing an initial memory image, optional fault
//! ranges and a list of processor or bus operations:
//!
//! ```json
//! {
//!   "memory": [{ "base": 4096, "words": [1, 2, 3, 4] }],
//!   "ops": [
//!     { "op": "ll", "addr": 4096 },
//!     { "op": "external_write", "addr": 4096, "data": 9 },
//!     { "op": "idle", "cycles": 2 },
//!     { "op": "sc", "addr": 4096, "data": 7 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::common::constants::BE_WORD;
use crate::common::data::{DataResponse, InstructionResponse};
use crate::common::error::SimError;

/// Consecutive words preloaded into memory.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MemoryImage {
    /// Address of the first word.
    pub base: u32,
    /// Words to load.
    pub words: Vec<u32>,
}

/// Half-open address range answered with an error acknowledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct FaultRange {
    /// First faulting address.
    pub start: u32,
    /// First address past the range.
    pub end: u32,
}

const fn full_word() -> u8 {
    BE_WORD
}

/// One trace operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    /// Instruction fetch.
    Fetch {
        /// Fetch address.
        addr: u32,
    },
    /// Data read.
    Read {
        /// Read address.
        addr: u32,
    },
    /// Data write.
    Write {
        /// Write address.
        addr: u32,
        /// Write data.
        data: u32,
        /// Byte enables, full word by default.
        #[serde(default = "full_word")]
        be: u8,
    },
    /// Load-linked.
    Ll {
        /// Address.
        addr: u32,
    },
    /// Store-conditional.
    Sc {
        /// Address.
        addr: u32,
        /// Data.
        data: u32,
    },
    /// Line invalidate.
    Invalidate {
        /// Any address in the line.
        addr: u32,
    },
    /// Write issued by another bus master.
    ExternalWrite {
        /// Address.
        addr: u32,
        /// Data.
        data: u32,
    },
    /// Cycles without processor requests.
    Idle {
        /// Cycle count.
        cycles: u64,
    },
    /// Idle until all posted writes and external writes are done.
    Drain,
}

/// A complete trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Trace {
    /// Initial memory contents.
    #[serde(default)]
    pub memory: Vec<MemoryImage>,
    /// Fault ranges.
    #[serde(default)]
    pub faults: Vec<FaultRange>,
    /// Operations, run in order.
    #[serde(default)]
    pub ops: Vec<TraceOp>,
}

impl Trace {
    /// Parses a JSON trace.
    ///
    /// # Errors
    ///
    /// `SimError::Trace` on malformed JSON or unknown operations.
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Answer to one trace operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TraceResult {
    /// No request was outstanding.
    Idle,
    /// Read, LL or fetch data.
    Word {
        /// Returned word.
        value: u32,
    },
    /// Write or invalidate accepted.
    Done,
    /// Store-conditional outcome.
    Sc {
        /// Whether the store was performed.
        success: bool,
    },
    /// Bus error reported to the processor.
    BusError,
    /// External write presented on the bus.
    Observed,
    /// Cycles spent idling or draining.
    Elapsed {
        /// Cycle count.
        spent: u64,
    },
}

impl From<DataResponse> for TraceResult {
    fn from(rsp: DataResponse) -> Self {
        match rsp {
            DataResponse::Idle | DataResponse::Stall => Self::Idle,
            DataResponse::Word(value) => Self::Word { value },
            DataResponse::Done => Self::Done,
            DataResponse::StoreConditional { success } => Self::Sc { success },
            DataResponse::BusError => Self::BusError,
        }
    }
}

impl From<InstructionResponse> for TraceResult {
    fn from(rsp: InstructionResponse) -> Self {
        match rsp {
            InstructionResponse::Idle | InstructionResponse::Stall => Self::Idle,
            InstructionResponse::Word(value) => Self::Word { value },
            InstructionResponse::BusError => Self::BusError,
        }
    }
}

/// Record of one executed trace operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TraceOutcome {
    /// Position in the trace.
    pub index: usize,
    /// Simulator cycle after the operation.
    pub cycle: u64,
    /// The operation.
    #[serde(flatten)]
    pub op: TraceOp,
    /// Its answer.
    #[serde(flatten)]
    pub result: TraceResult,
}
