//! The four cooperating state machines of the controller.
//!
//! Each FSM owns its state enum and its save registers. They talk to each other
//! only through [`Links`], a small set of registered request/acknowledge fields:
//! every transition reads the values latched at the end of the previous cycle and
//! writes the values visible in the next one. No FSM observes another's
//! same-cycle update through `Links`.
//!
//! The snoop FSM is the one exception: it runs last and checks the data cache
//! lines and reservation as the data cache FSM left them this cycle. An external
//! write that lands in the cycle an LL hit sets the reservation, or a refill
//! claims its slot, is therefore still seen and acted on.

/// Data cache FSM.
pub mod dcache;

/// Instruction cache FSM.
pub mod icache;

/// PIBUS transaction FSM.
pub mod pibus;

/// Snoop-invalidate FSM.
pub mod snoop;

use crate::common::error::BusError;

/// Bus transaction kinds and their bus shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Instruction line refill (burst read).
    IMiss,
    /// Uncached instruction read (single read).
    IUnc,
    /// Data line refill (burst read).
    DMiss,
    /// Uncached data read (single read).
    DUnc,
    /// Posted write (single write).
    Write,
    /// Posted store-conditional (single write).
    StoreConditional,
}

impl TransactionKind {
    /// Returns true for line refills.
    #[inline]
    pub const fn is_burst(self) -> bool {
        matches!(self, Self::IMiss | Self::DMiss)
    }

    /// Returns true for read transactions.
    #[inline]
    pub const fn is_read(self) -> bool {
        !matches!(self, Self::Write | Self::StoreConditional)
    }

    /// Returns true for transactions issued on behalf of the instruction cache.
    #[inline]
    pub const fn is_instruction(self) -> bool {
        matches!(self, Self::IMiss | Self::IUnc)
    }
}

/// A read request raised by a cache FSM for the bus FSM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusRequest {
    /// Transaction kind (one of the read kinds).
    pub kind: TransactionKind,
    /// Line base address for refills, word address for uncached reads.
    pub addr: u32,
}

/// Completion report of a read transaction.
pub type BusOutcome = Result<(), BusError>;

/// Registered cross-FSM signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Links {
    /// Instruction cache read request, cleared when the bus FSM takes it.
    pub icache_req: Option<BusRequest>,
    /// Data cache read request, cleared when the bus FSM takes it.
    pub dcache_req: Option<BusRequest>,
    /// Outcome of the last instruction read, cleared by the instruction cache.
    pub icache_rsp: Option<BusOutcome>,
    /// Outcome of the last data read, cleared by the data cache.
    pub dcache_rsp: Option<BusOutcome>,
    /// Sticky error of a posted write or store-conditional.
    pub write_error: bool,
    /// Snoop asks the data cache to drop the LL/SC reservation.
    pub snoop_llsc_inval: bool,
    /// Snoop asks the data cache to flush every line.
    pub snoop_flush: bool,
}
