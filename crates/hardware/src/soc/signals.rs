//! PIBUS signal bundles.
//!
//! This module defines the wires between the controller and the system bus. It provides:
//! 1. **Outputs:** The Moore outputs the controller drives in a cycle (request, lock,
//!    direction, opcode, address, write data).
//! 2. **Inputs:** Grant, acknowledge, read data and timeout returned by the arbiter
//!    and the target, plus the address-valid and address lines sampled by the snoop.
//!
//! The bus is pipelined: a target acknowledges, in a given cycle, the address a
//! master drove in an earlier address cycle. `Ack::Wait` keeps the master in place.

/// Target acknowledge code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Ack {
    /// No data this cycle.
    #[default]
    Wait,
    /// Transfer completed; `rdata` is valid for reads.
    Ready,
    /// Transfer failed.
    Error,
}

/// Transaction opcode driven during address cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// Burst of `words` consecutive words (cache line refill).
    Burst {
        /// Number of words in the burst.
        words: u32,
    },
    /// Single word transfer with byte enables.
    Single {
        /// Byte-enable mask.
        be: u8,
    },
}

/// Outputs driven by the controller for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BusOutputs {
    /// Bus request to the arbiter.
    pub req: bool,
    /// Keep ownership after this address cycle (all burst addresses but the last).
    pub lock: bool,
    /// Direction of the transaction: true for reads.
    pub read: bool,
    /// Opcode, driven together with an address.
    pub opcode: Option<Opcode>,
    /// Address, present only in address cycles.
    pub address: Option<u32>,
    /// Write data, present only in write data cycles.
    pub wdata: Option<u32>,
}

/// Inputs sampled by the controller at the end of a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BusInputs {
    /// Grant from the arbiter.
    pub gnt: bool,
    /// Acknowledge from the target.
    pub ack: Ack,
    /// Read data, valid with `Ack::Ready` on reads.
    pub rdata: u32,
    /// Bus timeout.
    pub tout: bool,
    /// An address cycle is in progress on the bus.
    pub avalid: bool,
    /// Direction of the address cycle in progress.
    pub read: bool,
    /// Address of the address cycle in progress.
    pub address: u32,
}

impl BusInputs {
    /// Idle bus: no grant, no acknowledge, no address cycle.
    pub const IDLE: Self = Self {
        gnt: false,
        ack: Ack::Wait,
        rdata: 0,
        tout: false,
        avalid: false,
        read: false,
        address: 0,
    };

    /// An external write address cycle at `address`.
    #[must_use]
    pub const fn with_write_cycle(mut self, address: u32) -> Self {
        self.avalid = true;
        self.read = false;
        self.address = address;
        self
    }

    /// Returns true if a write address cycle is on the bus.
    #[inline]
    pub const fn is_write_cycle(&self) -> bool {
        self.avalid && !self.read
    }
}
