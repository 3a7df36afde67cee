//! Reference PIBUS interconnect.
//!
//! This module models the rest of the bus around one controller. It provides:
//! 1. **Arbitration:** The controller is granted when it requests and no external
//!    write is scheduled for the cycle; it keeps the bus until its last address
//!    (the first one driven without `lock`) is accepted.
//! 2. **Target pipeline:** An address accepted in one cycle is acknowledged in a
//!    later one, after the memory latency, while the master drives its next address.
//! 3. **External agents:** A queue of foreign writes, each presented as one write
//!    address cycle (visible to the snoop) whenever the bus is free, and applied to
//!    memory at once.

use std::collections::VecDeque;

use tracing::trace;

use crate::common::constants::BE_WORD;
use super::memory::MemorySlave;
use super::signals::{Ack, BusInputs, BusOutputs, Opcode};

/// An address accepted by the target, waiting for its data cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Access {
    addr: u32,
    read: bool,
    be: u8,
    wait: u32,
}

/// A write issued by another bus master.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExternalWrite {
    /// Word address.
    pub addr: u32,
    /// Written data (full word).
    pub data: u32,
}

/// Bus, arbiter and memory target seen by one controller.
#[derive(Clone, Debug, Default)]
pub struct SystemBus {
    memory: MemorySlave,
    external: VecDeque<ExternalWrite>,
    owned: bool,
    pending: Option<Access>,
    cycle: u64,
}

impl SystemBus {
    /// Creates an idle bus in front of `memory`.
    pub fn new(memory: MemorySlave) -> Self {
        Self {
            memory,
            external: VecDeque::new(),
            owned: false,
            pending: None,
            cycle: 0,
        }
    }

    /// Memory target.
    pub fn memory(&self) -> &MemorySlave {
        &self.memory
    }

    /// Mutable memory target, for preloading and fault injection.
    pub fn memory_mut(&mut self) -> &mut MemorySlave {
        &mut self.memory
    }

    /// Schedules a foreign write; it appears on the next free bus cycle.
    pub fn schedule_external_write(&mut self, addr: u32, data: u32) {
        self.external.push_back(ExternalWrite { addr, data });
    }

    /// Foreign writes not yet presented.
    pub fn pending_external_writes(&self) -> usize {
        self.external.len()
    }

    /// Returns true if the controller holds the bus or a data cycle is outstanding.
    pub fn is_busy(&self) -> bool {
        self.owned || self.pending.is_some()
    }

    /// Cycles simulated so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Clears arbitration and pipeline state; memory contents are kept.
    pub fn reset(&mut self) {
        self.external.clear();
        self.owned = false;
        self.pending = None;
    }

    /// Resolves one bus cycle given the controller's outputs.
    ///
    /// # Returns
    ///
    /// The inputs the controller samples at the end of the cycle.
    pub fn cycle_with(&mut self, out: &BusOutputs) -> BusInputs {
        let mut inputs = BusInputs::IDLE;

        // Data cycle of the address accepted earlier.
        if let Some(access) = self.pending.as_mut() {
            if access.wait > 0 {
                access.wait -= 1;
            } else {
                let access = *access;
                self.pending = None;
                if access.read {
                    let (ack, rdata) = self.memory.read(access.addr);
                    inputs.ack = ack;
                    inputs.rdata = rdata;
                } else if let Some(wdata) = out.wdata {
                    inputs.ack = self.memory.write(access.addr, wdata, access.be);
                } else {
                    inputs.ack = Ack::Error;
                }
            }
        }

        // A master that stops driving addresses mid-burst gives the bus back
        // and abandons its outstanding access.
        if self.owned && out.address.is_none() {
            self.owned = false;
            self.pending = None;
        }

        // Address cycle.
        if self.owned {
            if let Some(addr) = out.address
                && self.pending.is_none()
            {
                let be = match out.opcode {
                    Some(Opcode::Single { be }) => be,
                    _ => BE_WORD,
                };
                self.pending = Some(Access {
                    addr,
                    read: out.read,
                    be,
                    wait: self.memory.latency(),
                });
                if !out.lock {
                    self.owned = false;
                }
                inputs.avalid = true;
                inputs.read = out.read;
                inputs.address = addr;
            }
        } else if let Some(ext) = self.external.pop_front() {
            trace!("external write at {:#010x}", ext.addr);
            let _ = self.memory.write(ext.addr, ext.data, BE_WORD);
            inputs = inputs.with_write_cycle(ext.addr);
        } else if out.req && self.pending.is_none() {
            inputs.gnt = true;
            self.owned = true;
        }

        self.cycle += 1;
        inputs
    }
}
