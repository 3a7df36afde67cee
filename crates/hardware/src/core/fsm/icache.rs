//! Instruction Cache FSM.
//!
//! Serves one instruction fetch per cycle. It provides:
//! 1. **Hit path:** A cacheable fetch that hits returns its word in the same cycle.
//! 2. **Miss path:** Victim selection, victim invalidation, an IMISS burst on the bus
//!    and the line commit, after which the retried fetch hits.
//! 3. **Uncached path:** A single IUNC read whose word is delivered without touching
//!    the cache.
//! 4. **Errors:** A failed read is reported as a precise bus error on the fetch
//!    that caused it; no line is committed.

use tracing::{debug, trace, warn};

use super::{BusRequest, Links, TransactionKind};
use crate::common::data::InstructionResponse;
use crate::config::CacheConfig;
use crate::core::units::cache::{CacheStorage, Slot};
use crate::soc::segment::CachedTable;
use crate::stats::XcacheStats;

/// Instruction cache FSM states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IcacheState {
    /// Waiting for a fetch.
    #[default]
    Idle,
    /// Choosing the victim way.
    MissSelect,
    /// Invalidating the victim and raising the refill request.
    MissInval,
    /// Waiting for the refill to complete.
    MissWait,
    /// Committing the refilled line.
    MissUpdt,
    /// Waiting for an uncached read.
    UncWait,
    /// Delivering the uncached word.
    UncGo,
    /// Reporting a bus error.
    Error,
}

/// Instruction cache controller: state, save registers and storage.
#[derive(Clone, Debug)]
pub struct IcacheFsm {
    state: IcacheState,
    save_addr: u32,
    save_slot: Slot,
    storage: CacheStorage,
}

impl IcacheFsm {
    /// Creates an idle instruction cache with every line invalid.
    pub fn new(geometry: &CacheConfig) -> Self {
        Self {
            state: IcacheState::Idle,
            save_addr: 0,
            save_slot: Slot { set: 0, way: 0 },
            storage: CacheStorage::new(geometry),
        }
    }

    /// Current state.
    pub fn state(&self) -> IcacheState {
        self.state
    }

    /// Cache storage.
    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Returns to `Idle` with an empty cache.
    pub fn reset(&mut self) {
        self.state = IcacheState::Idle;
        self.save_addr = 0;
        self.save_slot = Slot { set: 0, way: 0 };
        self.storage.reset();
    }

    /// One transition.
    ///
    /// # Arguments
    ///
    /// * `ireq` - Fetch address presented this cycle, if any.
    /// * `table` - Cached-address table.
    /// * `cur` - Cross-FSM signals latched last cycle.
    /// * `next` - Cross-FSM signals for the next cycle.
    /// * `buf` - Instruction miss buffer filled by the bus FSM.
    /// * `stats` - Counters.
    pub fn transition(
        &mut self,
        ireq: Option<u32>,
        table: &CachedTable,
        cur: &Links,
        next: &mut Links,
        buf: &[u32],
        stats: &mut XcacheStats,
    ) -> InstructionResponse {
        let prev = self.state;
        let rsp = match self.state {
            IcacheState::Idle => match ireq {
                None => InstructionResponse::Idle,
                Some(addr) if table.is_cached(addr) => {
                    if let Some(word) = self.storage.read(addr) {
                        stats.ireq += 1;
                        InstructionResponse::Word(word)
                    } else {
                        debug!("icache miss at {addr:#010x}");
                        stats.imiss += 1;
                        stats.imiss_frz += 1;
                        self.save_addr = addr;
                        self.state = IcacheState::MissSelect;
                        InstructionResponse::Stall
                    }
                }
                Some(addr) => {
                    debug!("icache uncached read at {addr:#010x}");
                    stats.iunc += 1;
                    stats.iunc_frz += 1;
                    self.save_addr = addr;
                    next.icache_req = Some(BusRequest {
                        kind: TransactionKind::IUnc,
                        addr,
                    });
                    self.state = IcacheState::UncWait;
                    InstructionResponse::Stall
                }
            },
            IcacheState::MissSelect => {
                stats.imiss_frz += 1;
                self.save_slot = self.storage.select_victim(self.save_addr);
                self.state = IcacheState::MissInval;
                InstructionResponse::Stall
            }
            IcacheState::MissInval => {
                stats.imiss_frz += 1;
                self.storage.invalidate(self.save_slot);
                next.icache_req = Some(BusRequest {
                    kind: TransactionKind::IMiss,
                    addr: self.storage.line_base(self.save_addr),
                });
                self.state = IcacheState::MissWait;
                InstructionResponse::Stall
            }
            IcacheState::MissWait => {
                stats.imiss_frz += 1;
                self.await_bus(cur, next, IcacheState::MissUpdt);
                InstructionResponse::Stall
            }
            IcacheState::MissUpdt => {
                stats.imiss_frz += 1;
                self.storage.fill(self.save_slot, self.save_addr, buf);
                self.state = IcacheState::Idle;
                InstructionResponse::Stall
            }
            IcacheState::UncWait => {
                stats.iunc_frz += 1;
                self.await_bus(cur, next, IcacheState::UncGo);
                InstructionResponse::Stall
            }
            IcacheState::UncGo => {
                self.state = IcacheState::Idle;
                InstructionResponse::Word(buf[0])
            }
            IcacheState::Error => {
                self.state = IcacheState::Idle;
                InstructionResponse::BusError
            }
        };

        if prev != self.state {
            trace!(from = ?prev, to = ?self.state, "icache fsm");
        }
        rsp
    }

    /// Consumes the bus outcome, moving to `ok` or to `Error`.
    fn await_bus(&mut self, cur: &Links, next: &mut Links, ok: IcacheState) {
        match cur.icache_rsp {
            Some(Ok(())) => {
                next.icache_rsp = None;
                self.state = ok;
            }
            Some(Err(err)) => {
                warn!(%err, "icache read of {:#010x} failed", self.save_addr);
                next.icache_rsp = None;
                self.state = IcacheState::Error;
            }
            None => {}
        }
    }
}
