//! Data Cache FSM.
//!
//! Serves one data request per cycle against a write-through, no-write-allocate
//! cache. It provides:
//! 1. **Reads and LL:** Same-cycle hits; DMISS refills and DUNC single reads otherwise.
//!    A load-linked sets the reservation when its word is delivered.
//! 2. **Writes and SC:** Every write (and every successful SC) is posted to the
//!    write buffer; a hit also updates the cached word. A full buffer refuses the
//!    request until the bus FSM drains an entry.
//! 3. **Line invalidate:** Drops the addressed line if present.
//! 4. **Coherence:** Applies the invalidations, reservation drops and flushes
//!    requested by the snoop FSM, never on the slot a refill is committing into.
//! 5. **Errors:** Read errors are precise. Write errors are latched by the bus FSM
//!    and reported once, on the next read-type request.

use tracing::{debug, info, trace, warn};

use super::{BusRequest, Links, TransactionKind};
use crate::common::data::{DataKind, DataRequest, DataResponse};
use crate::config::CacheConfig;
use crate::core::units::cache::{CacheStorage, Slot};
use crate::core::units::llsc::Reservation;
use crate::core::units::write_buffer::{WbufEntry, WriteKind};
use crate::soc::segment::CachedTable;
use crate::stats::XcacheStats;

/// Data cache FSM states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DcacheState {
    /// Waiting for a request.
    #[default]
    Idle,
    /// Updating the cached word of a posted write hit.
    WriteUpdt,
    /// Waiting for write buffer space for a WRITE.
    WriteReq,
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
    /// Invalidating the line addressed by a line invalidate command.
    Inval,
    /// Waiting for write buffer space for a successful SC.
    ScWait,
}

/// Per-cycle inputs of the data cache FSM.
#[derive(Clone, Copy, Debug)]
pub struct DcacheInputs<'a> {
    /// Request presented this cycle.
    pub req: Option<DataRequest>,
    /// Cached-address table.
    pub table: &'a CachedTable,
    /// Write buffer fullness at the start of the cycle.
    pub wbuf_full: bool,
    /// Data miss buffer filled by the bus FSM.
    pub buf: &'a [u32],
}

/// Result of one data cache transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DcacheStep {
    /// Response to the processor.
    pub rsp: DataResponse,
    /// Entry to append to the write buffer at the end of the cycle.
    pub push: Option<WbufEntry>,
}

impl DcacheStep {
    const fn respond(rsp: DataResponse) -> Self {
        Self { rsp, push: None }
    }
}

/// Data cache controller: state, save registers, storage and reservation.
#[derive(Clone, Debug)]
pub struct DcacheFsm {
    state: DcacheState,
    save: DataRequest,
    save_slot: Slot,
    storage: CacheStorage,
    reservation: Reservation,
}

impl DcacheFsm {
    /// Creates an idle data cache with every line invalid and no reservation.
    pub fn new(geometry: &CacheConfig) -> Self {
        Self {
            state: DcacheState::Idle,
            save: DataRequest::read(0),
            save_slot: Slot { set: 0, way: 0 },
            storage: CacheStorage::new(geometry),
            reservation: Reservation::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> DcacheState {
        self.state
    }

    /// Cache storage.
    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// LL/SC reservation.
    pub fn reservation(&self) -> Reservation {
        self.reservation
    }

    /// Returns to `Idle` with an empty cache and no reservation.
    pub fn reset(&mut self) {
        self.state = DcacheState::Idle;
        self.save = DataRequest::read(0);
        self.save_slot = Slot { set: 0, way: 0 };
        self.storage.reset();
        self.reservation.clear();
    }

    /// Slot a refill is being committed into, with the refilled address.
    pub fn in_flight(&self) -> Option<(u32, Slot)> {
        matches!(
            self.state,
            DcacheState::MissInval | DcacheState::MissWait | DcacheState::MissUpdt
        )
        .then_some((self.save.addr, self.save_slot))
    }

    /// Snoop match: the slot an external write to `addr` must invalidate.
    ///
    /// A valid line already scheduled for invalidation is not reported again.
    /// A refill in flight for the same line is reported so that the line is
    /// dropped once committed.
    pub fn snoop_match(&self, addr: u32) -> Option<Slot> {
        if let Some(slot) = self.storage.find(addr) {
            return (!self.storage.is_pending(slot)).then_some(slot);
        }
        self.in_flight()
            .filter(|&(miss, slot)| {
                self.storage.same_line(miss, addr) && !self.storage.is_pending(slot)
            })
            .map(|(_, slot)| slot)
    }

    /// Schedules invalidation of `slot`; applied by a later transition.
    pub fn schedule_invalidate(&mut self, slot: Slot) {
        self.storage.mark_pending(slot);
    }

    /// Returns true if the reservation lies in the line holding `addr`.
    pub fn reservation_covers(&self, addr: u32) -> bool {
        self.reservation
            .address()
            .is_some_and(|reserved| self.storage.same_line(reserved, addr))
    }

    /// Applies the coherence requests latched by the snoop FSM.
    fn apply_snoop(&mut self, cur: &Links, next: &mut Links) {
        if cur.snoop_flush {
            next.snoop_flush = false;
            let in_flight = self.in_flight();
            self.storage.invalidate_all();
            if let Some((_, slot)) = in_flight {
                self.storage.mark_pending(slot);
            }
            self.reservation.clear();
            info!("dcache flushed by snoop");
        }
        if cur.snoop_llsc_inval {
            next.snoop_llsc_inval = false;
            self.reservation.clear();
        }
        let keep = self.in_flight().map(|(_, slot)| slot);
        let applied = self.storage.apply_pending(keep);
        if applied > 0 {
            debug!(lines = applied, "dcache snoop invalidations applied");
        }
    }

    /// One transition.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Request, cacheability table, buffer state and miss buffer.
    /// * `cur` - Cross-FSM signals latched last cycle.
    /// * `next` - Cross-FSM signals for the next cycle.
    /// * `stats` - Counters.
    pub fn transition(
        &mut self,
        inputs: DcacheInputs<'_>,
        cur: &Links,
        next: &mut Links,
        stats: &mut XcacheStats,
    ) -> DcacheStep {
        self.apply_snoop(cur, next);

        let prev = self.state;
        let step = match self.state {
            DcacheState::Idle => self.serve(inputs, cur, next, stats),
            DcacheState::WriteUpdt => {
                self.storage.write(
                    self.save_slot,
                    self.save.addr,
                    self.save.wdata,
                    self.save.be,
                );
                self.state = DcacheState::Idle;
                self.serve(inputs, cur, next, stats)
            }
            DcacheState::WriteReq | DcacheState::ScWait => {
                if inputs.wbuf_full {
                    stats.write_frz += 1;
                    DcacheStep::respond(DataResponse::Stall)
                } else {
                    self.post(self.save, stats)
                }
            }
            DcacheState::MissSelect => {
                stats.dmiss_frz += 1;
                self.save_slot = self.storage.select_victim(self.save.addr);
                self.state = DcacheState::MissInval;
                DcacheStep::respond(DataResponse::Stall)
            }
            DcacheState::MissInval => {
                stats.dmiss_frz += 1;
                self.storage.invalidate(self.save_slot);
                next.dcache_req = Some(BusRequest {
                    kind: TransactionKind::DMiss,
                    addr: self.storage.line_base(self.save.addr),
                });
                self.state = DcacheState::MissWait;
                DcacheStep::respond(DataResponse::Stall)
            }
            DcacheState::MissWait => {
                stats.dmiss_frz += 1;
                self.await_bus(cur, next, DcacheState::MissUpdt);
                DcacheStep::respond(DataResponse::Stall)
            }
            DcacheState::MissUpdt => {
                stats.dmiss_frz += 1;
                self.storage.fill(self.save_slot, self.save.addr, inputs.buf);
                self.state = DcacheState::Idle;
                DcacheStep::respond(DataResponse::Stall)
            }
            DcacheState::UncWait => {
                stats.dunc_frz += 1;
                self.await_bus(cur, next, DcacheState::UncGo);
                DcacheStep::respond(DataResponse::Stall)
            }
            DcacheState::UncGo => {
                if self.save.kind == DataKind::LinkedLoad {
                    self.reservation.set(self.save.addr);
                }
                self.state = DcacheState::Idle;
                DcacheStep::respond(DataResponse::Word(inputs.buf[0]))
            }
            DcacheState::Error => {
                self.state = DcacheState::Idle;
                DcacheStep::respond(DataResponse::BusError)
            }
            DcacheState::Inval => {
                self.storage.invalidate(self.save_slot);
                self.state = DcacheState::Idle;
                self.serve(inputs, cur, next, stats)
            }
        };

        if prev != self.state {
            trace!(from = ?prev, to = ?self.state, "dcache fsm");
        }
        step
    }

    /// Accepts the request presented this cycle, if any.
    ///
    /// `WriteUpdt` and `Inval` finish their line update first, then serve the
    /// next request in the same cycle, so neither costs the processor a stall.
    fn serve(
        &mut self,
        inputs: DcacheInputs<'_>,
        cur: &Links,
        next: &mut Links,
        stats: &mut XcacheStats,
    ) -> DcacheStep {
        match inputs.req {
            None => DcacheStep::respond(DataResponse::Idle),
            Some(req) => self.idle(req, inputs, cur, next, stats),
        }
    }

    /// Handles a new request in `Idle`.
    fn idle(
        &mut self,
        req: DataRequest,
        inputs: DcacheInputs<'_>,
        cur: &Links,
        next: &mut Links,
        stats: &mut XcacheStats,
    ) -> DcacheStep {
        match req.kind {
            DataKind::Read | DataKind::LinkedLoad => {
                if cur.write_error {
                    warn!("deferred write error reported at {:#010x}", req.addr);
                    next.write_error = false;
                    return DcacheStep::respond(DataResponse::BusError);
                }
                if !inputs.table.is_cached(req.addr) {
                    debug!("dcache uncached read at {:#010x}", req.addr);
                    stats.dunc += 1;
                    stats.dunc_frz += 1;
                    self.save = req;
                    next.dcache_req = Some(BusRequest {
                        kind: TransactionKind::DUnc,
                        addr: req.addr,
                    });
                    self.state = DcacheState::UncWait;
                    return DcacheStep::respond(DataResponse::Stall);
                }
                if let Some(word) = self.storage.read(req.addr) {
                    stats.dread += 1;
                    if req.kind == DataKind::LinkedLoad {
                        self.reservation.set(req.addr);
                    }
                    return DcacheStep::respond(DataResponse::Word(word));
                }
                debug!("dcache miss at {:#010x}", req.addr);
                stats.dmiss += 1;
                stats.dmiss_frz += 1;
                self.save = req;
                self.state = DcacheState::MissSelect;
                DcacheStep::respond(DataResponse::Stall)
            }
            DataKind::Write => {
                if inputs.wbuf_full {
                    stats.write_frz += 1;
                    self.save = req;
                    self.state = DcacheState::WriteReq;
                    return DcacheStep::respond(DataResponse::Stall);
                }
                self.post(req, stats)
            }
            DataKind::StoreConditional => {
                let success = self.reservation.matches(req.addr);
                self.reservation.clear();
                if !success {
                    stats.sc_ko += 1;
                    return DcacheStep::respond(DataResponse::StoreConditional { success: false });
                }
                if inputs.wbuf_full {
                    stats.write_frz += 1;
                    self.save = req;
                    self.state = DcacheState::ScWait;
                    return DcacheStep::respond(DataResponse::Stall);
                }
                self.post(req, stats)
            }
            DataKind::InvalidateLine => {
                if let Some(slot) = self.storage.find(req.addr) {
                    self.save = req;
                    self.save_slot = slot;
                    self.state = DcacheState::Inval;
                }
                DcacheStep::respond(DataResponse::Done)
            }
        }
    }

    /// Posts a WRITE or a successful SC, scheduling the hit update if the line is present.
    fn post(&mut self, req: DataRequest, stats: &mut XcacheStats) -> DcacheStep {
        let (kind, rsp) = if req.kind == DataKind::StoreConditional {
            stats.sc_ok += 1;
            (
                WriteKind::StoreConditional,
                DataResponse::StoreConditional { success: true },
            )
        } else {
            stats.write += 1;
            (WriteKind::Write, DataResponse::Done)
        };

        self.state = match self.storage.find(req.addr) {
            Some(slot) => {
                self.save = req;
                self.save_slot = slot;
                DcacheState::WriteUpdt
            }
            None => DcacheState::Idle,
        };

        DcacheStep {
            rsp,
            push: Some(WbufEntry::new(req.addr, req.wdata, req.be, kind)),
        }
    }

    /// Consumes the bus outcome, moving to `ok` or to `Error`.
    fn await_bus(&mut self, cur: &Links, next: &mut Links, ok: DcacheState) {
        match cur.dcache_rsp {
            Some(Ok(())) => {
                next.dcache_rsp = None;
                self.state = ok;
            }
            Some(Err(err)) => {
                warn!(%err, "dcache read of {:#010x} failed", self.save.addr);
                next.dcache_rsp = None;
                self.state = DcacheState::Error;
            }
            None => {}
        }
    }
}
