//! Snoop-Invalidate FSM.
//!
//! Watches every write address cycle this controller did not issue. An external
//! write that hits a data cache line (or the line being refilled) schedules that
//! slot for invalidation; one that falls in the reserved line drops the LL/SC
//! reservation. Hits arriving in quick succession form a burst, and a burst of
//! `flush_threshold` hits escalates to a full data cache flush.
//!
//! The FSM never writes the cache lines itself: it sets pending-invalidate flags
//! and flush/reservation requests that the data cache FSM applies on a later cycle.

use tracing::{debug, info, trace};

use super::Links;
use super::dcache::DcacheFsm;
use crate::config::SnoopConfig;
use crate::soc::signals::BusInputs;
use crate::stats::XcacheStats;

/// Snoop FSM states. `Inval` and `Flush` last one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SnoopState {
    /// No external hit this cycle.
    #[default]
    Idle,
    /// A line invalidation was scheduled.
    Inval,
    /// A full flush was requested.
    Flush,
}

/// Snoop FSM with its burst detector.
#[derive(Clone, Debug)]
pub struct SnoopFsm {
    state: SnoopState,
    config: SnoopConfig,
    cycle: u64,
    burst: u32,
    last_hit: Option<u64>,
}

impl SnoopFsm {
    /// Creates an idle snoop FSM.
    pub fn new(config: SnoopConfig) -> Self {
        Self {
            state: SnoopState::Idle,
            config,
            cycle: 0,
            burst: 0,
            last_hit: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SnoopState {
        self.state
    }

    /// Returns to `Idle` and forgets the current burst.
    pub fn reset(&mut self) {
        self.state = SnoopState::Idle;
        self.cycle = 0;
        self.burst = 0;
        self.last_hit = None;
    }

    /// One transition.
    ///
    /// # Arguments
    ///
    /// * `bus` - Bus inputs sampled this cycle.
    /// * `own_write` - True if the write address cycle on the bus is our own.
    /// * `dcache` - Data cache, searched and scheduled for invalidation.
    /// * `next` - Cross-FSM signals for the next cycle.
    /// * `stats` - Counters.
    pub fn transition(
        &mut self,
        bus: &BusInputs,
        own_write: bool,
        dcache: &mut DcacheFsm,
        next: &mut Links,
        stats: &mut XcacheStats,
    ) {
        let prev = self.state;
        self.state = SnoopState::Idle;

        if self.config.enabled && bus.is_write_cycle() && !own_write {
            let addr = bus.address;
            if dcache.reservation_covers(addr) {
                debug!("reservation dropped by external write at {addr:#010x}");
                next.snoop_llsc_inval = true;
            }
            if let Some(slot) = dcache.snoop_match(addr) {
                self.hit();
                if self.burst >= self.config.flush_threshold {
                    info!(hits = self.burst, "snoop burst, flushing dcache");
                    stats.snoop_flush += 1;
                    next.snoop_flush = true;
                    self.burst = 0;
                    self.last_hit = None;
                    self.state = SnoopState::Flush;
                } else {
                    debug!(
                        set = slot.set,
                        way = slot.way,
                        "snoop invalidate at {addr:#010x}"
                    );
                    stats.snoop_inval += 1;
                    dcache.schedule_invalidate(slot);
                    self.state = SnoopState::Inval;
                }
            }
        }

        self.cycle += 1;
        if prev != self.state {
            trace!(from = ?prev, to = ?self.state, "snoop fsm");
        }
    }

    /// Records an external hit in the burst detector.
    fn hit(&mut self) {
        self.burst = match self.last_hit {
            Some(last) if self.cycle - last <= self.config.flush_window => self.burst + 1,
            _ => 1,
        };
        self.last_hit = Some(self.cycle);
    }
}
