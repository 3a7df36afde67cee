//! Cache controller top level.
//!
//! `Xcache` wires the four FSMs, the two caches, the write buffer and the
//! reservation together and advances them in lock step. Each cycle the owner:
//! 1. Reads [`Xcache::moore`] and drives those outputs onto the bus.
//! 2. Calls [`Xcache::tick`] with the processor requests and the sampled bus inputs.
//!
//! Inside `tick`, every FSM computes its next state from the state and cross-FSM
//! signals latched at the end of the previous cycle. Write buffer pushes are applied
//! after the bus FSM has run, so a push never races the pop of the same cycle.

use tracing::info;

use crate::common::data::{DataRequest, ProcessorResponse};
use crate::common::error::ConfigError;
use crate::config::Config;
use crate::core::fsm::Links;
use crate::core::fsm::dcache::{DcacheFsm, DcacheInputs, DcacheState};
use crate::core::fsm::icache::{IcacheFsm, IcacheState};
use crate::core::fsm::pibus::{PibusFsm, PibusState};
use crate::core::fsm::snoop::{SnoopFsm, SnoopState};
use crate::core::units::cache::CacheStorage;
use crate::core::units::llsc::Reservation;
use crate::core::units::write_buffer::WriteBuffer;
use crate::soc::segment::CachedTable;
use crate::soc::signals::{BusInputs, BusOutputs};
use crate::stats::XcacheStats;

/// Split instruction/data cache controller with write buffer, LL/SC and snoop.
#[derive(Clone, Debug)]
pub struct Xcache {
    config: Config,
    table: CachedTable,
    icache: IcacheFsm,
    dcache: DcacheFsm,
    pibus: PibusFsm,
    snoop: SnoopFsm,
    wbuf: WriteBuffer,
    links: Links,
    stats: XcacheStats,
}

impl Xcache {
    /// Builds a controller from a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first constraint violated by `config` (geometry, write buffer
    /// depth, snoop threshold or segment table).
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let table = config.validate()?;

        info!(
            name = %config.general.name,
            proc_id = config.general.proc_id,
            icache = ?config.icache,
            dcache = ?config.dcache,
            wbuf_depth = config.write_buffer.depth,
            snoop = config.snoop.enabled,
            "xcache created"
        );

        Ok(Self {
            config: config.clone(),
            table,
            icache: IcacheFsm::new(&config.icache),
            dcache: DcacheFsm::new(&config.dcache),
            pibus: PibusFsm::new(config.icache.words, config.dcache.words),
            snoop: SnoopFsm::new(config.snoop),
            wbuf: WriteBuffer::new(config.write_buffer.depth),
            links: Links::default(),
            stats: XcacheStats::default(),
        })
    }

    /// Bus outputs for the current cycle.
    pub fn moore(&self) -> BusOutputs {
        self.pibus.moore()
    }

    /// Advances every FSM by one cycle.
    ///
    /// # Arguments
    ///
    /// * `ireq` - Instruction fetch address, if the processor fetches this cycle.
    /// * `dreq` - Data request, if any.
    /// * `bus` - Bus inputs sampled this cycle.
    ///
    /// # Returns
    ///
    /// The instruction and data responses. A `Stall` asks the processor to present
    /// the same request again next cycle.
    pub fn tick(
        &mut self,
        ireq: Option<u32>,
        dreq: Option<DataRequest>,
        bus: &BusInputs,
    ) -> ProcessorResponse {
        let cur = self.links;
        let mut next = cur;
        let wbuf_full = self.wbuf.is_full();
        let own_write = self.pibus.drives_write_address();

        let instruction = self.icache.transition(
            ireq,
            &self.table,
            &cur,
            &mut next,
            self.pibus.icache_buffer(),
            &mut self.stats,
        );

        let step = self.dcache.transition(
            DcacheInputs {
                req: dreq,
                table: &self.table,
                wbuf_full,
                buf: self.pibus.dcache_buffer(),
            },
            &cur,
            &mut next,
            &mut self.stats,
        );

        self.pibus.transition(bus, &cur, &mut next, &mut self.wbuf);

        if let Some(entry) = step.push {
            let pushed = self.wbuf.push(entry);
            debug_assert!(pushed, "write buffer overflow");
        }

        // Snoop reads the data cache after its update of this cycle.
        self.snoop.transition(
            bus,
            own_write,
            &mut self.dcache,
            &mut next,
            &mut self.stats,
        );

        self.links = next;
        self.stats.total_cycles += 1;
        if instruction.is_stall() || step.rsp.is_stall() {
            self.stats.frz_cycles += 1;
        }

        ProcessorResponse {
            instruction,
            data: step.rsp,
        }
    }

    /// Clears every FSM, both caches, the write buffer, the reservation and the counters.
    pub fn reset(&mut self) {
        self.icache.reset();
        self.dcache.reset();
        self.pibus.reset();
        self.snoop.reset();
        self.wbuf.clear();
        self.links = Links::default();
        self.stats = XcacheStats::default();
        info!(name = %self.config.general.name, "xcache reset");
    }

    /// Configuration the controller was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Instrumentation counters.
    pub fn stats(&self) -> &XcacheStats {
        &self.stats
    }

    /// Instruction cache FSM state.
    pub fn icache_state(&self) -> IcacheState {
        self.icache.state()
    }

    /// Data cache FSM state.
    pub fn dcache_state(&self) -> DcacheState {
        self.dcache.state()
    }

    /// Bus FSM state.
    pub fn pibus_state(&self) -> PibusState {
        self.pibus.state()
    }

    /// Snoop FSM state.
    pub fn snoop_state(&self) -> SnoopState {
        self.snoop.state()
    }

    /// Instruction cache storage.
    pub fn icache(&self) -> &CacheStorage {
        self.icache.storage()
    }

    /// Data cache storage.
    pub fn dcache(&self) -> &CacheStorage {
        self.dcache.storage()
    }

    /// Write buffer.
    pub fn write_buffer(&self) -> &WriteBuffer {
        &self.wbuf
    }

    /// LL/SC reservation.
    pub fn reservation(&self) -> Reservation {
        self.dcache.reservation()
    }

    /// Cross-FSM signals latched at the end of the last cycle.
    pub fn links(&self) -> &Links {
        &self.links
    }

    /// Returns true if no transaction is in flight or pending.
    pub fn is_quiescent(&self) -> bool {
        self.pibus.state() == PibusState::Idle
            && self.wbuf.is_empty()
            && self.links.icache_req.is_none()
            && self.links.dcache_req.is_none()
    }
}
