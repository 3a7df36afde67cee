//! Simulator: owns the controller and the bus side-by-side.
//!
//! Each [`Simulator::step`] is one clock: the controller's Moore outputs are
//! resolved by the reference bus, then the controller transitions on the sampled
//! inputs. The blocking helpers present one request until it is answered, the way
//! a stalled in-order processor would.

use tracing::debug;

use super::trace::{Trace, TraceOp, TraceOutcome, TraceResult};
use crate::common::data::{DataRequest, DataResponse, InstructionResponse, ProcessorResponse};
use crate::common::error::{ConfigError, SimError};
use crate::config::Config;
use crate::core::Xcache;
use crate::soc::{MemorySlave, SystemBus};

/// Default cycle budget of a blocking helper.
pub const DEFAULT_CYCLE_LIMIT: u64 = 100_000;

/// Top-level simulator: controller + reference bus.
#[derive(Clone, Debug)]
pub struct Simulator {
    xcache: Xcache,
    bus: SystemBus,
    cycle_limit: u64,
}

impl Simulator {
    /// Creates a simulator with an empty memory.
    ///
    /// # Errors
    ///
    /// Returns the configuration error reported by [`Xcache::new`].
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            xcache: Xcache::new(config)?,
            bus: SystemBus::new(MemorySlave::new(config.memory.latency)),
            cycle_limit: DEFAULT_CYCLE_LIMIT,
        })
    }

    /// Sets the cycle budget of the blocking helpers.
    #[must_use]
    pub fn with_cycle_limit(mut self, cycles: u64) -> Self {
        self.cycle_limit = cycles;
        self
    }

    /// Controller.
    pub fn xcache(&self) -> &Xcache {
        &self.xcache
    }

    /// Reference bus.
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    /// Memory behind the bus.
    pub fn memory(&self) -> &MemorySlave {
        self.bus.memory()
    }

    /// Mutable memory, for preloading and fault injection.
    pub fn memory_mut(&mut self) -> &mut MemorySlave {
        self.bus.memory_mut()
    }

    /// Cycles simulated so far.
    pub fn cycle(&self) -> u64 {
        self.bus.cycle()
    }

    /// Resets the controller and the bus pipeline; memory contents are kept.
    pub fn reset(&mut self) {
        self.xcache.reset();
        self.bus.reset();
    }

    /// Advances one clock cycle.
    pub fn step(&mut self, ireq: Option<u32>, dreq: Option<DataRequest>) -> ProcessorResponse {
        let out = self.xcache.moore();
        let inputs = self.bus.cycle_with(&out);
        self.xcache.tick(ireq, dreq, &inputs)
    }

    /// Presents a fetch until it is answered.
    ///
    /// # Errors
    ///
    /// `SimError::Timeout` if the fetch is still refused after the cycle budget.
    pub fn fetch(&mut self, addr: u32) -> Result<InstructionResponse, SimError> {
        for _ in 0..self.cycle_limit {
            let rsp = self.step(Some(addr), None).instruction;
            if !rsp.is_stall() {
                return Ok(rsp);
            }
        }
        Err(SimError::Timeout {
            op: "fetch",
            addr,
            cycles: self.cycle_limit,
        })
    }

    /// Presents a data request until it is answered.
    ///
    /// # Errors
    ///
    /// `SimError::Timeout` if the request is still refused after the cycle budget.
    pub fn data(&mut self, req: DataRequest) -> Result<DataResponse, SimError> {
        for _ in 0..self.cycle_limit {
            let rsp = self.step(None, Some(req)).data;
            if !rsp.is_stall() {
                return Ok(rsp);
            }
        }
        Err(SimError::Timeout {
            op: "data request",
            addr: req.addr,
            cycles: self.cycle_limit,
        })
    }

    /// Word read.
    ///
    /// # Errors
    ///
    /// See [`Simulator::data`].
    pub fn read(&mut self, addr: u32) -> Result<DataResponse, SimError> {
        self.data(DataRequest::read(addr))
    }

    /// Full-word write.
    ///
    /// # Errors
    ///
    /// See [`Simulator::data`].
    pub fn write(&mut self, addr: u32, data: u32) -> Result<DataResponse, SimError> {
        self.data(DataRequest::write(addr, data))
    }

    /// Partial write under byte enables.
    ///
    /// # Errors
    ///
    /// See [`Simulator::data`].
    pub fn write_bytes(&mut self, addr: u32, data: u32, be: u8) -> Result<DataResponse, SimError> {
        self.data(DataRequest::write_bytes(addr, data, be))
    }

    /// Load-linked.
    ///
    /// # Errors
    ///
    /// See [`Simulator::data`].
    pub fn load_linked(&mut self, addr: u32) -> Result<DataResponse, SimError> {
        self.data(DataRequest::load_linked(addr))
    }

    /// Store-conditional.
    ///
    /// # Errors
    ///
    /// See [`Simulator::data`].
    pub fn store_conditional(&mut self, addr: u32, data: u32) -> Result<DataResponse, SimError> {
        self.data(DataRequest::store_conditional(addr, data))
    }

    /// Line invalidate.
    ///
    /// # Errors
    ///
    /// See [`Simulator::data`].
    pub fn invalidate(&mut self, addr: u32) -> Result<DataResponse, SimError> {
        self.data(DataRequest::invalidate(addr))
    }

    /// Runs `cycles` cycles without processor requests.
    pub fn idle(&mut self, cycles: u64) {
        for _ in 0..cycles {
            let _ = self.step(None, None);
        }
    }

    /// Queues a write by another bus master without advancing time.
    pub fn schedule_external_write(&mut self, addr: u32, data: u32) {
        self.bus.schedule_external_write(addr, data);
    }

    /// Issues a write by another bus master and idles until it has appeared on the bus.
    ///
    /// The snoop FSM samples the write in the cycle it appears; its effects are
    /// visible to the next request.
    ///
    /// # Errors
    ///
    /// `SimError::Timeout` if the bus stays owned for the whole cycle budget.
    pub fn external_write(&mut self, addr: u32, data: u32) -> Result<(), SimError> {
        self.bus.schedule_external_write(addr, data);
        for _ in 0..self.cycle_limit {
            if self.bus.pending_external_writes() == 0 {
                return Ok(());
            }
            let _ = self.step(None, None);
        }
        Err(SimError::Timeout {
            op: "external write",
            addr,
            cycles: self.cycle_limit,
        })
    }

    /// Idles until the write buffer is empty, the bus is free and every external
    /// write has been presented.
    ///
    /// # Returns
    ///
    /// The number of cycles spent.
    ///
    /// # Errors
    ///
    /// `SimError::DrainTimeout` if that state is not reached within the cycle budget.
    pub fn drain(&mut self) -> Result<u64, SimError> {
        for spent in 0..self.cycle_limit {
            if self.is_drained() {
                debug!(cycles = spent, "drained");
                return Ok(spent);
            }
            let _ = self.step(None, None);
        }
        if self.is_drained() {
            return Ok(self.cycle_limit);
        }
        Err(SimError::DrainTimeout(self.cycle_limit))
    }

    fn is_drained(&self) -> bool {
        self.xcache.is_quiescent()
            && !self.bus.is_busy()
            && self.bus.pending_external_writes() == 0
    }

    /// Loads the trace's memory image and fault ranges, then runs its operations.
    ///
    /// # Errors
    ///
    /// The first helper timeout.
    pub fn run_trace(&mut self, trace: &Trace) -> Result<Vec<TraceOutcome>, SimError> {
        for image in &trace.memory {
            self.memory_mut().load(image.base, &image.words);
        }
        for fault in &trace.faults {
            self.memory_mut().add_fault(fault.start..fault.end);
        }

        let mut outcomes = Vec::with_capacity(trace.ops.len());
        for (index, &op) in trace.ops.iter().enumerate() {
            let result = match op {
                TraceOp::Fetch { addr } => TraceResult::from(self.fetch(addr)?),
                TraceOp::Read { addr } => TraceResult::from(self.read(addr)?),
                TraceOp::Write { addr, data, be } => {
                    TraceResult::from(self.write_bytes(addr, data, be)?)
                }
                TraceOp::Ll { addr } => TraceResult::from(self.load_linked(addr)?),
                TraceOp::Sc { addr, data } => {
                    TraceResult::from(self.store_conditional(addr, data)?)
                }
                TraceOp::Invalidate { addr } => TraceResult::from(self.invalidate(addr)?),
                TraceOp::ExternalWrite { addr, data } => {
                    self.external_write(addr, data)?;
                    TraceResult::Observed
                }
                TraceOp::Idle { cycles } => {
                    self.idle(cycles);
                    TraceResult::Elapsed { spent: cycles }
                }
                TraceOp::Drain => TraceResult::Elapsed {
                    spent: self.drain()?,
                },
            };
            outcomes.push(TraceOutcome {
                index,
                cycle: self.cycle(),
                op,
                result,
            });
        }
        Ok(outcomes)
    }
}
