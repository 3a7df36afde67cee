//! Cycle-accurate split instruction/data cache controller.
//!
//! This crate models the processor-side cache subsystem of a PIBUS platform:
//! 1. **Core:** Instruction and data caches, write buffer, LL/SC reservation, and the
//!    four FSMs (icache, dcache, bus, snoop) clocked in lock step by [`Xcache`].
//! 2. **Bus:** PIBUS signal bundles, the segment table behind the cached-address
//!    table, and a reference interconnect with a memory target.
//! 3. **Simulation:** A lock-step simulator with blocking request helpers and a
//!    JSON trace runner.
//! 4. **Configuration and statistics:** Validated JSON configuration and the
//!    controller's instrumentation counters.

/// Common types and constants (processor interface, errors, limits).
pub mod common;
/// Controller configuration (defaults, validation, JSON loading).
pub mod config;
/// Controller core (storage units, FSMs, top level).
pub mod core;
/// Lock-step simulator and trace format.
pub mod sim;
/// Bus side (signals, segment table, reference bus and memory).
pub mod soc;
/// Instrumentation counters.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Controller top level; construct with `Xcache::new`.
pub use crate::core::Xcache;
/// Lock-step simulator around one controller.
pub use crate::sim::Simulator;
/// Instrumentation counters.
pub use crate::stats::XcacheStats;
