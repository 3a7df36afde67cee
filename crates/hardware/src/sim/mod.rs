//! Lock-step simulation around one controller.
//!
//! Provides the [`Simulator`], which clocks an `Xcache` against the reference
//! bus, and the JSON [`Trace`] format it replays.

/// Controller + bus simulator and blocking request helpers.
pub mod simulator;

/// JSON request traces.
pub mod trace;

pub use simulator::Simulator;
pub use trace::{Trace, TraceOp, TraceOutcome, TraceResult};
