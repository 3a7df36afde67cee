//! Bus-Side Components.
//!
//! This module holds everything the controller touches outside its own core:
//! the PIBUS signal bundles, the segment table that yields the cached-address
//! table, and a reference interconnect with a memory target used by the
//! simulator and the tests.

/// Reference interconnect: arbiter, target pipeline and external agents.
pub mod interconnect;

/// Sparse memory target.
pub mod memory;

/// Segment table and cached-address table.
pub mod segment;

/// PIBUS signal bundles.
pub mod signals;

pub use interconnect::SystemBus;
pub use memory::MemorySlave;
