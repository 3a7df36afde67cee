//! Bus-side tests.

/// Reference bus: arbitration, pipelining and external writes.
pub mod interconnect;
