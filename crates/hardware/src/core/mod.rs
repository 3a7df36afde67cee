//! Cache controller core.
//!
//! This module contains the storage-level units (cache arrays, write buffer,
//! reservation), the four FSMs and the `Xcache` top level that clocks them.

/// Instruction cache, data cache, PIBUS and snoop state machines.
pub mod fsm;

/// Cache storage, write buffer and LL/SC reservation.
pub mod units;

/// Controller top level.
pub mod xcache;

pub use self::xcache::Xcache;
