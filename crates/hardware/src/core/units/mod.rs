//! Storage-level units driven by the FSMs.
//!
//! None of these schedule themselves: each is a plain data structure mutated by
//! its owning FSM's transition.

/// Set-associative cache arrays with pseudo-LRU replacement.
pub mod cache;

/// LL/SC reservation register.
pub mod llsc;

/// Posted-write FIFO between the data cache and the bus.
pub mod write_buffer;
