//! Common utilities and types used throughout the cache controller.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the controller. It includes:
//! 1. **Constants:** Word size and the geometry limits of the caches.
//! 2. **Processor Interface:** Request and response types exchanged every cycle.
//! 3. **Error Handling:** Configuration, bus and simulation error types.

/// Common constants used throughout the controller.
pub mod constants;

/// Processor request and response definitions.
pub mod data;

/// Error types.
pub mod error;

pub use data::{DataKind, DataRequest, DataResponse, InstructionResponse, ProcessorResponse};
pub use error::{BusError, ConfigError, SimError};
