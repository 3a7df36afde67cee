//! Error definitions.
//!
//! This module defines the error handling for the controller. It provides:
//! 1. **Configuration Errors:** Geometry, write-buffer, snoop and segment-table
//!    violations rejected before simulation starts.
//! 2. **Bus Errors:** Failed bus transactions, carried back to the requesting FSM
//!    (precise read errors) or latched for deferred reporting (write errors).
//! 3. **Simulation Errors:** Failures of the lock-step simulator and trace runner.

use thiserror::Error;

/// Rejected construction-time configuration.
///
/// Every variant is fatal: a controller is never built from a configuration that
/// fails validation, and nothing is re-checked while simulating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A geometry parameter is zero or not a power of two.
    #[error("{cache}: {param} = {value} is not a power of two")]
    NotPowerOfTwo {
        /// Which cache the parameter belongs to.
        cache: &'static str,
        /// Parameter name (`sets`, `words` or `ways`).
        param: &'static str,
        /// Offending value.
        value: u32,
    },

    /// A geometry parameter exceeds its hardware limit.
    #[error("{cache}: {param} = {value} exceeds the maximum of {max}")]
    TooLarge {
        /// Which cache the parameter belongs to.
        cache: &'static str,
        /// Parameter name (`sets`, `words` or `ways`).
        param: &'static str,
        /// Offending value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// The write buffer must hold at least one entry.
    #[error("write buffer depth must be positive")]
    ZeroWriteBufferDepth,

    /// The snoop flush threshold must be at least one hit.
    #[error("snoop flush threshold must be positive")]
    ZeroFlushThreshold,

    /// The cached-address table decodes an unsupported number of MSBs.
    #[error("segment table decodes {0} address MSBs, expected 1..=16")]
    MsbBits(u32),

    /// A segment has no extent.
    #[error("segment {0} is empty")]
    EmptySegment(String),

    /// A segment runs past the end of the 32-bit address space.
    #[error("segment {0} wraps around the address space")]
    SegmentWraps(String),

    /// Two segments share addresses.
    #[error("segments {0} and {1} overlap")]
    SegmentOverlap(String, String),

    /// Two segments with different cacheability share one decoded MSB slot.
    #[error("segments {0} and {1} disagree on cacheability within one table slot")]
    CacheabilityConflict(String, String),

    /// The configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// A failed bus transaction.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The target answered with an error acknowledge.
    #[error("bus error acknowledge at {addr:#010x}")]
    Acknowledge {
        /// Address of the word being transferred.
        addr: u32,
    },

    /// The bus timeout line was raised.
    #[error("bus timeout at {addr:#010x}")]
    Timeout {
        /// Address of the word being transferred.
        addr: u32,
    },
}

impl BusError {
    /// Address of the word whose transfer failed.
    pub const fn addr(&self) -> u32 {
        match *self {
            Self::Acknowledge { addr } | Self::Timeout { addr } => addr,
        }
    }
}

/// Errors raised by the simulator around the controller.
#[derive(Debug, Error)]
pub enum SimError {
    /// A request stayed refused for the whole cycle budget.
    #[error("{op} at {addr:#010x} not answered after {cycles} cycles")]
    Timeout {
        /// Operation being presented.
        op: &'static str,
        /// Address of the request.
        addr: u32,
        /// Cycles spent presenting it.
        cycles: u64,
    },

    /// The controller or the write buffer never became idle.
    #[error("drain not finished after {0} cycles")]
    DrainTimeout(u64),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A trace file could not be parsed.
    #[error("invalid trace: {0}")]
    Trace(#[from] serde_json::Error),
}
