//! Controller statistics.
//!
//! This module tracks the instrumentation counters of the cache controller. It provides:
//! 1. **Cycles:** Total cycles and cycles where the processor was frozen by either cache.
//! 2. **Instruction cache:** Served requests, misses, uncached reads and their stall cycles.
//! 3. **Data cache:** Cached reads, misses, uncached reads, writes and store-conditional outcomes.
//! 4. **Coherence:** Snoop line invalidations and full flushes.
//!
//! Counters are only ever incremented by the FSM transitions; nothing here feeds
//! back into control flow. Reporting is left to the caller (the CLI serializes the
//! struct with `serde_json`).

use serde::Serialize;

/// Instrumentation counters of one controller instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct XcacheStats {
    /// Cycles simulated since construction or reset.
    pub total_cycles: u64,
    /// Cycles where at least one processor request was refused.
    pub frz_cycles: u64,

    /// Instruction requests served from the instruction cache (IREQ).
    pub ireq: u64,
    /// Instruction miss transactions (IMISS).
    pub imiss: u64,
    /// Stall cycles charged to instruction misses.
    pub imiss_frz: u64,
    /// Uncached instruction reads.
    pub iunc: u64,
    /// Stall cycles charged to uncached instruction reads.
    pub iunc_frz: u64,

    /// Cached data reads served from the data cache (DREQ).
    pub dread: u64,
    /// Data miss transactions (DMISS).
    pub dmiss: u64,
    /// Stall cycles charged to data misses.
    pub dmiss_frz: u64,
    /// Uncached data reads (UNC).
    pub dunc: u64,
    /// Stall cycles charged to uncached data reads.
    pub dunc_frz: u64,
    /// Writes posted to the write buffer (WRITE).
    pub write: u64,
    /// Stall cycles spent waiting for write buffer space.
    pub write_frz: u64,
    /// Successful store-conditionals.
    pub sc_ok: u64,
    /// Failed store-conditionals.
    pub sc_ko: u64,

    /// Data cache lines invalidated by external writes.
    pub snoop_inval: u64,
    /// Full data cache flushes triggered by snoop bursts.
    pub snoop_flush: u64,
}

/// Ratios derived from [`XcacheStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DerivedStats {
    /// Instruction misses per served instruction request.
    pub imiss_rate: f64,
    /// Data misses per served cached data read.
    pub dmiss_rate: f64,
    /// Average stall cycles per instruction miss.
    pub imiss_latency: f64,
    /// Average stall cycles per data miss.
    pub dmiss_latency: f64,
    /// Average stall cycles per uncached instruction read.
    pub iunc_latency: f64,
    /// Average stall cycles per uncached data read.
    pub dunc_latency: f64,
    /// Average buffer-full stall cycles per write.
    pub write_latency: f64,
    /// Fraction of cycles the processor was frozen.
    pub cpi_penalty: f64,
}

/// `num / den`, or 0 when nothing was counted.
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl XcacheStats {
    /// Instruction miss rate.
    pub fn imiss_rate(&self) -> f64 {
        ratio(self.imiss, self.ireq)
    }

    /// Data miss rate.
    pub fn dmiss_rate(&self) -> f64 {
        ratio(self.dmiss, self.dread)
    }

    /// Average instruction miss cost in cycles.
    pub fn imiss_latency(&self) -> f64 {
        ratio(self.imiss_frz, self.imiss)
    }

    /// Average data miss cost in cycles.
    pub fn dmiss_latency(&self) -> f64 {
        ratio(self.dmiss_frz, self.dmiss)
    }

    /// Average uncached instruction read cost in cycles.
    pub fn iunc_latency(&self) -> f64 {
        ratio(self.iunc_frz, self.iunc)
    }

    /// Average uncached data read cost in cycles.
    pub fn dunc_latency(&self) -> f64 {
        ratio(self.dunc_frz, self.dunc)
    }

    /// Average write-buffer-full stall per write.
    pub fn write_latency(&self) -> f64 {
        ratio(self.write_frz, self.write)
    }

    /// Frozen cycles over total cycles.
    pub fn cpi_penalty(&self) -> f64 {
        ratio(self.frz_cycles, self.total_cycles)
    }

    /// Computes every derived ratio at once.
    pub fn derived(&self) -> DerivedStats {
        DerivedStats {
            imiss_rate: self.imiss_rate(),
            dmiss_rate: self.dmiss_rate(),
            imiss_latency: self.imiss_latency(),
            dmiss_latency: self.dmiss_latency(),
            iunc_latency: self.iunc_latency(),
            dunc_latency: self.dunc_latency(),
            write_latency: self.write_latency(),
            cpi_penalty: self.cpi_penalty(),
        }
    }
}
