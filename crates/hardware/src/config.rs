//! Configuration system for the cache controller.
//!
//! This module defines all configuration structures used to parameterize the
//! controller. It provides:
//! 1. **Defaults:** Baseline geometry, write-buffer depth and snoop thresholds.
//! 2. **Structures:** Hierarchical config for the instance, both caches, the write
//!    buffer, the snoop path, the segment table and the reference memory.
//! 3. **Validation:** Construction-time checks of every hardware limit.
//!
//! Configuration is supplied as JSON (CLI, tests) or built with `Config::default()`.

use serde::Deserialize;

use crate::common::constants::{MAX_SETS, MAX_WAYS, MAX_WORDS};
use crate::common::error::ConfigError;
use crate::soc::segment::{CachedTable, SegmentTable};

/// Default configuration constants for the controller.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden in JSON configuration files.
mod defaults {
    /// Processor identifier of the instance.
    pub const PROC_ID: u32 = 0;

    /// Instance name used in log records.
    pub const NAME: &str = "xcache";

    /// Default cache associativity (1 way = direct-mapped).
    pub const CACHE_WAYS: u32 = 1;

    /// Default number of sets per cache.
    pub const CACHE_SETS: u32 = 128;

    /// Default number of 32-bit words per cache line.
    pub const CACHE_WORDS: u32 = 8;

    /// Default write-buffer depth in entries.
    pub const WBUF_DEPTH: usize = 8;

    /// Number of external hits in one burst that triggers a data cache flush.
    pub const SNOOP_FLUSH_THRESHOLD: u32 = 3;

    /// Largest gap, in cycles, between two external hits of the same burst.
    pub const SNOOP_FLUSH_WINDOW: u64 = 2;

    /// Default wait cycles inserted by the reference memory per word.
    pub const MEMORY_LATENCY: u32 = 0;
}

/// Root configuration structure containing all controller settings.
///
/// # Examples
///
/// ```
/// use xcache_core::config::Config;
///
/// let json = r#"{
///     "icache": { "ways": 2, "sets": 4, "words": 4 },
///     "dcache": { "ways": 2, "sets": 4, "words": 4 },
///     "write_buffer": { "depth": 4 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.dcache.ways, 2);
/// assert!(config.snoop.enabled);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Instance identification.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Instruction cache geometry.
    #[serde(default)]
    pub icache: CacheConfig,
    /// Data cache geometry.
    #[serde(default)]
    pub dcache: CacheConfig,
    /// Write buffer.
    #[serde(default)]
    pub write_buffer: WriteBufferConfig,
    /// Snoop-invalidate mechanism.
    #[serde(default)]
    pub snoop: SnoopConfig,
    /// Platform segment table, source of the cached-address table.
    #[serde(default)]
    pub segments: SegmentTable,
    /// Reference memory timing (simulator only; ignored by the controller).
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and any validation error
    /// reported by [`Config::validate`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        let _ = config.validate()?;
        Ok(config)
    }

    /// Checks every construction-time constraint.
    ///
    /// # Returns
    ///
    /// The cached-address table compiled from `segments`, ready for the controller.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<CachedTable, ConfigError> {
        self.icache.validate("icache")?;
        self.dcache.validate("dcache")?;
        if self.write_buffer.depth == 0 {
            return Err(ConfigError::ZeroWriteBufferDepth);
        }
        if self.snoop.flush_threshold == 0 {
            return Err(ConfigError::ZeroFlushThreshold);
        }
        self.segments.cached_table()
    }
}

/// Instance identification.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Processor identifier.
    #[serde(default = "GeneralConfig::default_proc_id")]
    pub proc_id: u32,

    /// Instance name.
    #[serde(default = "GeneralConfig::default_name")]
    pub name: String,
}

impl GeneralConfig {
    fn default_proc_id() -> u32 {
        defaults::PROC_ID
    }

    fn default_name() -> String {
        defaults::NAME.to_string()
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            proc_id: defaults::PROC_ID,
            name: defaults::NAME.to_string(),
        }
    }
}

/// Geometry of one set-associative cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Associative ways per set (power of two, at most 8).
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: u32,

    /// Number of sets (power of two, at most 1024).
    #[serde(default = "CacheConfig::default_sets")]
    pub sets: u32,

    /// Words per line (power of two, at most 32).
    #[serde(default = "CacheConfig::default_words")]
    pub words: u32,
}

impl CacheConfig {
    /// Creates a geometry without validating it.
    pub const fn new(ways: u32, sets: u32, words: u32) -> Self {
        Self { ways, sets, words }
    }

    /// Returns the default cache associativity (number of ways).
    fn default_ways() -> u32 {
        defaults::CACHE_WAYS
    }

    /// Returns the default number of sets.
    fn default_sets() -> u32 {
        defaults::CACHE_SETS
    }

    /// Returns the default number of words per line.
    fn default_words() -> u32 {
        defaults::CACHE_WORDS
    }

    /// Line size in bytes.
    pub const fn line_bytes(&self) -> u32 {
        self.words * crate::common::constants::WORD_BYTES
    }

    /// Checks the power-of-two and size limits.
    ///
    /// # Arguments
    ///
    /// * `cache` - Cache name reported in the error (`"icache"` or `"dcache"`).
    ///
    /// # Errors
    ///
    /// `ConfigError::NotPowerOfTwo` or `ConfigError::TooLarge` for the first
    /// offending parameter, checked in the order sets, words, ways.
    pub fn validate(&self, cache: &'static str) -> Result<(), ConfigError> {
        for (param, value, max) in [
            ("sets", self.sets, MAX_SETS),
            ("words", self.words, MAX_WORDS),
            ("ways", self.ways, MAX_WAYS),
        ] {
            if !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo {
                    cache,
                    param,
                    value,
                });
            }
            if value > max {
                return Err(ConfigError::TooLarge {
                    cache,
                    param,
                    value,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    /// Creates a default cache configuration.
    ///
    /// Direct-mapped, 128 sets of 8-word lines (4 KiB).
    fn default() -> Self {
        Self {
            ways: defaults::CACHE_WAYS,
            sets: defaults::CACHE_SETS,
            words: defaults::CACHE_WORDS,
        }
    }
}

/// Write buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WriteBufferConfig {
    /// FIFO depth in entries.
    #[serde(default = "WriteBufferConfig::default_depth")]
    pub depth: usize,
}

impl WriteBufferConfig {
    fn default_depth() -> usize {
        defaults::WBUF_DEPTH
    }
}

impl Default for WriteBufferConfig {
    fn default() -> Self {
        Self {
            depth: defaults::WBUF_DEPTH,
        }
    }
}

/// Snoop-invalidate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SnoopConfig {
    /// Observe external writes at all.
    #[serde(default = "SnoopConfig::default_enabled")]
    pub enabled: bool,

    /// External hits in one burst that escalate to a full data cache flush.
    #[serde(default = "SnoopConfig::default_flush_threshold")]
    pub flush_threshold: u32,

    /// Largest gap in cycles between two hits counted in the same burst.
    #[serde(default = "SnoopConfig::default_flush_window")]
    pub flush_window: u64,
}

impl SnoopConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_flush_threshold() -> u32 {
        defaults::SNOOP_FLUSH_THRESHOLD
    }

    fn default_flush_window() -> u64 {
        defaults::SNOOP_FLUSH_WINDOW
    }
}

impl Default for SnoopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_threshold: defaults::SNOOP_FLUSH_THRESHOLD,
            flush_window: defaults::SNOOP_FLUSH_WINDOW,
        }
    }
}

/// Reference memory timing used by [`crate::soc::memory::MemorySlave`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Wait cycles before each word is acknowledged.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u32,
}

impl MemoryConfig {
    fn default_latency() -> u32 {
        defaults::MEMORY_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            latency: defaults::MEMORY_LATENCY,
        }
    }
}
