//! Segment table and cached-address table.
//!
//! The platform address map is described by a list of segments, each flagged
//! cacheable or not. The controller never walks that list while simulating:
//! at construction it is compiled into a [`CachedTable`], a ROM indexed by the
//! most-significant bits of an address.

use serde::Deserialize;

use crate::common::constants::MAX_MSB_BITS;
use crate::common::error::ConfigError;

/// One contiguous range of the platform address map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Segment {
    /// Segment name, used in diagnostics.
    pub name: String,
    /// First byte address.
    pub base: u32,
    /// Size in bytes.
    pub size: u32,
    /// Whether accesses to this range may be cached.
    #[serde(default)]
    pub cacheable: bool,
}

impl Segment {
    /// Creates a segment.
    pub fn new(name: impl Into<String>, base: u32, size: u32, cacheable: bool) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            cacheable,
        }
    }

    /// Address one past the last byte, widened so the top segment does not wrap.
    fn end(&self) -> u64 {
        u64::from(self.base) + u64::from(self.size)
    }
}

/// Platform address map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SegmentTable {
    /// Number of address MSBs decoded by the cached-address table.
    #[serde(default = "SegmentTable::default_msb_bits")]
    pub msb_bits: u32,
    /// Mapped segments, in any order.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl SegmentTable {
    fn default_msb_bits() -> u32 {
        8
    }

    /// Creates an empty table decoding `msb_bits` MSBs.
    pub fn new(msb_bits: u32) -> Self {
        Self {
            msb_bits,
            segments: Vec::new(),
        }
    }

    /// Appends a segment (builder style).
    #[must_use]
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Compiles the table into the MSB-indexed cacheability ROM.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported `msb_bits`, an empty or wrapping segment,
    /// overlapping segments, or segments of different cacheability sharing one
    /// table slot.
    pub fn cached_table(&self) -> Result<CachedTable, ConfigError> {
        if self.msb_bits == 0 || self.msb_bits > MAX_MSB_BITS {
            return Err(ConfigError::MsbBits(self.msb_bits));
        }

        for seg in &self.segments {
            if seg.size == 0 {
                return Err(ConfigError::EmptySegment(seg.name.clone()));
            }
            if seg.end() > 1u64 << 32 {
                return Err(ConfigError::SegmentWraps(seg.name.clone()));
            }
        }

        let mut sorted: Vec<&Segment> = self.segments.iter().collect();
        sorted.sort_by_key(|s| s.base);
        for pair in sorted.windows(2) {
            if pair[0].end() > u64::from(pair[1].base) {
                return Err(ConfigError::SegmentOverlap(
                    pair[0].name.clone(),
                    pair[1].name.clone(),
                ));
            }
        }

        let shift = 32 - self.msb_bits;
        let mut owner: Vec<Option<&Segment>> = vec![None; 1 << self.msb_bits];
        for seg in &self.segments {
            let first = (seg.base >> shift) as usize;
            let last = ((seg.end() - 1) >> shift) as usize;
            for slot in &mut owner[first..=last] {
                if let Some(prev) = *slot
                    && prev.cacheable != seg.cacheable
                {
                    return Err(ConfigError::CacheabilityConflict(
                        prev.name.clone(),
                        seg.name.clone(),
                    ));
                }
                *slot = Some(seg);
            }
        }

        Ok(CachedTable {
            table: owner
                .into_iter()
                .map(|s| s.is_some_and(|s| s.cacheable))
                .collect(),
            shift,
        })
    }
}

impl Default for SegmentTable {
    /// A small MIPS platform: text, data and boot ROM cached, TTY uncached.
    fn default() -> Self {
        Self::new(Self::default_msb_bits())
            .with_segment(Segment::new("seg_text", 0x0040_0000, 0x0010_0000, true))
            .with_segment(Segment::new("seg_data", 0x1000_0000, 0x0100_0000, true))
            .with_segment(Segment::new("seg_reset", 0xBFC0_0000, 0x0001_0000, true))
            .with_segment(Segment::new("seg_tty", 0xC020_0000, 0x40, false))
    }
}

/// Read-only cacheability ROM keyed by address MSBs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTable {
    table: Box<[bool]>,
    shift: u32,
}

impl CachedTable {
    /// Returns whether `addr` lies in a cacheable range.
    #[inline]
    pub fn is_cached(&self, addr: u32) -> bool {
        self.table[(addr >> self.shift) as usize]
    }

    /// Number of table slots.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Always false: a compiled table has at least two slots.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
