//! Set-Associative Cache Storage.
//!
//! This module implements the tag/data array shared by the instruction and data
//! caches. It is a pure data structure: the owning FSM decides when to look up,
//! fill, update or invalidate a line. It provides:
//! 1. **Lookup:** Tag match with pseudo-LRU update on hit, and side-effect-free lookups.
//! 2. **Refill:** Victim selection (invalid way first, then PLRU) and line commit.
//! 3. **Write-through update:** In-place word update under byte enables on a write hit.
//! 4. **Deferred invalidation:** Per-slot pending-invalidate flags set by the snoop
//!    path and applied by the data-cache FSM.
//!
//! Address layout, from the LSB: 2 byte-offset bits, `log2(words)` word bits,
//! `log2(sets)` set bits, then the tag.

/// Pseudo-LRU replacement policy.
pub mod plru;

use self::plru::PlruPolicy;
use crate::common::constants::WORD_SHIFT;
use crate::common::data::merge_bytes;
use crate::config::CacheConfig;

/// A (set, way) position in the array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Set index.
    pub set: usize,
    /// Way index within the set.
    pub way: usize,
}

/// Cache line entry containing tag, validity and data words.
#[derive(Clone, Debug)]
pub struct CacheLine {
    tag: u32,
    valid: bool,
    words: Box<[u32]>,
}

impl CacheLine {
    fn empty(words: usize) -> Self {
        Self {
            tag: 0,
            valid: false,
            words: vec![0; words].into_boxed_slice(),
        }
    }

    /// Whether the line holds data.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Tag/data array of one cache.
#[derive(Clone, Debug)]
pub struct CacheStorage {
    lines: Vec<CacheLine>,
    ways: usize,
    sets: usize,
    words: usize,
    set_shift: u32,
    tag_shift: u32,
    policy: PlruPolicy,
    pending: Vec<bool>,
    pending_count: usize,
}

impl CacheStorage {
    /// Creates an empty (all invalid) cache.
    ///
    /// The geometry must already be validated (powers of two within limits).
    pub fn new(geometry: &CacheConfig) -> Self {
        let ways = geometry.ways as usize;
        let sets = geometry.sets as usize;
        let words = geometry.words as usize;
        let set_shift = WORD_SHIFT + geometry.words.trailing_zeros();
        let tag_shift = set_shift + geometry.sets.trailing_zeros();

        Self {
            lines: (0..sets * ways).map(|_| CacheLine::empty(words)).collect(),
            ways,
            sets,
            words,
            set_shift,
            tag_shift,
            policy: PlruPolicy::new(sets, ways),
            pending: vec![false; sets * ways],
            pending_count: 0,
        }
    }

    /// Byte address of the first word of the line holding `addr`.
    #[inline]
    pub fn line_base(&self, addr: u32) -> u32 {
        addr & !((1u32 << self.set_shift) - 1)
    }

    /// Returns true if both addresses fall in the same line.
    #[inline]
    pub fn same_line(&self, a: u32, b: u32) -> bool {
        self.line_base(a) == self.line_base(b)
    }

    /// Index of the word holding `addr` within its line.
    #[inline]
    pub fn word_index(&self, addr: u32) -> usize {
        ((addr >> WORD_SHIFT) as usize) & (self.words - 1)
    }

    /// Set selected by `addr`.
    #[inline]
    pub fn set_index(&self, addr: u32) -> usize {
        ((addr >> self.set_shift) as usize) & (self.sets - 1)
    }

    #[inline]
    fn tag_of(&self, addr: u32) -> u32 {
        // A 1-set, 1-word cache keeps 30 tag bits; wider shifts never reach 32.
        addr >> self.tag_shift
    }

    #[inline]
    fn idx(&self, slot: Slot) -> usize {
        slot.set * self.ways + slot.way
    }

    /// Line at `slot`.
    pub fn line(&self, slot: Slot) -> &CacheLine {
        &self.lines[self.idx(slot)]
    }

    /// Finds the valid line holding `addr` without touching replacement state.
    pub fn find(&self, addr: u32) -> Option<Slot> {
        let set = self.set_index(addr);
        let tag = self.tag_of(addr);
        (0..self.ways)
            .map(|way| Slot { set, way })
            .find(|&slot| {
                let line = self.line(slot);
                line.valid && line.tag == tag
            })
    }

    /// Reads the word at `addr` on a hit, marking the line most recently used.
    pub fn read(&mut self, addr: u32) -> Option<u32> {
        let slot = self.find(addr)?;
        self.policy.update(slot.set, slot.way);
        Some(self.line(slot).words[self.word_index(addr)])
    }

    /// Chooses the way that a refill of `addr` will replace.
    ///
    /// An invalid way is preferred (lowest index first); otherwise the PLRU way.
    pub fn select_victim(&self, addr: u32) -> Slot {
        let set = self.set_index(addr);
        let way = (0..self.ways)
            .find(|&way| !self.line(Slot { set, way }).valid)
            .unwrap_or_else(|| self.policy.victim(set));
        Slot { set, way }
    }

    /// Invalidates one line, consuming any invalidation scheduled on it.
    pub fn invalidate(&mut self, slot: Slot) {
        let i = self.idx(slot);
        self.lines[i].valid = false;
        if self.pending[i] {
            self.pending[i] = false;
            self.pending_count -= 1;
        }
    }

    /// Invalidates every line and drops every scheduled invalidation.
    pub fn invalidate_all(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
        }
        self.pending.fill(false);
        self.pending_count = 0;
    }

    /// Commits a refilled line: tag, data and valid bit, then marks it most recently used.
    ///
    /// # Arguments
    ///
    /// * `slot` - Victim chosen by [`CacheStorage::select_victim`].
    /// * `addr` - Any address inside the refilled line.
    /// * `data` - Line contents, one word per entry (extra entries are ignored).
    pub fn fill(&mut self, slot: Slot, addr: u32, data: &[u32]) {
        let tag = self.tag_of(addr);
        let words = self.words;
        let i = self.idx(slot);
        let line = &mut self.lines[i];
        line.tag = tag;
        line.valid = true;
        line.words.copy_from_slice(&data[..words]);
        self.policy.update(slot.set, slot.way);
    }

    /// Write-through hit update of the word at `addr` in `slot`.
    pub fn write(&mut self, slot: Slot, addr: u32, wdata: u32, be: u8) {
        let word = self.word_index(addr);
        let i = self.idx(slot);
        let old = self.lines[i].words[word];
        self.lines[i].words[word] = merge_bytes(old, wdata, be);
        self.policy.update(slot.set, slot.way);
    }

    /// Schedules invalidation of `slot` for the owning FSM.
    pub fn mark_pending(&mut self, slot: Slot) {
        let i = self.idx(slot);
        if !self.pending[i] {
            self.pending[i] = true;
            self.pending_count += 1;
        }
    }

    /// Returns true if `slot` has a scheduled invalidation.
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.pending[self.idx(slot)]
    }

    /// Number of scheduled invalidations.
    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    /// Applies every scheduled invalidation except the one on `keep`.
    ///
    /// Returns the number of flags consumed. A flag on `keep` stays set and is
    /// applied by a later call.
    pub fn apply_pending(&mut self, keep: Option<Slot>) -> usize {
        if self.pending_count == 0 {
            return 0;
        }
        let keep = keep.map(|s| self.idx(s));
        let mut applied = 0;
        for (i, flag) in self.pending.iter_mut().enumerate() {
            if *flag && Some(i) != keep {
                *flag = false;
                self.lines[i].valid = false;
                applied += 1;
            }
        }
        self.pending_count -= applied;
        applied
    }

    /// Returns the storage to its power-on state.
    pub fn reset(&mut self) {
        self.invalidate_all();
        self.policy.reset();
    }

    /// Number of valid lines.
    pub fn valid_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.valid).count()
    }
}
