//! Pseudo-LRU (PLRU) Replacement Policy.
//!
//! PLRU approximates the Least Recently Used algorithm with one "recently used"
//! bit per way. An access sets the bit of the accessed way; when every bit of a
//! set would be set, the set is cleared down to the accessed way alone.
//!
//! The victim is the lowest-numbered way whose bit is clear, so after touching
//! way 0 of a 2-way set the next victim is way 1.
//!
//! # Performance
//!
//! - **Time Complexity:** `update()` O(1), `victim()` O(W)
//! - **Space Complexity:** one byte per set (at most 8 ways)

/// PLRU Policy state.
#[derive(Clone, Debug)]
pub struct PlruPolicy {
    /// Recently-used bits for each set.
    usage: Vec<u8>,
    /// Number of ways in the cache.
    ways: usize,
}

impl PlruPolicy {
    /// Creates a new PLRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity of the cache (at most 8).
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: vec![0; sets],
            ways,
        }
    }

    /// Marks `way` of `set` as most recently used.
    pub fn update(&mut self, set: usize, way: usize) {
        let mask = 1u8 << way;
        self.usage[set] |= mask;

        let all_ones = ((1u16 << self.ways) - 1) as u8;
        if self.usage[set] & all_ones == all_ones {
            self.usage[set] = mask;
        }
    }

    /// Returns the pseudo-least-recently-used way of `set`.
    pub fn victim(&self, set: usize) -> usize {
        (0..self.ways)
            .find(|&i| (self.usage[set] >> i) & 1 == 0)
            .unwrap_or(0)
    }

    /// Forgets all usage history.
    pub fn reset(&mut self) {
        self.usage.fill(0);
    }
}
