//! Write Buffer for posted writes.
//!
//! The data cache is write-through with no write-allocate: every write and every
//! successful store-conditional is posted here and drained to the bus by the PIBUS
//! FSM, oldest first. It provides:
//! 1. **Enqueue:** Accept an entry unless the FIFO is full.
//! 2. **Head access:** Expose the oldest entry to the bus FSM.
//! 3. **Retire:** Remove the head once its bus transaction completes (OK or error).
//!
//! Entries are never reordered, coalesced or cancelled.

/// Kind of a posted write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WriteKind {
    /// Ordinary store.
    #[default]
    Write,
    /// Store-conditional that passed the reservation check.
    StoreConditional,
}

/// A single entry in the write buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WbufEntry {
    /// Byte address of the target word.
    pub addr: u32,
    /// Data to write.
    pub data: u32,
    /// Kind of the originating request.
    pub kind: WriteKind,
    /// Byte-enable mask.
    pub be: u8,
}

impl WbufEntry {
    /// Creates an entry.
    pub const fn new(addr: u32, data: u32, be: u8, kind: WriteKind) -> Self {
        Self {
            addr,
            data,
            kind,
            be,
        }
    }
}

/// Write buffer: bounded FIFO of posted writes.
#[derive(Clone, Debug)]
pub struct WriteBuffer {
    entries: Vec<WbufEntry>,
    /// Index of the oldest entry.
    head: usize,
    /// Index where the next entry will be written.
    tail: usize,
    /// Number of valid entries.
    count: usize,
}

impl WriteBuffer {
    /// Creates an empty write buffer with the given depth.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![WbufEntry::default(); capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the write buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the write buffer is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.entries.len() - self.count
    }

    /// Appends an entry. Returns false (and drops nothing) if the buffer is full.
    #[must_use]
    pub fn push(&mut self, entry: WbufEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[self.tail] = entry;
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        true
    }

    /// Oldest entry, if any.
    #[inline]
    pub fn front(&self) -> Option<&WbufEntry> {
        (self.count > 0).then(|| &self.entries[self.head])
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<WbufEntry> {
        if self.count == 0 {
            return None;
        }
        let entry = self.entries[self.head];
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        Some(entry)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &WbufEntry> + '_ {
        let cap = self.entries.len();
        (0..self.count).map(move |i| &self.entries[(self.head + i) % cap])
    }
}
