//! LL/SC reservation register.
//!
//! A load-linked records the word it read; a store-conditional succeeds only if
//! that reservation is still pending for the same address. The reservation is
//! dropped by any store-conditional (success or failure), by an external write
//! to the reserved line, by a data cache flush and by reset.

/// Single-entry reservation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reservation {
    addr: Option<u32>,
}

impl Reservation {
    /// Records a reservation on `addr`, replacing any previous one.
    pub fn set(&mut self, addr: u32) {
        self.addr = Some(addr);
    }

    /// Drops the reservation.
    pub fn clear(&mut self) {
        self.addr = None;
    }

    /// Returns true if a reservation is held.
    pub fn is_pending(&self) -> bool {
        self.addr.is_some()
    }

    /// Reserved address, if any.
    pub fn address(&self) -> Option<u32> {
        self.addr
    }

    /// Store-conditional check: pending and on exactly `addr`.
    pub fn matches(&self, addr: u32) -> bool {
        self.addr == Some(addr)
    }
}
