//! PIBUS Transaction FSM.
//!
//! The single gateway between the controller and the system bus. It provides:
//! 1. **Arbitration:** Picks the next transaction in `Idle`: a data cache read first,
//!    then an instruction cache read, then the oldest write buffer entry.
//! 2. **Read transactions:** Request/grant, then pipelined address and data cycles.
//!    A refill bursts one line into the requester's miss buffer; an uncached read
//!    transfers one word.
//! 3. **Write transactions:** One single-word write per buffer entry; the entry
//!    leaves the buffer when the write completes, with or without error.
//! 4. **Completion:** Read outcomes go back to the requesting cache FSM; write
//!    errors set the sticky write error flag.
//!
//! Timing: the address of word `i + 1` is driven in the cycle that receives the
//! data of word `i`. An `Ack::Wait` keeps the FSM in place and re-drives the address.

use tracing::{debug, trace, warn};

use super::{BusOutcome, Links, TransactionKind};
use crate::common::error::BusError;
use crate::core::units::write_buffer::{WriteBuffer, WriteKind};
use crate::soc::signals::{Ack, BusInputs, BusOutputs, Opcode};

/// PIBUS FSM states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PibusState {
    /// No transaction.
    #[default]
    Idle,
    /// Requesting the bus for a read.
    ReadReq,
    /// First read address cycle.
    ReadAd,
    /// Read data of the previous address, address of the next one.
    ReadDtad,
    /// Read data of the last address.
    ReadDt,
    /// Requesting the bus for a write.
    WriteReq,
    /// Write address cycle.
    WriteAd,
    /// Write data cycle.
    WriteDt,
}

/// Descriptor of the transaction in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Address of the first word.
    pub addr: u32,
    /// Words transferred.
    pub words: u32,
    /// Write data.
    pub wdata: u32,
    /// Byte enables of a write.
    pub be: u8,
}

/// Bus transaction controller and the two miss buffers it fills.
#[derive(Clone, Debug)]
pub struct PibusFsm {
    state: PibusState,
    txn: Option<Transaction>,
    /// Index of the next address to drive.
    count: u32,
    ibuf: Box<[u32]>,
    dbuf: Box<[u32]>,
}

impl PibusFsm {
    /// Creates an idle bus FSM with miss buffers of one line each.
    pub fn new(icache_words: u32, dcache_words: u32) -> Self {
        Self {
            state: PibusState::Idle,
            txn: None,
            count: 0,
            ibuf: vec![0; icache_words as usize].into_boxed_slice(),
            dbuf: vec![0; dcache_words as usize].into_boxed_slice(),
        }
    }

    /// Current state.
    pub fn state(&self) -> PibusState {
        self.state
    }

    /// Instruction miss buffer.
    pub fn icache_buffer(&self) -> &[u32] {
        &self.ibuf
    }

    /// Data miss buffer.
    pub fn dcache_buffer(&self) -> &[u32] {
        &self.dbuf
    }

    /// Returns true if this cycle's address cycle is one of our own writes.
    pub fn drives_write_address(&self) -> bool {
        self.state == PibusState::WriteAd
    }

    /// Returns to `Idle`, dropping any transaction in flight.
    pub fn reset(&mut self) {
        self.state = PibusState::Idle;
        self.txn = None;
        self.count = 0;
        self.ibuf.fill(0);
        self.dbuf.fill(0);
    }

    /// Moore outputs for the current state.
    pub fn moore(&self) -> BusOutputs {
        let Some(txn) = self.txn else {
            return BusOutputs::default();
        };
        let opcode = if txn.kind.is_burst() {
            Opcode::Burst { words: txn.words }
        } else {
            Opcode::Single { be: txn.be }
        };

        match self.state {
            PibusState::Idle => BusOutputs::default(),
            PibusState::ReadReq | PibusState::WriteReq => BusOutputs {
                req: true,
                read: txn.kind.is_read(),
                ..BusOutputs::default()
            },
            PibusState::ReadAd | PibusState::ReadDtad => BusOutputs {
                lock: self.count + 1 < txn.words,
                read: true,
                opcode: Some(opcode),
                address: Some(txn.addr + 4 * self.count),
                ..BusOutputs::default()
            },
            PibusState::ReadDt => BusOutputs {
                read: true,
                ..BusOutputs::default()
            },
            PibusState::WriteAd => BusOutputs {
                opcode: Some(opcode),
                address: Some(txn.addr),
                ..BusOutputs::default()
            },
            PibusState::WriteDt => BusOutputs {
                wdata: Some(txn.wdata),
                ..BusOutputs::default()
            },
        }
    }

    /// One transition.
    ///
    /// # Arguments
    ///
    /// * `bus` - Bus inputs sampled this cycle.
    /// * `cur` - Cross-FSM signals latched last cycle.
    /// * `next` - Cross-FSM signals for the next cycle.
    /// * `wbuf` - Write buffer; the head entry is popped when its write completes.
    pub fn transition(
        &mut self,
        bus: &BusInputs,
        cur: &Links,
        next: &mut Links,
        wbuf: &mut WriteBuffer,
    ) {
        let prev = self.state;
        match self.state {
            PibusState::Idle => self.arbitrate(cur, next, wbuf),
            PibusState::ReadReq => {
                if bus.gnt {
                    self.count = 0;
                    self.state = PibusState::ReadAd;
                }
            }
            PibusState::ReadAd => {
                self.count = 1;
                self.state = self.after_address();
            }
            PibusState::ReadDtad | PibusState::ReadDt => {
                let index = self.count as usize - 1;
                match sample(bus, self.word_address(self.count - 1)) {
                    Ok(false) => {}
                    Ok(true) => {
                        self.miss_buffer()[index] = bus.rdata;
                        if self.state == PibusState::ReadDt {
                            self.complete(Ok(()), next, wbuf);
                        } else {
                            self.count += 1;
                            self.state = self.after_address();
                        }
                    }
                    Err(err) => self.complete(Err(err), next, wbuf),
                }
            }
            PibusState::WriteReq => {
                if bus.gnt {
                    self.state = PibusState::WriteAd;
                }
            }
            PibusState::WriteAd => self.state = PibusState::WriteDt,
            PibusState::WriteDt => match sample(bus, self.word_address(0)) {
                Ok(false) => {}
                Ok(true) => self.complete(Ok(()), next, wbuf),
                Err(err) => self.complete(Err(err), next, wbuf),
            },
        }

        if prev != self.state {
            trace!(from = ?prev, to = ?self.state, "pibus fsm");
        }
    }

    /// Starts the highest-priority pending transaction.
    fn arbitrate(&mut self, cur: &Links, next: &mut Links, wbuf: &WriteBuffer) {
        let read = if let Some(req) = cur.dcache_req {
            next.dcache_req = None;
            Some(req)
        } else if let Some(req) = cur.icache_req {
            next.icache_req = None;
            Some(req)
        } else {
            None
        };

        let txn = if let Some(req) = read {
            let words = if req.kind.is_burst() {
                self.buffer_for(req.kind).len() as u32
            } else {
                1
            };
            Transaction {
                kind: req.kind,
                addr: req.addr,
                words,
                wdata: 0,
                be: 0,
            }
        } else if let Some(entry) = wbuf.front() {
            Transaction {
                kind: match entry.kind {
                    WriteKind::Write => TransactionKind::Write,
                    WriteKind::StoreConditional => TransactionKind::StoreConditional,
                },
                addr: entry.addr,
                words: 1,
                wdata: entry.data,
                be: entry.be,
            }
        } else {
            return;
        };

        debug!(
            kind = ?txn.kind,
            words = txn.words,
            "bus transaction start at {:#010x}",
            txn.addr
        );
        self.state = if txn.kind.is_read() {
            PibusState::ReadReq
        } else {
            PibusState::WriteReq
        };
        self.txn = Some(txn);
    }

    /// State following an address cycle.
    fn after_address(&self) -> PibusState {
        let words = self.txn.map_or(1, |t| t.words);
        if self.count < words {
            PibusState::ReadDtad
        } else {
            PibusState::ReadDt
        }
    }

    fn word_address(&self, index: u32) -> u32 {
        self.txn.map_or(0, |t| t.addr + 4 * index)
    }

    fn buffer_for(&self, kind: TransactionKind) -> &[u32] {
        if kind.is_instruction() {
            &self.ibuf
        } else {
            &self.dbuf
        }
    }

    fn miss_buffer(&mut self) -> &mut [u32] {
        match self.txn {
            Some(t) if t.kind.is_instruction() => &mut self.ibuf,
            _ => &mut self.dbuf,
        }
    }

    /// Ends the transaction and reports its outcome.
    fn complete(&mut self, outcome: BusOutcome, next: &mut Links, wbuf: &mut WriteBuffer) {
        self.state = PibusState::Idle;
        let Some(txn) = self.txn.take() else {
            return;
        };

        match outcome {
            Ok(()) => debug!(kind = ?txn.kind, "bus transaction done at {:#010x}", txn.addr),
            Err(err) => warn!(kind = ?txn.kind, %err, "bus transaction failed"),
        }

        match txn.kind {
            TransactionKind::IMiss | TransactionKind::IUnc => next.icache_rsp = Some(outcome),
            TransactionKind::DMiss | TransactionKind::DUnc => next.dcache_rsp = Some(outcome),
            TransactionKind::Write | TransactionKind::StoreConditional => {
                let _ = wbuf.pop();
                if outcome.is_err() {
                    next.write_error = true;
                }
            }
        }
    }
}

/// Decodes the acknowledge of the word at `addr`: true once it is transferred.
fn sample(bus: &BusInputs, addr: u32) -> Result<bool, BusError> {
    if bus.tout {
        return Err(BusError::Timeout { addr });
    }
    match bus.ack {
        Ack::Wait => Ok(false),
        Ack::Ready => Ok(true),
        Ack::Error => Err(BusError::Acknowledge { addr }),
    }
}
