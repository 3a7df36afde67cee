//! Bus Transaction FSM Tests.
//!
//! Verifies arbitration between the two caches and the write buffer, burst
//! refill timing, write draining order and bus timeouts.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use xcache_core::Xcache;
use xcache_core::common::data::{DataRequest, DataResponse, InstructionResponse};
use xcache_core::core::fsm::TransactionKind;
use xcache_core::core::fsm::pibus::PibusState;
use xcache_core::soc::signals::{Ack, BusInputs, Opcode};

use crate::common::harness::{RAM, TestContext, small_config};

/// When both caches miss in the same cycle, the data refill goes first.
#[test]
fn data_read_wins_over_instruction_read() {
    let mut ctx = TestContext::new()
        .with_words(RAM, &[0x11])
        .with_words(RAM + 0x100, &[0x22]);
    let dreq = DataRequest::read(RAM + 0x100);

    // Idle -> MissSelect -> MissInval -> MissWait on both sides.
    for _ in 0..3 {
        let rsp = ctx.sim.step(Some(RAM), Some(dreq));
        assert!(rsp.instruction.is_stall());
        assert!(rsp.data.is_stall());
    }
    let links = *ctx.xcache().links();
    assert_eq!(
        links.icache_req.map(|r| r.kind),
        Some(TransactionKind::IMiss)
    );
    assert_eq!(
        links.dcache_req.map(|r| r.kind),
        Some(TransactionKind::DMiss)
    );

    let _ = ctx.sim.step(Some(RAM), Some(dreq));
    assert_eq!(ctx.xcache().pibus_state(), PibusState::ReadReq);
    assert!(ctx.xcache().links().dcache_req.is_none());
    assert!(ctx.xcache().links().icache_req.is_some());

    let mut instruction = None;
    let mut data = None;
    for cycle in 0..200u32 {
        let ireq = instruction.is_none().then_some(RAM);
        let d = data.is_none().then_some(dreq);
        let rsp = ctx.sim.step(ireq, d);
        if let InstructionResponse::Word(w) = rsp.instruction {
            assert_eq!(w, 0x11);
            instruction = Some(cycle);
        }
        if let DataResponse::Word(w) = rsp.data {
            assert_eq!(w, 0x22);
            data = Some(cycle);
        }
        if instruction.is_some() && data.is_some() {
            break;
        }
    }
    let (i, d) = (instruction.unwrap(), data.unwrap());
    assert!(d < i, "data answered at {d}, instruction at {i}");
}

/// A pending refill is served before buffered writes.
#[test]
fn reads_bypass_buffered_writes() {
    let mut ctx = TestContext::configured(|c| c.memory.latency = 2).with_words(RAM + 0x200, &[3]);
    ctx.write(RAM, 1);
    ctx.write(RAM + 4, 2);
    assert_eq!(ctx.read_word(RAM + 0x200), 3);
    assert!(!ctx.xcache().write_buffer().is_empty());
    let _ = ctx.drain();
    assert_eq!(ctx.sim.memory().peek(RAM), 1);
    assert_eq!(ctx.sim.memory().peek(RAM + 4), 2);
}

/// Burst refill: address cycles walk the line with `lock` on all but the last.
#[test]
fn burst_refill_bus_shape() {
    let mut xcache = Xcache::new(&small_config()).unwrap();
    let dreq = Some(DataRequest::read(RAM + 0x10));
    let mut addresses = Vec::new();
    let mut gnt_given = false;

    for _ in 0..40 {
        let out = xcache.moore();
        if let Some(addr) = out.address {
            assert!(out.read);
            assert_eq!(out.opcode, Some(Opcode::Burst { words: 4 }));
            addresses.push((addr, out.lock));
        }
        let inputs = match xcache.pibus_state() {
            PibusState::ReadReq if !gnt_given => {
                gnt_given = true;
                BusInputs {
                    gnt: true,
                    ..BusInputs::IDLE
                }
            }
            PibusState::ReadDtad | PibusState::ReadDt => BusInputs {
                ack: Ack::Ready,
                rdata: 0xF00 + addresses.len() as u32,
                ..BusInputs::IDLE
            },
            _ => BusInputs::IDLE,
        };
        let rsp = xcache.tick(None, dreq, &inputs);
        if !rsp.data.is_stall() {
            break;
        }
    }

    assert_eq!(
        addresses,
        vec![
            (RAM + 0x10, true),
            (RAM + 0x14, true),
            (RAM + 0x18, true),
            (RAM + 0x1C, false),
        ]
    );
    assert!(xcache.dcache().find(RAM + 0x10).is_some());
}

/// A timeout on a refill is a bus error for the requester.
#[test]
fn timeout_fails_refill() {
    let mut xcache = Xcache::new(&small_config()).unwrap();
    let dreq = Some(DataRequest::read(RAM));
    let mut answer = None;

    for _ in 0..40 {
        let inputs = match xcache.pibus_state() {
            PibusState::ReadReq => BusInputs {
                gnt: true,
                ..BusInputs::IDLE
            },
            PibusState::ReadDtad | PibusState::ReadDt => BusInputs {
                tout: true,
                ..BusInputs::IDLE
            },
            _ => BusInputs::IDLE,
        };
        let rsp = xcache.tick(None, dreq, &inputs);
        if !rsp.data.is_stall() {
            answer = Some(rsp.data);
            break;
        }
    }

    assert_eq!(answer, Some(DataResponse::BusError));
    assert_eq!(xcache.pibus_state(), PibusState::Idle);
    assert!(xcache.dcache().find(RAM).is_none());
}

/// Timed-out writes leave the buffer and raise the sticky write error.
#[test]
fn timeout_on_write_sets_write_error() {
    let mut xcache = Xcache::new(&small_config()).unwrap();
    assert_eq!(
        xcache.tick(None, Some(DataRequest::write(RAM, 1)), &BusInputs::IDLE).data,
        DataResponse::Done
    );

    for _ in 0..20 {
        let inputs = match xcache.pibus_state() {
            PibusState::WriteReq => BusInputs {
                gnt: true,
                ..BusInputs::IDLE
            },
            PibusState::WriteDt => BusInputs {
                tout: true,
                ..BusInputs::IDLE
            },
            _ => BusInputs::IDLE,
        };
        let _ = xcache.tick(None, None, &inputs);
        if xcache.write_buffer().is_empty() {
            break;
        }
    }

    assert!(xcache.write_buffer().is_empty());
    assert!(xcache.links().write_error);
}

/// One processor access in a mixed write/read-miss sequence.
#[derive(Clone, Copy, Debug)]
enum Access {
    Write(u32, u32),
    ReadMiss,
}

/// Presents `req` until answered, logging every write address cycle the controller drives.
fn present_logged(
    ctx: &mut TestContext,
    req: Option<DataRequest>,
    log: &mut Vec<u32>,
) -> DataResponse {
    for _ in 0..500 {
        let out = ctx.xcache().moore();
        if let (false, Some(addr)) = (out.read, out.address) {
            log.push(addr);
        }
        let rsp = ctx.sim.step(None, req).data;
        if !rsp.is_stall() {
            return rsp;
        }
    }
    panic!("request {req:?} never answered");
}

/// Runs `accesses`, then idles until the write buffer is empty; returns the bus write order.
fn bus_write_order(ctx: &mut TestContext, accesses: &[Access]) -> Vec<u32> {
    let mut log = Vec::new();
    let mut next_line = RAM + 0x800;
    for access in accesses {
        match *access {
            Access::Write(addr, data) => {
                let rsp = present_logged(ctx, Some(DataRequest::write(addr, data)), &mut log);
                assert_eq!(rsp, DataResponse::Done);
            }
            Access::ReadMiss => {
                assert!(!ctx.dcache_holds(next_line));
                let rsp = present_logged(ctx, Some(DataRequest::read(next_line)), &mut log);
                assert!(matches!(rsp, DataResponse::Word(_)), "{rsp:?}");
                next_line += 0x10;
            }
        }
    }
    for _ in 0..500 {
        let xcache = ctx.xcache();
        if xcache.write_buffer().is_empty() && xcache.pibus_state() == PibusState::Idle {
            break;
        }
        let _ = present_logged(ctx, None, &mut log);
    }
    assert!(ctx.xcache().write_buffer().is_empty());
    log
}

/// Read misses issued between writes overtake them without reordering the writes.
#[test]
fn writes_drain_in_order_around_read_misses() {
    let mut ctx = TestContext::configured(|c| c.memory.latency = 2);
    let accesses = [
        Access::Write(RAM + 0x08, 1),
        Access::Write(RAM, 2),
        Access::ReadMiss,
        Access::Write(RAM + 0x04, 3),
        Access::ReadMiss,
        Access::Write(RAM, 4),
    ];

    let order = bus_write_order(&mut ctx, &accesses);

    assert_eq!(order, vec![RAM + 0x08, RAM, RAM + 0x04, RAM]);
    assert_eq!(ctx.xcache().stats().dmiss, 2);
    assert_eq!(ctx.sim.memory().peek(RAM), 4);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After a drain, memory holds the last value written to each address.
    #[test]
    fn drained_writes_match_program_order(
        writes in prop::collection::vec((0u32..8, any::<u32>()), 1..24),
        latency in 0u32..3,
    ) {
        let mut ctx = TestContext::configured(|c| c.memory.latency = latency);
        let mut expected = HashMap::new();
        for (slot, data) in writes {
            let addr = RAM + 4 * slot;
            ctx.write(addr, data);
            let _ = expected.insert(addr, data);
        }
        let _ = ctx.drain();
        for (addr, data) in expected {
            prop_assert_eq!(ctx.sim.memory().peek(addr), data);
        }
    }

    /// Writes reach the bus in program order even with read misses interleaved.
    #[test]
    fn bus_write_order_survives_read_misses(
        accesses in prop::collection::vec(
            prop_oneof![
                3 => (0u32..8, any::<u32>())
                    .prop_map(|(slot, data)| Access::Write(RAM + 4 * slot, data)),
                1 => Just(Access::ReadMiss),
            ],
            1..24,
        ),
        latency in 0u32..3,
    ) {
        let mut ctx = TestContext::configured(|c| c.memory.latency = latency);
        let expected: Vec<u32> = accesses
            .iter()
            .filter_map(|a| match *a {
                Access::Write(addr, _) => Some(addr),
                Access::ReadMiss => None,
            })
            .collect();

        let order = bus_write_order(&mut ctx, &accesses);
        prop_assert_eq!(order, expected);
    }
}
