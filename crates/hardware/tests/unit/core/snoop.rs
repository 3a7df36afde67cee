//! Snoop FSM Tests.
//!
//! Verifies invalidation on external writes, reservation loss, the burst flush
//! and the refill race where an external write lands on a line being filled.

use pretty_assertions::assert_eq;
use xcache_core::common::data::{DataRequest, DataResponse};
use xcache_core::core::fsm::pibus::PibusState;
use xcache_core::core::fsm::snoop::SnoopState;

use crate::common::harness::{IO, RAM, TestContext};

/// LL, then an external write to the reserved word: the SC must fail.
#[test]
fn external_write_breaks_reservation() {
    let mut ctx = TestContext::new().with_words(RAM, &[1, 2, 3, 4]);

    assert_eq!(ctx.sim.load_linked(RAM).unwrap(), DataResponse::Word(1));
    assert!(ctx.xcache().reservation().is_pending());

    ctx.sim.external_write(RAM, 9).unwrap();
    assert_eq!(
        ctx.sim.store_conditional(RAM, 7).unwrap(),
        DataResponse::StoreConditional { success: false }
    );
    assert!(!ctx.xcache().reservation().is_pending());

    let _ = ctx.drain();
    assert_eq!(ctx.sim.memory().peek(RAM), 9);
    assert_eq!(ctx.xcache().stats().sc_ko, 1);
}

/// An external write in the same cycle as an LL hit still breaks the new reservation.
#[test]
fn external_write_racing_ll_hit_breaks_reservation() {
    let mut ctx = TestContext::new().with_words(RAM, &[1, 2, 3, 4]);
    assert_eq!(ctx.read_word(RAM), 1);

    ctx.sim.schedule_external_write(RAM, 5);
    let rsp = ctx.sim.step(None, Some(DataRequest::load_linked(RAM)));
    assert_eq!(rsp.data, DataResponse::Word(1));
    assert_eq!(ctx.sim.bus().pending_external_writes(), 0);

    let rsp = ctx.sim.step(None, Some(DataRequest::store_conditional(RAM, 9)));
    assert_eq!(rsp.data, DataResponse::StoreConditional { success: false });
    assert!(!ctx.dcache_holds(RAM));
    assert_eq!(ctx.read_word(RAM), 5);
}

/// Reservations are tracked per line: a write to a neighbour word also breaks it.
#[test]
fn reservation_is_line_granular() {
    let mut ctx = TestContext::new().with_words(RAM, &[1, 2, 3, 4]);
    let _ = ctx.sim.load_linked(RAM).unwrap();
    ctx.sim.external_write(RAM + 8, 0).unwrap();
    assert_eq!(
        ctx.sim.store_conditional(RAM, 7).unwrap(),
        DataResponse::StoreConditional { success: false }
    );
}

/// External writes elsewhere leave the reservation alone.
#[test]
fn unrelated_external_write_keeps_reservation() {
    let mut ctx = TestContext::new().with_words(RAM, &[1, 2, 3, 4]);
    let _ = ctx.sim.load_linked(RAM).unwrap();
    ctx.sim.external_write(RAM + 0x40, 5).unwrap();
    assert_eq!(
        ctx.sim.store_conditional(RAM, 7).unwrap(),
        DataResponse::StoreConditional { success: true }
    );
}

/// An external write hitting a cached line invalidates it; the next read sees new data.
#[test]
fn external_hit_invalidates_line() {
    let mut ctx = TestContext::new().with_words(RAM, &[1, 2, 3, 4]);
    assert_eq!(ctx.read_word(RAM + 8), 3);

    ctx.sim.external_write(RAM + 8, 0x99).unwrap();
    assert_eq!(ctx.read_word(RAM + 8), 0x99);

    let stats = *ctx.xcache().stats();
    assert_eq!(stats.snoop_inval, 1);
    assert_eq!(stats.snoop_flush, 0);
    assert_eq!(stats.dmiss, 2);
}

/// External writes that miss the data cache change nothing.
#[test]
fn external_miss_is_ignored() {
    let mut ctx = TestContext::new().with_words(RAM, &[1]);
    let _ = ctx.read_word(RAM);
    ctx.sim.external_write(RAM + 0x100, 5).unwrap();
    ctx.sim.external_write(IO, 5).unwrap();
    assert!(ctx.dcache_holds(RAM));
    assert_eq!(ctx.xcache().stats().snoop_inval, 0);
    assert_eq!(ctx.xcache().snoop_state(), SnoopState::Idle);
}

/// The controller's own write-through never invalidates its own line.
#[test]
fn own_write_does_not_invalidate() {
    let mut ctx = TestContext::new().with_words(RAM, &[1, 2, 3, 4]);
    let _ = ctx.read_word(RAM);
    ctx.write(RAM + 4, 5);
    let _ = ctx.drain();

    assert!(ctx.dcache_holds(RAM));
    assert_eq!(ctx.read_word(RAM + 4), 5);
    assert_eq!(ctx.xcache().stats().snoop_inval, 0);
    assert_eq!(ctx.xcache().stats().dmiss, 1);
}

/// Own SC writes do not drop a reservation taken after them.
#[test]
fn own_sc_write_keeps_later_reservation() {
    let mut ctx = TestContext::configured(|c| c.memory.latency = 3).with_words(RAM, &[1, 2, 3, 4]);
    let _ = ctx.sim.load_linked(RAM).unwrap();
    let _ = ctx.sim.store_conditional(RAM, 5).unwrap();
    let _ = ctx.sim.load_linked(RAM).unwrap();
    let _ = ctx.drain();
    assert_eq!(
        ctx.sim.store_conditional(RAM, 6).unwrap(),
        DataResponse::StoreConditional { success: true }
    );
}

/// Hits in quick succession escalate to a flush of the whole data cache.
#[test]
fn burst_of_hits_flushes_dcache() {
    let mut ctx = TestContext::new();
    for line in 0..4 {
        let _ = ctx.read_word(RAM + 0x10 * line);
    }
    assert_eq!(ctx.xcache().dcache().valid_lines(), 4);
    let _ = ctx.sim.load_linked(RAM + 0x30).unwrap();

    for line in 0..3 {
        ctx.sim.schedule_external_write(RAM + 0x10 * line, 0xEE);
    }
    ctx.sim.idle(3);
    assert_eq!(ctx.xcache().snoop_state(), SnoopState::Flush);
    assert!(ctx.xcache().links().snoop_flush);

    ctx.sim.idle(1);
    assert_eq!(ctx.xcache().dcache().valid_lines(), 0);
    assert!(!ctx.xcache().reservation().is_pending());
    assert_eq!(ctx.xcache().snoop_state(), SnoopState::Idle);

    let stats = *ctx.xcache().stats();
    assert_eq!(stats.snoop_flush, 1);
    assert_eq!(stats.snoop_inval, 2);
}

/// Hits spread further apart than the window are handled one line at a time.
#[test]
fn spaced_hits_do_not_flush() {
    let mut ctx = TestContext::new();
    for line in 0..4 {
        let _ = ctx.read_word(RAM + 0x10 * line);
    }
    for line in 0..3 {
        ctx.sim.external_write(RAM + 0x10 * line, 0).unwrap();
        ctx.sim.idle(5);
    }
    let stats = *ctx.xcache().stats();
    assert_eq!(stats.snoop_flush, 0);
    assert_eq!(stats.snoop_inval, 3);
    assert_eq!(ctx.xcache().dcache().valid_lines(), 1);
    assert!(ctx.dcache_holds(RAM + 0x30));
}

/// An external write to a line being refilled drops that line once it is committed.
#[test]
fn external_write_during_refill() {
    let addr = RAM + 0x204;
    let mut ctx = TestContext::configured(|c| c.memory.latency = 3)
        .with_words(RAM + 0x200, &[1, 2, 3, 4]);
    let req = DataRequest::read(addr);

    let mut reached = false;
    for _ in 0..100 {
        let rsp = ctx.sim.step(None, Some(req));
        assert!(rsp.data.is_stall());
        if ctx.xcache().pibus_state() == PibusState::ReadDt {
            reached = true;
            break;
        }
    }
    assert!(reached, "refill never reached its last data cycle");
    ctx.sim.schedule_external_write(addr, 99);

    assert_eq!(ctx.sim.data(req).unwrap(), DataResponse::Word(99));
    let stats = *ctx.xcache().stats();
    assert_eq!(stats.dmiss, 2);
    assert_eq!(stats.snoop_inval, 1);
}

/// With the snoop disabled, external writes leave stale lines in place.
#[test]
fn disabled_snoop_ignores_external_writes() {
    let mut ctx = TestContext::configured(|c| c.snoop.enabled = false).with_words(RAM, &[1]);
    let _ = ctx.read_word(RAM);
    let _ = ctx.sim.load_linked(RAM).unwrap();

    ctx.sim.external_write(RAM, 5).unwrap();
    assert_eq!(ctx.read_word(RAM), 1);
    assert!(ctx.xcache().reservation().is_pending());
    assert_eq!(ctx.xcache().stats().snoop_inval, 0);
}
