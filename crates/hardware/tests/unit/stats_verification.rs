//! # Statistics Verification
//!
//! Checks the controller counters against known scenarios and the derived
//! ratios against hand-computed values.

use pretty_assertions::assert_eq;
use xcache_core::stats::XcacheStats;

use crate::common::harness::{IO, RAM, TestContext};

#[test]
fn cold_read_counts() {
    let mut ctx = TestContext::new().with_words(RAM, &[1]);
    let _ = ctx.read_word(RAM);

    let stats = *ctx.xcache().stats();
    assert_eq!(stats.total_cycles, 13);
    assert_eq!(stats.frz_cycles, 12);
    assert_eq!(stats.dmiss, 1);
    assert_eq!(stats.dmiss_frz, 12);
    assert_eq!(stats.dread, 1);
    assert!((stats.dmiss_latency() - 12.0).abs() < f64::EPSILON);
    assert!((stats.cpi_penalty() - 12.0 / 13.0).abs() < 1e-12);
}

#[test]
fn mixed_workload_counts() {
    let mut ctx = TestContext::new()
        .with_words(RAM, &[1, 2, 3, 4])
        .with_words(IO, &[5]);

    let _ = ctx.sim.fetch(RAM).unwrap();
    let _ = ctx.sim.fetch(RAM + 4).unwrap();
    let _ = ctx.sim.fetch(IO).unwrap();
    let _ = ctx.read_word(RAM);
    let _ = ctx.read_word(IO);
    ctx.write(RAM + 8, 9);
    let _ = ctx.sim.load_linked(RAM).unwrap();
    let _ = ctx.sim.store_conditional(RAM, 1).unwrap();
    let _ = ctx.sim.store_conditional(RAM, 1).unwrap();
    let _ = ctx.drain();

    let stats = *ctx.xcache().stats();
    assert_eq!(
        (stats.ireq, stats.imiss, stats.iunc),
        (2, 1, 1),
        "fetch counters"
    );
    assert_eq!(
        (stats.dread, stats.dmiss, stats.dunc),
        (2, 1, 1),
        "data read counters"
    );
    assert_eq!((stats.write, stats.sc_ok, stats.sc_ko), (1, 1, 1));
    assert_eq!(stats.write_frz, 0);
    assert_eq!((stats.snoop_inval, stats.snoop_flush), (0, 0));
    assert!(stats.frz_cycles < stats.total_cycles);
}

#[test]
fn derived_ratios() {
    let stats = XcacheStats {
        total_cycles: 100,
        frz_cycles: 25,
        ireq: 40,
        imiss: 4,
        imiss_frz: 48,
        iunc: 2,
        iunc_frz: 10,
        dread: 20,
        dmiss: 5,
        dmiss_frz: 50,
        dunc: 1,
        dunc_frz: 7,
        write: 8,
        write_frz: 4,
        ..XcacheStats::default()
    };
    let d = stats.derived();
    assert!((d.imiss_rate - 0.1).abs() < 1e-12);
    assert!((d.dmiss_rate - 0.25).abs() < 1e-12);
    assert!((d.imiss_latency - 12.0).abs() < 1e-12);
    assert!((d.dmiss_latency - 10.0).abs() < 1e-12);
    assert!((d.iunc_latency - 5.0).abs() < 1e-12);
    assert!((d.dunc_latency - 7.0).abs() < 1e-12);
    assert!((d.write_latency - 0.5).abs() < 1e-12);
    assert!((d.cpi_penalty - 0.25).abs() < 1e-12);
}

#[test]
fn derived_ratios_of_nothing_are_zero() {
    let d = XcacheStats::default().derived();
    assert_eq!(d.imiss_rate, 0.0);
    assert_eq!(d.cpi_penalty, 0.0);
    assert_eq!(d.write_latency, 0.0);
}

#[test]
fn counters_serialize_by_name() {
    let stats = XcacheStats {
        dmiss: 3,
        ..XcacheStats::default()
    };
    let value = serde_json::to_value(stats).unwrap();
    assert_eq!(value["dmiss"], 3);
    assert_eq!(value["snoop_flush"], 0);
}
