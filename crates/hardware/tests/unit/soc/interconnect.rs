//! Reference Bus Tests.
//!
//! Drives `SystemBus` directly with hand-written controller outputs.

use pretty_assertions::assert_eq;
use xcache_core::soc::signals::{Ack, BusInputs, BusOutputs, Opcode};
use xcache_core::soc::{MemorySlave, SystemBus};

fn request(read: bool) -> BusOutputs {
    BusOutputs {
        req: true,
        read,
        ..BusOutputs::default()
    }
}

/// A read data cycle: no address driven, direction still read.
fn read_data_cycle() -> BusOutputs {
    BusOutputs {
        read: true,
        ..BusOutputs::default()
    }
}

fn single_read(addr: u32) -> BusOutputs {
    BusOutputs {
        read: true,
        opcode: Some(Opcode::Single { be: 0b1111 }),
        address: Some(addr),
        ..BusOutputs::default()
    }
}

#[test]
fn idle_bus_is_quiet() {
    let mut bus = SystemBus::new(MemorySlave::new(0));
    assert_eq!(bus.cycle_with(&BusOutputs::default()), BusInputs::IDLE);
    assert_eq!(bus.cycle(), 1);
    assert!(!bus.is_busy());
}

#[test]
fn grant_then_single_read() {
    let mut memory = MemorySlave::new(0);
    memory.load(0x40, &[0x1234]);
    let mut bus = SystemBus::new(memory);

    let inputs = bus.cycle_with(&request(true));
    assert!(inputs.gnt);

    let inputs = bus.cycle_with(&single_read(0x40));
    assert!(inputs.avalid && inputs.read);
    assert_eq!(inputs.address, 0x40);
    assert_eq!(inputs.ack, Ack::Wait);

    let inputs = bus.cycle_with(&read_data_cycle());
    assert_eq!(inputs.ack, Ack::Ready);
    assert_eq!(inputs.rdata, 0x1234);
    assert!(!bus.is_busy());
}

#[test]
fn latency_delays_the_data_cycle() {
    let mut bus = SystemBus::new(MemorySlave::new(3));
    let _ = bus.cycle_with(&request(true));
    let _ = bus.cycle_with(&single_read(0));

    let idle = read_data_cycle();
    for _ in 0..3 {
        assert_eq!(bus.cycle_with(&idle).ack, Ack::Wait);
        assert!(bus.is_busy());
    }
    assert_eq!(bus.cycle_with(&idle).ack, Ack::Ready);
}

#[test]
fn write_uses_data_cycle_wdata() {
    let mut bus = SystemBus::new(MemorySlave::new(0));
    let _ = bus.cycle_with(&request(false));
    let inputs = bus.cycle_with(&BusOutputs {
        opcode: Some(Opcode::Single { be: 0b1100 }),
        address: Some(0x80),
        ..BusOutputs::default()
    });
    assert!(inputs.is_write_cycle());

    let inputs = bus.cycle_with(&BusOutputs {
        wdata: Some(0xABCD_0000),
        ..BusOutputs::default()
    });
    assert_eq!(inputs.ack, Ack::Ready);
    assert_eq!(bus.memory().peek(0x80), 0xABCD_0000);
}

#[test]
fn external_writes_take_the_free_bus_first() {
    let mut bus = SystemBus::new(MemorySlave::new(0));
    bus.schedule_external_write(0x10, 5);
    bus.schedule_external_write(0x14, 6);
    assert_eq!(bus.pending_external_writes(), 2);

    let inputs = bus.cycle_with(&request(true));
    assert!(!inputs.gnt);
    assert!(inputs.is_write_cycle());
    assert_eq!(inputs.address, 0x10);
    assert_eq!(bus.memory().peek(0x10), 5);

    let inputs = bus.cycle_with(&request(true));
    assert_eq!(inputs.address, 0x14);
    assert_eq!(bus.pending_external_writes(), 0);

    assert!(bus.cycle_with(&request(true)).gnt);
}

#[test]
fn locked_burst_holds_off_external_writes() {
    let mut bus = SystemBus::new(MemorySlave::new(0));
    let _ = bus.cycle_with(&request(true));
    bus.schedule_external_write(0x100, 1);

    let locked = BusOutputs {
        lock: true,
        read: true,
        opcode: Some(Opcode::Burst { words: 2 }),
        address: Some(0),
        ..BusOutputs::default()
    };
    let inputs = bus.cycle_with(&locked);
    assert!(inputs.avalid && inputs.read);

    let last = BusOutputs {
        lock: false,
        address: Some(4),
        ..locked
    };
    let inputs = bus.cycle_with(&last);
    assert_eq!(inputs.ack, Ack::Ready);
    assert_eq!(inputs.address, 4);
    assert_eq!(bus.pending_external_writes(), 1);

    let inputs = bus.cycle_with(&read_data_cycle());
    assert_eq!(inputs.ack, Ack::Ready);
    assert!(inputs.is_write_cycle());
    assert_eq!(inputs.address, 0x100);
}

#[test]
fn reset_keeps_memory() {
    let mut bus = SystemBus::new(MemorySlave::new(0));
    bus.memory_mut().load(0, &[3]);
    bus.schedule_external_write(4, 4);
    let _ = bus.cycle_with(&request(true));
    bus.reset();
    assert_eq!(bus.pending_external_writes(), 0);
    assert!(!bus.is_busy());
    assert_eq!(bus.memory().peek(0), 3);
}
