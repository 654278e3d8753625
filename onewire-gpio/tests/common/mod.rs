//! Deterministic software model of a 1-Wire line with attached devices.
//!
//! Time is virtual: the delay object handed to the port advances a shared
//! clock, and device behavior is derived purely from the master's edge
//! timing, so every scenario replays identically.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use onewire_gpio::{
    LinePull, ONEWIRE_ALARM_SEARCH_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SEARCH_ROM_CMD, OneWireLine,
};

/// A low phase at least this wide resets every device on the bus.
const RESET_THRESHOLD_US: u64 = 480;
/// A low phase shorter than this is a one (or a read request).
const WRITE_ONE_THRESHOLD_US: u64 = 15;
/// How long a transmitting device holds the line low for a zero bit.
const DEVICE_LOW_US: u64 = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    /// Answers searches and ROM reads like a healthy device.
    Normal,
    /// Gives a presence pulse but stays mute afterwards.
    PresenceOnly,
    /// Stops responding once the search reaches this bit position.
    VanishAfter(u8),
}

#[derive(Clone, Copy)]
enum Phase {
    Idle,
    Command { acc: u8, bits: u8 },
    Search { pos: u8, step: u8 },
    ReadRom { pos: u8 },
}

pub struct Device {
    rom: [u8; 8],
    presence_delay_us: u64,
    presence_low_us: u64,
    alarmed: bool,
    behavior: Behavior,
    phase: Phase,
    drive_from: u64,
    drive_until: u64,
}

impl Device {
    pub fn new(rom: [u8; 8]) -> Self {
        Self {
            rom,
            presence_delay_us: 30,
            presence_low_us: 90,
            alarmed: false,
            behavior: Behavior::Normal,
            phase: Phase::Idle,
            drive_from: 0,
            drive_until: 0,
        }
    }

    pub fn alarmed(mut self) -> Self {
        self.alarmed = true;
        self
    }

    pub fn presence_low_us(mut self, us: u64) -> Self {
        self.presence_low_us = us;
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn rom_bit(&self, pos: u8) -> bool {
        self.rom[(pos / 8) as usize] >> (pos % 8) & 1 == 1
    }

    fn driving(&self, now: u64) -> bool {
        self.drive_from <= now && now < self.drive_until
    }

    fn drive(&mut self, from: u64, width: u64) {
        self.drive_from = from;
        self.drive_until = from + width;
    }

    fn on_reset(&mut self, released_at: u64) {
        self.drive(released_at + self.presence_delay_us, self.presence_low_us);
        self.phase = Phase::Command { acc: 0, bits: 0 };
    }

    fn on_command(&mut self, cmd: u8) {
        let answers = self.behavior != Behavior::PresenceOnly;
        self.phase = match cmd {
            ONEWIRE_SEARCH_ROM_CMD if answers => Phase::Search { pos: 0, step: 0 },
            ONEWIRE_ALARM_SEARCH_CMD if answers && self.alarmed => Phase::Search { pos: 0, step: 0 },
            ONEWIRE_READ_ROM_CMD if answers => Phase::ReadRom { pos: 0 },
            _ => Phase::Idle,
        };
    }

    /// One master-driven timeslot ended; `bit` is the level the master
    /// wrote (read requests look like ones), `fell_at` when it began.
    fn on_slot(&mut self, bit: bool, fell_at: u64) {
        match self.phase {
            Phase::Idle => {}
            Phase::Command { acc, bits } => {
                let acc = acc | (bit as u8) << bits;
                if bits == 7 {
                    self.on_command(acc);
                } else {
                    self.phase = Phase::Command { acc, bits: bits + 1 };
                }
            }
            Phase::Search { pos, step } => {
                if let Behavior::VanishAfter(limit) = self.behavior {
                    if pos >= limit {
                        self.phase = Phase::Idle;
                        return;
                    }
                }
                match step {
                    0 => {
                        if !self.rom_bit(pos) {
                            self.drive(fell_at, DEVICE_LOW_US);
                        }
                        self.phase = Phase::Search { pos, step: 1 };
                    }
                    1 => {
                        if self.rom_bit(pos) {
                            self.drive(fell_at, DEVICE_LOW_US);
                        }
                        self.phase = Phase::Search { pos, step: 2 };
                    }
                    _ => {
                        // Direction bit: devices off the chosen branch go
                        // silent until the next reset
                        if bit != self.rom_bit(pos) || pos == 63 {
                            self.phase = Phase::Idle;
                        } else {
                            self.phase = Phase::Search { pos: pos + 1, step: 0 };
                        }
                    }
                }
            }
            Phase::ReadRom { pos } => {
                if !self.rom_bit(pos) {
                    self.drive(fell_at, DEVICE_LOW_US);
                }
                self.phase = if pos == 63 {
                    Phase::Idle
                } else {
                    Phase::ReadRom { pos: pos + 1 }
                };
            }
        }
    }
}

struct BusState {
    now: u64,
    master_low: bool,
    master_high: bool,
    fell_at: u64,
    devices: Vec<Device>,
}

impl BusState {
    /// The master stopped holding the line low; classify the pulse and let
    /// the devices react.
    fn end_low_phase(&mut self) {
        if !self.master_low {
            return;
        }
        self.master_low = false;
        let width = self.now - self.fell_at;
        if width >= RESET_THRESHOLD_US {
            for device in &mut self.devices {
                device.on_reset(self.now);
            }
        } else {
            let bit = width < WRITE_ONE_THRESHOLD_US;
            let fell_at = self.fell_at;
            for device in &mut self.devices {
                device.on_slot(bit, fell_at);
            }
        }
    }

    fn line_high(&self) -> bool {
        if self.master_low {
            return false;
        }
        if self.master_high {
            return true;
        }
        !self.devices.iter().any(|device| device.driving(self.now))
    }
}

/// Handle on a simulated bus; clones share the same line.
#[derive(Clone)]
pub struct SimBus(Rc<RefCell<BusState>>);

impl SimBus {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(BusState {
            now: 0,
            master_low: false,
            master_high: false,
            fell_at: 0,
            devices: Vec::new(),
        })))
    }

    pub fn attach(&self, device: Device) {
        self.0.borrow_mut().devices.push(device);
    }

    /// The line and delay ends to hand to a port.
    pub fn split(&self) -> (SimLine, SimDelay) {
        (SimLine(self.0.clone()), SimDelay(self.0.clone()))
    }
}

pub struct SimLine(Rc<RefCell<BusState>>);

impl OneWireLine for SimLine {
    type Error = core::convert::Infallible;

    fn set_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_input(&mut self, _pull: LinePull) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        bus.end_low_phase();
        bus.master_high = false;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        if !bus.master_low {
            bus.fell_at = bus.now;
            bus.master_low = true;
        }
        bus.master_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        bus.end_low_phase();
        bus.master_high = true;
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().line_high())
    }
}

pub struct SimDelay(Rc<RefCell<BusState>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now += ns as u64 / 1000;
    }
}
