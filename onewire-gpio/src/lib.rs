#![no_std]
#![deny(missing_docs)]
//! # onewire-gpio
//! A no-std bus master for the 1-Wire protocol, bit-banged over a single
//! open-drain GPIO line.
//!
//! The protocol multiplexes reset/presence signalling, bit transfers and
//! device enumeration onto one wire using nothing but timing: a timeslot of
//! 60 µs carries one bit in either direction, and all sub-steps are budgeted
//! in quarter-timeslot (15 µs) units. [`OneWirePort`] owns one physical line
//! for the duration of every transaction and provides the reset-pulse state
//! machine, octet-level transfers and the ROM-search algorithm that
//! discovers every device address on a shared line.
//!
//! Hardware access is injected through two capabilities: [`OneWireLine`]
//! (line direction, level and sampling, with a runtime [`LinePull`]
//! selection) and [`DelayNs`](embedded_hal::delay::DelayNs) (microsecond
//! busy-wait). Tests substitute a simulated bus for both; targets supply
//! their GPIO and timer peripherals.
//!
//! Every operation is synchronous and blocking, and no retries are made on
//! behalf of the caller; all outcomes are reported through
//! [`OneWireResult`].

mod address;
mod crc;
mod error;
mod line;
mod port;
mod search;

pub use address::OneWireAddress;
pub use crc::OneWireCrc;
pub use error::{OneWireError, error_to_string};
pub use line::{LinePull, OneWireLine};
pub use port::OneWirePort;
pub use search::OneWireSearchKind;

/// Outcome of a 1-Wire operation.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;

/// Command to read the ROM code of the only device on a single-drop bus.
pub const ONEWIRE_READ_ROM_CMD: u8 = 0x33;

/// Command to address a specific device by its full ROM code.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to address every device on the bus without sending a ROM code.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;

/// Command to search for devices on the 1-Wire bus.
pub const ONEWIRE_SEARCH_ROM_CMD: u8 = 0xf0;

/// Command to search only for devices in an alarm state.
pub const ONEWIRE_ALARM_SEARCH_CMD: u8 = 0xec;

/// Transport-layer command to read main memory.
pub const ONEWIRE_READ_MEMORY_CMD: u8 = 0xf0;

/// Transport-layer command to write the scratchpad.
pub const ONEWIRE_WRITE_SCRATCHPAD_CMD: u8 = 0x0f;

/// Transport-layer command to read the scratchpad back.
pub const ONEWIRE_READ_SCRATCHPAD_CMD: u8 = 0xaa;

/// Transport-layer command to commit the scratchpad to memory.
pub const ONEWIRE_COPY_SCRATCHPAD_CMD: u8 = 0x55;
