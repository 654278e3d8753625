use embedded_hal::delay::DelayNs;

use crate::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireAddress,
    OneWireError, OneWireResult,
    line::{LinePull, OneWireLine},
};

/// One timeslot is 60 µs; all sub-steps are budgeted in quarters of it.
const QUARTER_TIMESLOT_US: u32 = 15;
const QUARTERS_PER_TIMESLOT: u16 = 4;

/// The reset pulse must stay low for at least 8 timeslots; 10 adds margin.
const RESET_LOW_TIMESLOTS: u16 = 10;
/// After the reset pulse is released the line has to float back up within
/// this many microseconds, or the wiring is bad.
const RESET_FLOAT_TIMEOUT_US: u16 = 200;
/// Neither presence phase should exceed one timeslot; the bound leaves
/// generous slack before a stuck line is declared.
const PRESENCE_PHASE_MAX_QUARTERS: u16 = 90;
/// Minimum presence pulse width, one timeslot less a quarter of sampling
/// slack.
const PRESENCE_LOW_MIN_QUARTERS: u16 = 3;
/// Devices accept commands 8 timeslots after the reset pulse ends.
const RESET_RECOVERY_QUARTERS: u16 = 8 * QUARTERS_PER_TIMESLOT;

/// t_LOW1: long enough that every listener samples a clear low.
const WRITE_LOW_US: u32 = 7;
/// Remainder of the write slot, 1 + 1/4 timeslots.
const WRITE_HOLD_QUARTERS: u16 = 5;
/// t_REC after a write slot; 20 µs lets the line float fully.
const WRITE_RECOVERY_US: u32 = 20;

/// t_LOWR: the read request pulse, released before slaves answer.
const READ_LOW_US: u32 = 5;
/// Settle time between releasing the line and sampling the response.
const READ_SAMPLE_US: u32 = 5;
/// t_REC after a read slot.
const READ_RECOVERY_US: u32 = 10;

/// A bus master attached to one physical 1-Wire line.
///
/// Takes ownership of the line (implementing [`OneWireLine`]) and a timer
/// object implementing the [`DelayNs`](embedded_hal::delay::DelayNs) trait,
/// plus a caller-allocated address table whose length bounds how many
/// devices a search may record.
///
/// Every method blocks while it busy-waits out its timing windows, and the
/// port carries no transaction state between calls; callers in concurrent
/// environments must serialize access to a port themselves.
pub struct OneWirePort<'a, L, D> {
    pub(crate) line: L,
    pub(crate) delay: D,
    pub(crate) pull: LinePull,
    pub(crate) presence_high_quarters: u16,
    pub(crate) presence_low_quarters: u16,
    pub(crate) devices: &'a mut [OneWireAddress],
    pub(crate) num_devices: usize,
}

impl<'a, L, D> OneWirePort<'a, L, D> {
    /// Creates a port over `line` and `delay`.
    ///
    /// `devices` is the search result table; its length is the device
    /// capacity of the port.
    pub fn new(line: L, delay: D, devices: &'a mut [OneWireAddress]) -> Self {
        Self {
            line,
            delay,
            pull: LinePull::default(),
            presence_high_quarters: 0,
            presence_low_quarters: 0,
            devices,
            num_devices: 0,
        }
    }

    /// Selects the input bias used whenever the port releases the line.
    pub fn with_pull(mut self, pull: LinePull) -> Self {
        self.pull = pull;
        self
    }

    /// Capacity of the device table.
    pub fn capacity(&self) -> usize {
        self.devices.len()
    }

    /// Number of devices recorded by the last successful search.
    pub fn device_count(&self) -> usize {
        self.num_devices
    }

    /// Addresses recorded by the last successful search, in discovery
    /// order.
    pub fn devices(&self) -> &[OneWireAddress] {
        &self.devices[..self.num_devices]
    }

    /// Quarter-timeslots the line stayed high between the last reset pulse
    /// and the presence response.
    pub fn last_presence_high_quarters(&self) -> u16 {
        self.presence_high_quarters
    }

    /// Width of the last observed presence pulse, in quarter-timeslots.
    pub fn last_presence_low_quarters(&self) -> u16 {
        self.presence_low_quarters
    }
}

impl<L: OneWireLine, D: DelayNs> OneWirePort<'_, L, D> {
    fn delay_quarters(&mut self, quarters: u16) {
        self.delay.delay_us(quarters as u32 * QUARTER_TIMESLOT_US);
    }

    fn delay_timeslots(&mut self, timeslots: u16) {
        self.delay_quarters(timeslots * QUARTERS_PER_TIMESLOT);
    }

    /// Emits one write timeslot.
    ///
    /// The line is low for the full slot for a zero, and raised again after
    /// t_LOW1 for a one; either way the slot is followed by the recovery
    /// window with the line released.
    pub fn write_bit(&mut self, bit: bool) -> OneWireResult<(), L::Error> {
        self.line.set_output()?;
        self.line.set_low()?;
        self.delay.delay_us(WRITE_LOW_US);
        if bit {
            self.line.set_high()?;
        }
        self.delay_quarters(WRITE_HOLD_QUARTERS);
        self.line.set_input(self.pull)?;
        self.delay.delay_us(WRITE_RECOVERY_US);
        Ok(())
    }

    /// Emits one read timeslot and ORs the sampled bit into `value` at
    /// `position`.
    ///
    /// The slot is always consumed in full. A line still low at the end of
    /// the slot means a slave is overrunning its window, reported as
    /// [`CommError`](OneWireError::CommError).
    pub(crate) fn read_bit_or(&mut self, value: &mut u8, position: u8) -> OneWireResult<(), L::Error> {
        self.line.set_output()?;
        self.line.set_low()?;
        self.delay.delay_us(READ_LOW_US);

        // Release the line, wait for the responder
        self.line.set_input(self.pull)?;
        self.delay.delay_us(READ_SAMPLE_US);
        if self.line.is_high()? {
            *value |= 1 << position;
        }

        // Wait out the timeslot, after which the line must be back up
        self.delay_timeslots(1);
        if !self.line.is_high()? {
            return Err(OneWireError::CommError);
        }
        self.delay.delay_us(READ_RECOVERY_US);
        Ok(())
    }

    /// Emits one read timeslot and returns the sampled bit.
    pub fn read_bit(&mut self) -> OneWireResult<bool, L::Error> {
        let mut value = 0;
        self.read_bit_or(&mut value, 0)?;
        Ok(value & 1 == 1)
    }

    /// Resets the bus and waits for the presence response.
    ///
    /// Records the observed high and low presence phases in quarter
    /// timeslots, rejecting a presence pulse shorter than the protocol
    /// minimum, and does not return before all devices are ready for the
    /// next command.
    ///
    /// # Errors
    /// [`NoDevices`](OneWireError::NoDevices) if nothing answers the reset;
    /// [`CommError`](OneWireError::CommError) if the line never floats up
    /// after the pulse, stays low past the presence bound, or the presence
    /// pulse is too short to be a response.
    pub fn reset_pulse(&mut self) -> OneWireResult<(), L::Error> {
        // Send the reset pulse
        self.line.set_output()?;
        self.line.set_low()?;
        self.delay_timeslots(RESET_LOW_TIMESLOTS);
        self.line.set_input(self.pull)?;

        // Allow the line some time to float up
        let mut limit: u16 = 0;
        while !self.line.is_high()? {
            self.delay.delay_us(1);
            limit += 1;
            if limit > RESET_FLOAT_TIMEOUT_US {
                return Err(OneWireError::CommError);
            }
        }

        // Spin until a device pulls the line low
        self.presence_high_quarters = 0;
        self.presence_low_quarters = 0;
        loop {
            self.delay_quarters(1);
            self.presence_high_quarters += 1;
            if self.presence_high_quarters > PRESENCE_PHASE_MAX_QUARTERS {
                return Err(OneWireError::NoDevices);
            }
            if !self.line.is_high()? {
                break;
            }
        }

        // Spin until the presence pulse ends
        loop {
            self.delay_quarters(1);
            self.presence_low_quarters += 1;
            if self.presence_low_quarters > PRESENCE_PHASE_MAX_QUARTERS {
                return Err(OneWireError::CommError);
            }
            if self.line.is_high()? {
                break;
            }
        }

        // A pulse under one timeslot less sampling slack is line noise,

        // not a presence response
        if self.presence_low_quarters < PRESENCE_LOW_MIN_QUARTERS {
            return Err(OneWireError::CommError);
        }

        // Pad to 8 timeslots since the pulse ended so every device is

        // ready to receive the next command
        let elapsed = self.presence_high_quarters + self.presence_low_quarters;
        self.delay_quarters(RESET_RECOVERY_QUARTERS.saturating_sub(elapsed));

        Ok(())
    }

    /// Writes one octet, least significant bit first.
    pub fn write_octet(&mut self, mut value: u8) -> OneWireResult<(), L::Error> {
        for _ in 0..8 {
            self.write_bit(value & 1 != 0)?;
            value >>= 1;
        }
        Ok(())
    }

    /// Reads one octet, least significant bit first.
    ///
    /// Aborts on the first failed slot; the partially assembled byte is
    /// discarded.
    pub fn read_octet(&mut self) -> OneWireResult<u8, L::Error> {
        let mut value = 0;
        for position in 0..8 {
            self.read_bit_or(&mut value, position)?;
        }
        Ok(value)
    }

    /// Resets the bus and, when something is present, sends `cmd`.
    pub fn send_command(&mut self, cmd: u8) -> OneWireResult<(), L::Error> {
        self.reset_pulse()?;
        self.write_octet(cmd)
    }

    /// Addresses devices for a subsequent transport-layer exchange.
    ///
    /// With a ROM this is a match-ROM prologue selecting exactly one
    /// device; with [`None`] every device on the bus is selected, which on
    /// a multidrop bus makes sense for write-only broadcasts.
    pub fn address(&mut self, rom: Option<&OneWireAddress>) -> OneWireResult<(), L::Error> {
        match rom {
            Some(rom) => {
                self.send_command(ONEWIRE_MATCH_ROM_CMD)?;
                for &byte in rom.as_bytes() {
                    self.write_octet(byte)?;
                }
                Ok(())
            }
            None => self.send_command(ONEWIRE_SKIP_ROM_CMD),
        }
    }

    /// Reads the ROM code of the only device on the bus.
    ///
    /// On a multidrop bus the responses collide and the result is garbage;
    /// use [`search`](OneWirePort::search) there instead. The CRC byte is
    /// returned as read, unvalidated.
    pub fn read_rom(&mut self) -> OneWireResult<OneWireAddress, L::Error> {
        self.send_command(ONEWIRE_READ_ROM_CMD)?;
        let mut bytes = [0u8; 8];
        for byte in bytes.iter_mut() {
            *byte = self.read_octet()?;
        }
        Ok(OneWireAddress::new(bytes))
    }
}
