use embedded_hal::delay::DelayNs;

use crate::{
    ONEWIRE_ALARM_SEARCH_CMD, ONEWIRE_SEARCH_ROM_CMD, OneWireAddress, OneWireError, OneWirePort,
    OneWireResult, line::OneWireLine,
};

/// Which population a [`search`](OneWirePort::search_with) pass addresses.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneWireSearchKind {
    /// Every device on the bus.
    Normal = ONEWIRE_SEARCH_ROM_CMD,
    /// Only devices currently in an alarm state.
    Alarmed = ONEWIRE_ALARM_SEARCH_CMD,
}

impl<L: OneWireLine, D: DelayNs> OneWirePort<'_, L, D> {
    /// Enumerates every device on the bus into the port's device table.
    ///
    /// Equivalent to [`search_with`](OneWirePort::search_with) using
    /// [`OneWireSearchKind::Normal`].
    pub fn search(&mut self) -> OneWireResult<(), L::Error> {
        self.search_with(OneWireSearchKind::Normal)
    }

    /// Enumerates the devices answering `kind` into the port's device
    /// table.
    ///
    /// The address space is a binary tree of depth 64: the first
    /// transmitted bit is the level below the root and each device address
    /// is a root-to-leaf path. A pass resets the bus, sends the search
    /// command, and reads 64 bit/complement pairs; where still-active
    /// devices disagree, the master writes its chosen branch back, which
    /// silences every device off that path. One pass therefore walks out
    /// exactly one leaf, and the deepest position where the 0-branch was
    /// newly taken steers the next pass to the unexplored side.
    ///
    /// On success the table holds one entry per device in discovery order
    /// and [`device_count`](OneWirePort::device_count) reflects it. On any
    /// error the count is left at its previous value; table slots touched
    /// by completed passes of the failed search hold full addresses, while
    /// anything beyond the committed count is undefined.
    ///
    /// # Errors
    /// Errors from the embedded reset and read slots propagate and abort
    /// the search. A bus that stops answering at the first bit position
    /// reports [`NoDevices`](OneWireError::NoDevices); a device dropping
    /// off deeper into a pass reports
    /// [`CommError`](OneWireError::CommError);
    /// [`TooManyDevices`](OneWireError::TooManyDevices) means the table
    /// filled before the tree was exhausted.
    pub fn search_with(&mut self, kind: OneWireSearchKind) -> OneWireResult<(), L::Error> {
        let mut last_split: Option<u8> = None;
        let mut device_position: usize = 0;

        if self.devices.is_empty() {
            return Err(OneWireError::TooManyDevices);
        }

        loop {
            // Split position where this pass chose 0 at a collision;
            // stays None when the pass ran collision-free
            let mut current_split: Option<u8> = None;
            let mut rom = OneWireAddress::default();

            self.send_command(kind as u8)?;

            for position in 0..64u8 {
                let mut value = 0;
                let mut inv_value = 0;
                self.read_bit_or(&mut value, 0)?;
                self.read_bit_or(&mut inv_value, 0)?;

                let next_bit = match (value & 1 != 0, inv_value & 1 != 0) {
                    (true, true) => {
                        // No response: nothing on the bus at the first
                        // position, a dropped device later on
                        return Err(if position == 0 {
                            OneWireError::NoDevices
                        } else {
                            OneWireError::CommError
                        });
                    }
                    (false, false) => {
                        // Devices disagree here. Take 0 until the branch
                        // explored last pass is reached, 1 beyond it
                        if last_split.is_none_or(|split| position < split) {
                            current_split = Some(position);
                            false
                        } else {
                            true
                        }
                    }
                    // Unique response, follow it
                    (value_bit, _) => value_bit,
                };

                if next_bit {
                    rom.set_bit(position);
                }
                // Everything off the chosen branch falls silent
                self.write_bit(next_bit)?;
            }

            self.devices[device_position] = rom;
            last_split = current_split;

            device_position += 1;
            if device_position == self.devices.len() {
                return Err(OneWireError::TooManyDevices);
            }

            if last_split.is_none() {
                break;
            }
        }

        self.num_devices = device_position;
        Ok(())
    }
}
