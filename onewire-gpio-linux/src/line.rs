use gpio_cdev::{Line, LineHandle, LineRequestFlags};
use onewire_gpio::{LinePull, OneWireLine};

const CONSUMER: &str = "onewire-gpio";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// [`OneWireLine`] over a Linux GPIO character-device line.
///
/// The cdev interface has no runtime direction toggle, so every
/// input/output switch re-requests the line from the kernel. That is a
/// syscall per switch; on a non-realtime kernel the timeslot budget is
/// best effort and marginal wiring will surface as communication errors.
pub struct CdevLine {
    line: Line,
    handle: Option<LineHandle>,
    direction: Direction,
}

impl CdevLine {
    /// Claims `line` as a floating input to start with.
    pub fn new(line: Line) -> Result<Self, gpio_cdev::Error> {
        let handle = line.request(LineRequestFlags::INPUT, 0, CONSUMER)?;
        Ok(Self {
            line,
            handle: Some(handle),
            direction: Direction::Input,
        })
    }

    fn request(
        &mut self,
        flags: LineRequestFlags,
        value: u8,
        direction: Direction,
    ) -> Result<&LineHandle, gpio_cdev::Error> {
        // The previous handle must be released before re-requesting.
        self.handle = None;
        let handle = self.line.request(flags, value, CONSUMER)?;
        self.direction = direction;
        Ok(self.handle.insert(handle))
    }
}

impl OneWireLine for CdevLine {
    type Error = gpio_cdev::Error;

    fn set_output(&mut self) -> Result<(), Self::Error> {
        if self.direction != Direction::Output || self.handle.is_none() {
            self.request(LineRequestFlags::OUTPUT, 1, Direction::Output)?;
        }
        Ok(())
    }

    fn set_input(&mut self, pull: LinePull) -> Result<(), Self::Error> {
        let mut flags = LineRequestFlags::INPUT;
        if pull == LinePull::InternalPullUp {
            flags |= LineRequestFlags::BIAS_PULL_UP;
        }
        self.request(flags, 0, Direction::Input)?;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.direction == Direction::Output {
            if let Some(handle) = &self.handle {
                return handle.set_value(0);
            }
        }
        self.request(LineRequestFlags::OUTPUT, 0, Direction::Output)?;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.direction == Direction::Output {
            if let Some(handle) = &self.handle {
                return handle.set_value(1);
            }
        }
        self.request(LineRequestFlags::OUTPUT, 1, Direction::Output)?;
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if let Some(handle) = &self.handle {
            return Ok(handle.get_value()? != 0);
        }
        let handle = self.request(LineRequestFlags::INPUT, 0, Direction::Input)?;
        Ok(handle.get_value()? != 0)
    }
}
