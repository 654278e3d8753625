/// Input bias applied whenever the port releases the line.
///
/// An open-drain bus needs a pull-up somewhere. Boards with a discrete
/// resistor on the wire run the input floating; otherwise the controller
/// pin's internal pull-up has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinePull {
    /// An external resistor keeps the released line high.
    External,
    /// Enable the controller's internal pull-up on the input pin.
    #[default]
    InternalPullUp,
}

/// Capability interface for the single data line driven by an
/// [`OneWirePort`](crate::OneWirePort).
///
/// The port switches the pin between a driven output and a released
/// (floating) input many times per timeslot; implementations must reflect
/// the true electrical state well inside the 15 µs quarter-timeslot budget,
/// or reads will misfire as [`CommError`](crate::OneWireError::CommError).
pub trait OneWireLine {
    /// Error type of the underlying pin hardware.
    type Error;

    /// Reconfigure the pin as a driven output.
    fn set_output(&mut self) -> Result<(), Self::Error>;

    /// Release the pin: floating input with the requested bias.
    fn set_input(&mut self, pull: LinePull) -> Result<(), Self::Error>;

    /// Drive the output level low.
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Drive the output level high.
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Sample the current line level; `true` is high.
    fn is_high(&mut self) -> Result<bool, Self::Error>;
}
