use crate::OneWireResult;

/// One wire communication error type.
#[derive(Debug)]
pub enum OneWireError<E> {
    /// Encapsulates the error type of the underlying line hardware.
    Line(E),
    /// A timing contract was violated: the line stayed stuck at a level, a
    /// pulse width fell out of bounds, or a device dropped off the bus in
    /// the middle of a transfer.
    CommError,
    /// No presence pulse was observed after a reset; the bus is empty.
    NoDevices,
    /// A search found more devices than the port's table can hold.
    TooManyDevices,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Line(other)
    }
}

impl<E> OneWireError<E> {
    /// Stable human-readable text for this error.
    ///
    /// [`Line`](OneWireError::Line) errors fall outside the protocol
    /// taxonomy and map to the fallback string; render the wrapped error
    /// for the hardware-specific detail.
    pub fn as_str(&self) -> &'static str {
        match self {
            OneWireError::CommError => "Communication Error",
            OneWireError::NoDevices => "No devices",
            OneWireError::TooManyDevices => "Too many devices",
            OneWireError::Line(_) => "No such error",
        }
    }
}

/// Stable human-readable text for any operation outcome, success included.
pub fn error_to_string<T, E>(result: &OneWireResult<T, E>) -> &'static str {
    match result {
        Ok(_) => "No error",
        Err(error) => error.as_str(),
    }
}
