//! Error type shared by the transmitter and the repeat coordinator.

use embedded_hal::{digital, pwm};

/// Errors reported while encoding or transmitting NEC frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The command byte of a raw code is not the inverse of the inverted command byte.
    ///
    /// Nothing is transmitted when a raw code fails this check.
    #[error("raw code {code:#010x} fails the command inverse check")]
    Checksum {
        /// The rejected raw code
        code: u32,
    },
    /// The output pin reported an error.
    #[error("output pin error: {0:?}")]
    Pin(digital::ErrorKind),
    /// The carrier PWM reported an error.
    #[error("carrier error: {0:?}")]
    Carrier(pwm::ErrorKind),
    /// The repeat task panicked while it owned the hardware, so it cannot be
    /// handed back to the sender.
    #[error("transmitter lost by a panicked repeat task")]
    TransmitterLost,
    /// The operating system refused to start the repeat thread.
    #[cfg(feature = "std")]
    #[error("failed to start repeat thread: {0:?}")]
    Spawn(std::io::ErrorKind),
}

impl Error {
    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        Error::Pin(err.kind())
    }

    pub(crate) fn carrier<E: pwm::Error>(err: E) -> Self {
        Error::Carrier(err.kind())
    }
}

#[cfg(feature = "defmt-0-3")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Checksum { code } => defmt::write!(f, "Checksum({=u32:#x})", *code),
            Error::Pin(kind) => defmt::write!(f, "Pin({})", kind),
            Error::Carrier(kind) => defmt::write!(f, "Carrier({})", kind),
            Error::TransmitterLost => defmt::write!(f, "TransmitterLost"),
            #[cfg(feature = "std")]
            Error::Spawn(kind) => defmt::write!(f, "Spawn({})", defmt::Debug2Format(kind)),
        }
    }
}
