use core::fmt::{self, Debug};
use embedded_hal::{digital, spi};
use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// The error type used by this library.
///
/// This can encapsulate an SPI or chip-select error, and adds its own
/// protocol errors on top of that.
pub enum Error<SPI: spi::ErrorType, CS: digital::ErrorType> {
    /// An SPI transfer failed.
    Spi(SPI::Error),
    /// The chip-select pin could not be driven.
    Pin(CS::Error),
    /// The device was still busy once the poll budget ran out.
    Timeout,
    /// Erase address not aligned to the erase granularity.
    NotAligned,
    /// Access past the end of the device.
    OutOfBounds,
}

impl<SPI: spi::ErrorType, CS: digital::ErrorType> Error<SPI, CS> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

impl<SPI: spi::ErrorType, CS: digital::ErrorType> Debug for Error<SPI, CS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "Error::Spi({:?})", spi),
            Error::Pin(pin) => write!(f, "Error::Pin({:?})", pin),
            Error::Timeout => write!(f, "Error::Timeout"),
            Error::NotAligned => write!(f, "Error::NotAligned"),
            Error::OutOfBounds => write!(f, "Error::OutOfBounds"),
        }
    }
}

#[cfg(feature = "defmt-03")]
impl<SPI: spi::ErrorType, CS: digital::ErrorType> defmt::Format for Error<SPI, CS> {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::Spi(_) => defmt::write!(fmt, "Error::Spi"),
            Error::Pin(_) => defmt::write!(fmt, "Error::Pin"),
            Error::Timeout => defmt::write!(fmt, "Error::Timeout"),
            Error::NotAligned => defmt::write!(fmt, "Error::NotAligned"),
            Error::OutOfBounds => defmt::write!(fmt, "Error::OutOfBounds"),
        }
    }
}

impl<SPI: spi::ErrorType, CS: digital::ErrorType> From<NorFlashErrorKind> for Error<SPI, CS> {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => Error::NotAligned,
            _ => Error::OutOfBounds,
        }
    }
}

impl<SPI: spi::ErrorType, CS: digital::ErrorType> NorFlashError for Error<SPI, CS> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::NotAligned => NorFlashErrorKind::NotAligned,
            Error::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Error::Spi(_) | Error::Pin(_) | Error::Timeout => NorFlashErrorKind::Other,
        }
    }
}
