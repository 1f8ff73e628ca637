//! Implementation of the `NorFlash` traits of the `embedded_storage` crate.

use crate::comms::FlashSpi;
use crate::config::{EraseKind, BLOCK32_SIZE, BLOCK64_SIZE, SECTOR_SIZE};
use crate::error::Error;
use crate::traits::HardwareFlashDevice;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, MultiwriteNorFlash, NorFlash, ReadNorFlash,
};

/// Largest erase instruction that starts at `addr` and stays below `to`.
pub(crate) fn largest_erase(addr: u32, to: u32) -> EraseKind {
    let remaining = to - addr;
    if addr % BLOCK64_SIZE == 0 && remaining >= BLOCK64_SIZE {
        EraseKind::Block64
    } else if addr % BLOCK32_SIZE == 0 && remaining >= BLOCK32_SIZE {
        EraseKind::Block32
    } else {
        EraseKind::Sector
    }
}

impl<const CAPACITY: u32, SPI, CS, D> ErrorType for FlashSpi<CAPACITY, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = Error<SPI, CS>;
}

impl<const CAPACITY: u32, SPI, CS, D> ReadNorFlash for FlashSpi<CAPACITY, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        HardwareFlashDevice::read(self, offset, bytes)
    }

    fn capacity(&self) -> usize {
        CAPACITY as usize
    }
}

impl<const CAPACITY: u32, SPI, CS, D> NorFlash for FlashSpi<CAPACITY, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE as usize;

    /// Erases `from..to` with as few instructions as possible.
    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        let mut addr = from;
        while addr < to {
            let kind = largest_erase(addr, to);
            self.erase_at(kind, addr)?;
            // `largest_erase` only hands out erases with a size.
            addr += kind.size().unwrap_or(SECTOR_SIZE);
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        HardwareFlashDevice::write(self, offset, bytes)
    }
}

// NOR cells only go from 1 to 0 on program, so overlapping writes are fine.
impl<const CAPACITY: u32, SPI, CS, D> MultiwriteNorFlash for FlashSpi<CAPACITY, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
}
