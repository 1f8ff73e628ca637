//! Refer to datasheet:
//! https://datasheet.lcsc.com/lcsc/1912111437_Winbond-Elec-W25Q128JVSIQ_C113767.pdf

use crate::config::{address_bytes, Config, EraseKind, Opcode, FILLER, POWER_DOWN_RELEASE_US};
use crate::error::Error;
use crate::page::PageSegments;
use crate::register::Status;
use crate::traits::HardwareFlashDevice;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// W25Q16JV, 16M-bit.
pub type W25Q16<SPI, CS, D> = FlashSpi<0x20_0000, SPI, CS, D>;
/// W25Q32JV, 32M-bit.
pub type W25Q32<SPI, CS, D> = FlashSpi<0x40_0000, SPI, CS, D>;
/// W25Q64JV, 64M-bit.
pub type W25Q64<SPI, CS, D> = FlashSpi<0x80_0000, SPI, CS, D>;
/// W25Q128JV, 128M-bit. The largest part fully reachable with 3-byte
/// addresses.
pub type W25Q128<SPI, CS, D> = FlashSpi<0x100_0000, SPI, CS, D>;

/// Blocking driver for a W25Q flash of `CAPACITY` bytes.
///
/// The driver owns the SPI bus, the /CS pin and a delay provider, and
/// drives /CS itself: the status poll keeps /CS low across many sampled
/// bytes, which a per-transaction `SpiDevice` cannot express.
pub struct FlashSpi<const CAPACITY: u32, SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    config: Config,
}

impl<const CAPACITY: u32, SPI, CS, D> Debug for FlashSpi<CAPACITY, SPI, CS, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashSpi")
            .field("capacity", &CAPACITY)
            .field("config", &self.config)
            .finish()
    }
}

fn command_header(op: Opcode, addr: u32) -> [u8; 4] {
    let [a2, a1, a0] = address_bytes(addr);
    [op.into(), a2, a1, a0]
}

impl<const CAPACITY: u32, SPI, CS, D> HardwareFlashDevice for FlashSpi<CAPACITY, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = Error<SPI, CS>;

    /// Read Data (03h), datasheet section 8.2.6.
    ///
    /// Note that `addr` is not fully decoded: Flash chips will typically only
    /// look at the lowest `N` bits needed to encode their size, which means
    /// that the contents are "mirrored" to addresses that are a multiple of the
    /// flash size. Only 24 bits of `addr` are transferred to the device in any
    /// case.
    ///
    /// A poll timeout before the read is logged and the read goes ahead; only
    /// bus errors are reported.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        #[cfg(feature = "defmt-03")]
        defmt::trace!("read {=u32:#08x} len {=usize}", addr, buf.len());

        match self.wait_until_idle() {
            Err(Error::Timeout) => {
                #[cfg(feature = "defmt-03")]
                defmt::warn!("Reading {=u32:#08x} while the flash still reports busy", addr);
            }
            other => other?,
        }

        let header = command_header(Opcode::Read, addr);
        buf.fill(FILLER);
        self.select(|spi, _| {
            spi.write(&header)?;
            spi.transfer_in_place(buf)
        })
    }

    /// Page Program (02h), datasheet section 8.2.13, applied once per page
    /// touched by `data`.
    ///
    /// The device only advances its internal pointer inside the addressed
    /// 256-byte page, so every page gets its own instruction, idle wait and
    /// Write Enable.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error> {
        #[cfg(feature = "defmt-03")]
        defmt::trace!("write {=u32:#08x} len {=usize}", addr, data.len());

        for (segment_addr, segment) in PageSegments::new(addr, data) {
            self.program_segment(segment_addr, segment)?;
        }
        self.wait_until_idle()
    }

    /// Sector Erase (20h), datasheet section 8.2.15.
    fn erase_sector(&mut self, addr: u32) -> Result<(), Self::Error> {
        self.erase_at(EraseKind::Sector, addr)
    }

    /// 32KB Block Erase (52h), datasheet section 8.2.16.
    fn erase_block_32k(&mut self, addr: u32) -> Result<(), Self::Error> {
        self.erase_at(EraseKind::Block32, addr)
    }

    /// 64KB Block Erase (D8h), datasheet section 8.2.17.
    fn erase_block_64k(&mut self, addr: u32) -> Result<(), Self::Error> {
        self.erase_at(EraseKind::Block64, addr)
    }

    /// Chip Erase (60h), datasheet section 8.2.18.
    ///
    /// A full erase takes far longer than the default poll budget on the
    /// larger parts; use [`FlashSpi::new_with_config`] with a bigger budget
    /// if a `Timeout` here is not acceptable.
    fn erase_full(&mut self) -> Result<(), Self::Error> {
        self.erase_at(EraseKind::Chip, 0)
    }
}

impl<const CAPACITY: u32, SPI, CS, D> FlashSpi<CAPACITY, SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self::new_with_config(spi, cs, delay, Config::default())
    }

    pub fn new_with_config(spi: SPI, cs: CS, delay: D, config: Config) -> Self {
        Self {
            spi,
            cs,
            delay,
            config,
        }
    }

    /// Creates the driver and blocks until the flash is idle.
    pub fn init(spi: SPI, cs: CS, delay: D) -> Result<Self, Error<SPI, CS>> {
        let mut this = Self::new(spi, cs, delay);
        this.wait_until_idle()?;
        let _status = this.read_status()?;
        #[cfg(feature = "defmt-03")]
        defmt::debug!("Initial status: {:?}", _status);
        Ok(this)
    }

    pub const fn capacity() -> usize {
        CAPACITY as usize
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Hands back the bus, the /CS pin and the delay.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    /// Runs `f` with /CS asserted.
    ///
    /// /CS is released even when `f` fails; the bus error then takes
    /// precedence over a pin error.
    fn select<R, F>(&mut self, f: F) -> Result<R, Error<SPI, CS>>
    where
        F: FnOnce(&mut SPI, &mut D) -> Result<R, SPI::Error>,
    {
        self.cs.set_low().map_err(Error::Pin)?;
        let res = f(&mut self.spi, &mut self.delay);
        let flushed = self.spi.flush();
        let released = self.cs.set_high();

        let value = res.map_err(Error::Spi)?;
        flushed.map_err(Error::Spi)?;
        released.map_err(Error::Pin)?;
        Ok(value)
    }

    /// Writes a single /CS framed instruction.
    fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI, CS>> {
        self.select(|spi, _| spi.write(bytes))
    }

    /// Writes an instruction then clocks `response.len()` bytes back in the
    /// same /CS frame.
    fn command_with_response(
        &mut self,
        instruction: &[u8],
        response: &mut [u8],
    ) -> Result<(), Error<SPI, CS>> {
        response.fill(FILLER);
        self.select(|spi, _| {
            spi.write(instruction)?;
            spi.transfer_in_place(response)
        })
    }

    /// Blocks until the BUSY bit of status register 1 clears.
    ///
    /// /CS stays asserted for the whole wait: the Read Status Register
    /// instruction is sent once and the register is sampled continuously,
    /// at most `config.poll.attempts()` times with `config.poll.interval_us()`
    /// between samples.
    pub fn wait_until_idle(&mut self) -> Result<(), Error<SPI, CS>> {
        let budget = self.config.poll;
        let setup_us = self.config.select_setup_us;

        let samples = self.select(|spi, delay| {
            delay.delay_us(setup_us);
            spi.write(&[Opcode::ReadStatus1.into()])?;
            budget.poll(delay, || {
                let mut sample = [FILLER];
                spi.transfer_in_place(&mut sample)?;
                Ok(!Status::from_bits_truncate(sample[0]).is_busy())
            })
        })?;

        match samples {
            Some(_samples) => {
                #[cfg(feature = "defmt-03")]
                defmt::trace!("idle after {=u32} status samples", _samples);
                Ok(())
            }
            None => {
                #[cfg(feature = "defmt-03")]
                defmt::warn!(
                    "Flash still busy after {=u32} status samples",
                    budget.attempts()
                );
                Err(Error::Timeout)
            }
        }
    }

    /// Write Enable (06h) / Write Disable (04h), datasheet sections 8.2.1
    /// and 8.2.4.
    ///
    /// The latch is not read back: callers confirm the device is idle first
    /// and issue the program or erase instruction right after.
    pub fn set_write_enable(&mut self, enabled: bool) -> Result<(), Error<SPI, CS>> {
        let op = if enabled {
            Opcode::WriteEnable
        } else {
            Opcode::WriteDisable
        };
        self.command(&[op.into()])?;
        self.delay.delay_us(self.config.write_enable_settle_us);
        Ok(())
    }

    /// One Page Program instruction. `data` must not run past the end of
    /// the page holding `addr`.
    fn program_segment(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI, CS>> {
        debug_assert!(data.len() as u32 <= crate::config::page_remaining(addr));

        self.wait_until_idle()?;
        self.set_write_enable(true)?;

        let header = command_header(Opcode::PageProgram, addr);
        self.select(|spi, _| {
            spi.write(&header)?;
            spi.write(data)
        })
    }

    /// Erases the unit of `kind` starting at `addr`.
    ///
    /// Misaligned addresses are rejected before anything reaches the bus.
    /// `addr` is ignored for [`EraseKind::Chip`].
    pub fn erase_at(&mut self, kind: EraseKind, addr: u32) -> Result<(), Error<SPI, CS>> {
        if !kind.is_aligned(addr) {
            #[cfg(feature = "defmt-03")]
            defmt::warn!("{:?} erase at unaligned address {=u32:#08x}", kind, addr);
            return Err(Error::NotAligned);
        }

        #[cfg(feature = "defmt-03")]
        defmt::trace!("{:?} erase at {=u32:#08x}", kind, addr);

        self.wait_until_idle()?;
        self.set_write_enable(true)?;
        match kind {
            EraseKind::Chip => self.command(&[kind.opcode().into()])?,
            _ => self.command(&command_header(kind.opcode(), addr))?,
        }
        self.delay.delay_us(self.config.erase_settle_us);
        self.wait_until_idle()
    }

    /// Reads status register 1 once.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI, CS>> {
        let mut response = [0u8; 1];
        self.command_with_response(&[Opcode::ReadStatus1.into()], &mut response)?;
        Ok(Status::from_bits_truncate(response[0]))
    }

    /// Reads status register 2 once, undecoded.
    pub fn read_status_2(&mut self) -> Result<u8, Error<SPI, CS>> {
        let mut response = [0u8; 1];
        self.command_with_response(&[Opcode::ReadStatus2.into()], &mut response)?;
        Ok(response[0])
    }

    pub fn is_busy(&mut self) -> Result<bool, Error<SPI, CS>> {
        Ok(self.read_status()?.is_busy())
    }

    /// Reads the raw JEDEC manufacturer/device identification
    /// (manufacturer, memory type, capacity).
    pub fn read_jedec_id(&mut self) -> Result<[u8; 3], Error<SPI, CS>> {
        self.wait_until_idle()?;
        let mut response = [0u8; 3];
        self.command_with_response(&[Opcode::ReadJedecId.into()], &mut response)?;
        Ok(response)
    }

    /// Reads the factory programmed 64-bit unique ID. The instruction is
    /// followed by four dummy bytes.
    pub fn read_unique_id(&mut self) -> Result<[u8; 8], Error<SPI, CS>> {
        self.wait_until_idle()?;
        let mut response = [0u8; 8];
        self.command_with_response(
            &[Opcode::ReadUniqueId.into(), FILLER, FILLER, FILLER, FILLER],
            &mut response,
        )?;
        Ok(response)
    }

    /// Power-down (B9h). Every instruction but Release Power-down is
    /// ignored until [`Self::release_power_down`].
    pub fn power_down(&mut self) -> Result<(), Error<SPI, CS>> {
        self.wait_until_idle()?;
        self.command(&[Opcode::PowerDown.into()])?;
        #[cfg(feature = "defmt-03")]
        defmt::debug!("Flash powered down");
        Ok(())
    }

    /// Release Power-down (ABh). Does not poll first: status reads are
    /// ignored while the device is powered down.
    pub fn release_power_down(&mut self) -> Result<(), Error<SPI, CS>> {
        self.command(&[Opcode::ReleasePowerDown.into()])?;
        self.delay.delay_us(POWER_DOWN_RELEASE_US);
        #[cfg(feature = "defmt-03")]
        defmt::debug!("Flash released from power down");
        Ok(())
    }

    /// Software reset (see datasheet 6.4)
    /// The W25Q128JV can be reset to the initial power-on state by a software Reset
    /// sequence. This sequence must include two consecutive instructions: Enable Reset
    /// (66h) & Reset (99h). The device then takes approximately 30μS (tRST) to reset.
    pub fn software_reset(&mut self) -> Result<(), Error<SPI, CS>> {
        self.wait_until_idle()?;
        self.command(&[Opcode::EnableReset.into()])?;
        self.command(&[Opcode::Reset.into()])?;
        self.delay.delay_us(self.config.reset_recovery_us);
        #[cfg(feature = "defmt-03")]
        defmt::debug!("Flash reset");
        Ok(())
    }
}
