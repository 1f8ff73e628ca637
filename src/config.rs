//! Refer to datasheet:
//! https://datasheet.lcsc.com/lcsc/1912111437_Winbond-Elec-W25Q128JVSIQ_C113767.pdf

use crate::poll::PollBudget;

/// Largest number of bytes a single Page Program instruction accepts.
pub const PAGE_SIZE: u32 = 0x100;
/// Smallest erasable unit.
pub const SECTOR_SIZE: u32 = 0x1000;
pub const BLOCK32_SIZE: u32 = 0x8000;
pub const BLOCK64_SIZE: u32 = 0x10000;

/// Byte clocked out while the device is talking.
pub const FILLER: u8 = 0x00;

/// Samples of status register 1 before giving up on BUSY.
pub const POLL_ATTEMPTS: u32 = 10_000;
/// Delay between two status samples, in microseconds.
pub const POLL_INTERVAL_US: u32 = 100;
/// Delay between asserting /CS and the first status sample.
pub const SELECT_SETUP_US: u32 = 100;
/// Delay after a Write Enable / Write Disable instruction.
pub const WRITE_ENABLE_SETTLE_US: u32 = 100;
/// Delay between the end of an erase instruction and the first status poll.
pub const ERASE_SETTLE_US: u32 = 100;
/// tRST, the time the device ignores instructions after a software reset.
pub const RESET_RECOVERY_US: u32 = 30;
/// tRES1, release from power-down to standby.
pub const POWER_DOWN_RELEASE_US: u32 = 3;

/// Instruction set shared by the W25Q parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Set the write enable latch.
    WriteEnable = 0x06,
    /// Clear the write enable latch.
    WriteDisable = 0x04,
    /// Read the 8-bit status register 1.
    ReadStatus1 = 0x05,
    /// Read the 8-bit status register 2.
    ReadStatus2 = 0x35,
    PageProgram = 0x02,
    SectorErase = 0x20,
    BlockErase32 = 0x52,
    BlockErase64 = 0xD8,
    ChipErase = 0x60,
    Read = 0x03,
    /// Read 8-bit manufacturer ID and 16-bit device ID.
    ReadJedecId = 0x9F,
    /// Read the factory programmed 64-bit unique ID.
    ReadUniqueId = 0x4B,
    PowerDown = 0xB9,
    ReleasePowerDown = 0xAB,
    EnableReset = 0x66,
    Reset = 0x99,
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

/// Erase granularities and the instruction used for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum EraseKind {
    Sector,
    Block32,
    Block64,
    Chip,
}

impl EraseKind {
    pub const fn opcode(self) -> Opcode {
        match self {
            EraseKind::Sector => Opcode::SectorErase,
            EraseKind::Block32 => Opcode::BlockErase32,
            EraseKind::Block64 => Opcode::BlockErase64,
            EraseKind::Chip => Opcode::ChipErase,
        }
    }

    /// Required address alignment in bytes. `None` for chip erase, which
    /// takes no address.
    pub const fn size(self) -> Option<u32> {
        match self {
            EraseKind::Sector => Some(SECTOR_SIZE),
            EraseKind::Block32 => Some(BLOCK32_SIZE),
            EraseKind::Block64 => Some(BLOCK64_SIZE),
            EraseKind::Chip => None,
        }
    }

    pub const fn is_aligned(self, addr: u32) -> bool {
        match self.size() {
            Some(size) => addr % size == 0,
            None => true,
        }
    }
}

/// Runtime timing knobs. `Config::default()` uses the constants in this
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Config {
    /// Budget used by every idle wait.
    pub poll: PollBudget,
    pub select_setup_us: u32,
    pub write_enable_settle_us: u32,
    pub erase_settle_us: u32,
    pub reset_recovery_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll: PollBudget::new(POLL_ATTEMPTS, POLL_INTERVAL_US),
            select_setup_us: SELECT_SETUP_US,
            write_enable_settle_us: WRITE_ENABLE_SETTLE_US,
            erase_settle_us: ERASE_SETTLE_US,
            reset_recovery_us: RESET_RECOVERY_US,
        }
    }
}

/// Splits `addr` into the 24-bit big-endian header following an opcode.
pub(crate) const fn address_bytes(addr: u32) -> [u8; 3] {
    [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
}

/// Bytes left in the page holding `addr`.
pub(crate) const fn page_remaining(addr: u32) -> u32 {
    PAGE_SIZE - (addr % PAGE_SIZE)
}
