#![cfg_attr(not(test), no_std)]
//! Blocking driver for the Winbond W25Q serial NOR flash family using
//! [embedded-hal](https://github.com/rust-embedded/embedded-hal).
//!
//! The driver turns plain "read / write / erase at this address" requests
//! into the chip's command protocol:
//!
//! * every operation waits for the BUSY bit to clear before touching the
//!   array, with a bounded [`PollBudget`] instead of an open-ended loop,
//! * every program and erase instruction is preceded by Write Enable,
//! * writes are split so that no Page Program instruction runs past a
//!   256-byte page boundary,
//! * erase addresses are checked for alignment before anything reaches the
//!   bus.
//!
//! The bus is driven through [`SpiBus`](embedded_hal::spi::SpiBus) with a
//! separate chip-select [`OutputPin`](embedded_hal::digital::OutputPin),
//! since the status poll holds /CS low across many sampled bytes.
//!
//! ```ignore
//! use w25q_serial_flash::{HardwareFlashDevice, W25Q128};
//!
//! let mut flash = W25Q128::init(spi, cs, delay)?;
//! flash.erase_sector(0x1000)?;
//! flash.write(0x10FF, b"hello")?;
//! let mut buf = [0u8; 5];
//! flash.read(0x10FF, &mut buf)?;
//! ```
//!
//! Enable the `defmt-03` feature for logging through `defmt`.

pub mod comms;
pub mod config;
pub mod error;
pub mod page;
pub mod poll;
pub mod register;
mod storage;
pub mod traits;

pub use comms::{FlashSpi, W25Q128, W25Q16, W25Q32, W25Q64};
pub use config::{Config, EraseKind, BLOCK32_SIZE, BLOCK64_SIZE, PAGE_SIZE, SECTOR_SIZE};
pub use error::Error;
pub use poll::PollBudget;
pub use register::Status;
pub use traits::HardwareFlashDevice;
