#![allow(dead_code)]
//! A simulated W25Q chip behind `SpiBus`, `OutputPin` and `DelayNs`.
//!
//! The three halves share one `Chip` so tests can inspect every /CS frame,
//! every delay, and any protocol violation the driver commits.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind, SpiBus};
use w25q_serial_flash::{Config, PollBudget, W25Q16};

pub const CAPACITY: usize = 0x20_0000;
pub const JEDEC_ID: [u8; 3] = [0xEF, 0x40, 0x15];
pub const UNIQUE_ID: [u8; 8] = [0xD1, 0x62, 0x0A, 0x1B, 0x3C, 0x4D, 0x5E, 0x6F];
const STUCK: u32 = u32::MAX;

/// Bytes the driver sent in one /CS low..high window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(pub Vec<u8>);

impl Frame {
    pub fn opcode(&self) -> u8 {
        self.0[0]
    }

    pub fn address(&self) -> u32 {
        u32::from_be_bytes([0, self.0[1], self.0[2], self.0[3]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.0[4..]
    }
}

#[derive(Debug)]
pub struct Chip {
    pub memory: Vec<u8>,
    pub frames: Vec<Frame>,
    pub delays_us: Vec<u32>,
    pub violations: Vec<String>,
    /// Total status register samples clocked out.
    pub status_samples: u32,
    pub select_count: u32,
    pub bytes_exchanged: u32,
    /// Status samples reporting BUSY after each program or erase.
    pub busy_after_op: u32,
    pub selected: bool,
    pub powered_down: bool,
    busy_samples: u32,
    wel: bool,
    frame: Vec<u8>,
    fail_after: Option<u32>,
}

impl Chip {
    fn new() -> Self {
        Self {
            memory: vec![0xFF; CAPACITY],
            frames: Vec::new(),
            delays_us: Vec::new(),
            violations: Vec::new(),
            status_samples: 0,
            select_count: 0,
            bytes_exchanged: 0,
            busy_after_op: 0,
            selected: false,
            powered_down: false,
            busy_samples: 0,
            wel: false,
            frame: Vec::new(),
            fail_after: None,
        }
    }

    /// Report BUSY for the next `samples` status samples.
    pub fn busy_for(&mut self, samples: u32) {
        self.busy_samples = samples;
    }

    /// Report BUSY forever.
    pub fn stuck_busy(&mut self) {
        self.busy_samples = STUCK;
    }

    /// Fail every byte exchange once `bytes` more have gone through.
    pub fn fail_after(&mut self, bytes: u32) {
        self.fail_after = Some(bytes);
    }

    pub fn is_busy(&self) -> bool {
        self.busy_samples > 0
    }

    pub fn frames_with(&self, opcode: u8) -> Vec<Frame> {
        self.frames
            .iter()
            .filter(|f| f.opcode() == opcode)
            .cloned()
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.frames.clear();
        self.delays_us.clear();
        self.violations.clear();
        self.status_samples = 0;
        self.select_count = 0;
        self.bytes_exchanged = 0;
    }

    fn exchange(&mut self, tx: u8) -> Result<u8, BusFault> {
        if let Some(left) = self.fail_after.as_mut() {
            if *left == 0 {
                return Err(BusFault);
            }
            *left -= 1;
        }
        self.bytes_exchanged += 1;
        if !self.selected {
            self.violations.push(format!("byte {tx:#04x} clocked with /CS high"));
            return Ok(0xFF);
        }

        let pos = self.frame.len();
        self.frame.push(tx);
        let rx = match self.frame[0] {
            0x05 if pos >= 1 => self.sample_status(),
            0x35 if pos >= 1 => 0x02,
            0x03 if pos >= 4 => {
                let base = u32::from_be_bytes([0, self.frame[1], self.frame[2], self.frame[3]]);
                let addr = base as usize + (pos - 4);
                self.memory[addr % CAPACITY]
            }
            0x9F if (1..=3).contains(&pos) => JEDEC_ID[pos - 1],
            0x4B if (5..=12).contains(&pos) => UNIQUE_ID[pos - 5],
            _ => 0xFF,
        };
        Ok(rx)
    }

    fn sample_status(&mut self) -> u8 {
        self.status_samples += 1;
        let busy = self.is_busy();
        if busy && self.busy_samples != STUCK {
            self.busy_samples -= 1;
        }
        u8::from(busy) | (u8::from(self.wel) << 1)
    }

    fn select(&mut self) {
        if self.selected {
            self.violations.push("/CS asserted twice".into());
        }
        self.selected = true;
        self.select_count += 1;
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let bytes = std::mem::take(&mut self.frame);
        if bytes.is_empty() {
            return;
        }
        self.execute(&bytes);
        self.frames.push(Frame(bytes));
    }

    fn execute(&mut self, bytes: &[u8]) {
        let opcode = bytes[0];
        if self.powered_down && opcode != 0xAB {
            self.violations.push(format!("{opcode:#04x} while powered down"));
            return;
        }
        if opcode != 0x05 && self.is_busy() {
            self.violations.push(format!("{opcode:#04x} while busy"));
            return;
        }
        match opcode {
            0x06 => self.wel = true,
            0x04 => self.wel = false,
            0x02 => {
                if self.consume_wel(opcode) {
                    let frame = Frame(bytes.to_vec());
                    if frame.payload().len() > 256 {
                        self.violations.push("page program over 256 bytes".into());
                    }
                    let start = frame.address() as usize;
                    let page = start & !0xFF;
                    for (i, byte) in frame.payload().iter().enumerate() {
                        // The page pointer wraps inside the addressed page.
                        let addr = page | ((start + i) & 0xFF);
                        self.memory[addr % CAPACITY] &= byte;
                    }
                }
            }
            0x20 | 0x52 | 0xD8 => {
                if self.consume_wel(opcode) {
                    let size = match opcode {
                        0x20 => 0x1000,
                        0x52 => 0x8000,
                        _ => 0x10000,
                    };
                    let start = Frame(bytes.to_vec()).address() as usize & !(size - 1);
                    let start = start % CAPACITY;
                    self.memory[start..start + size].fill(0xFF);
                }
            }
            0x60 | 0xC7 => {
                if self.consume_wel(opcode) {
                    self.memory.fill(0xFF);
                }
            }
            0xB9 => self.powered_down = true,
            0xAB => self.powered_down = false,
            0x99 => self.wel = false,
            _ => {}
        }
    }

    fn consume_wel(&mut self, opcode: u8) -> bool {
        if !self.wel {
            self.violations.push(format!("{opcode:#04x} without write enable"));
            return false;
        }
        self.wel = false;
        self.busy_samples = self.busy_after_op;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

impl spi::Error for BusFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct Bus(Rc<RefCell<Chip>>);

impl spi::ErrorType for Bus {
    type Error = BusFault;
}

impl SpiBus for Bus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), BusFault> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            *word = chip.exchange(0x00)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), BusFault> {
        let mut chip = self.0.borrow_mut();
        for &word in words {
            chip.exchange(word)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), BusFault> {
        let mut chip = self.0.borrow_mut();
        for i in 0..read.len().max(write.len()) {
            let rx = chip.exchange(write.get(i).copied().unwrap_or(0x00))?;
            if let Some(word) = read.get_mut(i) {
                *word = rx;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), BusFault> {
        let mut chip = self.0.borrow_mut();
        for word in words {
            *word = chip.exchange(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BusFault> {
        Ok(())
    }
}

pub struct ChipSelect(Rc<RefCell<Chip>>);

impl digital::ErrorType for ChipSelect {
    type Error = Infallible;
}

impl OutputPin for ChipSelect {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().deselect();
        Ok(())
    }
}

pub struct Delay(Rc<RefCell<Chip>>);

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delays_us.push(ns / 1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().delays_us.push(us);
    }
}

pub type TestFlash = W25Q16<Bus, ChipSelect, Delay>;

pub fn flash() -> (TestFlash, Rc<RefCell<Chip>>) {
    flash_with_config(Config::default())
}

/// A driver whose idle wait gives up after `attempts` samples.
pub fn flash_with_budget(attempts: u32) -> (TestFlash, Rc<RefCell<Chip>>) {
    flash_with_config(Config {
        poll: PollBudget::new(attempts, 100),
        ..Config::default()
    })
}

pub fn flash_with_config(config: Config) -> (TestFlash, Rc<RefCell<Chip>>) {
    let chip = Rc::new(RefCell::new(Chip::new()));
    let flash = W25Q16::new_with_config(
        Bus(chip.clone()),
        ChipSelect(chip.clone()),
        Delay(chip.clone()),
        config,
    );
    (flash, chip)
}

/// Deterministic, non-repeating-per-page test pattern.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 256) as u8).collect()
}
