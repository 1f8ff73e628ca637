use bitflags::bitflags;

bitflags! {
    /// Status register 1 bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Erase or write in progress.
        const BUSY = 1 << 0;
        /// Status of the **W**rite **E**nable **L**atch.
        const WEL = 1 << 1;
        /// The 3 block protect bits.
        const BP = 0b0001_1100;
        /// Top/bottom protect.
        const TB = 1 << 5;
        /// Sector/block protect.
        const SEC = 1 << 6;
        /// **S**tatus **R**egister **P**rotect bit.
        const SRP = 1 << 7;
    }
}

impl Status {
    pub fn is_busy(self) -> bool {
        self.contains(Status::BUSY)
    }
}

#[cfg(feature = "defmt-03")]
impl defmt::Format for Status {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Status({=u8:#010b})", self.bits())
    }
}
