/// Operations a serial NOR flash exposes to the layers above it.
///
/// Addresses are linear byte offsets. Erase addresses must be aligned to the
/// erase granularity; misaligned requests fail without touching the bus.
pub trait HardwareFlashDevice {
    type Error;

    /// Reads flash contents into `buf`, starting at `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Programs `data` at `addr`, splitting it on page boundaries.
    /// The target range must have been erased beforehand.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error>;

    /// Sets the 4 KiB sector starting at `addr` to all 1s (FFh).
    fn erase_sector(&mut self, addr: u32) -> Result<(), Self::Error>;

    /// Sets the 32 KiB block starting at `addr` to all 1s (FFh).
    fn erase_block_32k(&mut self, addr: u32) -> Result<(), Self::Error>;

    /// Sets the 64 KiB block starting at `addr` to all 1s (FFh).
    fn erase_block_64k(&mut self, addr: u32) -> Result<(), Self::Error>;

    /// Sets the whole device to all 1s (FFh).
    fn erase_full(&mut self) -> Result<(), Self::Error>;
}
