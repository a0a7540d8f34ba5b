//! Mock Flash implementation for testing
//!
//! Provides in-memory Flash simulation for unit tests and host demos.

use crate::platform::{error::FlashError, traits::FlashInterface, Result};
use std::vec;
use std::vec::Vec;

/// Flash sector size (4 KB)
pub const SECTOR_SIZE: u32 = 4096;

/// Flash page size (256 B)
pub const PAGE_SIZE: u32 = 256;

/// Flash capacity (4 MB, same as Pico 2 W)
pub const FLASH_CAPACITY: u32 = 4 * 1024 * 1024;

/// Minimum firmware size (protect first 256 KB)
const FIRMWARE_SIZE: u32 = 0x40000;

/// Mock Flash implementation
///
/// Simulates a blank NOR Flash device in memory. Supports:
/// - Read/program/erase with real NOR semantics (program only clears bits)
/// - Sector erase counting
/// - Power-loss simulation (next program stops halfway)
/// - Lockout contention (next `run_exclusive` times out)
///
/// # Example
///
/// ```ignore
/// use pico_flashparam::platform::mock::MockFlash;
/// use pico_flashparam::platform::traits::FlashInterface;
///
/// let mut flash = MockFlash::new();
///
/// flash.erase(0x3FF000, 4096).unwrap();
/// flash.write(0x3FF000, &[0x5A; 256]).unwrap();
///
/// let mut buf = [0u8; 4];
/// flash.read(0x3FF000, &mut buf).unwrap();
/// assert_eq!(buf, [0x5A; 4]);
/// assert_eq!(flash.get_erase_count(0x3FF000), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockFlash {
    /// Flash storage (initialized to 0xFF - erased state)
    storage: Vec<u8>,
    /// Erase count per sector
    erase_counts: Vec<u32>,
    /// Next program writes only half of its data
    power_loss: bool,
    /// Number of upcoming `run_exclusive` calls that time out
    contended: u32,
    /// Completed exclusive sessions
    exclusive_sessions: u32,
}

impl MockFlash {
    /// Create a new, fully erased mock Flash instance
    pub fn new() -> Self {
        let sector_count = (FLASH_CAPACITY / SECTOR_SIZE) as usize;
        Self {
            storage: vec![0xFF; FLASH_CAPACITY as usize],
            erase_counts: vec![0; sector_count],
            power_loss: false,
            contended: 0,
            exclusive_sessions: 0,
        }
    }

    /// Get Flash contents (for test verification)
    pub fn get_contents(&self, address: u32, len: usize) -> Vec<u8> {
        self.storage[address as usize..(address as usize + len)].to_vec()
    }

    /// Inject corruption at address (for testing error recovery)
    pub fn inject_corruption(&mut self, address: u32, len: usize) {
        for byte in &mut self.storage[address as usize..address as usize + len] {
            *byte = 0xAA; // Corrupt pattern
        }
    }

    /// Get erase count for the sector containing `address`
    pub fn get_erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / SECTOR_SIZE) as usize]
    }

    /// Get total erase count across all sectors
    pub fn get_total_erase_count(&self) -> u32 {
        self.erase_counts.iter().sum()
    }

    /// Simulate power loss during the next program operation
    ///
    /// Only the first half of the data reaches the array.
    pub fn simulate_power_loss(&mut self) {
        self.power_loss = true;
    }

    /// Make the next `count` lockout requests time out
    ///
    /// Models another core that never acknowledges the lockout.
    pub fn simulate_contention(&mut self, count: u32) {
        self.contended = count;
    }

    /// Number of exclusive sessions that were granted
    pub fn exclusive_sessions(&self) -> u32 {
        self.exclusive_sessions
    }

    /// Check if address is in writable region
    fn is_writable(&self, address: u32) -> bool {
        (FIRMWARE_SIZE..FLASH_CAPACITY).contains(&address)
    }

    fn check_range(&self, address: u32, len: usize) -> Result<()> {
        if !self.is_writable(address) || address as usize + len > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }
        Ok(())
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        if address as usize + buf.len() > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }

        let start = address as usize;
        buf.copy_from_slice(&self.storage[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.check_range(address, data.len())?;

        if address % PAGE_SIZE != 0 || data.len() % PAGE_SIZE as usize != 0 {
            return Err(FlashError::InvalidAddress.into());
        }

        let write_len = if self.power_loss {
            self.power_loss = false;
            data.len() / 2
        } else {
            data.len()
        };

        // Programming can only change bits from 1→0
        let start = address as usize;
        for (cell, byte) in self.storage[start..start + write_len]
            .iter_mut()
            .zip(data.iter())
        {
            *cell &= *byte;
        }

        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        self.check_range(address, size as usize)?;

        if address % SECTOR_SIZE != 0 || size % SECTOR_SIZE != 0 {
            return Err(FlashError::InvalidAddress.into());
        }

        let start = address as usize;
        self.storage[start..start + size as usize].fill(0xFF);

        let first_sector = (address / SECTOR_SIZE) as usize;
        for count in &mut self.erase_counts[first_sector..first_sector + (size / SECTOR_SIZE) as usize]
        {
            *count += 1;
        }

        Ok(())
    }

    fn block_size(&self) -> u32 {
        SECTOR_SIZE
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn capacity(&self) -> u32 {
        FLASH_CAPACITY
    }

    fn run_exclusive<R, Op>(&mut self, _timeout_ms: u32, op: Op) -> Result<R>
    where
        Op: FnOnce(&mut Self) -> Result<R>,
    {
        if self.contended > 0 {
            self.contended -= 1;
            return Err(FlashError::Busy.into());
        }

        self.exclusive_sessions += 1;
        op(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;

    const REGION: u32 = FLASH_CAPACITY - SECTOR_SIZE;

    #[test]
    fn test_mock_flash_starts_blank() {
        let mut flash = MockFlash::new();
        let mut buf = [0u8; 16];
        flash.read(REGION, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 16]);
    }

    #[test]
    fn test_mock_flash_read_write() {
        let mut flash = MockFlash::new();

        flash.erase(REGION, SECTOR_SIZE).unwrap();

        let mut page = [0xFFu8; 256];
        page[..4].copy_from_slice(b"PARA");
        flash.write(REGION, &page).unwrap();

        let mut buf = [0u8; 4];
        flash.read(REGION, &mut buf).unwrap();
        assert_eq!(&buf, b"PARA");
    }

    #[test]
    fn test_mock_flash_erase() {
        let mut flash = MockFlash::new();

        flash.erase(REGION, SECTOR_SIZE).unwrap();
        flash.write(REGION, &[0x55; 256]).unwrap();
        flash.erase(REGION, SECTOR_SIZE).unwrap();

        assert_eq!(flash.get_contents(REGION, 256), vec![0xFF; 256]);
        assert_eq!(flash.get_erase_count(REGION), 2);
        assert_eq!(flash.get_total_erase_count(), 2);
    }

    #[test]
    fn test_mock_flash_protects_firmware() {
        let mut flash = MockFlash::new();

        assert!(flash.write(0x000000, &[0x00; 256]).is_err());
        assert!(flash.erase(0x000000, SECTOR_SIZE).is_err());

        let mut buf = [0u8; 4];
        assert!(flash.read(FLASH_CAPACITY, &mut buf).is_err());
    }

    #[test]
    fn test_mock_flash_alignment() {
        let mut flash = MockFlash::new();

        assert!(flash.erase(REGION + 0x100, SECTOR_SIZE).is_err());
        assert!(flash.erase(REGION, 1024).is_err());
        assert!(flash.write(REGION + 1, &[0x00; 256]).is_err());
        assert!(flash.write(REGION, &[0x00; 100]).is_err());
    }

    #[test]
    fn test_mock_flash_power_loss() {
        let mut flash = MockFlash::new();

        flash.simulate_power_loss();
        flash.write(REGION, &[0x55; 256]).unwrap();

        let contents = flash.get_contents(REGION, 256);
        assert_eq!(&contents[..128], &[0x55; 128]);
        assert_eq!(&contents[128..], &[0xFF; 128]);
    }

    #[test]
    fn test_mock_flash_write_only_clears_bits() {
        let mut flash = MockFlash::new();

        let mut page = [0xFFu8; 256];
        page[0] = 0x0F;
        flash.write(REGION, &page).unwrap();

        page[0] = 0xF1;
        flash.write(REGION, &page).unwrap();

        let mut buf = [0u8; 1];
        flash.read(REGION, &mut buf).unwrap();
        assert_eq!(buf[0], 0x01);
    }

    #[test]
    fn test_mock_flash_contention() {
        let mut flash = MockFlash::new();
        flash.simulate_contention(1);

        let result = flash.run_exclusive(100, |_| Ok(()));
        assert_eq!(result, Err(PlatformError::Flash(FlashError::Busy)));
        assert_eq!(flash.exclusive_sessions(), 0);

        let result = flash.run_exclusive(100, |f| f.erase(REGION, SECTOR_SIZE));
        assert!(result.is_ok());
        assert_eq!(flash.exclusive_sessions(), 1);
    }
}
