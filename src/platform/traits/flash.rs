//! Flash interface trait
//!
//! This module defines the Flash interface that platform implementations must provide.
//! The parameter store consumes it; it never touches hardware directly.

use crate::platform::Result;

/// Flash interface trait
///
/// Platform implementations must provide this interface for Flash read/program/erase
/// operations and for the cross-core lockout that must surround erase and program.
///
/// # Flash Characteristics
///
/// - Flash is erased in sectors (4 KB on RP2040/RP2350) and programmed in pages (256 B)
/// - Erase operations set all bytes to 0xFF
/// - Program operations can only change bits from 1→0 (must erase first to reset to 1)
/// - Reads of the memory-mapped window need no synchronization
///
/// # Safety Invariants
///
/// - Only one owner per Flash instance (no concurrent access)
/// - `erase` and `write` must only be called from inside `run_exclusive`
///   on targets where other cores execute from flash
///
/// # Memory Layout (RP2350, 4 MB device, 1 KB requested)
///
/// ```text
/// [Firmware]           0x000000 - 0x3FF000 - DO NOT WRITE
/// [Parameter Region]   0x3FF000 - 0x400000 (one 4 KB sector, first 1 KB programmed)
/// ```
pub trait FlashInterface {
    /// Read data from Flash
    ///
    /// Reads `buf.len()` bytes starting at device offset `address`.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::InvalidAddress)` if address is out of bounds.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Program data into Flash
    ///
    /// The target range must have been erased first.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::InvalidAddress)` if the range is
    /// outside the writable area or not page-aligned.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Erase Flash region
    ///
    /// Erases `size` bytes starting at `address`; both must be sector-aligned.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::InvalidAddress)` on misalignment
    /// or when the range is outside the writable area.
    fn erase(&mut self, address: u32, size: u32) -> Result<()>;

    /// Get Flash sector size (minimum erasable unit)
    fn block_size(&self) -> u32;

    /// Get Flash page size (program granularity)
    fn page_size(&self) -> u32;

    /// Get total Flash size
    fn capacity(&self) -> u32;

    /// Run `op` with every other execution context paused
    ///
    /// Blocks for at most `timeout_ms` waiting for the other contexts to
    /// release the flash bus. Once `op` starts it runs to completion.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Flash(FlashError::Busy)` without calling `op`
    /// if exclusivity could not be obtained in time; otherwise whatever `op`
    /// returns.
    fn run_exclusive<R, Op>(&mut self, timeout_ms: u32, op: Op) -> Result<R>
    where
        Op: FnOnce(&mut Self) -> Result<R>;
}
