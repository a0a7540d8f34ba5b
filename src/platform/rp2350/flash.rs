//! RP2350 Flash implementation
//!
//! This module provides Flash storage support for RP2350 using ROM functions.
//!
//! # Flash Layout
//!
//! ```text
//! [Firmware]           0x000000 - end of image  - PROTECTED (first 256 KB enforced)
//! [Free]               ...
//! [Parameter Region]   capacity - erase_size .. capacity
//! ```
//!
//! # Safety
//!
//! Flash operations use unsafe ROM functions and must:
//! - Disable interrupts during operations (XIP inaccessible)
//! - Keep the other core parked (see [`super::lockout`])
//! - Validate addresses are not in firmware region

use super::lockout;
use crate::platform::{error::FlashError, traits::FlashInterface, Result};
use rp235x_hal::rom_data;

/// Minimum firmware size (protect first 256 KB)
const FIRMWARE_SIZE: u32 = 0x40000; // 256 KB

/// Flash block size (minimum erase unit)
const BLOCK_SIZE: u32 = 4096; // 4 KB

/// Flash page size (program unit)
const PAGE_SIZE: u32 = 256;

/// Flash sector erase command (0x20 for 4KB sector)
const SECTOR_ERASE_CMD: u8 = 0x20;

/// Total Flash capacity for Pico 2 W
const FLASH_CAPACITY: u32 = 4 * 1024 * 1024; // 4 MB

/// XIP window the device is memory-mapped at
const XIP_BASE: usize = 0x1000_0000;

/// RP2350 Flash implementation
///
/// Provides Flash read/program/erase operations using RP2350 ROM functions.
///
/// # Important
///
/// - Flash operations are blocking (can take 100ms+)
/// - XIP is inaccessible during erase/write; use `run_exclusive`
/// - Firmware region (0x000000-0x03FFFF) is protected from writes
pub struct Rp2350Flash;

impl Rp2350Flash {
    /// Create a new RP2350 Flash instance
    pub fn new() -> Self {
        Self
    }

    /// Check if address is in writable region (not firmware)
    fn is_writable(&self, address: u32) -> bool {
        (FIRMWARE_SIZE..FLASH_CAPACITY).contains(&address)
    }

    /// Run one erase or program with XIP disabled
    ///
    /// # Safety
    ///
    /// - The other core must be parked in RAM (see `run_exclusive`)
    /// - Any buffer referenced by `op` must live in RAM
    unsafe fn run_without_xip(&mut self, op: RomOp) {
        // Resolved while XIP is still mapped; the RAM sequence only calls pointers
        let rom = RomFlash::resolve();
        cortex_m::interrupt::free(|_cs| {
            rom_sequence(&rom, op);
        });
    }
}

/// ROM entry points used while XIP is off
struct RomFlash {
    connect_internal_flash: unsafe extern "C" fn(),
    flash_exit_xip: unsafe extern "C" fn(),
    flash_range_erase: unsafe extern "C" fn(u32, usize, u32, u8),
    flash_range_program: unsafe extern "C" fn(u32, *const u8, usize),
    flash_flush_cache: unsafe extern "C" fn(),
    flash_enter_cmd_xip: unsafe extern "C" fn(),
}

impl RomFlash {
    fn resolve() -> Self {
        Self {
            connect_internal_flash: rom_data::connect_internal_flash::ptr(),
            flash_exit_xip: rom_data::flash_exit_xip::ptr(),
            flash_range_erase: rom_data::flash_range_erase::ptr(),
            flash_range_program: rom_data::flash_range_program::ptr(),
            flash_flush_cache: rom_data::flash_flush_cache::ptr(),
            flash_enter_cmd_xip: rom_data::flash_enter_cmd_xip::ptr(),
        }
    }
}

#[derive(Clone, Copy)]
enum RomOp {
    Erase { address: u32, size: u32 },
    Program { address: u32, data: *const u8, len: usize },
}

/// XIP off, erase or program, XIP back on
///
/// Runs from RAM: flash is not executable between `flash_exit_xip` and
/// `flash_enter_cmd_xip`.
#[inline(never)]
#[link_section = ".data.ram_func"]
unsafe fn rom_sequence(rom: &RomFlash, op: RomOp) {
    (rom.connect_internal_flash)();
    (rom.flash_exit_xip)();

    match op {
        RomOp::Erase { address, size } => {
            (rom.flash_range_erase)(address, size as usize, BLOCK_SIZE, SECTOR_ERASE_CMD);
        }
        RomOp::Program { address, data, len } => {
            (rom.flash_range_program)(address, data, len);
        }
    }

    (rom.flash_flush_cache)();
    (rom.flash_enter_cmd_xip)();
}

impl Default for Rp2350Flash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for Rp2350Flash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        if address as usize + buf.len() > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }

        let flash_ptr = (XIP_BASE + address as usize) as *const u8;

        // SAFETY: range validated above; the XIP window is always mapped
        unsafe {
            core::ptr::copy_nonoverlapping(flash_ptr, buf.as_mut_ptr(), buf.len());
        }

        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if !self.is_writable(address) {
            return Err(FlashError::InvalidAddress.into());
        }

        if address as usize + data.len() > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }

        if !address.is_multiple_of(PAGE_SIZE) || !data.len().is_multiple_of(PAGE_SIZE as usize) {
            return Err(FlashError::InvalidAddress.into());
        }

        // SAFETY: `data` lives in RAM (staging buffer), never in XIP
        unsafe {
            self.run_without_xip(RomOp::Program {
                address,
                data: data.as_ptr(),
                len: data.len(),
            });
        }

        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        if !self.is_writable(address) {
            return Err(FlashError::InvalidAddress.into());
        }

        if !address.is_multiple_of(BLOCK_SIZE) || !size.is_multiple_of(BLOCK_SIZE) {
            return Err(FlashError::InvalidAddress.into());
        }

        if address + size > FLASH_CAPACITY {
            return Err(FlashError::InvalidAddress.into());
        }

        // SAFETY: range validated above and outside the firmware image
        unsafe {
            self.run_without_xip(RomOp::Erase { address, size });
        }

        Ok(())
    }

    fn block_size(&self) -> u32 {
        BLOCK_SIZE
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn capacity(&self) -> u32 {
        FLASH_CAPACITY
    }

    fn run_exclusive<R, Op>(&mut self, timeout_ms: u32, op: Op) -> Result<R>
    where
        Op: FnOnce(&mut Self) -> Result<R>,
    {
        if !lockout::acquire(timeout_ms) {
            crate::log_warn!("flash lockout not acknowledged within {} ms", timeout_ms);
            return Err(FlashError::Busy.into());
        }

        let result = op(self);
        lockout::release();
        result
    }
}
