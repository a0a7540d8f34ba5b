//! Flash parameter store
//!
//! Models the reserved flash window that holds the parameter image:
//! committed bytes are read straight from the device, pending writes go to
//! an in-memory staging buffer, and `commit` replaces the window with the
//! staging buffer in one erase + program sequence.
//!
//! # Region Geometry
//!
//! ```text
//! requested   1024 B  (user budget)
//! program     1024 B  (rounded up to page size, bounds + program call)
//! erase       4096 B  (rounded up to sector size, erase call only)
//! base        capacity - erase  (last sector(s) of the device)
//! ```

use super::value::{ParamValue, MAX_TEXT_LEN};
use crate::platform::{FlashError, FlashInterface, PlatformError, Result};
use heapless::Vec;

/// Largest supported program size (one 4 KB sector)
pub const MAX_REGION_SIZE: usize = 4096;

/// Byte value of erased flash
pub const ERASED_BYTE: u8 = 0xFF;

/// Largest single value transferred between store and parameter
const MAX_VALUE_SIZE: usize = MAX_TEXT_LEN;

/// Round `value` up to a multiple of `unit`, `None` on overflow
pub const fn round_up(value: u32, unit: u32) -> Option<u32> {
    value.div_ceil(unit).checked_mul(unit)
}

/// Placement of the parameter region on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub struct RegionGeometry {
    /// Total device size
    pub capacity: u32,
    /// Erase granularity of the device
    pub sector_size: u32,
    /// Program granularity of the device
    pub page_size: u32,
    /// Requested byte budget
    pub requested_size: u32,
    /// Bytes erased on commit
    pub erase_size: u32,
    /// Bytes programmed on commit; bound for every access
    pub program_size: u32,
    /// Device offset of the region
    pub base: u32,
}

impl RegionGeometry {
    /// Compute the region for `requested_size` bytes at the end of the device
    ///
    /// # Errors
    ///
    /// `PlatformError::InvalidConfig` if the request is empty, the device
    /// granularities are inconsistent, or the region does not fit.
    pub fn new(requested_size: u32, capacity: u32, sector_size: u32, page_size: u32) -> Result<Self> {
        if requested_size == 0 || page_size == 0 || sector_size < page_size {
            return Err(PlatformError::InvalidConfig);
        }
        if sector_size % page_size != 0 {
            return Err(PlatformError::InvalidConfig);
        }

        let program_size =
            round_up(requested_size, page_size).ok_or(PlatformError::InvalidConfig)?;
        let erase_size =
            round_up(requested_size, sector_size).ok_or(PlatformError::InvalidConfig)?;
        if program_size as usize > MAX_REGION_SIZE || erase_size > capacity {
            return Err(PlatformError::InvalidConfig);
        }

        Ok(Self {
            capacity,
            sector_size,
            page_size,
            requested_size,
            erase_size,
            program_size,
            base: capacity - erase_size,
        })
    }

    /// Check that `offset..offset + size` lies inside the programmed area
    pub fn contains(&self, offset: u32, size: u32) -> bool {
        offset
            .checked_add(size)
            .is_some_and(|end| end <= self.program_size)
    }
}

/// Flash parameter store
///
/// Owns the flash device and a staging buffer of `program_size` bytes.
/// After construction and after every commit the staging buffer equals the
/// committed bytes; staged writes never touch the device.
pub struct FlashStore<F: FlashInterface> {
    /// Flash interface
    flash: F,
    geometry: RegionGeometry,
    staging: Vec<u8, MAX_REGION_SIZE>,
    commit_timeout_ms: u32,
}

impl<F: FlashInterface> FlashStore<F> {
    /// Create a store for `requested_size` bytes at the end of `flash`
    ///
    /// The staging buffer starts as a copy of the committed bytes.
    pub fn new(mut flash: F, requested_size: u32, commit_timeout_ms: u32) -> Result<Self> {
        let geometry = RegionGeometry::new(
            requested_size,
            flash.capacity(),
            flash.block_size(),
            flash.page_size(),
        )?;

        let mut staging = Vec::new();
        staging
            .resize(geometry.program_size as usize, ERASED_BYTE)
            .map_err(|_| PlatformError::InvalidConfig)?;
        flash.read(geometry.base, &mut staging)?;

        Ok(Self {
            flash,
            geometry,
            staging,
            commit_timeout_ms,
        })
    }

    /// Region geometry
    pub fn geometry(&self) -> &RegionGeometry {
        &self.geometry
    }

    /// Pending image (staging buffer)
    pub fn staged(&self) -> &[u8] {
        &self.staging
    }

    /// Copy `size` committed bytes at `offset` into `dest`
    ///
    /// Scalars are reinterpreted in place; text is replaced by exactly the
    /// addressed bytes. Out-of-range requests are skipped and return `false`.
    pub fn read_into(&mut self, offset: u32, size: u32, dest: &mut ParamValue) -> bool {
        let mut buf = [0u8; MAX_VALUE_SIZE];
        let Some(bytes) = self.read_committed(offset, size, &mut buf) else {
            return false;
        };
        dest.decode_from(bytes);
        true
    }

    /// Read a raw little-endian word from the committed bytes
    pub fn read_u32(&mut self, offset: u32) -> Option<u32> {
        let mut buf = [0u8; MAX_VALUE_SIZE];
        let bytes = self.read_committed(offset, 4, &mut buf)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        Some(u32::from_le_bytes(word))
    }

    /// Copy `size` bytes of `value` into the staging buffer at `offset`
    ///
    /// Out-of-range requests are skipped and return `false`.
    pub fn write_staged(&mut self, offset: u32, size: u32, value: &ParamValue) -> bool {
        if !self.geometry.contains(offset, size) {
            crate::log_warn!("staged write skipped: {} bytes at {:#x}", size, offset);
            return false;
        }

        let start = offset as usize;
        value.encode(&mut self.staging[start..start + size as usize]);
        true
    }

    /// Erase the region and program the staging buffer
    ///
    /// Waits at most `commit_timeout_ms` for exclusive access to the flash
    /// bus. On success the staging buffer is refreshed from the device.
    /// The programmed bytes are not verified.
    ///
    /// # Errors
    ///
    /// - `FlashError::Busy` if exclusivity was not obtained; flash untouched
    /// - any erase/program/read error reported by the device
    pub fn commit(&mut self) -> Result<()> {
        let base = self.geometry.base;
        let erase_size = self.geometry.erase_size;
        let staging = &self.staging;

        let outcome = self
            .flash
            .run_exclusive(self.commit_timeout_ms, |flash| {
                flash.erase(base, erase_size)?;
                flash.write(base, staging)
            });

        match outcome {
            Ok(()) => {
                self.flash.read(base, &mut self.staging)?;
                crate::log_debug!("committed {} bytes at {:#x}", self.staging.len(), base);
                Ok(())
            }
            Err(PlatformError::Flash(FlashError::Busy)) => {
                crate::log_warn!("commit skipped: flash lockout timed out");
                Err(FlashError::Busy.into())
            }
            Err(e) => {
                crate::log_error!("commit failed: {}", e);
                Err(e)
            }
        }
    }

    /// Erase the persisted image (factory reset)
    ///
    /// Fills the staging buffer with the erased pattern and commits it.
    pub fn clear(&mut self) -> Result<()> {
        self.staging.fill(ERASED_BYTE);
        self.commit()
    }

    /// Log the region placement
    pub fn print_info(&self) {
        let g = &self.geometry;
        crate::log_info!("=== FlashStore ===");
        crate::log_info!("FlashSize: {:#x} ({})", g.capacity, g.capacity);
        crate::log_info!("SectorSize: {:#x} ({})", g.sector_size, g.sector_size);
        crate::log_info!("PageSize: {:#x} ({})", g.page_size, g.page_size);
        crate::log_info!("RequestedSize: {:#x} ({})", g.requested_size, g.requested_size);
        crate::log_info!("EraseSize: {:#x} ({})", g.erase_size, g.erase_size);
        crate::log_info!("ProgramSize: {:#x} ({})", g.program_size, g.program_size);
        crate::log_info!("RegionBase: {:#x}", g.base);
    }

    /// Log the staging buffer as hex + printable ASCII, 16 bytes per line
    pub fn dump(&self) {
        for (index, chunk) in self.staging.chunks(16).enumerate() {
            let line = format_dump_line(index * 16, chunk);
            crate::log_info!("{}", line.as_str());
        }
    }

    /// Get Flash interface reference (for testing)
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Give the device back
    pub fn release(self) -> F {
        self.flash
    }

    fn read_committed<'b>(
        &mut self,
        offset: u32,
        size: u32,
        buf: &'b mut [u8; MAX_VALUE_SIZE],
    ) -> Option<&'b [u8]> {
        if !self.geometry.contains(offset, size) || size as usize > MAX_VALUE_SIZE {
            crate::log_warn!("read skipped: {} bytes at {:#x}", size, offset);
            return None;
        }

        let bytes = &mut buf[..size as usize];
        if let Err(e) = self.flash.read(self.geometry.base + offset, bytes) {
            crate::log_error!("read failed at {:#x}: {}", offset, e);
            return None;
        }
        Some(&*bytes)
    }
}

/// Format one dump line: offset, 16 hex bytes, printable ASCII
fn format_dump_line(offset: usize, chunk: &[u8]) -> heapless::String<96> {
    use core::fmt::Write;

    let mut line = heapless::String::new();
    let _ = write!(line, "{:04x}: ", offset);
    for byte in chunk {
        let _ = write!(line, "{:02x} ", byte);
    }
    for _ in chunk.len()..16 {
        let _ = line.push_str("   ");
    }
    for &byte in chunk {
        let ch = if (0x20..=0x7E).contains(&byte) {
            byte as char
        } else {
            ' '
        };
        let _ = line.push(ch);
    }
    line
}
