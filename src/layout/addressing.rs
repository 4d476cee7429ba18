//! Addressing
//!
//! Pure conversions between block indexes, entry slots and byte offsets.

use crate::error::{Result, VfsError};

use super::{BLOCK_SIZE, ENTRY_SIZE, HEADER_SIZE};

/// Bitmap size in bytes for `block_count` blocks.
///
/// Always one byte more than `block_count / 8`, even on exact multiples of 8.
/// Existing stores depend on this sizing, so it must not be "fixed".
pub fn bitmap_byte_size(block_count: u32) -> u64 {
    block_count as u64 / 8 + 1
}

/// Region offsets of a store with a given block count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    block_count: u32,
}

impl Layout {
    /// Layout for a store that already has `block_count` blocks
    pub fn new(block_count: u32) -> Self {
        Self { block_count }
    }

    /// Layout for a new store of `total_bytes` requested bytes
    ///
    /// Remainder bytes that do not fill a whole block are dropped. Fails if
    /// the resulting file could not be addressed by 32-bit block pointers.
    pub fn for_size(total_bytes: u64) -> Result<Self> {
        let block_count = u32::try_from(total_bytes / BLOCK_SIZE).map_err(|_| {
            VfsError::Config(format!("Store size {} bytes is too large", total_bytes))
        })?;

        let layout = Self::new(block_count);
        if layout.total_size() > u32::MAX as u64 {
            return Err(VfsError::Config(format!(
                "Store size {} bytes exceeds the 32-bit address space ({} bytes needed)",
                total_bytes,
                layout.total_size()
            )));
        }

        Ok(layout)
    }

    /// Number of data blocks (and entry slots)
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Byte offset of the bitmap
    pub fn bitmap_offset(&self) -> u64 {
        HEADER_SIZE
    }

    /// Size of the bitmap in bytes
    pub fn bitmap_size(&self) -> u64 {
        bitmap_byte_size(self.block_count)
    }

    /// Byte offset of the entry table
    pub fn entry_table_offset(&self) -> u64 {
        self.bitmap_offset() + self.bitmap_size()
    }

    /// Size of the entry table in bytes
    pub fn entry_table_size(&self) -> u64 {
        self.block_count as u64 * ENTRY_SIZE
    }

    /// Byte offset of entry slot `slot`
    pub fn entry_offset(&self, slot: usize) -> u64 {
        self.entry_table_offset() + slot as u64 * ENTRY_SIZE
    }

    /// Byte offset of the first data block
    pub fn data_offset(&self) -> u64 {
        self.entry_table_offset() + self.entry_table_size()
    }

    /// Absolute byte offset of block `index`
    pub fn block_offset(&self, index: u32) -> u64 {
        self.data_offset() + index as u64 * BLOCK_SIZE
    }

    /// Inverse of `block_offset`
    ///
    /// Returns `None` for offsets outside the data region or not on a block
    /// boundary.
    pub fn block_index_from_offset(&self, offset: u64) -> Option<u32> {
        let relative = offset.checked_sub(self.data_offset())?;
        if relative % BLOCK_SIZE != 0 {
            return None;
        }

        let index = relative / BLOCK_SIZE;
        if index >= self.block_count as u64 {
            return None;
        }

        u32::try_from(index).ok()
    }

    /// Total size of the backing file
    pub fn total_size(&self) -> u64 {
        self.data_offset() + self.block_count as u64 * BLOCK_SIZE
    }
}
