//! Block Bitmap
//!
//! One bit per data block, most significant bit first within each byte.
//! A set bit means the block belongs to some live entry.
//!
//! Mutations only touch memory. The whole image is written back with
//! `persist`; the region is never updated partially.

use crate::device::BlockDevice;
use crate::error::Result;
use crate::layout::{bitmap_byte_size, Layout};

/// In-memory image of the block bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    block_count: u32,
}

/// A maximal run of blocks sharing the same state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub used: bool,
    pub start: u32,
    pub len: u32,
}

impl Bitmap {
    /// All-free bitmap for `block_count` blocks
    pub fn new(block_count: u32) -> Self {
        Self {
            bytes: vec![0u8; bitmap_byte_size(block_count) as usize],
            block_count,
        }
    }

    /// Load the bitmap region of a store
    pub fn load<D: BlockDevice>(device: &mut D, layout: &Layout) -> Result<Self> {
        let mut bytes = vec![0u8; layout.bitmap_size() as usize];
        device.read_at(layout.bitmap_offset(), &mut bytes)?;

        Ok(Self {
            bytes,
            block_count: layout.block_count(),
        })
    }

    /// Write the full image back to the bitmap region
    pub fn persist<D: BlockDevice>(&self, device: &mut D, layout: &Layout) -> Result<()> {
        device.write_at(layout.bitmap_offset(), &self.bytes)
    }

    /// Raw on-disk image
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Whether block `index` is free. Indexes past the end are never free.
    pub fn is_free(&self, index: u32) -> bool {
        if index >= self.block_count {
            return false;
        }

        let (byte, mask) = Self::locate(index);
        self.bytes[byte] & mask == 0
    }

    /// Mark block `index` as used. Indexes past the end are ignored.
    pub fn mark_used(&mut self, index: u32) {
        if index >= self.block_count {
            return;
        }
        let (byte, mask) = Self::locate(index);
        self.bytes[byte] |= mask;
    }

    /// Mark block `index` as free. Indexes past the end are ignored.
    pub fn mark_free(&mut self, index: u32) {
        if index >= self.block_count {
            return;
        }
        let (byte, mask) = Self::locate(index);
        self.bytes[byte] &= !mask;
    }

    /// First free block at or after `start`, scanning forward
    pub fn find_free_from(&self, start: u32) -> Option<u32> {
        (start..self.block_count).find(|&index| self.is_free(index))
    }

    /// Number of blocks currently marked used
    pub fn used_count(&self) -> u32 {
        (0..self.block_count).filter(|&index| !self.is_free(index)).count() as u32
    }

    /// Maximal runs of free/used blocks, in block order
    pub fn runs(&self) -> Runs<'_> {
        Runs {
            bitmap: self,
            next: 0,
        }
    }

    /// Byte index and bit mask for a block
    fn locate(index: u32) -> (usize, u8) {
        ((index / 8) as usize, 0x80 >> (index % 8))
    }
}

/// Iterator over the runs of a bitmap
pub struct Runs<'a> {
    bitmap: &'a Bitmap,
    next: u32,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.bitmap.block_count {
            return None;
        }

        let start = self.next;
        let used = !self.bitmap.is_free(start);
        let mut end = start + 1;
        while end < self.bitmap.block_count && !self.bitmap.is_free(end) == used {
            end += 1;
        }

        self.next = end;
        Some(Run {
            used,
            start,
            len: end - start,
        })
    }
}
