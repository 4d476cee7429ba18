//! Space Map
//!
//! Run-length report of how the store file is laid out and used.

use std::fmt;

use crate::bitmap::Bitmap;
use crate::layout::{Layout, BLOCK_SIZE};

/// What a region of the store file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Header,
    Bitmap,
    Entries,
    /// A run of free data blocks
    Free,
    /// A run of used data blocks
    Used,
}

impl RegionKind {
    fn label(&self) -> &'static str {
        match self {
            RegionKind::Header => "Header",
            RegionKind::Bitmap => "Bitmap",
            RegionKind::Entries => "Entries",
            RegionKind::Free => "FREE",
            RegionKind::Used => "USED",
        }
    }
}

/// A contiguous byte range of the store file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    /// Absolute byte offset
    pub offset: u64,
    /// Length in bytes
    pub size: u64,
}

/// Fixed regions followed by the free/used block runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceMap {
    regions: Vec<Region>,
}

impl SpaceMap {
    /// Build the report from the layout and the current bitmap
    pub fn build(layout: &Layout, bitmap: &Bitmap) -> Self {
        let mut regions = vec![
            Region {
                kind: RegionKind::Header,
                offset: 0,
                size: layout.bitmap_offset(),
            },
            Region {
                kind: RegionKind::Bitmap,
                offset: layout.bitmap_offset(),
                size: layout.bitmap_size(),
            },
            Region {
                kind: RegionKind::Entries,
                offset: layout.entry_table_offset(),
                size: layout.entry_table_size(),
            },
        ];

        regions.extend(bitmap.runs().map(|run| Region {
            kind: if run.used {
                RegionKind::Used
            } else {
                RegionKind::Free
            },
            offset: layout.block_offset(run.start),
            size: run.len as u64 * BLOCK_SIZE,
        }));

        Self { regions }
    }

    /// Every region in file order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Only the free/used block runs
    pub fn block_runs(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions
            .iter()
            .filter(|r| matches!(r.kind, RegionKind::Free | RegionKind::Used))
    }
}

impl fmt::Display for SpaceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10}\t{:>10}\t{:>10}", "Type", "Address", "Size (B)")?;
        for region in &self.regions {
            writeln!(
                f,
                "{:<10}\t{:>10}\t{:>10}",
                region.kind.label(),
                region.offset,
                region.size
            )?;
        }
        Ok(())
    }
}
