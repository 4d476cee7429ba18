//! Layout Module
//!
//! Fixed on-disk layout of a store and the arithmetic that addresses it.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (8 bytes)                                        │
//! │   Magic: u32 (4) | BlockCount: u32 (4)                  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Bitmap (block_count / 8 + 1 bytes)                      │
//! │   one bit per block, MSB first, 1 = used                │
//! ├─────────────────────────────────────────────────────────┤
//! │ Entry Table (block_count * 148 bytes)                   │
//! │   [Name: 16][Size: u32][Pointers: u32 * 32]             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Blocks (block_count * 4096 bytes)                       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Pointers are absolute byte offsets of
//! blocks; zero marks an unused pointer slot.

mod addressing;
mod header;

pub use addressing::{bitmap_byte_size, Layout};
pub use header::Header;

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic number identifying a flatvfs store
pub const MAGIC: u32 = 0x754c_7295;

/// Size of one data block in bytes
pub const BLOCK_SIZE: u64 = 4096;

/// Number of direct block pointers per entry
pub const POINTERS_PER_ENTRY: usize = 32;

/// Largest content an entry can hold, regardless of free space
pub const MAX_ENTRY_SIZE: u64 = POINTERS_PER_ENTRY as u64 * BLOCK_SIZE;

/// Bytes reserved for a name on disk (NUL terminated)
pub const NAME_CAPACITY: usize = 16;

/// Longest accepted entry name; one byte of the buffer is kept for NUL
pub const MAX_NAME_LEN: usize = NAME_CAPACITY - 1;

/// Header size: Magic (4) + BlockCount (4) = 8 bytes
pub const HEADER_SIZE: u64 = 8;

/// Entry size: Name (16) + Size (4) + Pointers (32 * 4) = 148 bytes
pub const ENTRY_SIZE: u64 = NAME_CAPACITY as u64 + 4 + POINTERS_PER_ENTRY as u64 * 4;
