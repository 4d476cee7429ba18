//! Store Header
//!
//! Written once at creation, read back on every open.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VfsError};

use super::{HEADER_SIZE, MAGIC};

/// Fixed-size header at offset 0 of every store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Format identifier, always `MAGIC` for a valid store
    pub magic: u32,

    /// Number of data blocks, fixed at creation
    pub block_count: u32,
}

impl Header {
    /// Header for a new store
    pub fn new(block_count: u32) -> Self {
        Self {
            magic: MAGIC,
            block_count,
        }
    }

    /// Encode to the on-disk representation
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| VfsError::Serialization(e.to_string()))
    }

    /// Decode and validate the magic number
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if (bytes.len() as u64) < HEADER_SIZE {
            return Err(VfsError::Format(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let header: Header = bincode::deserialize(&bytes[..HEADER_SIZE as usize])
            .map_err(|e| VfsError::Serialization(e.to_string()))?;

        if header.magic != MAGIC {
            return Err(VfsError::Format(format!(
                "Invalid magic: expected {:#010x}, got {:#010x}",
                MAGIC, header.magic
            )));
        }

        Ok(header)
    }
}
