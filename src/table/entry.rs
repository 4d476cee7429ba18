//! Entry record
//!
//! The on-disk inode of a stored item: a NUL-terminated name, the content
//! length and up to `POINTERS_PER_ENTRY` direct block pointers.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VfsError};
use crate::layout::{ENTRY_SIZE, MAX_NAME_LEN, NAME_CAPACITY, POINTERS_PER_ENTRY};

/// Check that `name` can be stored in an entry
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.as_bytes().contains(&0) {
        return Err(VfsError::InvalidName {
            name: name.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// A single entry slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// NUL-terminated name; all zeros means the slot is free
    name: [u8; NAME_CAPACITY],

    /// Content length in bytes
    size: u32,

    /// Absolute block offsets; the first zero ends the in-use prefix
    pointers: [u32; POINTERS_PER_ENTRY],
}

impl Default for Entry {
    fn default() -> Self {
        Self::empty()
    }
}

impl Entry {
    /// A free slot
    pub fn empty() -> Self {
        Self {
            name: [0u8; NAME_CAPACITY],
            size: 0,
            pointers: [0u32; POINTERS_PER_ENTRY],
        }
    }

    /// Whether this slot holds no entry
    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    /// Name bytes up to the terminating NUL
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_CAPACITY);
        &self.name[..len]
    }

    /// Name as text; invalid UTF-8 from foreign stores is replaced
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    /// Whether this live entry is called `name`
    pub fn has_name(&self, name: &str) -> bool {
        !self.is_free() && self.name_bytes() == name.as_bytes()
    }

    /// Set the name after validating it
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = [0u8; NAME_CAPACITY];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(())
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    /// In-use pointers, stopping at the first zero
    pub fn pointers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pointers.iter().copied().take_while(|&p| p != 0)
    }

    /// Every non-zero pointer, including any after a gap
    pub fn live_pointers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pointers.iter().copied().filter(|&p| p != 0)
    }

    /// Number of pointers in the in-use prefix
    pub fn pointer_count(&self) -> usize {
        self.pointers().count()
    }

    /// Append a block pointer. Returns false if all pointer slots are taken.
    pub fn push_pointer(&mut self, pointer: u32) -> bool {
        match self.pointers.iter().position(|&p| p == 0) {
            Some(slot) => {
                self.pointers[slot] = pointer;
                true
            }
            None => false,
        }
    }

    /// Reset to a free slot, returning the pointers it held
    pub fn clear(&mut self) -> Vec<u32> {
        let held: Vec<u32> = self.live_pointers().collect();
        *self = Self::empty();
        held
    }

    /// Encode to the 148-byte on-disk representation
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| VfsError::Serialization(e.to_string()))
    }

    /// Decode one on-disk slot
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if (bytes.len() as u64) < ENTRY_SIZE {
            return Err(VfsError::Format(format!(
                "Incomplete entry: expected {} bytes, got {}",
                ENTRY_SIZE,
                bytes.len()
            )));
        }

        bincode::deserialize(&bytes[..ENTRY_SIZE as usize])
            .map_err(|e| VfsError::Serialization(e.to_string()))
    }
}
