//! Entry Table
//!
//! In-memory image of every entry slot, loaded whole on open.

use crate::device::BlockDevice;
use crate::error::{Result, VfsError};
use crate::layout::{Layout, ENTRY_SIZE};

use super::Entry;

/// All entry slots of a store, in slot order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTable {
    slots: Vec<Entry>,
}

impl EntryTable {
    /// Table of `slot_count` free slots
    pub fn new(slot_count: u32) -> Self {
        Self {
            slots: vec![Entry::empty(); slot_count as usize],
        }
    }

    /// Load the entry table region of a store
    pub fn load<D: BlockDevice>(device: &mut D, layout: &Layout) -> Result<Self> {
        let mut bytes = vec![0u8; layout.entry_table_size() as usize];
        device.read_at(layout.entry_table_offset(), &mut bytes)?;

        let slots = bytes
            .chunks_exact(ENTRY_SIZE as usize)
            .map(Entry::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots })
    }

    /// Write every slot back, used once when a store is formatted
    pub fn persist<D: BlockDevice>(&self, device: &mut D, layout: &Layout) -> Result<()> {
        let mut image = Vec::with_capacity(layout.entry_table_size() as usize);
        for entry in &self.slots {
            image.extend_from_slice(&entry.encode()?);
        }
        device.write_at(layout.entry_table_offset(), &image)
    }

    /// Write exactly one slot to its fixed offset
    pub fn write_slot<D: BlockDevice>(
        &self,
        device: &mut D,
        layout: &Layout,
        slot: usize,
    ) -> Result<()> {
        let entry = self
            .slots
            .get(slot)
            .ok_or_else(|| VfsError::Corruption(format!("No entry slot {}", slot)))?;
        device.write_at(layout.entry_offset(slot), &entry.encode()?)
    }

    /// Slot index of the live entry called `name`
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|entry| entry.has_name(name))
    }

    /// Slot index of the first free slot
    pub fn find_first_free(&self) -> Result<usize> {
        self.slots
            .iter()
            .position(Entry::is_free)
            .ok_or(VfsError::TableFull)
    }

    pub fn get(&self, slot: usize) -> Option<&Entry> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Entry> {
        self.slots.get_mut(slot)
    }

    /// Total number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live entries with their slot index, in slot order
    pub fn live(&self) -> impl Iterator<Item = (usize, &Entry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_free())
    }
}
