//! Store Manager
//!
//! One open store session: the backing device plus in-memory images of the
//! bitmap and entry table.
//!
//! ## Responsibilities
//! - Format new stores and mount existing ones
//! - Put/get/delete entries, keeping bitmap and entry table consistent
//! - Persist every touched region before an operation returns
//!
//! ## Invariant
//! A block is marked used in the bitmap if and only if exactly one live entry
//! points at it. Every operation either preserves this or fails before
//! persisting anything, except a put that runs out of space under
//! `PartialWritePolicy::KeepAllocated`.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::bitmap::Bitmap;
use crate::config::{Config, PartialWritePolicy, SyncStrategy};
use crate::device::BlockDevice;
use crate::error::{Result, VfsError};
use crate::layout::{Header, Layout, BLOCK_SIZE, HEADER_SIZE, MAX_ENTRY_SIZE};
use crate::table::{validate_name, Entry, EntryTable};

use super::listing::Entries;
use super::space_map::SpaceMap;

/// Usage counters for an open store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub block_count: u32,
    pub used_blocks: u32,
    pub free_blocks: u32,
    pub entries: usize,
}

/// An open store session
///
/// Owns the only handle to the backing device. Nothing else may touch the
/// device while the session is alive.
pub struct Store<D: BlockDevice = File> {
    device: D,
    layout: Layout,
    bitmap: Bitmap,
    table: EntryTable,
    config: Config,
}

impl Store<File> {
    /// Create a new store file at `path`, replacing any existing file
    ///
    /// `total_bytes / BLOCK_SIZE` blocks are made available; the remainder
    /// is dropped.
    pub fn create(path: &Path, total_bytes: u64, config: Config) -> Result<Self> {
        // Reject an unaddressable size before truncating anything
        let layout = Layout::for_size(total_bytes)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let store = Self::format_layout(file, layout, config)?;
        info!(
            path = %path.display(),
            blocks = store.layout.block_count(),
            bytes = store.layout.total_size(),
            "Created store"
        );
        Ok(store)
    }

    /// Open an existing store file
    pub fn open(path: &Path, config: Config) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let store = Self::mount(file, config)?;
        info!(
            path = %path.display(),
            blocks = store.layout.block_count(),
            "Opened store"
        );
        Ok(store)
    }
}

impl<D: BlockDevice> Store<D> {
    /// Lay out a fresh store on `device`
    ///
    /// Steps:
    /// 1. Size the device for the full layout, data region included
    /// 2. Write the header
    /// 3. Write an all-free bitmap and an all-empty entry table
    pub fn format(device: D, total_bytes: u64, config: Config) -> Result<Self> {
        let layout = Layout::for_size(total_bytes)?;
        Self::format_layout(device, layout, config)
    }

    /// Write an already validated layout to `device`
    fn format_layout(mut device: D, layout: Layout, config: Config) -> Result<Self> {
        let block_count = layout.block_count();

        device.set_len(layout.total_size())?;
        device.write_at(0, &Header::new(block_count).encode()?)?;

        let bitmap = Bitmap::new(block_count);
        bitmap.persist(&mut device, &layout)?;

        let table = EntryTable::new(block_count);
        table.persist(&mut device, &layout)?;

        let mut store = Self {
            device,
            layout,
            bitmap,
            table,
            config,
        };
        store.sync_if_needed()?;
        Ok(store)
    }

    /// Load an existing store from `device`
    ///
    /// Fails with `Format` on a bad magic number or a device shorter than
    /// the layout the header describes.
    pub fn mount(mut device: D, config: Config) -> Result<Self> {
        let device_len = device.len()?;
        if device_len < HEADER_SIZE {
            return Err(VfsError::Format(format!(
                "File too short for a header: {} bytes",
                device_len
            )));
        }

        let mut header_bytes = [0u8; HEADER_SIZE as usize];
        device.read_at(0, &mut header_bytes)?;
        let header = Header::decode(&header_bytes)?;

        let layout = Layout::new(header.block_count);
        if device_len < layout.total_size() {
            return Err(VfsError::Format(format!(
                "Truncated store: {} blocks need {} bytes, file has {}",
                header.block_count,
                layout.total_size(),
                device_len
            )));
        }

        let bitmap = Bitmap::load(&mut device, &layout)?;
        let table = EntryTable::load(&mut device, &layout)?;

        Ok(Self {
            device,
            layout,
            bitmap,
            table,
            config,
        })
    }

    // =========================================================================
    // Entry Operations
    // =========================================================================

    /// Store `data` under `name`. Returns the entry slot used.
    pub fn put(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        self.put_from(name, data, data.len() as u64)
    }

    /// Stream `len` bytes from `source` into a new entry called `name`
    ///
    /// Steps:
    /// 1. Validate the name, its uniqueness and the size cap
    /// 2. Reserve the first free slot
    /// 3. Copy the source block by block into free blocks, scanning forward
    /// 4. Persist the slot and the whole bitmap
    ///
    /// If the source ends early the recorded size is what was actually read.
    pub fn put_from<R: Read>(&mut self, name: &str, source: R, len: u64) -> Result<usize> {
        validate_name(name)?;

        if self.table.find_by_name(name).is_some() {
            return Err(VfsError::DuplicateName(name.to_string()));
        }

        if len > MAX_ENTRY_SIZE {
            return Err(VfsError::FileTooLarge {
                size: len,
                max: MAX_ENTRY_SIZE,
            });
        }

        let slot = self.table.find_first_free()?;
        {
            let entry = self.slot_mut(slot)?;
            entry.set_name(name)?;
            entry.set_size(len as u32);
        }

        let mut allocated = Vec::new();
        let written = match self.commit_put(slot, source.take(len), &mut allocated) {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = self.abort_put(slot, &allocated) {
                    warn!(entry = name, error = %cleanup, "Failed to persist put rollback");
                }
                return Err(e);
            }
        };

        if written != len {
            debug!(entry = name, expected = len, written, "Source ended early");
        }

        debug!(entry = name, slot, size = written, blocks = allocated.len(), "Put entry");
        Ok(slot)
    }

    /// Copy the contents of `name` into `sink`. Returns the bytes written.
    pub fn get<W: Write>(&mut self, name: &str, mut sink: W) -> Result<u64> {
        let slot = self
            .table
            .find_by_name(name)
            .ok_or_else(|| VfsError::NotFound(name.to_string()))?;
        let entry = self
            .table
            .get(slot)
            .ok_or_else(|| VfsError::NotFound(name.to_string()))?;

        let size = entry.size() as u64;
        let mut remaining = size;
        let mut buffer = vec![0u8; BLOCK_SIZE as usize];

        for pointer in entry.pointers() {
            if remaining == 0 {
                break;
            }

            let n = remaining.min(BLOCK_SIZE) as usize;
            self.device.read_at(pointer as u64, &mut buffer[..n])?;
            sink.write_all(&buffer[..n])?;
            remaining -= n as u64;
        }

        if remaining != 0 {
            return Err(VfsError::Corruption(format!(
                "Entry {} records {} bytes but its blocks hold only {}",
                name,
                size,
                size - remaining
            )));
        }

        debug!(entry = name, size, "Read entry");
        Ok(size)
    }

    /// Read the whole contents of `name` into memory
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.get(name, &mut data)?;
        Ok(data)
    }

    /// Remove `name` and release its blocks
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let slot = self
            .table
            .find_by_name(name)
            .ok_or_else(|| VfsError::NotFound(name.to_string()))?;

        // Resolve every pointer before touching anything
        let layout = self.layout;
        let indexes = self
            .table
            .get(slot)
            .ok_or_else(|| VfsError::NotFound(name.to_string()))?
            .live_pointers()
            .map(|pointer| {
                layout.block_index_from_offset(pointer as u64).ok_or_else(|| {
                    VfsError::Corruption(format!(
                        "Entry {} points outside the data region: {}",
                        name, pointer
                    ))
                })
            })
            .collect::<Result<Vec<u32>>>()?;

        self.slot_mut(slot)?.clear();
        for &index in &indexes {
            self.bitmap.mark_free(index);
        }

        self.table.write_slot(&mut self.device, &self.layout, slot)?;
        self.bitmap.persist(&mut self.device, &self.layout)?;
        self.sync_if_needed()?;

        debug!(entry = name, slot, blocks = indexes.len(), "Deleted entry");
        Ok(())
    }

    /// Live entries in slot order
    pub fn list(&self) -> Entries<'_> {
        Entries::new(&self.table)
    }

    /// Layout regions and free/used block runs
    pub fn space_map(&self) -> SpaceMap {
        SpaceMap::build(&self.layout, &self.bitmap)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Verify that the bitmap matches the blocks referenced by live entries
    ///
    /// Also checks that names are unique, no block is shared and every size
    /// fits within the cap and the entry's own blocks.
    pub fn check(&self) -> Result<()> {
        let mut owned = Bitmap::new(self.layout.block_count());
        let mut names = HashSet::new();

        for (slot, entry) in self.table.live() {
            let name = entry.name();
            if !names.insert(entry.name_bytes()) {
                return Err(VfsError::Corruption(format!(
                    "Duplicate entry name {} in slot {}",
                    name, slot
                )));
            }

            let mut blocks = 0u64;
            for pointer in entry.live_pointers() {
                let index = self
                    .layout
                    .block_index_from_offset(pointer as u64)
                    .ok_or_else(|| {
                        VfsError::Corruption(format!(
                            "Entry {} points outside the data region: {}",
                            name, pointer
                        ))
                    })?;

                if !owned.is_free(index) {
                    return Err(VfsError::Corruption(format!(
                        "Block {} is referenced more than once (entry {})",
                        index, name
                    )));
                }
                owned.mark_used(index);
                blocks += 1;
            }

            let size = entry.size() as u64;
            if size > MAX_ENTRY_SIZE || size > blocks * BLOCK_SIZE {
                return Err(VfsError::Corruption(format!(
                    "Entry {} records {} bytes in {} blocks",
                    name, size, blocks
                )));
            }
        }

        for index in 0..self.layout.block_count() {
            match (self.bitmap.is_free(index), owned.is_free(index)) {
                (false, true) => {
                    return Err(VfsError::Corruption(format!(
                        "Block {} is marked used but no entry owns it",
                        index
                    )))
                }
                (true, false) => {
                    return Err(VfsError::Corruption(format!(
                        "Block {} is owned by an entry but marked free",
                        index
                    )))
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Close the session, syncing the backing device
    pub fn close(mut self) -> Result<()> {
        self.device.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn block_count(&self) -> u32 {
        self.layout.block_count()
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn table(&self) -> &EntryTable {
        &self.table
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Usage counters
    pub fn stats(&self) -> StoreStats {
        let used_blocks = self.bitmap.used_count();
        StoreStats {
            block_count: self.layout.block_count(),
            used_blocks,
            free_blocks: self.layout.block_count() - used_blocks,
            entries: self.table.live().count(),
        }
    }

    /// Give back the backing device without syncing
    pub fn into_device(self) -> D {
        self.device
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Stream the blocks, then persist the slot and the bitmap
    fn commit_put<R: Read>(
        &mut self,
        slot: usize,
        source: R,
        allocated: &mut Vec<u32>,
    ) -> Result<u64> {
        let written = self.write_blocks(slot, source, allocated)?;
        self.slot_mut(slot)?.set_size(written as u32);

        self.table.write_slot(&mut self.device, &self.layout, slot)?;
        self.bitmap.persist(&mut self.device, &self.layout)?;
        self.sync_if_needed()?;
        Ok(written)
    }

    /// Copy `source` into free blocks, recording each claimed block
    fn write_blocks<R: Read>(
        &mut self,
        slot: usize,
        mut source: R,
        allocated: &mut Vec<u32>,
    ) -> Result<u64> {
        let mut buffer = vec![0u8; BLOCK_SIZE as usize];
        let mut cursor = 0u32;
        let mut written = 0u64;

        loop {
            let n = read_chunk(&mut source, &mut buffer)?;
            if n == 0 {
                break;
            }

            let index = self
                .bitmap
                .find_free_from(cursor)
                .ok_or(VfsError::OutOfSpace)?;
            cursor = index + 1;

            let address = self.layout.block_offset(index);
            let pointer = u32::try_from(address).map_err(|_| {
                VfsError::Corruption(format!("Block address {} exceeds 32 bits", address))
            })?;

            if !self.slot_mut(slot)?.push_pointer(pointer) {
                return Err(VfsError::FileTooLarge {
                    size: written + n as u64,
                    max: MAX_ENTRY_SIZE,
                });
            }
            self.bitmap.mark_used(index);
            allocated.push(index);

            self.device.write_at(address, &buffer[..n])?;
            written += n as u64;
        }

        Ok(written)
    }

    /// Undo a failed put: empty the slot and apply the partial write policy
    ///
    /// Memory is restored first; the first persist error, if any, is
    /// returned after every region has been attempted.
    fn abort_put(&mut self, slot: usize, allocated: &[u32]) -> Result<()> {
        self.slot_mut(slot)?.clear();

        match self.config.partial_write_policy {
            PartialWritePolicy::Rollback => {
                for &index in allocated {
                    self.bitmap.mark_free(index);
                }
                warn!(slot, blocks = allocated.len(), "Put failed, released claimed blocks");
            }
            PartialWritePolicy::KeepAllocated => {
                warn!(slot, blocks = allocated.len(), "Put failed, claimed blocks left allocated");
            }
        }

        let slot_result = self.table.write_slot(&mut self.device, &self.layout, slot);
        let bitmap_result = self.bitmap.persist(&mut self.device, &self.layout);
        slot_result?;
        bitmap_result?;
        self.sync_if_needed()
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Entry> {
        self.table
            .get_mut(slot)
            .ok_or_else(|| VfsError::Corruption(format!("No entry slot {}", slot)))
    }

    fn sync_if_needed(&mut self) -> Result<()> {
        match self.config.sync_strategy {
            SyncStrategy::EveryWrite => self.device.sync(),
            SyncStrategy::Never => Ok(()),
        }
    }
}

/// Fill `buf` from `source`, stopping early only at end of input
fn read_chunk<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
