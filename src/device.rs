//! Backing device
//!
//! The byte-addressable, growable resource a store lives in. A regular host
//! file is the normal backing; `MemDevice` keeps everything in memory.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Result;

/// Random-access storage a store reads from and writes to
pub trait BlockDevice {
    /// Fill `buf` with the bytes starting at `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write all of `buf` starting at `offset`
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Grow or shrink the resource to exactly `len` bytes
    fn set_len(&mut self, len: u64) -> Result<()>;

    /// Current length in bytes
    fn len(&mut self) -> Result<u64>;

    /// Flush everything written so far to durable storage
    fn sync(&mut self) -> Result<()>;
}

impl BlockDevice for File {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)?;
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        File::set_len(self, len)?;
        Ok(())
    }

    fn len(&mut self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> Result<()> {
        self.sync_all()?;
        Ok(())
    }
}

/// In-memory device, used for tests and benchmarks
#[derive(Debug, Clone, Default)]
pub struct MemDevice {
    data: Vec<u8>,
}

impl MemDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes, e.g. an image read from disk
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the device and return its contents
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl BlockDevice for MemDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.data.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read of {}..{} past end of device ({})", start, end, self.data.len()),
            )
            .into());
        }

        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        self.data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.data.resize(len as usize, 0);
        Ok(())
    }

    fn len(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}
