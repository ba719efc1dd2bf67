/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec;
use crate::error::Result;

/// Positional I/O against a graph's single backing file.
///
/// This is the only thing the stores see of the file. Every call takes an
/// explicit offset; no position is carried between calls, so interleaved
/// store accesses cannot alias each other. All numeric accessors go through
/// the big-endian [codec](crate::codec).
#[derive(Debug)]
pub struct GraphFile {
    file: File,
}

impl GraphFile {
    /// Creates (or truncates) the backing file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Opens an existing backing file at `path` for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Extends or truncates the file to `len` bytes. Extended bytes read as
    /// zero, which every store treats as "slot not in use".
    pub fn set_len(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn read_bytes(&mut self, at: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(at))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, at: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(at))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    pub fn read_u16(&mut self, at: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bytes(at, &mut buf)?;
        Ok(codec::read_u16(&buf, 0))
    }

    pub fn read_u32(&mut self, at: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(at, &mut buf)?;
        Ok(codec::read_u32(&buf, 0))
    }

    pub fn read_u64(&mut self, at: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_bytes(at, &mut buf)?;
        Ok(codec::read_u64(&buf, 0))
    }

    pub fn write_u16(&mut self, at: u64, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        codec::write_u16(&mut buf, 0, value);
        self.write_bytes(at, &buf)
    }

    pub fn write_u32(&mut self, at: u64, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        codec::write_u32(&mut buf, 0, value);
        self.write_bytes(at, &buf)
    }

    pub fn write_u64(&mut self, at: u64, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        codec::write_u64(&mut buf, 0, value);
        self.write_bytes(at, &buf)
    }

    /// Flushes OS buffers to the storage device.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_positional_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scratch.fdb");
        let mut file = GraphFile::create(&path)?;
        file.set_len(64)?;

        file.write_u16(0, 0xCAFE)?;
        file.write_u32(10, 0xDEAD_BEEF)?;
        file.write_u64(20, u64::MAX - 1)?;
        assert_eq!(file.read_u16(0)?, 0xCAFE);
        assert_eq!(file.read_u32(10)?, 0xDEAD_BEEF);
        assert_eq!(file.read_u64(20)?, u64::MAX - 1);
        // Zero-extended bytes read back as zero.
        assert_eq!(file.read_u32(60)?, 0);

        // Reopen and read the same values back.
        drop(file);
        let mut file = GraphFile::open(&path)?;
        assert_eq!(file.read_u16(0)?, 0xCAFE);
        assert_eq!(file.read_u32(10)?, 0xDEAD_BEEF);
        Ok(())
    }
}
