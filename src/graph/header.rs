/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::error::{Result, StoreError};
use crate::graph::file::GraphFile;
use crate::graph::{INDEX_PAGE_SIZE, MIN_PAGE_SIZE, TEXT_BLOCK_SIZE};

/// The 16-byte signature every graph file starts with.
pub const FABRIC_SIGNATURE: [u8; 16] = *b"fabricdb v0.1\0\0\0";

/// The format version written to new files.
pub const FABRIC_VERSION: u32 = 1;

/// Total size of the file header in bytes.
pub const FABRIC_HEADER_SIZE: u32 = 84;

// Byte offsets of the header fields.
const FABRIC_SIGNATURE_OFFSET: u64 = 0;
const APP_SIGNATURE_OFFSET: u64 = 16;
const FABRIC_VERSION_OFFSET: u64 = 32;
const APP_VERSION_OFFSET: u64 = 36;
const CHANGE_COUNTER_OFFSET: u64 = 40;
const CLASS_STORE_OFFSET_OFFSET: u64 = 44;
const LABEL_STORE_OFFSET_OFFSET: u64 = 48;
const VERTEX_STORE_OFFSET_OFFSET: u64 = 52;
const EDGE_STORE_OFFSET_OFFSET: u64 = 56;
const PROPERTY_STORE_OFFSET_OFFSET: u64 = 60;
const TEXT_STORE_OFFSET_OFFSET: u64 = 64;
const TEXT_BLOCK_SIZE_OFFSET: u64 = 68;
const INDEX_STORE_OFFSET_OFFSET: u64 = 72;
const INDEX_PAGE_SIZE_OFFSET: u64 = 76;
const INDEX_PAGE_COUNT_OFFSET: u64 = 80;

/// The fixed 84-byte header at the start of every graph file.
///
/// The header is the source of truth for the region layout: on open, each
/// store is told its offset and computes its size as the gap to the next
/// region. The change counter is bumped on every flush that writes, so
/// clients can use it to invalidate external caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub fabric_signature: [u8; 16],
    /// Optionally used by the embedding application to verify the file type.
    pub app_signature: [u8; 16],
    pub fabric_version: u32,
    pub app_version: u32,
    pub change_counter: u32,
    pub class_store_offset: u32,
    pub label_store_offset: u32,
    pub vertex_store_offset: u32,
    pub edge_store_offset: u32,
    pub property_store_offset: u32,
    pub text_store_offset: u32,
    pub text_block_size: u32,
    pub index_store_offset: u32,
    pub index_page_size: u32,
    pub index_page_count: u32,
}

impl Header {
    /// The layout of a freshly created file: regions assigned contiguously,
    /// one [`MIN_PAGE_SIZE`] apart, starting right after the header.
    pub fn new_layout() -> Self {
        let class_store_offset = FABRIC_HEADER_SIZE;
        let label_store_offset = class_store_offset + MIN_PAGE_SIZE;
        let vertex_store_offset = label_store_offset + MIN_PAGE_SIZE;
        let edge_store_offset = vertex_store_offset + MIN_PAGE_SIZE;
        let property_store_offset = edge_store_offset + MIN_PAGE_SIZE;
        let text_store_offset = property_store_offset + MIN_PAGE_SIZE;
        let index_store_offset = text_store_offset + MIN_PAGE_SIZE;
        Self {
            fabric_signature: FABRIC_SIGNATURE,
            app_signature: [0; 16],
            fabric_version: FABRIC_VERSION,
            app_version: 0,
            change_counter: 1,
            class_store_offset,
            label_store_offset,
            vertex_store_offset,
            edge_store_offset,
            property_store_offset,
            text_store_offset,
            text_block_size: TEXT_BLOCK_SIZE,
            index_store_offset,
            index_page_size: INDEX_PAGE_SIZE,
            index_page_count: 0,
        }
    }

    /// Reads and validates the header of an existing file.
    pub(crate) fn read(file: &mut GraphFile) -> Result<Self> {
        let mut fabric_signature = [0u8; 16];
        file.read_bytes(FABRIC_SIGNATURE_OFFSET, &mut fabric_signature)?;
        if fabric_signature != FABRIC_SIGNATURE {
            return Err(StoreError::BadSignature);
        }
        let mut app_signature = [0u8; 16];
        file.read_bytes(APP_SIGNATURE_OFFSET, &mut app_signature)?;
        Ok(Self {
            fabric_signature,
            app_signature,
            fabric_version: file.read_u32(FABRIC_VERSION_OFFSET)?,
            app_version: file.read_u32(APP_VERSION_OFFSET)?,
            change_counter: file.read_u32(CHANGE_COUNTER_OFFSET)?,
            class_store_offset: file.read_u32(CLASS_STORE_OFFSET_OFFSET)?,
            label_store_offset: file.read_u32(LABEL_STORE_OFFSET_OFFSET)?,
            vertex_store_offset: file.read_u32(VERTEX_STORE_OFFSET_OFFSET)?,
            edge_store_offset: file.read_u32(EDGE_STORE_OFFSET_OFFSET)?,
            property_store_offset: file.read_u32(PROPERTY_STORE_OFFSET_OFFSET)?,
            text_store_offset: file.read_u32(TEXT_STORE_OFFSET_OFFSET)?,
            text_block_size: file.read_u32(TEXT_BLOCK_SIZE_OFFSET)?,
            index_store_offset: file.read_u32(INDEX_STORE_OFFSET_OFFSET)?,
            index_page_size: file.read_u32(INDEX_PAGE_SIZE_OFFSET)?,
            index_page_count: file.read_u32(INDEX_PAGE_COUNT_OFFSET)?,
        })
    }

    /// Writes the header in full.
    pub(crate) fn write(&self, file: &mut GraphFile) -> Result<()> {
        file.write_bytes(FABRIC_SIGNATURE_OFFSET, &self.fabric_signature)?;
        file.write_bytes(APP_SIGNATURE_OFFSET, &self.app_signature)?;
        file.write_u32(FABRIC_VERSION_OFFSET, self.fabric_version)?;
        file.write_u32(APP_VERSION_OFFSET, self.app_version)?;
        file.write_u32(CHANGE_COUNTER_OFFSET, self.change_counter)?;
        file.write_u32(CLASS_STORE_OFFSET_OFFSET, self.class_store_offset)?;
        file.write_u32(LABEL_STORE_OFFSET_OFFSET, self.label_store_offset)?;
        file.write_u32(VERTEX_STORE_OFFSET_OFFSET, self.vertex_store_offset)?;
        file.write_u32(EDGE_STORE_OFFSET_OFFSET, self.edge_store_offset)?;
        file.write_u32(PROPERTY_STORE_OFFSET_OFFSET, self.property_store_offset)?;
        file.write_u32(TEXT_STORE_OFFSET_OFFSET, self.text_store_offset)?;
        file.write_u32(TEXT_BLOCK_SIZE_OFFSET, self.text_block_size)?;
        file.write_u32(INDEX_STORE_OFFSET_OFFSET, self.index_store_offset)?;
        file.write_u32(INDEX_PAGE_SIZE_OFFSET, self.index_page_size)?;
        file.write_u32(INDEX_PAGE_COUNT_OFFSET, self.index_page_count)
    }
}

impl core::fmt::Display for Header {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(
            f,
            "Fabric Header String: {}",
            String::from_utf8_lossy(&self.fabric_signature)
        )?;
        writeln!(
            f,
            "Application Header String: {}",
            String::from_utf8_lossy(&self.app_signature)
        )?;
        writeln!(f, "Fabric Version Number: {}", self.fabric_version)?;
        writeln!(f, "Application Version Number: {}", self.app_version)?;
        writeln!(f, "File Change Counter: {}", self.change_counter)?;
        writeln!(f, "Class Store Offset: {}", self.class_store_offset)?;
        writeln!(f, "Label Store Offset: {}", self.label_store_offset)?;
        writeln!(f, "Vertex Store Offset: {}", self.vertex_store_offset)?;
        writeln!(f, "Edge Store Offset: {}", self.edge_store_offset)?;
        writeln!(f, "Property Store Offset: {}", self.property_store_offset)?;
        writeln!(f, "Text Store Offset: {}", self.text_store_offset)?;
        writeln!(f, "Text Block Size: {}", self.text_block_size)?;
        writeln!(f, "Index Store Offset: {}", self.index_store_offset)?;
        writeln!(f, "Index Page Size: {}", self.index_page_size)?;
        write!(f, "Index Page Count: {}", self.index_page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layout() {
        let header = Header::new_layout();
        assert_eq!(header.class_store_offset, 84);
        assert_eq!(header.label_store_offset, 84 + 65536);
        assert_eq!(header.index_store_offset, 84 + 6 * 65536);
        assert_eq!(header.change_counter, 1);
        assert_eq!(header.text_block_size, 32);
        assert_eq!(header.index_page_size, 65536);
        assert_eq!(header.index_page_count, 0);
    }

    #[test]
    fn test_signature() {
        assert_eq!(&FABRIC_SIGNATURE[..13], b"fabricdb v0.1");
        assert_eq!(&FABRIC_SIGNATURE[13..], &[0, 0, 0]);
    }
}
