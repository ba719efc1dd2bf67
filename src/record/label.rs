/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::codec;
use crate::error::{Result, StoreError, StoreKind};
use crate::record::{LabelId, TextId};

/// The on-disk size of a label record.
pub const LABEL_RECORD_SIZE: usize = 8;

/// An interned, refcounted string used as a class name, edge type, or
/// property key.
///
/// Labels deduplicate text that is repeated often and needs quick lookup:
/// they are always indexed by their text. The refcount is the number of live
/// classes, edges, and properties naming the label; when it drops to zero the
/// slot is freed and the backing text record deleted.
///
/// On disk a label occupies 8 bytes:
///
/// ```text
/// +----+----+----+----+----+----+----+----+
/// | text_id           | refs              |
/// +----+----+----+----+----+----+----+----+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub(crate) id: LabelId,
    pub(crate) text_id: TextId,
    pub(crate) refs: u32,
}

impl LabelRecord {
    pub(crate) fn new(id: LabelId, text_id: TextId) -> Self {
        Self {
            id,
            text_id,
            refs: 0,
        }
    }

    /// Decodes a label from its 8-byte slot. The id must be assigned by the
    /// store before the bytes are interpreted.
    pub fn decode(id: LabelId, data: &[u8]) -> Result<Self> {
        if id < 1 {
            return Err(StoreError::InvalidId(StoreKind::Label, id));
        }
        Ok(Self {
            id,
            text_id: codec::read_u32(data, 0),
            refs: codec::read_u32(data, 4),
        })
    }

    pub fn encode(&self, data: &mut [u8]) {
        codec::write_u32(data, 0, self.text_id);
        codec::write_u32(data, 4, self.refs);
    }

    pub fn id(&self) -> LabelId {
        self.id
    }

    pub fn text_id(&self) -> TextId {
        self.text_id
    }

    /// A label is marked as not in use by zeroing its text id.
    pub fn is_in_use(&self) -> bool {
        self.text_id != 0
    }

    pub fn refs(&self) -> u32 {
        self.refs
    }

    pub fn has_refs(&self) -> bool {
        self.refs > 0
    }

    pub(crate) fn add_ref(&mut self) {
        self.refs += 1;
    }

    pub(crate) fn remove_ref(&mut self) {
        self.refs = self.refs.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refcount() {
        let mut label = LabelRecord::new(5, 12);
        assert!(!label.has_refs());
        label.add_ref();
        label.add_ref();
        assert_eq!(label.refs(), 2);
        label.remove_ref();
        assert_eq!(label.refs(), 1);

        let mut data = [0u8; LABEL_RECORD_SIZE];
        label.encode(&mut data);
        assert_eq!(data, [0, 0, 0, 12, 0, 0, 0, 1]);
        assert_eq!(LabelRecord::decode(5, &data).unwrap(), label);
    }
}
