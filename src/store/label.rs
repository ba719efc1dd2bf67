/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::debug;

use crate::error::{Result, StoreError, StoreKind};
use crate::graph::file::GraphFile;
use crate::record::label::LABEL_RECORD_SIZE;
use crate::record::{LabelId, LabelRecord};
use crate::store::slots::{IdWidth, SlotRecord, SlotStore};
use crate::store::{IndexStore, TextStore};

impl SlotRecord for LabelRecord {
    const KIND: StoreKind = StoreKind::Label;
    const SLOT_SIZE: usize = LABEL_RECORD_SIZE;
    const ID_WIDTH: IdWidth = IdWidth::U32;
    // The refs field aliases the free-list link.
    const LINK_OFFSET: u64 = 4;

    fn decode(id: u32, bytes: &[u8]) -> Result<Self> {
        LabelRecord::decode(id, bytes)
    }

    fn encode(&self, bytes: &mut [u8]) {
        LabelRecord::encode(self, bytes);
    }

    fn in_use(&self) -> bool {
        self.is_in_use()
    }

    fn free_link(&self) -> u32 {
        self.refs
    }

    fn retire(&mut self, next_free: u32) {
        self.text_id = 0;
        self.refs = next_free;
    }

    fn retired(id: u32, next_free: u32) -> Self {
        Self {
            id,
            text_id: 0,
            refs: next_free,
        }
    }
}

/// Interns textual labels with refcounts.
///
/// Adding a name that is already interned bumps its refcount; adding a new
/// name allocates a slot, stores the text in the text store, and registers
/// the label in the label-text index. Removing the last reference frees the
/// slot and deletes the backing text.
#[derive(Debug)]
pub struct LabelStore {
    slots: SlotStore<LabelRecord>,
}

impl LabelStore {
    pub(crate) fn new(offset: u64, size: u64) -> Self {
        Self {
            slots: SlotStore::new(offset, size),
        }
    }

    pub(crate) fn load(file: &mut GraphFile, offset: u64, size: u64) -> Result<Self> {
        Ok(Self {
            slots: SlotStore::load(file, offset, size)?,
        })
    }

    /// The number of live labels.
    pub fn count(&self) -> u32 {
        self.slots.count
    }

    pub(crate) fn flush(&mut self, file: &mut GraphFile) -> Result<bool> {
        self.slots.flush(file)
    }

    pub(crate) fn write_counters(&mut self, file: &mut GraphFile) -> Result<()> {
        self.slots.write_counters(file)
    }

    pub(crate) fn id_bound(&self) -> u32 {
        self.slots.id_bound()
    }

    /// Returns the label with the given id.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: LabelId) -> Result<&LabelRecord> {
        self.slots.get(file, id).map(|record| &*record)
    }

    /// Returns the slot with the given id even if it is not in use.
    pub(crate) fn raw(&mut self, file: &mut GraphFile, id: u32) -> Result<&LabelRecord> {
        self.slots.raw(file, id)
    }

    /// Resolves a label by name through the label-text index.
    pub(crate) fn get_by_name(
        &mut self,
        file: &mut GraphFile,
        indexes: &IndexStore,
        name: &str,
    ) -> Result<&LabelRecord> {
        match indexes.label_index().lookup(name) {
            Some(id) => self.get(file, id),
            None => Err(StoreError::DoesNotExist(StoreKind::Label, 0)),
        }
    }

    /// Interns `name` and takes a reference to it.
    ///
    /// Returns the existing label's id with its refcount bumped, or
    /// allocates a new label whose refcount starts at one.
    pub(crate) fn add(
        &mut self,
        file: &mut GraphFile,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        name: &str,
    ) -> Result<LabelId> {
        if let Some(id) = indexes.label_index().lookup(name) {
            {
                let record = self.slots.get(file, id)?;
                record.add_ref();
            }
            self.slots.mark_dirty(id);
            return Ok(id);
        }

        let id = self.slots.allocate(file)?;
        let text_id = match texts.create(name) {
            Ok(text_id) => text_id,
            Err(e) => {
                self.slots.release(id);
                return Err(e);
            }
        };
        let mut record = LabelRecord::new(id, text_id);
        record.add_ref();
        self.slots.insert(id, record);
        indexes.add_label_to_index(name, id);
        self.slots.count += 1;
        debug!("interned label {id} (`{name}`)");
        Ok(id)
    }

    /// Drops one reference to a label. When the refcount reaches zero the
    /// slot is freed, the backing text is deleted, and the label leaves the
    /// label-text index.
    pub(crate) fn remove(
        &mut self,
        file: &mut GraphFile,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        id: LabelId,
    ) -> Result<()> {
        let (refs, text_id) = {
            let record = self.slots.get(file, id)?;
            record.remove_ref();
            (record.refs(), record.text_id())
        };
        self.slots.mark_dirty(id);
        if refs > 0 {
            return Ok(());
        }
        let name = texts.get(file, text_id)?.value().to_owned();
        texts.delete(file, text_id)?;
        indexes.remove_label_from_index(&name);
        self.slots.release(id);
        self.slots.count -= 1;
        debug!("freed label {id} (`{name}`)");
        Ok(())
    }
}
