/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::debug;

use crate::error::{Result, StoreKind};
use crate::graph::file::GraphFile;
use crate::record::property::PROPERTY_RECORD_SIZE;
use crate::record::{PropertyId, PropertyRecord, PropertyValue};
use crate::store::slots::{IdWidth, SlotRecord, SlotStore};
use crate::store::{IndexStore, LabelStore, TextStore};

impl SlotRecord for PropertyRecord {
    const KIND: StoreKind = StoreKind::Property;
    const SLOT_SIZE: usize = PROPERTY_RECORD_SIZE;
    const ID_WIDTH: IdWidth = IdWidth::U32;
    // The next-property field aliases the free-list link.
    const LINK_OFFSET: u64 = 4;

    fn decode(id: u32, bytes: &[u8]) -> Result<Self> {
        PropertyRecord::decode(id, bytes)
    }

    fn encode(&self, bytes: &mut [u8]) {
        PropertyRecord::encode(self, bytes);
    }

    fn in_use(&self) -> bool {
        self.is_in_use()
    }

    fn free_link(&self) -> u32 {
        self.next_property_id
    }

    fn retire(&mut self, next_free: u32) {
        self.label_id = 0;
        self.clear_value();
        self.next_property_id = next_free;
    }

    fn retired(id: u32, next_free: u32) -> Self {
        let mut record = PropertyRecord::new(id, 0);
        record.next_property_id = next_free;
        record
    }
}

/// Manages the storage of properties.
///
/// A property's key is an interned, refcounted label. Text values up to 8
/// bytes are stored inline; longer text is spilled to the text store.
/// Threading a property into its owner's list is the traversal layer's job,
/// so the store only deals in records.
#[derive(Debug)]
pub struct PropertyStore {
    slots: SlotStore<PropertyRecord>,
}

impl PropertyStore {
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

    /// The number of live properties.
    pub fn count(&self) -> u32 {
        self.slots.count
    }

    pub(crate) fn flush(&mut self, file: &mut GraphFile) -> Result<bool> {
        self.slots.flush(file)
    }

    pub(crate) fn write_counters(&mut self, file: &mut GraphFile) -> Result<()> {
        self.slots.write_counters(file)
    }

    /// Returns the property with the given id.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: PropertyId) -> Result<&PropertyRecord> {
        self.slots.get(file, id).map(|record| &*record)
    }

    /// Creates a property `key = value` and returns its id.
    pub(crate) fn create(
        &mut self,
        file: &mut GraphFile,
        labels: &mut LabelStore,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        key: &str,
        value: &PropertyValue,
    ) -> Result<PropertyId> {
        let label_id = labels.add(file, texts, indexes, key)?;
        // Spill text that does not fit the inline payload.
        let stored;
        let value = match value {
            PropertyValue::Text(text) if text.len() > 8 => {
                let text_id = match texts.create(text) {
                    Ok(text_id) => text_id,
                    Err(e) => {
                        labels.remove(file, texts, indexes, label_id)?;
                        return Err(e);
                    }
                };
                stored = PropertyValue::LongText(text_id);
                &stored
            }
            other => other,
        };
        let id = match self.slots.allocate(file) {
            Ok(id) => id,
            Err(e) => {
                if let PropertyValue::LongText(text_id) = value {
                    texts.delete(file, *text_id)?;
                }
                labels.remove(file, texts, indexes, label_id)?;
                return Err(e);
            }
        };
        let mut record = PropertyRecord::new(id, label_id);
        record.set_value(value)?;
        self.slots.insert(id, record);
        self.slots.count += 1;
        debug!("created property {id} (`{key}`)");
        Ok(id)
    }

    /// Resolves a property's value, reading spilled text back from the text
    /// store.
    pub(crate) fn value(
        &mut self,
        file: &mut GraphFile,
        texts: &mut TextStore,
        id: PropertyId,
    ) -> Result<PropertyValue> {
        let value = self.slots.get(file, id)?.value()?;
        match value {
            PropertyValue::LongText(text_id) => {
                let text = texts.get(file, text_id)?;
                Ok(PropertyValue::Text(text.value().to_owned()))
            }
            other => Ok(other),
        }
    }

    /// Deletes a property, dropping its key's label reference and any
    /// spilled text.
    pub(crate) fn delete(
        &mut self,
        file: &mut GraphFile,
        labels: &mut LabelStore,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        id: PropertyId,
    ) -> Result<()> {
        let (label_id, value) = {
            let record = self.slots.get(file, id)?;
            (record.label_id(), record.value()?)
        };
        if let PropertyValue::LongText(text_id) = value {
            texts.delete(file, text_id)?;
        }
        labels.remove(file, texts, indexes, label_id)?;
        self.slots.release(id);
        self.slots.count -= 1;
        debug!("deleted property {id}");
        Ok(())
    }
}
