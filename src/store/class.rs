/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::debug;

use crate::collections::DynamicList;
use crate::error::{Result, StoreError, StoreKind};
use crate::graph::file::GraphFile;
use crate::record::class::CLASS_RECORD_SIZE;
use crate::record::{ClassId, ClassRecord, LabelId};
use crate::store::slots::{IdWidth, SlotRecord, SlotStore};
use crate::store::{IndexStore, LabelStore, TextStore};

/// The id of the reserved root class every other class descends from.
pub const ROOT_CLASS_ID: ClassId = 1;

/// The name of the reserved root class.
pub const ROOT_CLASS_NAME: &str = "Vertex";

impl SlotRecord for ClassRecord {
    const KIND: StoreKind = StoreKind::Class;
    const SLOT_SIZE: usize = CLASS_RECORD_SIZE;
    const ID_WIDTH: IdWidth = IdWidth::U16;
    // The parent id field aliases the free-list link.
    const LINK_OFFSET: u64 = 4;

    fn decode(id: u32, bytes: &[u8]) -> Result<Self> {
        ClassRecord::decode(id as ClassId, bytes)
    }

    fn encode(&self, bytes: &mut [u8]) {
        ClassRecord::encode(self, bytes);
    }

    fn in_use(&self) -> bool {
        self.is_in_use()
    }

    fn free_link(&self) -> u32 {
        self.parent_id as u32
    }

    fn retire(&mut self, next_free: u32) {
        self.label_id = 0;
        self.parent_id = next_free as ClassId;
    }

    fn retired(id: u32, next_free: u32) -> Self {
        Self {
            id: id as ClassId,
            label_id: 0,
            parent_id: next_free as ClassId,
            first_child_id: 0,
            next_child_id: 0,
            first_index_id: 0,
            count: 0,
            is_abstract: false,
            incrementer: 0,
        }
    }
}

/// Manages the storage of classes and the hierarchy invariants.
///
/// Creating and deleting classes cascades into the label store (class names
/// are interned labels) and the index store (the class-name index, and one id
/// index per non-abstract class), so those stores are passed explicitly to
/// every mutating operation.
#[derive(Debug)]
pub struct ClassStore {
    slots: SlotStore<ClassRecord>,
}

impl ClassStore {
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

    /// The number of live classes.
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

    /// Returns the class with the given id.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: ClassId) -> Result<&ClassRecord> {
        self.slots.get(file, id as u32).map(|record| &*record)
    }

    /// Returns the slot with the given id even if it is not in use.
    pub(crate) fn raw(&mut self, file: &mut GraphFile, id: u32) -> Result<&ClassRecord> {
        self.slots.raw(file, id)
    }

    /// Resolves a class by name through the class-name index.
    pub(crate) fn get_by_name(
        &mut self,
        file: &mut GraphFile,
        indexes: &IndexStore,
        name: &str,
    ) -> Result<&ClassRecord> {
        match indexes.class_index().lookup(name) {
            Some(id) => self.get(file, id),
            None => Err(StoreError::DoesNotExist(StoreKind::Class, 0)),
        }
    }

    /// Creates a new class extending `parent_id`.
    ///
    /// The name is interned as a label, a per-class id index is created
    /// unless the class is abstract, and the new class is wired in as its
    /// parent's first child (the previous first child becomes its next
    /// sibling). Any failure after the slot allocation rolls the preceding
    /// steps back and returns the id to the free-list.
    pub(crate) fn create(
        &mut self,
        file: &mut GraphFile,
        labels: &mut LabelStore,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        parent_id: ClassId,
        name: &str,
        is_abstract: bool,
    ) -> Result<ClassId> {
        if indexes.class_index().lookup(name).is_some() {
            return Err(StoreError::DuplicateClassName(name.to_owned()));
        }
        // The parent must be live before anything is allocated.
        let parent_first_child = self.get(file, parent_id)?.first_child_id();

        let class_id = self.slots.allocate(file)? as ClassId;
        let label_id = match labels.add(file, texts, indexes, name) {
            Ok(label_id) => label_id,
            Err(e) => {
                self.slots.release(class_id as u32);
                return Err(e);
            }
        };
        let first_index_id = if is_abstract {
            0
        } else {
            indexes.create_id_index(class_id)
        };

        let record = ClassRecord::new(
            class_id,
            label_id,
            parent_id,
            parent_first_child,
            first_index_id,
            is_abstract,
        );
        self.slots.insert(class_id as u32, record);
        {
            let parent = self.slots.get(file, parent_id as u32)?;
            parent.set_first_child_id(class_id);
        }
        self.slots.mark_dirty(parent_id as u32);
        indexes.add_class_to_index(name, class_id);
        self.slots.count += 1;
        debug!("created class {class_id} (`{name}`) under {parent_id}");
        Ok(class_id)
    }

    /// Deletes a class.
    ///
    /// Rejected while the class still has child classes or members. The
    /// class is spliced out of its parent's child list, removed from the
    /// class-name index, its id index deleted, and its label released.
    pub(crate) fn delete(
        &mut self,
        file: &mut GraphFile,
        labels: &mut LabelStore,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        class_id: ClassId,
    ) -> Result<()> {
        if class_id == ROOT_CLASS_ID {
            return Err(StoreError::Store(StoreKind::Class));
        }
        let id = class_id as u32;
        let (label_id, parent_id, next_child, first_child, count, first_index) = {
            let record = self.slots.get(file, id)?;
            (
                record.label_id(),
                record.parent_id(),
                record.next_child_id(),
                record.first_child_id(),
                record.count(),
                record.first_index_id(),
            )
        };
        if first_child != 0 {
            return Err(StoreError::HasChildren(class_id));
        }
        if count != 0 {
            return Err(StoreError::HasMembers(class_id));
        }
        // Resolve the name before the label can go away.
        let text_id = labels.get(file, label_id)?.text_id();
        let name = texts.get(file, text_id)?.value().to_owned();

        // Splice the class out of its parent's child list.
        let parent_first_child = self.slots.get(file, parent_id as u32)?.first_child_id();
        if parent_first_child == class_id {
            {
                let parent = self.slots.get(file, parent_id as u32)?;
                parent.set_first_child_id(next_child);
            }
            self.slots.mark_dirty(parent_id as u32);
        } else {
            // Walk the sibling chain to the class's predecessor. A chain that
            // ends before reaching the class is corrupt and surfaces as an
            // invalid id.
            let mut sibling = parent_first_child;
            loop {
                let sibling_next = self.slots.get(file, sibling as u32)?.next_child_id();
                if sibling_next == class_id {
                    break;
                }
                sibling = sibling_next;
            }
            {
                let predecessor = self.slots.get(file, sibling as u32)?;
                predecessor.set_next_child_id(next_child);
            }
            self.slots.mark_dirty(sibling as u32);
        }

        indexes.remove_class_from_index(&name);
        if first_index != 0 {
            indexes.delete_id_index(first_index);
        }
        labels.remove(file, texts, indexes, label_id)?;
        self.slots.release(id);
        self.slots.count -= 1;
        debug!("deleted class {class_id} (`{name}`)");
        Ok(())
    }

    /// Collects the descendants of a class in pre-order.
    ///
    /// `depth` bounds the traversal: 1 collects only direct children, values
    /// below 1 collect every level. The walk keeps an explicit stack, so a
    /// deep hierarchy cannot exhaust the call stack.
    pub(crate) fn descendants(
        &mut self,
        file: &mut GraphFile,
        class_id: ClassId,
        depth: i32,
    ) -> Result<DynamicList<ClassId>> {
        let mut result = DynamicList::new();
        let first_child = self.get(file, class_id)?.first_child_id();
        let mut stack: Vec<(ClassId, i32)> = Vec::new();
        if first_child != 0 {
            stack.push((first_child, depth));
        }
        while let Some((id, depth)) = stack.pop() {
            let (next_child, first_child) = {
                let record = self.get(file, id)?;
                (record.next_child_id(), record.first_child_id())
            };
            result.append(id);
            // Sibling first: the stack pops the child subtree before it.
            if next_child != 0 {
                stack.push((next_child, depth));
            }
            if depth != 1 && first_child != 0 {
                stack.push((first_child, depth - 1));
            }
        }
        Ok(result)
    }

    /// The number of vertices of this class and all of its descendants.
    pub(crate) fn total_member_count(
        &mut self,
        file: &mut GraphFile,
        class_id: ClassId,
    ) -> Result<u32> {
        let mut total = self.get(file, class_id)?.count();
        let descendants = self.descendants(file, class_id, 0)?;
        for &id in &descendants {
            total += self.get(file, id)?.count();
        }
        Ok(total)
    }

    /// Returns the class's current increment value and bumps the counter.
    pub(crate) fn increment(&mut self, file: &mut GraphFile, class_id: ClassId) -> Result<u32> {
        let value = {
            let record = self.slots.get(file, class_id as u32)?;
            record.increment()
        };
        self.slots.mark_dirty(class_id as u32);
        Ok(value)
    }

    /// Adjusts a class's member count by one.
    pub(crate) fn add_member(&mut self, file: &mut GraphFile, class_id: ClassId) -> Result<()> {
        {
            let record = self.slots.get(file, class_id as u32)?;
            record.count += 1;
        }
        self.slots.mark_dirty(class_id as u32);
        Ok(())
    }

    pub(crate) fn remove_member(&mut self, file: &mut GraphFile, class_id: ClassId) -> Result<()> {
        {
            let record = self.slots.get(file, class_id as u32)?;
            record.count = record.count.saturating_sub(1);
        }
        self.slots.mark_dirty(class_id as u32);
        Ok(())
    }

    /// Seeds the reserved root class in a freshly created store. The root's
    /// parent field is 0 and ignored during traversal.
    pub(crate) fn seed_root(
        &mut self,
        file: &mut GraphFile,
        label_id: LabelId,
        first_index_id: crate::record::IndexId,
    ) -> Result<ClassId> {
        let id = self.slots.allocate(file)? as ClassId;
        debug_assert_eq!(id, ROOT_CLASS_ID);
        let record = ClassRecord::new(id, label_id, 0, 0, first_index_id, false);
        self.slots.insert(id as u32, record);
        self.slots.count += 1;
        Ok(id)
    }
}
