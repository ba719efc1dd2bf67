/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::collections::HashMap;

use log::debug;

use crate::collections::{EntityMap, IdSet};
use crate::error::Result;
use crate::graph::file::GraphFile;
use crate::record::{ClassId, IndexId, IndexRecord, IndexType, LabelId, VertexId};
use crate::store::{ClassStore, LabelStore, TextStore, VertexStore};

/// Preset id of the class-name index.
pub const CLASS_INDEX_ID: IndexId = 1;
/// Preset id of the label-text index.
pub const LABEL_INDEX_ID: IndexId = 2;
/// Preset id of the edge index.
pub const EDGE_INDEX_ID: IndexId = 3;

/// Looks classes up by their unique name.
#[derive(Debug, Default)]
pub struct ClassIndex {
    by_name: HashMap<String, ClassId>,
}

impl ClassIndex {
    /// Returns the id of the class with the given name, or `None`.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }
}

/// Looks labels up by their text.
#[derive(Debug, Default)]
pub struct LabelIndex {
    by_text: HashMap<String, LabelId>,
}

impl LabelIndex {
    /// Returns the id of the label with the given text, or `None`.
    pub fn lookup(&self, name: &str) -> Option<LabelId> {
        self.by_text.get(name).copied()
    }
}

/// Manages the redundant lookup structures: the class-name index, the
/// label-text index, and one vertex-id set per non-abstract class.
///
/// The lookup structures are rebuilt from the primary stores on open rather
/// than persisted; the region's header fields (page size, page count) are
/// carried through faithfully so a paged on-disk implementation can take
/// over the region later.
#[derive(Debug)]
pub struct IndexStore {
    offset: u64,
    size: u64,
    page_size: u32,
    page_count: u32,
    records: HashMap<IndexId, IndexRecord>,
    class_index: ClassIndex,
    label_index: LabelIndex,
    /// Vertex-id sets of the non-abstract classes, keyed by index id.
    id_indexes: EntityMap<IdSet>,
    next_index_id: IndexId,
    free_index_ids: Vec<IndexId>,
}

impl IndexStore {
    pub(crate) fn new(offset: u64, size: u64, page_size: u32, page_count: u32) -> Self {
        let mut records = HashMap::new();
        records.insert(
            CLASS_INDEX_ID,
            IndexRecord::new(CLASS_INDEX_ID, IndexType::ClassName),
        );
        records.insert(
            LABEL_INDEX_ID,
            IndexRecord::new(LABEL_INDEX_ID, IndexType::LabelText),
        );
        records.insert(EDGE_INDEX_ID, IndexRecord::new(EDGE_INDEX_ID, IndexType::Edge));
        Self {
            offset,
            size,
            page_size,
            page_count,
            records,
            class_index: ClassIndex::default(),
            label_index: LabelIndex::default(),
            id_indexes: EntityMap::new(),
            next_index_id: EDGE_INDEX_ID + 1,
            free_index_ids: Vec::new(),
        }
    }

    /// Absolute file offset of the index region.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the index region in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn class_index(&self) -> &ClassIndex {
        &self.class_index
    }

    pub fn label_index(&self) -> &LabelIndex {
        &self.label_index
    }

    /// Returns an index's registry entry.
    pub fn get(&self, id: IndexId) -> Option<&IndexRecord> {
        self.records.get(&id)
    }

    pub(crate) fn add_class_to_index(&mut self, name: &str, id: ClassId) {
        self.class_index.by_name.insert(name.to_owned(), id);
    }

    pub(crate) fn remove_class_from_index(&mut self, name: &str) {
        self.class_index.by_name.remove(name);
    }

    pub(crate) fn add_label_to_index(&mut self, name: &str, id: LabelId) {
        self.label_index.by_text.insert(name.to_owned(), id);
    }

    pub(crate) fn remove_label_from_index(&mut self, name: &str) {
        self.label_index.by_text.remove(name);
    }

    /// Creates the vertex-id index of a class and returns its id.
    pub(crate) fn create_id_index(&mut self, class_id: ClassId) -> IndexId {
        let id = self.free_index_ids.pop().unwrap_or_else(|| {
            let id = self.next_index_id;
            self.next_index_id += 1;
            id
        });
        self.records.insert(id, IndexRecord::new(id, IndexType::IdSet));
        self.id_indexes.set(id as u32, IdSet::new());
        debug!("created id index {id} for class {class_id}");
        id
    }

    pub(crate) fn delete_id_index(&mut self, id: IndexId) {
        self.records.remove(&id);
        self.id_indexes.unset(id as u32);
        self.free_index_ids.push(id);
    }

    pub(crate) fn add_vertex_to_id_index(&mut self, index_id: IndexId, vertex_id: VertexId) {
        if let Some(set) = self.id_indexes.get_mut(index_id as u32) {
            set.add(vertex_id);
        }
    }

    pub(crate) fn remove_vertex_from_id_index(&mut self, index_id: IndexId, vertex_id: VertexId) {
        if let Some(set) = self.id_indexes.get_mut(index_id as u32) {
            set.remove(vertex_id);
        }
    }

    /// The vertex ids indexed under an id index.
    pub fn id_index(&self, index_id: IndexId) -> Option<&IdSet> {
        self.id_indexes.get(index_id as u32)
    }

    /// Rebuilds every lookup structure by scanning the live slots of the
    /// primary stores.
    pub(crate) fn rebuild(
        &mut self,
        file: &mut GraphFile,
        classes: &mut ClassStore,
        labels: &mut LabelStore,
        vertices: &mut VertexStore,
        texts: &mut TextStore,
    ) -> Result<()> {
        let mut max_index_id = EDGE_INDEX_ID;

        for id in 1..classes.id_bound() {
            let (in_use, label_id, first_index) = {
                let record = classes.raw(file, id)?;
                (record.is_in_use(), record.label_id(), record.first_index_id())
            };
            if !in_use {
                continue;
            }
            let text_id = labels.get(file, label_id)?.text_id();
            let name = texts.get(file, text_id)?.value().to_owned();
            self.class_index.by_name.insert(name, id as ClassId);
            if first_index != 0 {
                self.records
                    .insert(first_index, IndexRecord::new(first_index, IndexType::IdSet));
                self.id_indexes.set(first_index as u32, IdSet::new());
                max_index_id = max_index_id.max(first_index);
            }
        }

        for id in 1..labels.id_bound() {
            let (in_use, text_id) = {
                let record = labels.raw(file, id)?;
                (record.is_in_use(), record.text_id())
            };
            if !in_use {
                continue;
            }
            let name = texts.get(file, text_id)?.value().to_owned();
            self.label_index.by_text.insert(name, id);
        }

        for id in 1..vertices.id_bound() {
            let (in_use, class_id) = {
                let record = vertices.raw(file, id)?;
                (record.is_in_use(), record.class_id())
            };
            if !in_use {
                continue;
            }
            let first_index = classes.get(file, class_id)?.first_index_id();
            if first_index != 0 {
                self.add_vertex_to_id_index(first_index, id);
            }
        }

        self.next_index_id = max_index_id + 1;
        self.free_index_ids = (EDGE_INDEX_ID + 1..=max_index_id)
            .filter(|id| !self.records.contains_key(id))
            .collect();
        debug!(
            "rebuilt indexes: {} classes, {} labels, {} id indexes",
            self.class_index.by_name.len(),
            self.label_index.by_text.len(),
            self.id_indexes.len()
        );
        Ok(())
    }
}
