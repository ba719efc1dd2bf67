/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::debug;

use crate::error::{Result, StoreError, StoreKind};
use crate::graph::file::GraphFile;
use crate::record::vertex::VERTEX_RECORD_SIZE;
use crate::record::{ClassId, EdgeId, VertexId, VertexRecord};
use crate::store::slots::{IdWidth, SlotRecord, SlotStore};
use crate::store::{ClassStore, IndexStore};

impl SlotRecord for VertexRecord {
    const KIND: StoreKind = StoreKind::Vertex;
    const SLOT_SIZE: usize = VERTEX_RECORD_SIZE;
    const ID_WIDTH: IdWidth = IdWidth::U32;
    // The first-out-edge field aliases the free-list link (the class id field
    // is too narrow to hold a vertex id).
    const LINK_OFFSET: u64 = 2;

    fn decode(id: u32, bytes: &[u8]) -> Result<Self> {
        VertexRecord::decode(id, bytes)
    }

    fn encode(&self, bytes: &mut [u8]) {
        VertexRecord::encode(self, bytes);
    }

    fn in_use(&self) -> bool {
        self.is_in_use()
    }

    fn free_link(&self) -> u32 {
        self.first_out_id
    }

    fn retire(&mut self, next_free: u32) {
        self.class_id = 0;
        self.first_out_id = next_free;
    }

    fn retired(id: u32, next_free: u32) -> Self {
        Self {
            id,
            class_id: 0,
            first_out_id: next_free,
            first_in_id: 0,
            first_property_id: 0,
        }
    }
}

/// Manages the storage of vertices.
///
/// A vertex always belongs to a live, non-abstract class; creating one bumps
/// the class's member count and registers the vertex in the class's id
/// index, deleting one reverses both.
#[derive(Debug)]
pub struct VertexStore {
    slots: SlotStore<VertexRecord>,
}

impl VertexStore {
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

    /// The number of live vertices.
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

    /// Returns the vertex with the given id.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: VertexId) -> Result<&VertexRecord> {
        self.slots.get(file, id).map(|record| &*record)
    }

    /// Returns the slot with the given id even if it is not in use.
    pub(crate) fn raw(&mut self, file: &mut GraphFile, id: u32) -> Result<&VertexRecord> {
        self.slots.raw(file, id)
    }

    /// Creates a vertex of the given class.
    pub(crate) fn create(
        &mut self,
        file: &mut GraphFile,
        classes: &mut ClassStore,
        indexes: &mut IndexStore,
        class_id: ClassId,
    ) -> Result<VertexId> {
        let (is_abstract, first_index) = {
            let class = classes.get(file, class_id)?;
            (class.is_abstract(), class.first_index_id())
        };
        // An abstract class cannot have members.
        if is_abstract {
            return Err(StoreError::Store(StoreKind::Vertex));
        }
        let id = self.slots.allocate(file)?;
        self.slots.insert(id, VertexRecord::new(id, class_id));
        classes.add_member(file, class_id)?;
        if first_index != 0 {
            indexes.add_vertex_to_id_index(first_index, id);
        }
        self.slots.count += 1;
        debug!("created vertex {id} of class {class_id}");
        Ok(id)
    }

    /// Deletes a vertex. Rejected while the vertex still has edges or
    /// properties attached.
    pub(crate) fn delete(
        &mut self,
        file: &mut GraphFile,
        classes: &mut ClassStore,
        indexes: &mut IndexStore,
        id: VertexId,
    ) -> Result<()> {
        let class_id = {
            let record = self.slots.get(file, id)?;
            if record.has_out_edges() || record.has_in_edges() || record.has_properties() {
                return Err(StoreError::Store(StoreKind::Vertex));
            }
            record.class_id()
        };
        let first_index = classes.get(file, class_id)?.first_index_id();
        classes.remove_member(file, class_id)?;
        if first_index != 0 {
            indexes.remove_vertex_from_id_index(first_index, id);
        }
        self.slots.release(id);
        self.slots.count -= 1;
        debug!("deleted vertex {id} of class {class_id}");
        Ok(())
    }

    /// Points a vertex's outgoing-edge list head at `edge_id`.
    pub(crate) fn set_first_out_edge(
        &mut self,
        file: &mut GraphFile,
        id: VertexId,
        edge_id: EdgeId,
    ) -> Result<()> {
        {
            let record = self.slots.get(file, id)?;
            record.set_first_out_edge_id(edge_id);
        }
        self.slots.mark_dirty(id);
        Ok(())
    }

    /// Points a vertex's incoming-edge list head at `edge_id`.
    pub(crate) fn set_first_in_edge(
        &mut self,
        file: &mut GraphFile,
        id: VertexId,
        edge_id: EdgeId,
    ) -> Result<()> {
        {
            let record = self.slots.get(file, id)?;
            record.set_first_in_edge_id(edge_id);
        }
        self.slots.mark_dirty(id);
        Ok(())
    }
}
