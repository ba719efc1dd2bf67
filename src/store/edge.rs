/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::debug;

use crate::error::{Result, StoreError, StoreKind};
use crate::graph::file::GraphFile;
use crate::record::edge::EDGE_RECORD_SIZE;
use crate::record::{EdgeId, EdgeRecord, VertexId};
use crate::store::slots::{IdWidth, SlotRecord, SlotStore};
use crate::store::{IndexStore, LabelStore, TextStore, VertexStore};

impl SlotRecord for EdgeRecord {
    const KIND: StoreKind = StoreKind::Edge;
    const SLOT_SIZE: usize = EDGE_RECORD_SIZE;
    const ID_WIDTH: IdWidth = IdWidth::U32;
    // The from-vertex field aliases the free-list link.
    const LINK_OFFSET: u64 = 4;

    fn decode(id: u32, bytes: &[u8]) -> Result<Self> {
        EdgeRecord::decode(id, bytes)
    }

    fn encode(&self, bytes: &mut [u8]) {
        EdgeRecord::encode(self, bytes);
    }

    fn in_use(&self) -> bool {
        self.is_in_use()
    }

    fn free_link(&self) -> u32 {
        self.from_id
    }

    fn retire(&mut self, next_free: u32) {
        self.label_id = 0;
        self.from_id = next_free;
    }

    fn retired(id: u32, next_free: u32) -> Self {
        Self {
            id,
            label_id: 0,
            from_id: next_free,
            to_id: 0,
            next_out_id: 0,
            next_in_id: 0,
            first_property_id: 0,
        }
    }
}

/// Manages the storage of edges.
///
/// An edge's label is an interned, refcounted string; creating an edge takes
/// a reference, deleting it drops one. New edges are threaded at the head of
/// the from-vertex's outgoing list and the to-vertex's incoming list.
#[derive(Debug)]
pub struct EdgeStore {
    slots: SlotStore<EdgeRecord>,
}

impl EdgeStore {
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

    /// The number of live edges.
    pub fn count(&self) -> u32 {
        self.slots.count
    }

    pub(crate) fn flush(&mut self, file: &mut GraphFile) -> Result<bool> {
        self.slots.flush(file)
    }

    pub(crate) fn write_counters(&mut self, file: &mut GraphFile) -> Result<()> {
        self.slots.write_counters(file)
    }

    /// Returns the edge with the given id.
    pub(crate) fn get(&mut self, file: &mut GraphFile, id: EdgeId) -> Result<&EdgeRecord> {
        self.slots.get(file, id).map(|record| &*record)
    }

    /// Creates an edge labeled `name` from `from_id` to `to_id`.
    pub(crate) fn create(
        &mut self,
        file: &mut GraphFile,
        vertices: &mut VertexStore,
        labels: &mut LabelStore,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        name: &str,
        from_id: VertexId,
        to_id: VertexId,
    ) -> Result<EdgeId> {
        // Both endpoints must be live.
        let from_first_out = vertices.get(file, from_id)?.first_out_edge_id();
        let to_first_in = vertices.get(file, to_id)?.first_in_edge_id();

        let label_id = labels.add(file, texts, indexes, name)?;
        let id = match self.slots.allocate(file) {
            Ok(id) => id,
            Err(e) => {
                labels.remove(file, texts, indexes, label_id)?;
                return Err(e);
            }
        };
        self.slots.insert(
            id,
            EdgeRecord::new(id, label_id, from_id, to_id, from_first_out, to_first_in),
        );
        vertices.set_first_out_edge(file, from_id, id)?;
        vertices.set_first_in_edge(file, to_id, id)?;
        self.slots.count += 1;
        debug!("created edge {id} (`{name}`) {from_id} -> {to_id}");
        Ok(id)
    }

    /// Deletes an edge, splicing it out of both endpoint lists and dropping
    /// its label reference. Rejected while the edge still has properties.
    pub(crate) fn delete(
        &mut self,
        file: &mut GraphFile,
        vertices: &mut VertexStore,
        labels: &mut LabelStore,
        texts: &mut TextStore,
        indexes: &mut IndexStore,
        id: EdgeId,
    ) -> Result<()> {
        let (label_id, from_id, to_id, next_out, next_in) = {
            let record = self.slots.get(file, id)?;
            if record.has_properties() {
                return Err(StoreError::Store(StoreKind::Edge));
            }
            (
                record.label_id(),
                record.from_vertex_id(),
                record.to_vertex_id(),
                record.next_out_edge_id(),
                record.next_in_edge_id(),
            )
        };

        // Splice out of the from-vertex's outgoing list.
        let from_first_out = vertices.get(file, from_id)?.first_out_edge_id();
        if from_first_out == id {
            vertices.set_first_out_edge(file, from_id, next_out)?;
        } else {
            let predecessor = self.find_out_predecessor(file, from_first_out, id)?;
            {
                let record = self.slots.get(file, predecessor)?;
                record.set_next_out_edge_id(next_out);
            }
            self.slots.mark_dirty(predecessor);
        }

        // Splice out of the to-vertex's incoming list.
        let to_first_in = vertices.get(file, to_id)?.first_in_edge_id();
        if to_first_in == id {
            vertices.set_first_in_edge(file, to_id, next_in)?;
        } else {
            let predecessor = self.find_in_predecessor(file, to_first_in, id)?;
            {
                let record = self.slots.get(file, predecessor)?;
                record.set_next_in_edge_id(next_in);
            }
            self.slots.mark_dirty(predecessor);
        }

        labels.remove(file, texts, indexes, label_id)?;
        self.slots.release(id);
        self.slots.count -= 1;
        debug!("deleted edge {id} {from_id} -> {to_id}");
        Ok(())
    }

    /// Walks an outgoing list from `head` to the edge whose next-out link is
    /// `id`. A chain that ends early is corrupt and surfaces as an invalid
    /// id.
    fn find_out_predecessor(
        &mut self,
        file: &mut GraphFile,
        head: EdgeId,
        id: EdgeId,
    ) -> Result<EdgeId> {
        let mut current = head;
        loop {
            let next = self.slots.get(file, current)?.next_out_edge_id();
            if next == id {
                return Ok(current);
            }
            current = next;
        }
    }

    fn find_in_predecessor(
        &mut self,
        file: &mut GraphFile,
        head: EdgeId,
        id: EdgeId,
    ) -> Result<EdgeId> {
        let mut current = head;
        loop {
            let next = self.slots.get(file, current)?.next_in_edge_id();
            if next == id {
                return Ok(current);
            }
            current = next;
        }
    }
}
