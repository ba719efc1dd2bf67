/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::codec;
use crate::error::{Result, StoreError, StoreKind};
use crate::record::{EdgeId, LabelId, PropertyId, VertexId};

/// The on-disk size of an edge record.
pub const EDGE_RECORD_SIZE: usize = 24;

/// A directed, labeled connection between two vertices.
///
/// An edge is an entity in its own right: it carries a label naming the
/// relationship and may have properties. `next_out_id` threads the
/// from-vertex's list of outgoing edges, `next_in_id` the to-vertex's list of
/// incoming edges.
///
/// On disk an edge occupies 24 bytes:
///
/// ```text
/// +----+----+----+----+----+----+----+----+----+----+----+----+
/// | label_id          | from_id           | to_id             |
/// +----+----+----+----+----+----+----+----+----+----+----+----+
/// | next_out_id       | next_in_id        | first_property_id |
/// +----+----+----+----+----+----+----+----+----+----+----+----+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub(crate) id: EdgeId,
    pub(crate) label_id: LabelId,
    pub(crate) from_id: VertexId,
    pub(crate) to_id: VertexId,
    pub(crate) next_out_id: EdgeId,
    pub(crate) next_in_id: EdgeId,
    pub(crate) first_property_id: PropertyId,
}

impl EdgeRecord {
    pub(crate) fn new(
        id: EdgeId,
        label_id: LabelId,
        from_id: VertexId,
        to_id: VertexId,
        next_out_id: EdgeId,
        next_in_id: EdgeId,
    ) -> Self {
        Self {
            id,
            label_id,
            from_id,
            to_id,
            next_out_id,
            next_in_id,
            first_property_id: 0,
        }
    }

    pub fn decode(id: EdgeId, data: &[u8]) -> Result<Self> {
        if id < 1 {
            return Err(StoreError::InvalidId(StoreKind::Edge, id));
        }
        Ok(Self {
            id,
            label_id: codec::read_u32(data, 0),
            from_id: codec::read_u32(data, 4),
            to_id: codec::read_u32(data, 8),
            next_out_id: codec::read_u32(data, 12),
            next_in_id: codec::read_u32(data, 16),
            first_property_id: codec::read_u32(data, 20),
        })
    }

    pub fn encode(&self, data: &mut [u8]) {
        codec::write_u32(data, 0, self.label_id);
        codec::write_u32(data, 4, self.from_id);
        codec::write_u32(data, 8, self.to_id);
        codec::write_u32(data, 12, self.next_out_id);
        codec::write_u32(data, 16, self.next_in_id);
        codec::write_u32(data, 20, self.first_property_id);
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn label_id(&self) -> LabelId {
        self.label_id
    }

    /// An edge is marked as not in use by zeroing its label id.
    pub fn is_in_use(&self) -> bool {
        self.label_id != 0
    }

    pub fn from_vertex_id(&self) -> VertexId {
        self.from_id
    }

    pub fn to_vertex_id(&self) -> VertexId {
        self.to_id
    }

    pub fn next_out_edge_id(&self) -> EdgeId {
        self.next_out_id
    }

    pub fn has_next_out_edge(&self) -> bool {
        self.next_out_id != 0
    }

    pub fn next_in_edge_id(&self) -> EdgeId {
        self.next_in_id
    }

    pub fn has_next_in_edge(&self) -> bool {
        self.next_in_id != 0
    }

    pub fn first_property_id(&self) -> PropertyId {
        self.first_property_id
    }

    pub fn has_properties(&self) -> bool {
        self.first_property_id != 0
    }

    pub(crate) fn set_next_out_edge_id(&mut self, id: EdgeId) {
        self.next_out_id = id;
    }

    pub(crate) fn set_next_in_edge_id(&mut self, id: EdgeId) {
        self.next_in_id = id;
    }
}
