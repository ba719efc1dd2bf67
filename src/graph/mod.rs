/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The graph: one backing file, an 84-byte header, and seven stores.

use std::path::Path;

use log::info;

use crate::collections::DynamicList;
use crate::error::Result;
use crate::record::{
    ClassId, ClassRecord, EdgeId, EdgeRecord, LabelId, LabelRecord, PropertyId, PropertyRecord,
    PropertyValue, TextId, TextRecord, VertexId, VertexRecord,
};
use crate::store::{
    ClassStore, EdgeStore, IndexStore, LabelStore, PropertyStore, TextStore, VertexStore,
    ROOT_CLASS_ID, ROOT_CLASS_NAME,
};

pub mod file;
use file::GraphFile;

pub mod header;
pub use header::{Header, FABRIC_HEADER_SIZE, FABRIC_SIGNATURE, FABRIC_VERSION};

/// Initial size of each store region when a graph file is created.
pub const MIN_PAGE_SIZE: u32 = 65536;

/// Default size of one text block.
pub const TEXT_BLOCK_SIZE: u32 = 32;

/// Default size of one index page.
pub const INDEX_PAGE_SIZE: u32 = 65536;

/// A persistent property graph backed by a single binary file.
///
/// A graph owns its backing file and its seven stores. All mutations are
/// in-memory until [`flush`](Graph::flush) writes the dirty records back;
/// there is no journal, so a flush overwrites slots in place. A graph is
/// exclusively owned by one caller: share it across threads only behind
/// external mutual exclusion.
#[derive(Debug)]
pub struct Graph {
    file: GraphFile,
    header: Header,
    classes: ClassStore,
    labels: LabelStore,
    vertices: VertexStore,
    edges: EdgeStore,
    properties: PropertyStore,
    texts: TextStore,
    indexes: IndexStore,
}

impl Graph {
    /// Creates a new graph file at `path`, truncating any existing file.
    ///
    /// The header is written with the change counter at 1, the regions are
    /// materialized (so never-written slots read as zero), and the reserved
    /// root class "Vertex" is seeded as class id 1.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = GraphFile::create(path.as_ref())?;
        let header = Header::new_layout();
        file.set_len(header.index_store_offset as u64)?;
        header.write(&mut file)?;

        let mut graph = Self::assemble(file, header, true)?;
        graph.seed_root_class()?;
        // The initial write-out is part of creation, not a change.
        graph.write_store_headers()?;
        graph.flush_stores()?;
        graph.file.sync()?;
        info!("created graph file {}", path.as_ref().display());
        Ok(graph)
    }

    /// Opens an existing graph file at `path`.
    ///
    /// The signature is checked, each store is initialized from its
    /// persisted counters, and the lookup indexes are rebuilt from the live
    /// slots.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = GraphFile::open(path.as_ref())?;
        let header = Header::read(&mut file)?;
        let mut graph = Self::assemble(file, header, false)?;
        graph.indexes.rebuild(
            &mut graph.file,
            &mut graph.classes,
            &mut graph.labels,
            &mut graph.vertices,
            &mut graph.texts,
        )?;
        info!(
            "opened graph file {} ({} classes, {} vertices, {} edges)",
            path.as_ref().display(),
            graph.classes.count(),
            graph.vertices.count(),
            graph.edges.count(),
        );
        Ok(graph)
    }

    /// Builds the stores over the regions described by the header. Each
    /// store's size is the gap to the next region's offset; the index region
    /// is sized by its page geometry.
    fn assemble(mut file: GraphFile, header: Header, fresh: bool) -> Result<Self> {
        let h = &header;
        let class_size = (h.label_store_offset - h.class_store_offset) as u64;
        let label_size = (h.vertex_store_offset - h.label_store_offset) as u64;
        let vertex_size = (h.edge_store_offset - h.vertex_store_offset) as u64;
        let edge_size = (h.property_store_offset - h.edge_store_offset) as u64;
        let property_size = (h.text_store_offset - h.property_store_offset) as u64;
        let text_size = (h.index_store_offset - h.text_store_offset) as u64;
        let index_size = h.index_page_size as u64 * h.index_page_count as u64;

        let (classes, labels, vertices, edges, properties, texts) = if fresh {
            (
                ClassStore::new(h.class_store_offset as u64, class_size),
                LabelStore::new(h.label_store_offset as u64, label_size),
                VertexStore::new(h.vertex_store_offset as u64, vertex_size),
                EdgeStore::new(h.edge_store_offset as u64, edge_size),
                PropertyStore::new(h.property_store_offset as u64, property_size),
                TextStore::new(h.text_store_offset as u64, text_size, h.text_block_size),
            )
        } else {
            (
                ClassStore::load(&mut file, h.class_store_offset as u64, class_size)?,
                LabelStore::load(&mut file, h.label_store_offset as u64, label_size)?,
                VertexStore::load(&mut file, h.vertex_store_offset as u64, vertex_size)?,
                EdgeStore::load(&mut file, h.edge_store_offset as u64, edge_size)?,
                PropertyStore::load(&mut file, h.property_store_offset as u64, property_size)?,
                TextStore::load(
                    &mut file,
                    h.text_store_offset as u64,
                    text_size,
                    h.text_block_size,
                )?,
            )
        };
        let indexes = IndexStore::new(
            h.index_store_offset as u64,
            index_size,
            h.index_page_size,
            h.index_page_count,
        );
        Ok(Self {
            file,
            header,
            classes,
            labels,
            vertices,
            edges,
            properties,
            texts,
            indexes,
        })
    }

    fn seed_root_class(&mut self) -> Result<()> {
        let label_id = self.labels.add(
            &mut self.file,
            &mut self.texts,
            &mut self.indexes,
            ROOT_CLASS_NAME,
        )?;
        let index_id = self.indexes.create_id_index(ROOT_CLASS_ID);
        let class_id = self.classes.seed_root(&mut self.file, label_id, index_id)?;
        self.indexes.add_class_to_index(ROOT_CLASS_NAME, class_id);
        Ok(())
    }

    fn write_store_headers(&mut self) -> Result<()> {
        self.classes.write_counters(&mut self.file)?;
        self.labels.write_counters(&mut self.file)?;
        self.vertices.write_counters(&mut self.file)?;
        self.edges.write_counters(&mut self.file)?;
        self.properties.write_counters(&mut self.file)?;
        self.texts.write_header(&mut self.file)
    }

    fn flush_stores(&mut self) -> Result<bool> {
        let mut wrote = false;
        wrote |= self.classes.flush(&mut self.file)?;
        wrote |= self.labels.flush(&mut self.file)?;
        wrote |= self.vertices.flush(&mut self.file)?;
        wrote |= self.edges.flush(&mut self.file)?;
        wrote |= self.properties.flush(&mut self.file)?;
        wrote |= self.texts.flush(&mut self.file)?;
        Ok(wrote)
    }

    /// Writes every dirty record back to the file.
    ///
    /// The change counter is bumped and the header rewritten only when
    /// something was actually written, so flushing an unchanged graph leaves
    /// the file bytes identical.
    pub fn flush(&mut self) -> Result<()> {
        if self.flush_stores()? {
            self.header.change_counter += 1;
            self.header.write(&mut self.file)?;
            self.file.sync()?;
        }
        Ok(())
    }

    /// The graph file's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The header's change counter: monotonic across flushes, usable by
    /// clients to invalidate external caches.
    pub fn change_counter(&self) -> u32 {
        self.header.change_counter
    }

    /// Sets the application-defined 16-byte signature and version, and
    /// rewrites the header.
    pub fn set_application(&mut self, signature: [u8; 16], version: u32) -> Result<()> {
        self.header.app_signature = signature;
        self.header.app_version = version;
        self.header.write(&mut self.file)
    }

    // Classes

    /// Creates a class named `name` extending `parent_id`.
    pub fn create_class(
        &mut self,
        parent_id: ClassId,
        name: &str,
        is_abstract: bool,
    ) -> Result<ClassId> {
        self.classes.create(
            &mut self.file,
            &mut self.labels,
            &mut self.texts,
            &mut self.indexes,
            parent_id,
            name,
            is_abstract,
        )
    }

    /// Returns the class with the given id.
    pub fn class(&mut self, id: ClassId) -> Result<&ClassRecord> {
        self.classes.get(&mut self.file, id)
    }

    /// Returns the class with the given name.
    pub fn class_by_name(&mut self, name: &str) -> Result<&ClassRecord> {
        self.classes.get_by_name(&mut self.file, &self.indexes, name)
    }

    /// Deletes a class. Fails while the class has child classes or members.
    pub fn delete_class(&mut self, id: ClassId) -> Result<()> {
        self.classes.delete(
            &mut self.file,
            &mut self.labels,
            &mut self.texts,
            &mut self.indexes,
            id,
        )
    }

    /// The direct child classes of a class.
    pub fn child_classes(&mut self, id: ClassId) -> Result<DynamicList<ClassId>> {
        self.classes.descendants(&mut self.file, id, 1)
    }

    /// All descendant classes of a class, in pre-order.
    pub fn descendant_classes(&mut self, id: ClassId) -> Result<DynamicList<ClassId>> {
        self.classes.descendants(&mut self.file, id, 0)
    }

    /// The number of vertices of a class and all of its descendants.
    pub fn total_member_count(&mut self, id: ClassId) -> Result<u32> {
        self.classes.total_member_count(&mut self.file, id)
    }

    /// Returns the class's current autoincrement value and bumps it.
    pub fn increment_class(&mut self, id: ClassId) -> Result<u32> {
        self.classes.increment(&mut self.file, id)
    }

    /// The class's name, resolved through its label.
    pub fn class_name(&mut self, id: ClassId) -> Result<String> {
        let label_id = self.classes.get(&mut self.file, id)?.label_id();
        let text_id = self.labels.get(&mut self.file, label_id)?.text_id();
        Ok(self.texts.get(&mut self.file, text_id)?.value().to_owned())
    }

    /// The number of live classes.
    pub fn class_count(&self) -> u32 {
        self.classes.count()
    }

    // Labels

    /// Interns `name` and takes a reference to it.
    pub fn add_label(&mut self, name: &str) -> Result<LabelId> {
        self.labels
            .add(&mut self.file, &mut self.texts, &mut self.indexes, name)
    }

    /// Returns the label with the given id.
    pub fn label(&mut self, id: LabelId) -> Result<&LabelRecord> {
        self.labels.get(&mut self.file, id)
    }

    /// Returns the label with the given text.
    pub fn label_by_name(&mut self, name: &str) -> Result<&LabelRecord> {
        self.labels.get_by_name(&mut self.file, &self.indexes, name)
    }

    /// Drops one reference to a label, freeing it when no references remain.
    pub fn remove_label(&mut self, id: LabelId) -> Result<()> {
        self.labels
            .remove(&mut self.file, &mut self.texts, &mut self.indexes, id)
    }

    /// The number of live labels.
    pub fn label_count(&self) -> u32 {
        self.labels.count()
    }

    // Vertices

    /// Creates a vertex of the given class.
    pub fn create_vertex(&mut self, class_id: ClassId) -> Result<VertexId> {
        self.vertices.create(
            &mut self.file,
            &mut self.classes,
            &mut self.indexes,
            class_id,
        )
    }

    /// Returns the vertex with the given id.
    pub fn vertex(&mut self, id: VertexId) -> Result<&VertexRecord> {
        self.vertices.get(&mut self.file, id)
    }

    /// Deletes a vertex. Fails while the vertex has edges or properties.
    pub fn delete_vertex(&mut self, id: VertexId) -> Result<()> {
        self.vertices
            .delete(&mut self.file, &mut self.classes, &mut self.indexes, id)
    }

    /// The number of live vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertices.count()
    }

    // Edges

    /// Creates an edge labeled `name` from `from_id` to `to_id`.
    pub fn create_edge(
        &mut self,
        name: &str,
        from_id: VertexId,
        to_id: VertexId,
    ) -> Result<EdgeId> {
        self.edges.create(
            &mut self.file,
            &mut self.vertices,
            &mut self.labels,
            &mut self.texts,
            &mut self.indexes,
            name,
            from_id,
            to_id,
        )
    }

    /// Returns the edge with the given id.
    pub fn edge(&mut self, id: EdgeId) -> Result<&EdgeRecord> {
        self.edges.get(&mut self.file, id)
    }

    /// Deletes an edge.
    pub fn delete_edge(&mut self, id: EdgeId) -> Result<()> {
        self.edges.delete(
            &mut self.file,
            &mut self.vertices,
            &mut self.labels,
            &mut self.texts,
            &mut self.indexes,
            id,
        )
    }

    /// The number of live edges.
    pub fn edge_count(&self) -> u32 {
        self.edges.count()
    }

    // Properties

    /// Creates a property `key = value` and returns its id.
    pub fn create_property(&mut self, key: &str, value: &PropertyValue) -> Result<PropertyId> {
        self.properties.create(
            &mut self.file,
            &mut self.labels,
            &mut self.texts,
            &mut self.indexes,
            key,
            value,
        )
    }

    /// Returns the property record with the given id.
    pub fn property(&mut self, id: PropertyId) -> Result<&PropertyRecord> {
        self.properties.get(&mut self.file, id)
    }

    /// A property's value, with spilled text read back from the text store.
    pub fn property_value(&mut self, id: PropertyId) -> Result<PropertyValue> {
        self.properties.value(&mut self.file, &mut self.texts, id)
    }

    /// Deletes a property.
    pub fn delete_property(&mut self, id: PropertyId) -> Result<()> {
        self.properties.delete(
            &mut self.file,
            &mut self.labels,
            &mut self.texts,
            &mut self.indexes,
            id,
        )
    }

    /// The number of live properties.
    pub fn property_count(&self) -> u32 {
        self.properties.count()
    }

    // Texts

    /// Returns the text record with the given id.
    pub fn text(&mut self, id: TextId) -> Result<&TextRecord> {
        self.texts.get(&mut self.file, id)
    }

    /// The index store's registries.
    pub fn indexes(&self) -> &IndexStore {
        &self.indexes
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        // Buffered changes must not vanish silently when the graph goes away.
        if let Err(e) = self.flush() {
            log::warn!("flush on drop failed: {e}");
        }
    }
}
