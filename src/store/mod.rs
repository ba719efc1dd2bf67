/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The slot stores, one per record type.
//!
//! Each store owns a contiguous region of the graph file: a small header of
//! counters followed by fixed-size slots indexed by 1-based id. The shared
//! machinery (allocation, free-lists, caching, write-back) lives in
//! [`slots`]; each store specializes it with its record type and the
//! cross-store consistency rules of its entity.

pub(crate) mod slots;

pub mod class;
pub use class::{ClassStore, ROOT_CLASS_ID, ROOT_CLASS_NAME};

pub mod label;
pub use label::LabelStore;

pub mod vertex;
pub use vertex::VertexStore;

pub mod edge;
pub use edge::EdgeStore;

pub mod property;
pub use property::PropertyStore;

pub mod text;
pub use text::TextStore;

pub mod index;
pub use index::{ClassIndex, IndexStore, LabelIndex};
