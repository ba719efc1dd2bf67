/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The error taxonomy shared by all stores.
//!
//! Errors are deliberately flat: callers routinely match on
//! [`StoreError::DoesNotExist`] to choose between create and update flows, and
//! on [`StoreError::NeedsResize`] to grow a region and retry a flush, so every
//! semantic outcome gets its own variant rather than being folded into a
//! generic error with context strings.

use thiserror::Error;

/// Identifies which store an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Class,
    Label,
    Vertex,
    Edge,
    Property,
    Text,
    Index,
}

impl core::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            StoreKind::Class => "class",
            StoreKind::Label => "label",
            StoreKind::Vertex => "vertex",
            StoreKind::Edge => "edge",
            StoreKind::Property => "property",
            StoreKind::Text => "text",
            StoreKind::Index => "index",
        })
    }
}

/// Errors returned by graph and store operations.
///
/// A failed call leaves the affected store's in-memory state as it was before
/// the call, except where noted on the individual operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file does not start with the fabricdb signature.
    #[error("not a fabricdb file")]
    BadSignature,
    /// The id is zero or falls outside the store's region.
    #[error("invalid {0} id {1}")]
    InvalidId(StoreKind, u32),
    /// The slot exists but is not in use. Lookups by name report id 0.
    #[error("{0} {1} does not exist")]
    DoesNotExist(StoreKind, u32),
    #[error("duplicate class name `{0}`")]
    DuplicateClassName(String),
    #[error("cannot delete class {0}: it has child classes")]
    HasChildren(u16),
    #[error("cannot delete class {0}: it has members")]
    HasMembers(u16),
    /// The region is too small to hold every live slot. Retryable after the
    /// caller grows the region.
    #[error("{0} store needs resize")]
    NeedsResize(StoreKind),
    /// Catch-all for the peripheral stores (corrupt payloads, forbidden
    /// operations).
    #[error("{0} store error")]
    Store(StoreKind),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
