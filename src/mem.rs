/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Tracked allocation accounting.
//!
//! The in-memory collections report their heap growth and shrinkage here, so
//! embedders can observe how much memory the library is holding between
//! flushes. The counter is advisory: it tracks the backing buffers of the
//! collections, not every last allocation.

use std::sync::atomic::{AtomicUsize, Ordering};

static BYTES_IN_USE: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn record_alloc(bytes: usize) {
    BYTES_IN_USE.fetch_add(bytes, Ordering::Relaxed);
}

pub(crate) fn record_free(bytes: usize) {
    // Saturating: a mismatched free must not wrap the counter around.
    let _ = BYTES_IN_USE.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(bytes))
    });
}

/// The number of bytes currently held by the library's tracked collections.
pub fn bytes_in_use() -> usize {
    BYTES_IN_USE.load(Ordering::Relaxed)
}
