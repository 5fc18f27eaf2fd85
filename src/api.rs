//! Flat operations over searches and entries.
//!
//! Each function mirrors one call of the classic handle-based interface
//! (open, advance, query, copy, release, process, error text) over owned
//! Rust values. A closed [`Search`] cannot be used again, and an exhausted
//! one answers every navigation call with [`ReclsError::NoMoreData`].

use std::path::Path;

use crate::entry::{entry_stats, Entry};
use crate::error::{ErrorKind, ReclsError};
use crate::flags::SearchFlags;
use crate::properties::copy_into;
use crate::results::{ProcessState, ProcessSummary};
use crate::session::Search;

// ── Pull model ────────────────────────────────────────────────────────────

/// Open a search of the local file system. See [`Search::open`].
pub fn search(root_dir: impl AsRef<Path>, pattern: &str, flags: SearchFlags) -> Result<Search, ReclsError> {
    crate::search()
        .root(root_dir.as_ref())
        .pattern(pattern)
        .flags(flags)
        .open()
}

/// Close a search, releasing its traversal state.
pub fn search_close(search: Search) {
    search.close();
}

pub fn get_next(search: &mut Search) -> Result<(), ReclsError> {
    search.get_next()
}

pub fn get_details(search: &mut Search) -> Result<Entry, ReclsError> {
    search.get_details()
}

pub fn get_next_details(search: &mut Search) -> Result<Entry, ReclsError> {
    search.get_next_details()
}

pub fn get_last_error(search: &Search) -> ErrorKind {
    search.last_error()
}

// ── Entry lifetime ────────────────────────────────────────────────────────

/// A new reference to `entry`'s block. `None` in, `None` out.
pub fn copy_details(entry: Option<&Entry>) -> Option<Entry> {
    entry.map(Entry::copy)
}

/// Release one reference. `None` is accepted and ignored.
pub fn close_details(entry: Option<Entry>) {
    if let Some(entry) = entry {
        entry.release();
    }
}

/// Number of entry blocks alive in this process.
pub fn outstanding_details() -> usize {
    entry_stats().blocks
}

// ── Push model ────────────────────────────────────────────────────────────

/// Search the local file system, calling `callback` on each match.
/// See [`SearchBuilder::process`](crate::SearchBuilder::process).
pub fn search_process<F, S>(
    root_dir: impl AsRef<Path>,
    pattern:  &str,
    flags:    SearchFlags,
    callback: F,
) -> Result<ProcessSummary, ReclsError>
where
    F: FnMut(&Entry) -> S,
    S: Into<ProcessState>,
{
    crate::search()
        .root(root_dir.as_ref())
        .pattern(pattern)
        .flags(flags)
        .process(callback)
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Copy the text for `kind` into `buffer`; with `None`, return its length.
pub fn get_error_string(kind: ErrorKind, buffer: Option<&mut [u8]>) -> usize {
    copy_into(kind.as_str().as_bytes(), buffer)
}

/// Text for the last error of `search`, same convention as [`get_error_string`].
pub fn get_last_error_string(search: &Search, buffer: Option<&mut [u8]>) -> usize {
    get_error_string(search.last_error(), buffer)
}
