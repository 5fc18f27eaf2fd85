//! # recls
//!
//! Recursive file-system search: glob matching, lazy depth-first traversal,
//! shared entry details.
//!
//! A search is bound to one root directory, one pattern and a set of
//! [`SearchFlags`]. It reports every matching entry of the root first, then
//! walks subdirectories one at a time, depth first, holding only the
//! directories on the current path in memory. Each match is an [`Entry`]: a
//! reference-counted block carrying the path (split into directory, file
//! name, extension and optional directory parts) and its metadata.
//!
//! Two ways to consume a search:
//!
//! - **Pull**: [`SearchBuilder::open`] returns a [`Search`], which is also an
//!   [`Iterator`] over entries.
//! - **Push**: [`SearchBuilder::process`] calls a closure per entry until it
//!   returns [`ProcessState::Cancel`] (or `false`).
//!
//! # Quick Start
//!
//! ```rust
//! use std::fs;
//! use recls::SearchFlags;
//!
//! let dir = tempfile::tempdir().unwrap();
//! fs::write(dir.path().join("a.txt"), "a").unwrap();
//! fs::write(dir.path().join("b.log"), "b").unwrap();
//! fs::create_dir(dir.path().join("sub")).unwrap();
//! fs::write(dir.path().join("sub").join("c.txt"), "c").unwrap();
//!
//! let files: Vec<String> = recls::search()
//!     .root(dir.path())
//!     .pattern("*.txt")
//!     .flags(SearchFlags::FILES | SearchFlags::RECURSIVE)
//!     .open()
//!     .unwrap()
//!     .map(|entry| entry.file().to_string_lossy().into_owned())
//!     .collect();
//!
//! assert_eq!(files, vec!["a.txt", "c.txt"]);
//! ```
//!
//! # Custom File Systems
//!
//! The traversal never touches the OS directly. Implement [`FileSystem`] to
//! search an in-memory tree, an archive, or a test fixture with a fixed
//! listing order, and pass it to [`SearchBuilder::file_system`].

#![forbid(unsafe_code)]

pub mod api;
pub mod properties;

mod builder;
mod entry;
mod error;
mod flags;
mod fs;
mod node;
mod pattern;
mod results;
mod session;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::SearchBuilder;
pub use entry::{entry_stats, Entry, EntryInfo, EntryStats};
pub use error::{kind_of, ErrorKind, ReclsError};
pub use flags::SearchFlags;
pub use fs::LocalFileSystem;
pub use pattern::{Pattern, PATTERN_SEPARATOR};
pub use results::{ProcessState, ProcessSummary};
pub use session::Search;
pub use traits::{DirectoryListing, FileSystem, ListOptions, Stat};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`SearchBuilder`] to configure and run a search.
///
/// # Example
///
/// ```rust,no_run
/// let summary = recls::search()
///     .pattern("*.rs")
///     .recursive(true)
///     .process(|entry| {
///         println!("{}", entry.search_relative_path().to_string_lossy());
///         true
///     })
///     .unwrap();
///
/// println!("{} files in {:.3}s", summary.processed, summary.duration.as_secs_f64());
/// ```
pub fn search() -> SearchBuilder {
    SearchBuilder::default()
}
