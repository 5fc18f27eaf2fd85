use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::entry::Entry;
use crate::error::ReclsError;
use crate::flags::SearchFlags;
use crate::fs::LocalFileSystem;
use crate::results::{ProcessState, ProcessSummary};
use crate::session::Search;
use crate::traits::FileSystem;

// ---------------------------------------------------------------------------
// SearchBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and running a search.
///
/// Created via [`recls::search()`](crate::search). Configure with chained
/// builder methods, then [`open()`](SearchBuilder::open) a pull-model
/// [`Search`] or [`process()`](SearchBuilder::process) every match through a
/// callback.
///
/// # Example
///
/// ```rust,no_run
/// use recls::SearchFlags;
///
/// let search = recls::search()
///     .root("src")
///     .pattern("*.rs|*.toml")
///     .flags(SearchFlags::FILES)
///     .recursive(true)
///     .open()?;
///
/// for entry in search {
///     println!("{} ({} bytes)", entry.path().display(), entry.size());
/// }
/// # Ok::<(), recls::ReclsError>(())
/// ```
pub struct SearchBuilder {
    root:    PathBuf,
    pattern: String,
    flags:   SearchFlags,
    fs:      Option<Arc<dyn FileSystem>>,
}

impl Default for SearchBuilder {
    fn default() -> Self {
        Self {
            root:    PathBuf::new(),
            pattern: "*".to_owned(),
            flags:   SearchFlags::FILES,
            fs:      None,
        }
    }
}

impl SearchBuilder {
    // ── Target ────────────────────────────────────────────────────────────

    /// Directory to search. Empty (the default) means the current directory.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Glob pattern matched against entry names. Separate alternatives with
    /// `|`. Defaults to `*`.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Replace the search flags. Defaults to [`SearchFlags::FILES`].
    pub fn flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Descend into subdirectories.
    pub fn recursive(mut self, yes: bool) -> Self {
        self.flags.set(SearchFlags::RECURSIVE, yes);
        self
    }

    /// Record each entry's directory segments.
    pub fn directory_parts(mut self, yes: bool) -> Self {
        self.flags.set(SearchFlags::DIRECTORY_PARTS, yes);
        self
    }

    /// Search through `fs` instead of the local file system.
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Some(Arc::new(fs));
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Open the search, positioned on the first match.
    ///
    /// # Errors
    ///
    /// See [`Search::open`]. In particular a search that matches nothing
    /// fails with [`ReclsError::NoMoreData`] and is never created.
    pub fn open(self) -> Result<Search, ReclsError> {
        let fs = self.fs.unwrap_or_else(|| Arc::new(LocalFileSystem::new()));
        Search::open(fs, &self.root, &self.pattern, self.flags)
    }

    /// Run the search, handing each match to `callback` until it cancels or
    /// the matches run out.
    ///
    /// Each entry is released as soon as the callback returns; copy it to
    /// keep it. The search is always closed before returning. Running out of
    /// matches, including having none at all, is success.
    ///
    /// # Errors
    ///
    /// Any failure other than end-of-data from opening or advancing.
    pub fn process<F, S>(self, mut callback: F) -> Result<ProcessSummary, ReclsError>
    where
        F: FnMut(&Entry) -> S,
        S: Into<ProcessState>,
    {
        let start = Instant::now();

        let mut search = match self.open() {
            Ok(s) => s,
            Err(ReclsError::NoMoreData) => return Ok(ProcessSummary::empty(start.elapsed())),
            Err(e) => return Err(e),
        };

        let mut processed = 0usize;
        let mut cancelled = false;

        loop {
            let entry = search.get_details()?;
            let state = callback(&entry).into();
            entry.release();
            processed += 1;

            if state == ProcessState::Cancel {
                log::debug!("search cancelled after {processed} entries");
                cancelled = true;
                break;
            }

            match search.get_next() {
                Ok(()) => {}
                Err(ReclsError::NoMoreData) => break,
                Err(e) => return Err(e),
            }
        }

        search.close();

        Ok(ProcessSummary {
            processed,
            cancelled,
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.txt"), "1").unwrap();
        fs::write(dir.path().join("two.txt"), "2").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("three.txt"), "3").unwrap();
        dir
    }

    #[test]
    fn defaults_search_files_non_recursively() {
        let dir = setup();
        let names: Vec<String> = crate::search()
            .root(dir.path())
            .open()
            .unwrap()
            .map(|e| e.file().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["one.txt", "two.txt"]);
    }

    #[test]
    fn recursive_toggle_sets_flag() {
        let b = crate::search().recursive(true).directory_parts(true);
        assert!(b.flags.contains(SearchFlags::RECURSIVE | SearchFlags::DIRECTORY_PARTS));
        let b = b.recursive(false);
        assert!(!b.flags.is_recursive());
    }

    #[test]
    fn process_visits_everything() {
        let dir = setup();
        let mut seen = Vec::new();
        let summary = crate::search()
            .root(dir.path())
            .pattern("*.txt")
            .recursive(true)
            .process(|e| {
                seen.push(e.file().to_string_lossy().into_owned());
                ProcessState::Continue
            })
            .unwrap();
        assert_eq!(seen, vec!["one.txt", "two.txt", "three.txt"]);
        assert_eq!(summary.processed, 3);
        assert!(!summary.cancelled);
    }

    #[test]
    fn process_stops_on_cancel() {
        let dir = setup();
        let summary = crate::search()
            .root(dir.path())
            .pattern("*.txt")
            .recursive(true)
            .process(|_| false)
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert!(summary.cancelled);
    }

    #[test]
    fn process_with_no_matches_is_success() {
        let dir = setup();
        let summary = crate::search()
            .root(dir.path())
            .pattern("*.md")
            .process(|_| true)
            .unwrap();
        assert_eq!(summary.processed, 0);
        assert!(!summary.cancelled);
    }

    #[test]
    fn process_reports_setup_errors() {
        let dir = setup();
        let err = crate::search()
            .root(dir.path().join("missing"))
            .process(|_| true)
            .unwrap_err();
        assert!(matches!(err, ReclsError::InvalidDirectory(_)));
    }
}
