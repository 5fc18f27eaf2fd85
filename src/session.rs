use std::path::Path;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::{ErrorKind, ReclsError};
use crate::flags::SearchFlags;
use crate::node::{DirectoryNode, SearchContext};
use crate::pattern::Pattern;
use crate::traits::FileSystem;

/// An open search: one root directory, one pattern, one set of flags.
///
/// A search starts positioned on its first match. Advance with
/// [`get_next`](Search::get_next), read with [`get_details`](Search::get_details),
/// or use it as an [`Iterator`]. Once enumeration ends the traversal state is
/// released, but the search itself stays valid: every further navigation call
/// returns [`ReclsError::NoMoreData`] and [`last_error`](Search::last_error)
/// remains readable.
///
/// A search is not meant for concurrent use. Move it between threads freely,
/// but drive it from one at a time.
pub struct Search {
    ctx:        SearchContext,
    root:       Option<DirectoryNode>,
    last_error: Option<ReclsError>,
    /// The iterator has yielded the entry the search was opened on.
    started:    bool,
}

impl Search {
    /// Open a search over `root_dir` for entries matching `pattern`.
    ///
    /// An empty `root_dir` means the current directory. Flags with no type
    /// bit search for files.
    ///
    /// # Errors
    ///
    /// - [`ReclsError::InvalidSearchType`] if `flags` only name unsupported types.
    /// - [`ReclsError::NoMoreData`] if `pattern` is empty or nothing matches;
    ///   no search is created.
    /// - [`ReclsError::InvalidPattern`] if `pattern` is malformed.
    /// - [`ReclsError::InvalidDirectory`] if `root_dir` cannot be resolved.
    pub fn open(
        fs:       Arc<dyn FileSystem>,
        root_dir: &Path,
        pattern:  &str,
        flags:    SearchFlags,
    ) -> Result<Self, ReclsError> {
        let flags = flags.validated()?;
        let pattern = Pattern::new(pattern)?;

        let root_dir = if root_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            root_dir
        };

        let root = fs.resolve_absolute_path(root_dir).map_err(|e| {
            log::debug!("cannot resolve {}: {e}", root_dir.display());
            ReclsError::InvalidDirectory(root_dir.to_path_buf())
        })?;

        let ctx = SearchContext {
            fs,
            root,
            pattern,
            flags,
        };

        let node = DirectoryNode::find_and_create(&ctx, ctx.root.clone())?;
        log::debug!(
            "opened search of {} for {:?} with {:?}",
            ctx.root.display(),
            ctx.pattern.as_str(),
            ctx.flags
        );

        Ok(Self {
            ctx,
            root: Some(node),
            last_error: None,
            started: false,
        })
    }

    /// Advance to the next match.
    pub fn get_next(&mut self) -> Result<(), ReclsError> {
        let result = match self.root.as_mut() {
            Some(node) => node.get_next(&self.ctx),
            None => Err(ReclsError::NoMoreData),
        };
        self.record(result)
    }

    /// A new reference to the current match.
    pub fn get_details(&mut self) -> Result<Entry, ReclsError> {
        let result = match self.root.as_ref() {
            Some(node) => node.get_details(),
            None => Err(ReclsError::NoMoreData),
        };
        self.record(result)
    }

    /// Advance, then return a new reference to the new current match.
    pub fn get_next_details(&mut self) -> Result<Entry, ReclsError> {
        let result = match self.root.as_mut() {
            Some(node) => node.get_next_details(&self.ctx),
            None => Err(ReclsError::NoMoreData),
        };
        self.record(result)
    }

    /// The most recent navigation error, or `Ok` if none occurred yet.
    pub fn last_error(&self) -> ErrorKind {
        self.last_error
            .as_ref()
            .map(ReclsError::kind)
            .unwrap_or(ErrorKind::Ok)
    }

    /// The most recent navigation error in full.
    pub fn last_error_detail(&self) -> Option<&ReclsError> {
        self.last_error.as_ref()
    }

    /// Whether enumeration has ended.
    pub fn is_exhausted(&self) -> bool {
        self.root.is_none()
    }

    /// The resolved root: absolute and separator-terminated.
    pub fn root(&self) -> &Path {
        &self.ctx.root
    }

    pub fn pattern(&self) -> &str {
        self.ctx.pattern.as_str()
    }

    /// Effective flags, after type defaulting.
    pub fn flags(&self) -> SearchFlags {
        self.ctx.flags
    }

    /// Close the search, releasing the traversal state and any entry it holds.
    pub fn close(self) {
        drop(self);
    }

    /// Remember the outcome; on `NoMoreData` destroy the node chain.
    fn record<T>(&mut self, result: Result<T, ReclsError>) -> Result<T, ReclsError> {
        if let Err(e) = &result {
            if e.is_end_of_data() && self.root.take().is_some() {
                log::debug!("search of {} exhausted", self.ctx.root.display());
            }
            self.last_error = Some(e.clone());
        }
        result
    }
}

impl Drop for Search {
    fn drop(&mut self) {
        if self.root.is_some() {
            log::debug!("closing search of {} before exhaustion", self.ctx.root.display());
        }
    }
}

impl Iterator for Search {
    type Item = Entry;

    /// Yields the current match, then advances on each later call. Errors
    /// other than end-of-data also end iteration; see
    /// [`last_error_detail`](Search::last_error_detail).
    fn next(&mut self) -> Option<Entry> {
        if self.started {
            self.get_next_details().ok()
        } else {
            self.started = true;
            self.get_details().ok()
        }
    }
}

impl std::fmt::Debug for Search {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search")
            .field("root", &self.ctx.root)
            .field("pattern", &self.ctx.pattern.as_str())
            .field("flags", &self.ctx.flags)
            .field("exhausted", &self.root.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::fs::LocalFileSystem;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.log"), "b").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "c").unwrap();
        dir
    }

    fn open(root: &Path, pattern: &str, flags: SearchFlags) -> Result<Search, ReclsError> {
        Search::open(Arc::new(LocalFileSystem::new()), root, pattern, flags)
    }

    #[test]
    fn starts_on_first_match() {
        let dir = setup();
        let mut search = open(dir.path(), "*.txt", SearchFlags::FILES).unwrap();
        let entry = search.get_details().unwrap();
        assert_eq!(entry.file(), "a.txt");
        assert_eq!(search.last_error(), ErrorKind::Ok);
    }

    #[test]
    fn exhaustion_is_terminal_but_session_survives() {
        let dir = setup();
        let mut search = open(dir.path(), "*.txt", SearchFlags::FILES).unwrap();
        assert_eq!(search.get_next(), Err(ReclsError::NoMoreData));
        assert!(search.is_exhausted());
        assert_eq!(search.last_error(), ErrorKind::NoMoreData);

        assert_eq!(search.get_next(), Err(ReclsError::NoMoreData));
        assert!(matches!(search.get_details(), Err(ReclsError::NoMoreData)));
        assert!(matches!(search.get_next_details(), Err(ReclsError::NoMoreData)));
    }

    #[test]
    fn empty_pattern_creates_no_search() {
        let dir = setup();
        assert!(matches!(
            open(dir.path(), "", SearchFlags::FILES),
            Err(ReclsError::NoMoreData)
        ));
    }

    #[test]
    fn missing_root_is_invalid_directory() {
        let dir = setup();
        let missing = dir.path().join("missing");
        match open(&missing, "*", SearchFlags::FILES) {
            Err(ReclsError::InvalidDirectory(p)) => assert_eq!(p, missing),
            other => panic!("expected InvalidDirectory, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_type_rejected_before_touching_disk() {
        let missing = Path::new("/definitely/not/here");
        assert!(matches!(
            open(missing, "*", SearchFlags::LINKS),
            Err(ReclsError::InvalidSearchType)
        ));
    }

    #[test]
    fn root_is_absolute_and_terminated() {
        let dir = setup();
        let search = open(dir.path(), "*", SearchFlags::empty()).unwrap();
        assert!(search.root().is_absolute());
        assert!(search.root().to_string_lossy().ends_with(std::path::MAIN_SEPARATOR));
        assert!(search.flags().wants_files());
        assert_eq!(search.pattern(), "*");
    }

    #[test]
    fn iterator_yields_every_match_once() {
        let dir = setup();
        let search = open(dir.path(), "*.txt", SearchFlags::FILES | SearchFlags::RECURSIVE).unwrap();
        let files: Vec<String> = search.map(|e| e.file().to_string_lossy().into_owned()).collect();
        assert_eq!(files, vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn search_relative_paths_are_relative_to_root() {
        let dir = setup();
        let search = open(dir.path(), "c.txt", SearchFlags::FILES | SearchFlags::RECURSIVE).unwrap();
        let rel: Vec<String> = search
            .map(|e| e.search_relative_path().to_string_lossy().into_owned())
            .collect();
        assert_eq!(rel, vec![Path::new("sub").join("c.txt").to_string_lossy().into_owned()]);
    }

    #[test]
    fn allocation_failure_keeps_the_session_open() {
        let dir = setup();
        let mut search = open(dir.path(), "*", SearchFlags::FILES | SearchFlags::RECURSIVE).unwrap();
        assert_eq!(search.get_details().unwrap().file(), "a.txt");

        crate::entry::fault::fail_next_reservation();
        assert_eq!(search.get_next(), Err(ReclsError::OutOfMemory));
        assert_eq!(search.last_error(), ErrorKind::OutOfMemory);
        assert!(!search.is_exhausted());

        // b.log was the casualty; traversal carries on into the subdirectory.
        assert_eq!(search.get_next_details().unwrap().file(), "c.txt");
    }
}
