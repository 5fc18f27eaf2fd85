use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::vec;

use crate::entry::{Entry, EntryInfo};
use crate::error::ReclsError;
use crate::flags::SearchFlags;
use crate::pattern::Pattern;
use crate::traits::{DirectoryListing, FileSystem, ListOptions};

// ---------------------------------------------------------------------------
// SearchContext
// ---------------------------------------------------------------------------

/// Parameters shared by every node of one search.
///
/// Owned by the session and lent to nodes on each call, so nodes hold no
/// back-references.
pub(crate) struct SearchContext {
    pub fs:      Arc<dyn FileSystem>,
    pub root:    PathBuf,
    pub pattern: Pattern,
    pub flags:   SearchFlags,
}

impl SearchContext {
    fn list_options(&self) -> ListOptions {
        ListOptions {
            include_files: self.flags.wants_files(),
            include_dirs:  self.flags.wants_directories(),
            follow_links:  self.flags.follows_links(),
        }
    }

    /// One read of `directory`. A listing failure is logged and the
    /// directory treated as empty.
    fn listing(&self, directory: &Path) -> DirectoryListing {
        self.fs
            .list_directory(directory, &self.pattern, self.list_options(), self.flags.is_recursive())
            .unwrap_or_else(|e| {
                log::warn!("cannot list {}: {e}", directory.display());
                DirectoryListing::default()
            })
    }

    fn materialize(&self, path: &Path) -> Result<Entry, ReclsError> {
        let stat = self.fs.stat(path, self.flags.follows_links());
        EntryInfo::create(path, &self.root, stat, self.flags)
    }
}

// ---------------------------------------------------------------------------
// DirectoryNode
// ---------------------------------------------------------------------------

/// Traversal state for one directory.
///
/// Yields this directory's direct matches first, in listing order, then the
/// whole subtree of each subdirectory in turn. At most one child node exists
/// at a time, so memory stays proportional to depth.
///
/// A node is either on a direct entry (`current` set, no `child`) or inside a
/// child (`child` set, no `current`). A node with neither has either failed
/// to build its last entry or is exhausted, in which case the next advance
/// reports `NoMoreData` and the owner destroys it. Construction never returns
/// such a node.
pub(crate) struct DirectoryNode {
    directory: PathBuf,
    entries:   vec::IntoIter<PathBuf>,
    current:   Option<Entry>,
    subdirs:   vec::IntoIter<PathBuf>,
    child:     Option<Box<DirectoryNode>>,
}

impl DirectoryNode {
    /// Create the node for `directory`, positioned on its first result.
    ///
    /// # Errors
    ///
    /// [`ReclsError::NoMoreData`] if nothing under `directory` matches.
    pub fn find_and_create(ctx: &SearchContext, directory: PathBuf) -> Result<Self, ReclsError> {
        let listing = ctx.listing(&directory);
        let mut entries = listing.matches.into_iter();
        let subdirs = listing.subdirectories.into_iter();

        let current = match entries.next() {
            Some(first) => Some(ctx.materialize(&first)?),
            None => None,
        };

        let mut node = Self {
            directory,
            entries,
            current,
            subdirs,
            child: None,
        };

        if node.current.is_none() {
            node.child = node.next_child(ctx)?;
            if node.child.is_none() {
                return Err(ReclsError::NoMoreData);
            }
        }

        log::trace!("entered {}", node.directory.display());
        Ok(node)
    }

    /// Advance exactly one position.
    ///
    /// A failure to build an entry is returned once; the entry is skipped
    /// and the next call resumes after it.
    ///
    /// # Errors
    ///
    /// [`ReclsError::NoMoreData`] once this node and its subtree are exhausted.
    /// The owner should then drop the node.
    pub fn get_next(&mut self, ctx: &SearchContext) -> Result<(), ReclsError> {
        if let Some(child) = self.child.as_mut() {
            match child.get_next(ctx) {
                Err(ReclsError::NoMoreData) => {
                    log::trace!("left {}", child.directory.display());
                    self.child = None;
                }
                other => return other,
            }
        } else {
            self.current = None;
            if let Some(next) = self.entries.next() {
                self.current = Some(ctx.materialize(&next)?);
                return Ok(());
            }
        }

        self.child = self.next_child(ctx)?;
        match self.child {
            Some(_) => Ok(()),
            None    => Err(ReclsError::NoMoreData),
        }
    }

    /// A new reference to the current entry, here or in the active child.
    pub fn get_details(&self) -> Result<Entry, ReclsError> {
        match (&self.current, &self.child) {
            (Some(entry), _) => Ok(entry.copy()),
            (None, Some(child)) => child.get_details(),
            (None, None) => Err(ReclsError::NoMoreData),
        }
    }

    /// [`get_next`](Self::get_next), then [`get_details`](Self::get_details).
    pub fn get_next_details(&mut self, ctx: &SearchContext) -> Result<Entry, ReclsError> {
        self.get_next(ctx)?;
        self.get_details()
    }

    /// The current entry without taking a new reference.
    pub fn current(&self) -> Option<&Entry> {
        match &self.current {
            Some(entry) => Some(entry),
            None => self.child.as_ref().and_then(|c| c.current()),
        }
    }

    /// Node for the next subdirectory whose subtree has a match, skipping
    /// empty ones. `None` when the subdirectories are used up.
    fn next_child(&mut self, ctx: &SearchContext) -> Result<Option<Box<DirectoryNode>>, ReclsError> {
        for subdir in self.subdirs.by_ref() {
            match DirectoryNode::find_and_create(ctx, subdir) {
                Ok(node) => return Ok(Some(Box::new(node))),
                Err(ReclsError::NoMoreData) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::traits::Stat;

    /// In-memory tree: directory -> (files, subdirectories), in listing order.
    #[derive(Default)]
    struct MemoryFs {
        dirs:    BTreeMap<PathBuf, (Vec<&'static str>, Vec<&'static str>)>,
        listed:  AtomicUsize,
    }

    impl MemoryFs {
        fn dir(mut self, path: &str, files: &[&'static str], subdirs: &[&'static str]) -> Self {
            self.dirs
                .insert(PathBuf::from(path), (files.to_vec(), subdirs.to_vec()));
            self
        }
    }

    impl FileSystem for MemoryFs {
        fn list_matching_entries(
            &self,
            directory: &Path,
            pattern:   &Pattern,
            options:   ListOptions,
        ) -> io::Result<Vec<PathBuf>> {
            let (files, subdirs) = self
                .dirs
                .get(directory)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            let mut out = Vec::new();
            if options.include_files {
                out.extend(files.iter().filter(|f| pattern.is_match(f)).map(|f| directory.join(f)));
            }
            if options.include_dirs {
                out.extend(subdirs.iter().filter(|d| pattern.is_match(d)).map(|d| directory.join(d)));
            }
            Ok(out)
        }

        fn list_subdirectories(&self, directory: &Path, _follow: bool) -> io::Result<Vec<PathBuf>> {
            self.listed.fetch_add(1, Ordering::Relaxed);
            let (_, subdirs) = self
                .dirs
                .get(directory)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            Ok(subdirs.iter().map(|d| directory.join(d)).collect())
        }

        fn stat(&self, path: &Path, _follow: bool) -> Stat {
            Stat {
                is_directory: self.dirs.contains_key(path),
                ..Stat::default()
            }
        }

        fn resolve_absolute_path(&self, path: &Path) -> io::Result<PathBuf> {
            Ok(path.to_path_buf())
        }
    }

    fn tree() -> MemoryFs {
        MemoryFs::default()
            .dir("/r", &["a.txt", "b.log"], &["empty", "sub", "z"])
            .dir("/r/empty", &["x.log"], &[])
            .dir("/r/sub", &["c.txt"], &["deep"])
            .dir("/r/sub/deep", &["d.txt", "e.txt"], &[])
            .dir("/r/z", &["f.txt"], &[])
    }

    fn ctx(fs: MemoryFs, pattern: &str, flags: SearchFlags) -> SearchContext {
        SearchContext {
            fs: Arc::new(fs),
            root: PathBuf::from("/r/"),
            pattern: Pattern::new(pattern).unwrap(),
            flags: flags.validated().unwrap(),
        }
    }

    fn collect(ctx: &SearchContext) -> Vec<String> {
        let mut node = match DirectoryNode::find_and_create(ctx, PathBuf::from("/r")) {
            Ok(n) => n,
            Err(ReclsError::NoMoreData) => return Vec::new(),
            Err(e) => panic!("unexpected {e}"),
        };
        let mut out = vec![node.get_details().unwrap().path().to_string_lossy().into_owned()];
        loop {
            match node.get_next_details(ctx) {
                Ok(e) => out.push(e.path().to_string_lossy().into_owned()),
                Err(ReclsError::NoMoreData) => break,
                Err(e) => panic!("unexpected {e}"),
            }
        }
        out
    }

    #[test]
    fn direct_matches_only_without_recursion() {
        let c = ctx(tree(), "*.txt", SearchFlags::FILES);
        assert_eq!(collect(&c), vec!["/r/a.txt"]);
    }

    #[test]
    fn depth_first_files_before_subdirectories() {
        let c = ctx(tree(), "*.txt", SearchFlags::FILES | SearchFlags::RECURSIVE);
        assert_eq!(
            collect(&c),
            vec!["/r/a.txt", "/r/sub/c.txt", "/r/sub/deep/d.txt", "/r/sub/deep/e.txt", "/r/z/f.txt"]
        );
    }

    #[test]
    fn starts_in_subdirectory_when_root_has_no_match() {
        let c = ctx(tree(), "*.log", SearchFlags::FILES | SearchFlags::RECURSIVE);
        assert_eq!(collect(&c), vec!["/r/b.log", "/r/empty/x.log"]);

        let c = ctx(tree(), "f.txt", SearchFlags::FILES | SearchFlags::RECURSIVE);
        assert_eq!(collect(&c), vec!["/r/z/f.txt"]);
    }

    #[test]
    fn no_match_anywhere_fails_construction() {
        let c = ctx(tree(), "*.md", SearchFlags::FILES | SearchFlags::RECURSIVE);
        assert!(matches!(
            DirectoryNode::find_and_create(&c, PathBuf::from("/r")),
            Err(ReclsError::NoMoreData)
        ));
    }

    #[test]
    fn directories_as_match_targets() {
        let c = ctx(tree(), "*", SearchFlags::DIRECTORIES | SearchFlags::RECURSIVE);
        assert_eq!(
            collect(&c),
            vec!["/r/empty", "/r/sub", "/r/z", "/r/sub/deep"]
        );
    }

    #[test]
    fn exhausted_node_stays_exhausted() {
        let c = ctx(tree(), "*.txt", SearchFlags::FILES);
        let mut node = DirectoryNode::find_and_create(&c, PathBuf::from("/r")).unwrap();
        assert_eq!(node.get_next(&c), Err(ReclsError::NoMoreData));
        assert_eq!(node.get_next(&c), Err(ReclsError::NoMoreData));
        assert!(matches!(node.get_details(), Err(ReclsError::NoMoreData)));
        assert!(node.current().is_none());
    }

    #[test]
    fn subdirectories_listed_lazily() {
        let fs = Arc::new(tree());
        let c = SearchContext {
            fs: fs.clone(),
            root: PathBuf::from("/r/"),
            pattern: Pattern::new("*.txt").unwrap(),
            flags: SearchFlags::FILES | SearchFlags::RECURSIVE,
        };
        let mut node = DirectoryNode::find_and_create(&c, PathBuf::from("/r")).unwrap();
        assert_eq!(node.current().unwrap().path().as_os_str(), "/r/a.txt");
        assert!(node.child.is_none());
        assert_eq!(fs.listed.load(Ordering::Relaxed), 1);

        // Entering "sub" lists it; "z" is not touched yet.
        node.get_next(&c).unwrap();
        assert_eq!(node.current().unwrap().path().as_os_str(), "/r/sub/c.txt");
        assert_eq!(fs.listed.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn details_are_shared_references() {
        let c = ctx(tree(), "*.txt", SearchFlags::FILES);
        let node = DirectoryNode::find_and_create(&c, PathBuf::from("/r")).unwrap();
        let a = node.get_details().unwrap();
        let b = node.get_details().unwrap();
        assert!(crate::entry::Entry::same_block(&a, &b));
        assert_eq!(a.ref_count(), 3);
    }

    #[test]
    fn unreadable_directory_is_treated_as_empty() {
        let fs = MemoryFs::default().dir("/r", &["a.txt"], &["ghost", "z"]).dir("/r/z", &["f.txt"], &[]);
        let c = ctx(fs, "*.txt", SearchFlags::FILES | SearchFlags::RECURSIVE);
        assert_eq!(collect(&c), vec!["/r/a.txt", "/r/z/f.txt"]);
    }

    #[test]
    fn failed_entry_is_skipped_and_traversal_resumes() {
        let fs = MemoryFs::default()
            .dir("/r", &["a.txt", "b.txt"], &["sub"])
            .dir("/r/sub", &["c.txt"], &[]);
        let c = ctx(fs, "*.txt", SearchFlags::FILES | SearchFlags::RECURSIVE);
        let mut node = DirectoryNode::find_and_create(&c, PathBuf::from("/r")).unwrap();

        crate::entry::fault::fail_next_reservation();
        assert_eq!(node.get_next(&c), Err(ReclsError::OutOfMemory));
        assert!(matches!(node.get_details(), Err(ReclsError::NoMoreData)));

        node.get_next(&c).unwrap();
        assert_eq!(node.current().unwrap().path().as_os_str(), "/r/sub/c.txt");
        assert_eq!(node.get_next(&c), Err(ReclsError::NoMoreData));
    }

    #[test]
    fn failed_subdirectory_is_skipped() {
        let fs = MemoryFs::default()
            .dir("/r", &["a.txt"], &["bad", "good"])
            .dir("/r/bad", &["x.txt"], &[])
            .dir("/r/good", &["y.txt"], &[]);
        let c = ctx(fs, "*.txt", SearchFlags::FILES | SearchFlags::RECURSIVE);
        let mut node = DirectoryNode::find_and_create(&c, PathBuf::from("/r")).unwrap();

        crate::entry::fault::fail_next_reservation();
        assert_eq!(node.get_next(&c), Err(ReclsError::OutOfMemory));

        node.get_next(&c).unwrap();
        assert_eq!(node.current().unwrap().path().as_os_str(), "/r/good/y.txt");
    }
}
