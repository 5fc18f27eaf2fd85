use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::pattern::Pattern;

/// What a directory listing should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub include_files: bool,
    pub include_dirs:  bool,
    pub follow_links:  bool,
}

/// One directory read, split the way the traversal consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Children matching the pattern and requested types, in listing order.
    pub matches:        Vec<PathBuf>,
    /// Every child directory, in listing order. Empty unless requested.
    pub subdirectories: Vec<PathBuf>,
}

/// Metadata for one file-system entry.
///
/// A failed stat yields [`Stat::default()`]: all sizes and attributes zero,
/// all times at the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub size:                    u64,
    /// Platform attribute bits: `st_mode` on Unix, file attributes on Windows.
    pub attributes:              u32,
    pub is_directory:            bool,
    pub is_link:                 bool,
    pub is_read_only:            bool,
    pub modification_time:       SystemTime,
    pub last_access_time:        SystemTime,
    /// Status-change time on Unix, creation time on Windows.
    pub last_status_change_time: SystemTime,
}

impl Default for Stat {
    fn default() -> Self {
        Self {
            size:                    0,
            attributes:              0,
            is_directory:            false,
            is_link:                 false,
            is_read_only:            false,
            modification_time:       SystemTime::UNIX_EPOCH,
            last_access_time:        SystemTime::UNIX_EPOCH,
            last_status_change_time: SystemTime::UNIX_EPOCH,
        }
    }
}

/// The platform capability a search runs on.
///
/// Implement this to search something other than the local file system, or
/// to control listing order in tests. The traversal engine itself never
/// touches the OS; every directory read and stat goes through this trait.
///
/// # Thread Safety
///
/// `Send + Sync` are required so searches (and the entries they hand out) can
/// move between threads. A single search still runs on one thread at a time.
///
/// # Ordering
///
/// Enumeration order follows listing order: whatever order
/// `list_matching_entries` and `list_subdirectories` return is the order
/// entries are reported in.
pub trait FileSystem: Send + Sync {
    /// Direct children of `directory` whose names match `pattern`, filtered to
    /// the types requested in `options`. One level deep.
    fn list_matching_entries(
        &self,
        directory: &Path,
        pattern:   &Pattern,
        options:   ListOptions,
    ) -> io::Result<Vec<PathBuf>>;

    /// Every direct subdirectory of `directory`, unfiltered. One level deep.
    fn list_subdirectories(&self, directory: &Path, follow_links: bool) -> io::Result<Vec<PathBuf>>;

    /// Matches and (if `recursive`) subdirectories of `directory` together.
    ///
    /// The traversal calls this once per directory. The default combines
    /// the two listing methods; implementations that can split a single read
    /// should override it so both halves see the same directory state.
    fn list_directory(
        &self,
        directory: &Path,
        pattern:   &Pattern,
        options:   ListOptions,
        recursive: bool,
    ) -> io::Result<DirectoryListing> {
        let matches = if options.include_files || options.include_dirs {
            self.list_matching_entries(directory, pattern, options)?
        } else {
            Vec::new()
        };
        let subdirectories = if recursive {
            self.list_subdirectories(directory, options.follow_links)?
        } else {
            Vec::new()
        };
        Ok(DirectoryListing {
            matches,
            subdirectories,
        })
    }

    /// Metadata for `path`. Must not fail: return [`Stat::default()`] instead.
    fn stat(&self, path: &Path, follow_links: bool) -> Stat;

    /// Absolute form of `path`, terminated by a path separator.
    ///
    /// Fails if the path cannot be resolved or is not an existing directory.
    fn resolve_absolute_path(&self, path: &Path) -> io::Result<PathBuf>;
}
