use std::fs::{self, FileType, Metadata};
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};
use std::time::SystemTime;

use ignore::WalkBuilder;

use crate::pattern::Pattern;
use crate::traits::{DirectoryListing, FileSystem, ListOptions, Stat};

// ---------------------------------------------------------------------------
// LocalFileSystem
// ---------------------------------------------------------------------------

/// [`FileSystem`] over the local disk.
///
/// Listings are one level deep and sorted by file name, so enumeration order
/// is deterministic. No ignore files, hidden-file rules or other filters are
/// applied: every entry is a candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Read one level of `directory`, yielding each child with its file type.
    ///
    /// Children that vanish or cannot be typed while listing are skipped.
    fn read_level(&self, directory: &Path, follow_links: bool) -> io::Result<Vec<(PathBuf, FileType)>> {
        // Surface a missing or unreadable directory to the caller; the walker
        // would only log it. Opening is enough, the walk does the reading.
        fs::read_dir(directory)?;

        let walker = WalkBuilder::new(directory)
            .standard_filters(false)
            .ignore(false)
            .parents(false)
            .hidden(false)
            .follow_links(follow_links)
            .same_file_system(false)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut children = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("skipping entry under {}: {e}", directory.display());
                    continue;
                }
            };

            // The walk yields the directory itself first.
            if entry.depth() == 0 {
                continue;
            }

            if let Some(ft) = entry.file_type() {
                children.push((entry.into_path(), ft));
            }
        }

        Ok(children)
    }
}

/// Whether a child of type `ft` named by `path` is reported as a match.
fn is_reported(path: &Path, ft: &FileType, pattern: &Pattern, options: ListOptions) -> bool {
    // Links and devices are never reported as match targets.
    let wanted = (options.include_files && ft.is_file()) || (options.include_dirs && ft.is_dir());
    wanted && path.file_name().is_some_and(|name| pattern.is_match(name))
}

impl FileSystem for LocalFileSystem {
    fn list_matching_entries(
        &self,
        directory: &Path,
        pattern:   &Pattern,
        options:   ListOptions,
    ) -> io::Result<Vec<PathBuf>> {
        let children = self.read_level(directory, options.follow_links)?;

        Ok(children
            .into_iter()
            .filter(|(path, ft)| is_reported(path, ft, pattern, options))
            .map(|(path, _)| path)
            .collect())
    }

    fn list_subdirectories(&self, directory: &Path, follow_links: bool) -> io::Result<Vec<PathBuf>> {
        let children = self.read_level(directory, follow_links)?;

        Ok(children
            .into_iter()
            .filter(|(_, ft)| ft.is_dir())
            .map(|(path, _)| path)
            .collect())
    }

    fn list_directory(
        &self,
        directory: &Path,
        pattern:   &Pattern,
        options:   ListOptions,
        recursive: bool,
    ) -> io::Result<DirectoryListing> {
        let mut listing = DirectoryListing::default();
        if !recursive && !options.include_files && !options.include_dirs {
            return Ok(listing);
        }

        for (path, ft) in self.read_level(directory, options.follow_links)? {
            if recursive && ft.is_dir() {
                listing.subdirectories.push(path.clone());
            }
            if is_reported(&path, &ft, pattern, options) {
                listing.matches.push(path);
            }
        }

        Ok(listing)
    }

    fn stat(&self, path: &Path, follow_links: bool) -> Stat {
        let metadata = if follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };

        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => {
                log::debug!("stat failed for {}: {e}", path.display());
                return Stat::default();
            }
        };

        let is_link = if follow_links {
            fs::symlink_metadata(path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false)
        } else {
            metadata.file_type().is_symlink()
        };

        Stat {
            size:                    if metadata.is_dir() { 0 } else { metadata.len() },
            attributes:              attributes_of(&metadata),
            is_directory:            metadata.is_dir(),
            is_link,
            is_read_only:            metadata.permissions().readonly(),
            modification_time:       metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            last_access_time:        metadata.accessed().unwrap_or(SystemTime::UNIX_EPOCH),
            last_status_change_time: status_change_time_of(&metadata),
        }
    }

    fn resolve_absolute_path(&self, path: &Path) -> io::Result<PathBuf> {
        let path = if path.as_os_str().is_empty() {
            Path::new(".")
        } else {
            path
        };

        // dunce keeps Windows paths free of the `\\?\` verbatim prefix.
        let resolved = dunce::canonicalize(path)?;
        if !resolved.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", resolved.display()),
            ));
        }

        Ok(with_trailing_separator(resolved))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append the platform separator unless `path` already ends with one.
pub(crate) fn with_trailing_separator(path: PathBuf) -> PathBuf {
    let ends_with_sep = path
        .as_os_str()
        .to_string_lossy()
        .ends_with(|c: char| c == MAIN_SEPARATOR || c == '/');

    if ends_with_sep {
        path
    } else {
        let mut os = path.into_os_string();
        os.push(MAIN_SEPARATOR_STR);
        PathBuf::from(os)
    }
}

#[cfg(unix)]
fn attributes_of(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(windows)]
fn attributes_of(metadata: &Metadata) -> u32 {
    use std::os::windows::fs::MetadataExt;
    metadata.file_attributes()
}

#[cfg(not(any(unix, windows)))]
fn attributes_of(_metadata: &Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn status_change_time_of(metadata: &Metadata) -> SystemTime {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = metadata.ctime();
    let nanos = metadata.ctime_nsec().clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        SystemTime::UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        SystemTime::UNIX_EPOCH - Duration::new(secs.unsigned_abs(), 0) + Duration::from_nanos(nanos.into())
    }
}

#[cfg(not(unix))]
fn status_change_time_of(metadata: &Metadata) -> SystemTime {
    metadata.created().unwrap_or(SystemTime::UNIX_EPOCH)
}
