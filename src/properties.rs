//! Buffer-filling accessors over an [`Entry`].
//!
//! String getters share one convention: pass `None` to learn the length the
//! full value needs, then pass a buffer of that length to receive it. A
//! shorter buffer gets a truncated copy. Path values are copied as their raw
//! bytes in the platform's encoding, so lengths are byte counts and truncation
//! may cut a character in two.
//!
//! ```rust,ignore
//! let len = recls::properties::get_path_property(&entry, None);
//! let mut buf = vec![0u8; len];
//! let written = recls::properties::get_path_property(&entry, Some(buf.as_mut_slice()));
//! assert_eq!(written, len);
//! ```

use std::ffi::OsStr;
use std::time::SystemTime;

use crate::entry::Entry;
use crate::error::ReclsError;

/// Directory-part index that asks for the number of parts instead of a part.
pub const PART_COUNT: isize = -1;

/// Copy `bytes` into `buffer`, truncating to its capacity.
///
/// Returns the full length of `bytes` when `buffer` is `None`, otherwise the
/// number of bytes written.
pub fn copy_into(bytes: &[u8], buffer: Option<&mut [u8]>) -> usize {
    match buffer {
        None => bytes.len(),
        Some(buf) => {
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            n
        }
    }
}

fn copy_os(value: &OsStr, buffer: Option<&mut [u8]>) -> usize {
    copy_into(value.as_encoded_bytes(), buffer)
}

// ── String properties ─────────────────────────────────────────────────────

pub fn get_path_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.path().as_os_str(), buffer)
}

pub fn get_directory_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.directory(), buffer)
}

/// Drive or UNC prefix plus directory.
pub fn get_directory_path_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.directory_path(), buffer)
}

/// File name and extension together.
pub fn get_file_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.file(), buffer)
}

pub fn get_file_name_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.file_name(), buffer)
}

pub fn get_file_ext_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.file_ext(), buffer)
}

pub fn get_search_relative_path_property(entry: &Entry, buffer: Option<&mut [u8]>) -> usize {
    copy_os(entry.search_relative_path(), buffer)
}

/// Directory part `part`, or with [`PART_COUNT`] the number of parts.
///
/// # Errors
///
/// [`ReclsError::IndexOutOfRange`] for any other index outside the parts.
pub fn get_directory_part_property(
    entry:  &Entry,
    part:   isize,
    buffer: Option<&mut [u8]>,
) -> Result<usize, ReclsError> {
    if part == PART_COUNT {
        return Ok(entry.num_directory_parts());
    }
    let index = usize::try_from(part).map_err(|_| ReclsError::IndexOutOfRange {
        index: usize::MAX,
        count: entry.num_directory_parts(),
    })?;
    Ok(copy_os(entry.directory_part(index)?, buffer))
}

// ── Predicates ────────────────────────────────────────────────────────────

pub fn is_file_read_only(entry: &Entry) -> bool {
    entry.is_read_only()
}

pub fn is_file_directory(entry: &Entry) -> bool {
    entry.is_directory()
}

pub fn is_file_link(entry: &Entry) -> bool {
    entry.is_link()
}

// ── Numeric and time properties ───────────────────────────────────────────

pub fn get_size_property(entry: &Entry) -> u64 {
    entry.size()
}

pub fn get_attributes_property(entry: &Entry) -> u32 {
    entry.attributes()
}

pub fn get_modification_time(entry: &Entry) -> SystemTime {
    entry.modification_time()
}

pub fn get_last_access_time(entry: &Entry) -> SystemTime {
    entry.last_access_time()
}

/// Status-change time on Unix. On Windows this is the creation time.
pub fn get_last_status_change_time(entry: &Entry) -> SystemTime {
    entry.last_status_change_time()
}
