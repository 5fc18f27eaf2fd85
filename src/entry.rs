use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::ops::Deref;
use std::path::{is_separator, Component, Path, MAIN_SEPARATOR};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::ReclsError;
use crate::flags::SearchFlags;
use crate::traits::Stat;

// ---------------------------------------------------------------------------
// Process-wide counters
// ---------------------------------------------------------------------------

/// Blocks currently alive.
static LIVE_BLOCKS: AtomicUsize = AtomicUsize::new(0);

/// `Entry` handles currently alive, across all blocks.
static LIVE_HANDLES: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of the process-wide entry counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    /// Entry-info blocks allocated and not yet freed.
    pub blocks: usize,

    /// Entry handles alive, counting every copy.
    pub handles: usize,
}

impl EntryStats {
    /// Handles that exist only because a block was copied.
    pub fn shared(&self) -> usize {
        self.handles.saturating_sub(self.blocks)
    }
}

/// Current values of the process-wide counters.
///
/// Each counter is exact on its own; the pair is read without a lock, so a
/// snapshot taken while other threads copy or release entries may be skewed
/// by in-flight operations.
pub fn entry_stats() -> EntryStats {
    EntryStats {
        blocks:  LIVE_BLOCKS.load(Ordering::Relaxed),
        handles: LIVE_HANDLES.load(Ordering::Relaxed),
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// Byte range into an entry's path bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Span {
    start: usize,
    end:   usize,
}

impl Span {
    fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    fn of<'a>(&self, text: &'a [u8]) -> &'a [u8] {
        &text[self.start..self.end]
    }
}

// ---------------------------------------------------------------------------
// EntryInfo
// ---------------------------------------------------------------------------

/// Details of one matched file-system entry.
///
/// The path is held once, in a single buffer sized exactly at creation and
/// kept in the platform's native encoding; every path component (directory,
/// file name, extension, directory parts) is a range into that buffer. Obtain
/// one through an [`Entry`] handle.
#[derive(Debug)]
pub struct EntryInfo {
    text:            Vec<u8>,
    path:            Span,
    directory:       Span,
    directory_path:  Span,
    file_name:       Span,
    file_ext:        Span,
    search_relative: Span,
    directory_parts: Vec<Span>,
    stat:            Stat,
}

impl EntryInfo {
    /// Build the block for `path`, found during a search rooted at `search_root`.
    ///
    /// With `MARK_DIRS`, a directory's path gains a trailing separator. With
    /// `DIRECTORY_PARTS`, each directory segment of the path is recorded.
    ///
    /// # Errors
    ///
    /// [`ReclsError::OutOfMemory`] if the block's storage cannot be reserved.
    pub(crate) fn create(
        path:        &Path,
        search_root: &Path,
        stat:        Stat,
        flags:       SearchFlags,
    ) -> Result<Entry, ReclsError> {
        let raw = encode(path.as_os_str());
        let mark = flags.contains(SearchFlags::MARK_DIRS)
            && stat.is_directory
            && !raw.last().is_some_and(is_sep);

        let len = raw.len() + usize::from(mark);
        let mut text = Vec::new();
        reserve_exact(&mut text, len)?;
        text.extend_from_slice(&raw);
        if mark {
            text.push(MAIN_SEPARATOR as u8);
        }

        let layout = Layout::of(&text, prefix_len(path));

        let mut directory_parts = Vec::new();
        if flags.contains(SearchFlags::DIRECTORY_PARTS) {
            let parts = split_directory_parts(&text, layout.directory);
            reserve_exact(&mut directory_parts, parts.len())?;
            directory_parts.extend(parts);
        }

        let root = encode(search_root.as_os_str());
        let search_relative = if !root.is_empty() && text.starts_with(&root) {
            Span::new(root.len(), text.len())
        } else {
            Span::new(0, text.len())
        };

        let info = EntryInfo {
            path: Span::new(0, text.len()),
            directory: layout.directory,
            directory_path: Span::new(0, layout.directory.end),
            file_name: layout.file_name,
            file_ext: layout.file_ext,
            search_relative,
            directory_parts,
            stat,
            text,
        };

        LIVE_BLOCKS.fetch_add(1, Ordering::Relaxed);
        log::trace!("created entry block for {}", info.path().display());

        Ok(Entry::from_info(info))
    }

    fn slice(&self, span: Span) -> &OsStr {
        decode(span.of(&self.text))
    }

    // ── Path components ───────────────────────────────────────────────────

    /// The full path.
    pub fn path(&self) -> &Path {
        Path::new(self.slice(self.path))
    }

    /// The directory, separator-terminated, without any drive or UNC prefix.
    pub fn directory(&self) -> &OsStr {
        self.slice(self.directory)
    }

    /// Drive or UNC prefix plus directory. Equal to [`directory`](Self::directory)
    /// on platforms without drive prefixes.
    pub fn directory_path(&self) -> &OsStr {
        self.slice(self.directory_path)
    }

    /// File name plus extension: the final path component.
    pub fn file(&self) -> &OsStr {
        self.slice(Span::new(self.file_name.start, self.file_ext.end))
    }

    /// File name up to (not including) the last `.`. A name that ends in
    /// `.` has no extension and keeps the dot here.
    pub fn file_name(&self) -> &OsStr {
        self.slice(self.file_name)
    }

    /// Extension after the last `.`, without the dot. Empty if there is none.
    pub fn file_ext(&self) -> &OsStr {
        self.slice(self.file_ext)
    }

    /// The path relative to the search root.
    pub fn search_relative_path(&self) -> &OsStr {
        self.slice(self.search_relative)
    }

    /// Number of directory parts. Zero unless the search recorded them.
    pub fn num_directory_parts(&self) -> usize {
        self.directory_parts.len()
    }

    /// Directory part `index`, e.g. `"/usr/"`, `"include/"`.
    pub fn directory_part(&self, index: usize) -> Result<&OsStr, ReclsError> {
        self.directory_parts
            .get(index)
            .map(|span| self.slice(*span))
            .ok_or(ReclsError::IndexOutOfRange {
                index,
                count: self.directory_parts.len(),
            })
    }

    /// All directory parts, in path order.
    pub fn directory_parts(&self) -> impl Iterator<Item = &OsStr> + '_ {
        self.directory_parts.iter().map(|span| self.slice(*span))
    }

    // ── Metadata ──────────────────────────────────────────────────────────

    pub fn size(&self) -> u64 {
        self.stat.size
    }

    /// Platform attribute bits.
    pub fn attributes(&self) -> u32 {
        self.stat.attributes
    }

    pub fn is_directory(&self) -> bool {
        self.stat.is_directory
    }

    pub fn is_link(&self) -> bool {
        self.stat.is_link
    }

    pub fn is_read_only(&self) -> bool {
        self.stat.is_read_only
    }

    pub fn modification_time(&self) -> SystemTime {
        self.stat.modification_time
    }

    pub fn last_access_time(&self) -> SystemTime {
        self.stat.last_access_time
    }

    /// Status-change time on Unix; creation time on Windows.
    pub fn last_status_change_time(&self) -> SystemTime {
        self.stat.last_status_change_time
    }
}

impl Drop for EntryInfo {
    fn drop(&mut self) {
        LIVE_BLOCKS.fetch_sub(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Component spans of a path.
struct Layout {
    directory: Span,
    file_name: Span,
    file_ext:  Span,
}

impl Layout {
    /// Split `text` into directory, file name and extension.
    ///
    /// `prefix` is the byte length of any drive/UNC prefix. A single trailing
    /// separator (a marked directory) is not part of the file name.
    fn of(text: &[u8], prefix: usize) -> Self {
        let mut end = text.len();
        if end > prefix + 1 && text.last().is_some_and(is_sep) {
            end -= 1;
        }

        let name_start = text[prefix..end]
            .iter()
            .rposition(is_sep)
            .map(|i| prefix + i + 1)
            .unwrap_or(prefix);

        let name = &text[name_start..end];
        let (file_name, file_ext) = match name.iter().rposition(|&b| b == b'.') {
            Some(dot) if dot + 1 < name.len() => (
                Span::new(name_start, name_start + dot),
                Span::new(name_start + dot + 1, end),
            ),
            _ => (Span::new(name_start, end), Span::new(end, end)),
        };

        Self {
            directory: Span::new(prefix, name_start),
            file_name,
            file_ext,
        }
    }
}

/// One span per directory segment, each ending with its separator. A leading
/// separator belongs to the first segment: `/usr/include/` splits into
/// `/usr/` and `include/`.
fn split_directory_parts(text: &[u8], directory: Span) -> Vec<Span> {
    let mut parts = Vec::new();
    let mut start = directory.start;

    for (i, b) in directory.of(text).iter().enumerate() {
        let at = directory.start + i;
        if !is_sep(b) || at == directory.start {
            continue;
        }
        parts.push(Span::new(start, at + 1));
        start = at + 1;
    }

    if start < directory.end {
        parts.push(Span::new(start, directory.end));
    }

    parts
}

/// Byte length of the drive or UNC prefix of `path`, if any.
fn prefix_len(path: &Path) -> usize {
    match path.components().next() {
        Some(Component::Prefix(prefix)) => encode(prefix.as_os_str()).len(),
        _ => 0,
    }
}

/// Separators are ASCII on every platform, so a byte test never splits an
/// encoded character.
fn is_sep(b: &u8) -> bool {
    b.is_ascii() && is_separator(char::from(*b))
}

fn reserve_exact<T>(buf: &mut Vec<T>, additional: usize) -> Result<(), ReclsError> {
    #[cfg(test)]
    if fault::take() {
        return Err(ReclsError::OutOfMemory);
    }
    buf.try_reserve_exact(additional)
        .map_err(|_| ReclsError::OutOfMemory)
}

// ── Native encoding ───────────────────────────────────────────────────────

#[cfg(unix)]
fn encode(os: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(os.as_bytes())
}

#[cfg(unix)]
fn decode(bytes: &[u8]) -> &OsStr {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes)
}

// Elsewhere the buffer holds UTF-8. Paths that are not valid Unicode (lone
// surrogates on Windows) are replaced lossily.
#[cfg(not(unix))]
fn encode(os: &OsStr) -> Cow<'_, [u8]> {
    match os.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(not(unix))]
fn decode(bytes: &[u8]) -> &OsStr {
    std::str::from_utf8(bytes).map(OsStr::new).unwrap_or_default()
}

/// Fault injection for the allocation-failure paths.
#[cfg(test)]
pub(crate) mod fault {
    use std::cell::Cell;

    thread_local! {
        static FAIL_NEXT: Cell<bool> = const { Cell::new(false) };
    }

    /// Make the next block reservation on this thread fail.
    pub(crate) fn fail_next_reservation() {
        FAIL_NEXT.with(|f| f.set(true));
    }

    pub(super) fn take() -> bool {
        FAIL_NEXT.with(|f| f.replace(false))
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Shared, reference-counted handle to an [`EntryInfo`].
///
/// Cloning (see [`Entry::copy`]) aliases the same block; dropping a handle
/// (see [`Entry::release`]) releases one reference. The block is freed when
/// the last handle goes. Handles are `Send + Sync` and may be copied or
/// released from any thread.
pub struct Entry {
    info: Arc<EntryInfo>,
}

impl Entry {
    fn from_info(info: EntryInfo) -> Self {
        LIVE_HANDLES.fetch_add(1, Ordering::Relaxed);
        Self {
            info: Arc::new(info),
        }
    }

    /// A new reference to the same block. Nothing is duplicated.
    pub fn copy(&self) -> Entry {
        self.clone()
    }

    /// Release this reference.
    pub fn release(self) {
        drop(self);
    }

    /// Number of handles currently sharing this block.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.info)
    }

    /// Whether two handles refer to the same block.
    pub fn same_block(a: &Entry, b: &Entry) -> bool {
        Arc::ptr_eq(&a.info, &b.info)
    }
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        LIVE_HANDLES.fetch_add(1, Ordering::Relaxed);
        Self {
            info: Arc::clone(&self.info),
        }
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        LIVE_HANDLES.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Deref for Entry {
    type Target = EntryInfo;

    fn deref(&self) -> &EntryInfo {
        &self.info
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.path())
            .field("refs", &self.ref_count())
            .finish()
    }
}
