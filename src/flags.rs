use bitflags::bitflags;

use crate::error::ReclsError;

bitflags! {
    /// Search flags: which entry types to report and how to traverse.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SearchFlags: u32 {
        /// Report regular files.
        const FILES           = 0x0000_0001;
        /// Report directories.
        const DIRECTORIES     = 0x0000_0002;
        /// Report links. Not supported; ignored when combined with a supported type.
        const LINKS           = 0x0000_0004;
        /// Report devices. Not supported; ignored when combined with a supported type.
        const DEVICES         = 0x0000_0008;
        /// Descend into subdirectories.
        const RECURSIVE       = 0x0001_0000;
        /// Do not follow symbolic links when listing or statting.
        const NO_FOLLOW_LINKS = 0x0002_0000;
        /// Record the directory segments of each entry's path.
        const DIRECTORY_PARTS = 0x0004_0000;
        /// Accepted for compatibility. Details are always gathered on match.
        const DETAILS_LATER   = 0x0008_0000;
        /// Directory entries carry a trailing path separator.
        const MARK_DIRS       = 0x0020_0000;
    }
}

impl SearchFlags {
    /// All entry-type bits.
    pub const TYPE_MASK: SearchFlags = SearchFlags::FILES
        .union(SearchFlags::DIRECTORIES)
        .union(SearchFlags::LINKS)
        .union(SearchFlags::DEVICES);

    /// Default the type bits and reject searches for unsupported types only.
    ///
    /// No type bit at all means `FILES`. A set made solely of `LINKS` and/or
    /// `DEVICES` fails with [`ReclsError::InvalidSearchType`].
    pub fn validated(self) -> Result<SearchFlags, ReclsError> {
        if !self.intersects(Self::TYPE_MASK) {
            return Ok(self | Self::FILES);
        }
        if !self.intersects(Self::FILES | Self::DIRECTORIES) {
            return Err(ReclsError::InvalidSearchType);
        }
        if self.intersects(Self::LINKS | Self::DEVICES) {
            log::debug!("ignoring unsupported search types in {self:?}");
        }
        Ok(self)
    }

    pub fn wants_files(self) -> bool {
        self.contains(Self::FILES)
    }

    pub fn wants_directories(self) -> bool {
        self.contains(Self::DIRECTORIES)
    }

    pub fn is_recursive(self) -> bool {
        self.contains(Self::RECURSIVE)
    }

    pub fn follows_links(self) -> bool {
        !self.contains(Self::NO_FOLLOW_LINKS)
    }
}

impl Default for SearchFlags {
    fn default() -> Self {
        Self::FILES
    }
}
