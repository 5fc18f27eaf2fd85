use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::ReclsError;

/// Separator between alternatives in a compound pattern, e.g. `*.rs|*.toml`.
pub const PATTERN_SEPARATOR: char = '|';

/// Pattern treated as "match everything", in addition to `*`.
const ALL_WILDCARDS: &str = "*.*";

/// A compiled search pattern, matched against entry names (never full paths).
///
/// A pattern holds one or more glob alternatives separated by
/// [`PATTERN_SEPARATOR`]. An entry matches when any alternative does.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    set:    GlobSet,
}

impl Pattern {
    /// Compile `pattern`.
    ///
    /// Matching is case-insensitive on Windows and case-sensitive elsewhere.
    /// Empty alternatives (`"*.rs||*.toml"`) are skipped.
    ///
    /// # Errors
    ///
    /// [`ReclsError::NoMoreData`] when no alternative remains (an empty pattern
    /// can never match), [`ReclsError::InvalidPattern`] when a glob is malformed.
    pub fn new(pattern: &str) -> Result<Self, ReclsError> {
        let mut builder = GlobSetBuilder::new();
        let mut count = 0usize;

        for alt in pattern.split(PATTERN_SEPARATOR).filter(|a| !a.is_empty()) {
            let alt = if alt == ALL_WILDCARDS { "*" } else { alt };
            let glob = GlobBuilder::new(alt)
                .case_insensitive(cfg!(windows))
                .literal_separator(true)
                .backslash_escape(!cfg!(windows))
                .build()
                .map_err(|e| ReclsError::InvalidPattern(e.to_string()))?;
            builder.add(glob);
            count += 1;
        }

        if count == 0 {
            return Err(ReclsError::NoMoreData);
        }

        let set = builder
            .build()
            .map_err(|e| ReclsError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            source: pattern.to_owned(),
            set,
        })
    }

    /// Whether `name` (a single path segment) matches any alternative.
    pub fn is_match(&self, name: impl AsRef<Path>) -> bool {
        self.set.is_match(name)
    }

    /// The pattern text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
