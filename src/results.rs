use std::time::Duration;

/// What a push-model callback tells the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Advance to the next entry.
    Continue,

    /// Stop the search. The driver closes it and returns success.
    Cancel,
}

impl From<bool> for ProcessState {
    /// `true` continues, `false` cancels.
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Self::Continue
        } else {
            Self::Cancel
        }
    }
}

/// The outcome of a completed push-model search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Number of entries handed to the callback.
    pub processed: usize,

    /// Whether the callback stopped the search before it ran out of entries.
    pub cancelled: bool,

    /// Wall-clock time from opening the search to closing it.
    pub duration: Duration,
}

impl ProcessSummary {
    pub(crate) fn empty(duration: Duration) -> Self {
        Self {
            processed: 0,
            cancelled: false,
            duration,
        }
    }
}
