/// Record-list state machine for one unit
///
/// This module defines the states a unit's record list moves through while it
/// is being paginated.
use std::fmt;

/// Where the crawler is in one unit's record list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListState {
    /// A list page is displayed and its rows are about to be read
    ListLoaded,

    /// Record links of the current page have been read
    RowsExtracted,

    /// Every record on the page was handled; looking for a next page
    Paginating,

    /// No more pages for this unit
    Done,
}

impl ListState {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    ///
    /// The list can be abandoned (moved to `Done`) from any live state; every
    /// other step follows the page cycle
    /// `ListLoaded -> RowsExtracted -> Paginating -> ListLoaded`.
    pub fn can_transition_to(&self, next: ListState) -> bool {
        match (self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (Self::ListLoaded, Self::RowsExtracted) => true,
            (Self::RowsExtracted, Self::Paginating) => true,
            (Self::Paginating, Self::ListLoaded) => true,
            _ => false,
        }
    }

    /// Short name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListLoaded => "list_loaded",
            Self::RowsExtracted => "rows_extracted",
            Self::Paginating => "paginating",
            Self::Done => "done",
        }
    }

    /// Returns all list states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::ListLoaded,
            Self::RowsExtracted,
            Self::Paginating,
            Self::Done,
        ]
    }
}

impl fmt::Display for ListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
