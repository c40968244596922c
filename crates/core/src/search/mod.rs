//! Multi-criteria recipe search and the text rendering of its results.

pub mod criteria;
pub mod engine;
pub mod format;

pub use criteria::{Filter, FilterKind, SearchCriteria};
pub use engine::{FilterEngine, FilteredResultSet, SearchOutcome, NO_CRITERIA};
pub use format::{format_results, truncate_chars, DEFAULT_MAX_ITEMS, NO_RESULTS};
