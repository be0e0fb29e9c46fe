//! Feed history and presentation.

pub mod merge;
pub mod present;

pub use merge::merge_history;
pub use present::{present, CategoryChoice, FeedFilters, RecencyWindow};
