//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `ListState`: where the crawler is within one unit's paginated record list

mod list_state;

pub use list_state::ListState;
