//! Coursework Tracker
//!
//! Tracks assignments per course through release, fetch and submission and
//! exposes a pull-based listing view over the result.

pub mod config;
pub mod listing;
pub mod tracker;

pub use config::TrackerConfig;
pub use listing::{CourseListing, ListRow, ListSection, ListingView};
pub use tracker::AssignmentTracker;
