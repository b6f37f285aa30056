//! Service Layer
//!
//! Timeline aggregation and refresh, independent of the HTTP surface.

mod aggregator;
mod refresh;

pub use aggregator::{TimelineAggregator, TimelineOptions};
pub use refresh::RefreshController;
