// File: simucast-core/src/feed/mod.rs

pub mod history;
pub mod merger;

pub use history::HistoryCursor;
pub use merger::LiveFeedMerger;
