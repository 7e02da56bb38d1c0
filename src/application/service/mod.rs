// src/application/service/mod.rs
// Application services

pub mod live_feed;

pub use live_feed::{ErrorPolicy, FeedSettings, FeedState, LiveFeedController};
