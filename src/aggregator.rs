//! # Window Aggregator
//! Drains one bounded post sequence and folds it into a single [`AnalysisResult`].
//!
//! The fold is single-pass with constant state: posts are never buffered, so
//! memory use does not depend on how busy the feed is.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dimension::Dimension;
use crate::ingest::types::{PostStream, SocialPost};

/// Statistics for one sampling window. All zeros when no post was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_posts: u64,
    /// Timestamp of the first post in arrival order.
    pub minimum_timestamp: i64,
    /// Timestamp of the last post in arrival order.
    pub maximum_timestamp: i64,
    #[serde(rename = "avg_value")]
    pub average_value: f64,
}

/// Running fold state for one window.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    dimension: Dimension,
    total_posts: u64,
    first_ts: i64,
    last_ts: i64,
    sum: i64,
}

impl WindowAccumulator {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            total_posts: 0,
            first_ts: 0,
            last_ts: 0,
            sum: 0,
        }
    }

    pub fn observe(&mut self, post: &SocialPost) {
        if self.total_posts == 0 {
            self.first_ts = post.timestamp;
        }
        self.last_ts = post.timestamp;
        self.sum = self.sum.saturating_add(post.value(self.dimension));
        self.total_posts += 1;
    }

    pub fn finish(self) -> AnalysisResult {
        if self.total_posts == 0 {
            return AnalysisResult::default();
        }
        AnalysisResult {
            total_posts: self.total_posts,
            minimum_timestamp: self.first_ts,
            maximum_timestamp: self.last_ts,
            average_value: self.sum as f64 / self.total_posts as f64,
        }
    }
}

/// The operation the HTTP layer depends on. Never fails: upstream trouble
/// shows up as fewer (possibly zero) posts.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, window: Duration, dimension: Dimension) -> AnalysisResult;
}

pub struct Aggregator<S> {
    source: S,
}

impl<S: PostStream> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Sample the feed for `window` and summarise `dimension`.
    ///
    /// Returns only after the post sequence has closed.
    pub async fn aggregate(&self, window: Duration, dimension: Dimension) -> AnalysisResult {
        let mut posts = self.source.read_stream(window);
        let mut acc = WindowAccumulator::new(dimension);
        while let Some(post) = posts.recv().await {
            acc.observe(&post.data);
        }
        acc.finish()
    }
}

#[async_trait]
impl<S: PostStream> Analyzer for Aggregator<S> {
    async fn analyze(&self, window: Duration, dimension: Dimension) -> AnalysisResult {
        self.aggregate(window, dimension).await
    }
}
