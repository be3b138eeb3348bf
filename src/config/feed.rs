// src/config/feed.rs
use serde::{Deserialize, Serialize};

use crate::ingest::sse::DEFAULT_MAX_LINE_BYTES;

pub const DEFAULT_FEED_URL: &str = "https://stream.upfluence.co/stream";
const MIN_LINE_BYTES: usize = 1024;

fn default_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}
fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Upstream SSE feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Longest single SSE line accepted before the stream is abandoned.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_line_bytes: default_max_line_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl FeedConfig {
    pub(crate) fn sanitize(&mut self) {
        self.url = self.url.trim().to_string();
        if self.url.is_empty() {
            self.url = default_url();
        }
        self.max_line_bytes = self.max_line_bytes.max(MIN_LINE_BYTES);
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
    }
}
