// src/ingest/observer.rs
//! Reporting hook for the SSE reader. The reader never fails its caller, so
//! everything that goes wrong on the wire is surfaced here instead.

use metrics::counter;
use once_cell::sync::OnceCell;

/// Why a post sequence was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Deadline,
    Eof,
    Error,
    ConsumerGone,
}

impl StreamEnd {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamEnd::Deadline => "deadline",
            StreamEnd::Eof => "eof",
            StreamEnd::Error => "error",
            StreamEnd::ConsumerGone => "consumer_gone",
        }
    }
}

/// Everything the reader reports while a stream is open.
#[derive(Debug)]
pub enum StreamNotice<'a> {
    Connected {
        url: &'a str,
    },
    ConnectFailed {
        url: &'a str,
        error: &'a reqwest::Error,
    },
    BadStatus {
        url: &'a str,
        status: reqwest::StatusCode,
    },
    ReadFailed {
        error: &'a reqwest::Error,
    },
    LineTooLong {
        limit: usize,
    },
    MalformedLine {
        line: &'a str,
        error: &'a serde_json::Error,
    },
    Closed {
        reason: StreamEnd,
        posts: u64,
        malformed: u64,
    },
}

pub trait StreamObserver: Send + Sync {
    fn notify(&self, notice: StreamNotice<'_>);
}

/// Default observer: structured `tracing` events plus Prometheus counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StreamObserver for TracingObserver {
    fn notify(&self, notice: StreamNotice<'_>) {
        ensure_metrics_described();
        match notice {
            StreamNotice::Connected { url } => {
                tracing::debug!(target: "sse", %url, "stream connected");
            }
            StreamNotice::ConnectFailed { url, error } => {
                tracing::warn!(target: "sse", %url, error = %error, "stream connect failed");
                counter!("sse_stream_errors_total", "kind" => "connect").increment(1);
            }
            StreamNotice::BadStatus { url, status } => {
                tracing::warn!(target: "sse", %url, %status, "stream rejected by upstream");
                counter!("sse_stream_errors_total", "kind" => "status").increment(1);
            }
            StreamNotice::ReadFailed { error } => {
                tracing::warn!(target: "sse", error = %error, "error reading SSE stream");
                counter!("sse_stream_errors_total", "kind" => "read").increment(1);
            }
            StreamNotice::LineTooLong { limit } => {
                tracing::warn!(target: "sse", limit, "SSE line exceeds limit; closing stream");
                counter!("sse_stream_errors_total", "kind" => "line_too_long").increment(1);
            }
            StreamNotice::MalformedLine { line, error } => {
                tracing::debug!(
                    target: "sse",
                    line = %truncate(line, 120),
                    error = %error,
                    "skipping malformed data line"
                );
                counter!("sse_malformed_lines_total").increment(1);
            }
            StreamNotice::Closed {
                reason,
                posts,
                malformed,
            } => {
                tracing::info!(
                    target: "sse",
                    reason = reason.as_str(),
                    posts,
                    malformed,
                    "stream closed"
                );
                counter!("sse_posts_total").increment(posts);
                counter!("sse_streams_closed_total", "reason" => reason.as_str()).increment(1);
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        use metrics::describe_counter;
        describe_counter!("sse_posts_total", "Posts decoded and delivered to aggregators.");
        describe_counter!(
            "sse_malformed_lines_total",
            "SSE data lines that failed to decode."
        );
        describe_counter!(
            "sse_stream_errors_total",
            "Upstream connect/status/read failures."
        );
        describe_counter!("sse_streams_closed_total", "Post sequences closed, by reason.");
    });
}
