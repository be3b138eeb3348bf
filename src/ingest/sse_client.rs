// src/ingest/sse_client.rs
//! Deadline-bounded reader for the upstream post feed.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, USER_AGENT};
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::config::feed::FeedConfig;
use crate::ingest::observer::{StreamEnd, StreamNotice, StreamObserver, TracingObserver};
use crate::ingest::sse::{data_payload, decode_posts, LineBuffer};
use crate::ingest::types::{Post, PostStream};

#[derive(Clone)]
pub struct SseClient {
    url: String,
    user_agent: String,
    max_line_bytes: usize,
    client: reqwest::Client,
    observer: Arc<dyn StreamObserver>,
}

impl SseClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_config(&FeedConfig {
            url: url.into(),
            ..FeedConfig::default()
        })
    }

    pub fn from_config(cfg: &FeedConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            user_agent: cfg.user_agent.clone(),
            max_line_bytes: cfg.max_line_bytes,
            client: reqwest::Client::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the feed until `deadline`, forwarding posts into `tx`.
    ///
    /// The deadline cuts connection setup and body reads only; a post that
    /// has been decoded is always handed to the consumer.
    async fn pump(
        &self,
        deadline: Instant,
        tx: &mpsc::Sender<Post>,
        tally: &mut Tally,
    ) -> StreamEnd {
        if Instant::now() >= deadline {
            return StreamEnd::Deadline;
        }
        let request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(USER_AGENT, &self.user_agent)
            .send();

        let response = match timeout_at(deadline, request).await {
            Err(_) => return StreamEnd::Deadline,
            Ok(Err(e)) => {
                self.observer.notify(StreamNotice::ConnectFailed {
                    url: &self.url,
                    error: &e,
                });
                return StreamEnd::Error;
            }
            Ok(Ok(resp)) => resp,
        };

        if !response.status().is_success() {
            self.observer.notify(StreamNotice::BadStatus {
                url: &self.url,
                status: response.status(),
            });
            return StreamEnd::Error;
        }
        self.observer.notify(StreamNotice::Connected { url: &self.url });

        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::new(self.max_line_bytes);

        loop {
            let chunk = match timeout_at(deadline, body.next()).await {
                Err(_) => return StreamEnd::Deadline,
                Ok(None) => {
                    if let Some(tail) = lines.finish() {
                        if !self.dispatch(&tail, tx, tally).await {
                            return StreamEnd::ConsumerGone;
                        }
                    }
                    return StreamEnd::Eof;
                }
                Ok(Some(Err(e))) => {
                    self.observer.notify(StreamNotice::ReadFailed { error: &e });
                    return StreamEnd::Error;
                }
                Ok(Some(Ok(bytes))) => bytes,
            };

            lines.push(&chunk);
            loop {
                let line = match lines.next_line() {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        self.observer
                            .notify(StreamNotice::LineTooLong { limit: e.limit });
                        return StreamEnd::Error;
                    }
                };
                if Instant::now() >= deadline {
                    return StreamEnd::Deadline;
                }
                if !self.dispatch(&line, tx, tally).await {
                    return StreamEnd::ConsumerGone;
                }
            }
        }
    }

    /// Returns `false` once the consumer has hung up.
    async fn dispatch(&self, line: &str, tx: &mpsc::Sender<Post>, tally: &mut Tally) -> bool {
        let Some(payload) = data_payload(line) else {
            return true;
        };
        let posts = match decode_posts(payload) {
            Ok(posts) => posts,
            Err(error) => {
                tally.malformed += 1;
                self.observer.notify(StreamNotice::MalformedLine {
                    line: payload,
                    error: &error,
                });
                return true;
            }
        };
        for post in posts {
            if tx.send(post).await.is_err() {
                return false;
            }
            tally.posts += 1;
        }
        true
    }
}

#[derive(Debug, Default)]
struct Tally {
    posts: u64,
    malformed: u64,
}

impl PostStream for SseClient {
    fn read_stream(&self, window: Duration) -> mpsc::Receiver<Post> {
        let (tx, rx) = mpsc::channel(1);
        let deadline = Instant::now() + window;
        let reader = self.clone();
        tokio::spawn(async move {
            let mut tally = Tally::default();
            let reason = reader.pump(deadline, &tx, &mut tally).await;
            // Release the sender before reporting so the consumer sees the close first.
            drop(tx);
            reader.observer.notify(StreamNotice::Closed {
                reason,
                posts: tally.posts,
                malformed: tally.malformed,
            });
        });
        rx
    }
}
