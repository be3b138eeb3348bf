// src/ingest/mod.rs
//! Upstream ingestion: SSE framing, post decoding and the deadline-bounded reader.

pub mod observer;
pub mod sse;
pub mod sse_client;
pub mod types;

pub use observer::{StreamEnd, StreamNotice, StreamObserver, TracingObserver};
pub use types::{Post, PostStream, SocialPost};
