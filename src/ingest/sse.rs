// src/ingest/sse.rs
//! SSE line framing and `data:` payload decoding.

use std::collections::BTreeMap;

use crate::ingest::types::{Post, SocialPost};

pub const DATA_PREFIX: &str = "data: ";

/// Default cap on a single line, matching the classic 64 KiB scanner token limit.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("line exceeds {limit} bytes")]
pub struct LineTooLong {
    pub limit: usize,
}

/// Accumulates body chunks and hands out complete lines.
///
/// Lines end at `\n`; a trailing `\r` is stripped. Chunk boundaries may fall
/// anywhere, including inside a multi-byte UTF-8 sequence. Consumed bytes are
/// released once per `push`, so framing a chunk is linear in its size.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // start of the first unconsumed line
    start: usize,
    // bytes before this offset are known to hold no `\n`
    scanned: usize,
    max_line: usize,
}

impl LineBuffer {
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            start: 0,
            scanned: 0,
            max_line,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Result<Option<String>, LineTooLong> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(rel) => {
                let end = self.scanned + rel;
                if end - self.start > self.max_line {
                    return Err(LineTooLong {
                        limit: self.max_line,
                    });
                }
                let line = decode_line(&self.buf[self.start..end]);
                self.start = end + 1;
                self.scanned = self.start;
                Ok(Some(line))
            }
            None => {
                self.scanned = self.buf.len();
                if self.buf.len() - self.start > self.max_line {
                    return Err(LineTooLong {
                        limit: self.max_line,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Whatever is left once the body has ended (a final line without `\n`).
    pub fn finish(self) -> Option<String> {
        let tail = &self.buf[self.start..];
        if tail.is_empty() {
            None
        } else {
            Some(decode_line(tail))
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Payload of a `data: ` line, or `None` for any other SSE line.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
}

/// Decode one payload into posts, one per top-level key.
///
/// Keys are emitted in ascending order of event-type name; wire order is not
/// preserved for lines that carry more than one key. A `null` payload reads
/// as an all-zero post.
pub fn decode_posts(payload: &str) -> Result<Vec<Post>, serde_json::Error> {
    let by_kind: BTreeMap<String, Option<SocialPost>> = serde_json::from_str(payload)?;
    Ok(by_kind
        .into_iter()
        .map(|(kind, data)| Post {
            kind,
            data: data.unwrap_or_default(),
        })
        .collect())
}
