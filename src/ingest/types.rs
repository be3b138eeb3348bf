// src/ingest/types.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::dimension::Dimension;

/// Payload of one feed event. Absent (or `null`) counters read as 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialPost {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub timestamp: i64, // upstream epoch units, opaque here
    #[serde(default, deserialize_with = "null_as_zero")]
    pub likes: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub comments: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub favorites: i64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub retweets: i64,
}

impl SocialPost {
    pub fn value(&self, dimension: Dimension) -> i64 {
        match dimension {
            Dimension::Likes => self.likes,
            Dimension::Comments => self.comments,
            Dimension::Favorites => self.favorites,
            Dimension::Retweets => self.retweets,
        }
    }
}

fn null_as_zero<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(de)?.unwrap_or_default())
}

/// One decoded (event type, payload) unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    #[serde(rename = "type")]
    pub kind: String, // e.g. "instagram_media"; carried, never filtered on
    pub data: SocialPost,
}

/// Something that can produce a bounded, one-shot sequence of posts.
///
/// The receiver yields posts in arrival order and returns `None` once the
/// producer has closed the sequence (deadline, end of feed, or error).
pub trait PostStream: Send + Sync {
    fn read_stream(&self, window: Duration) -> mpsc::Receiver<Post>;
}
