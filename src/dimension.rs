//! # Dimension
//! The closed set of post counters a caller can average over.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Metric selected for averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Likes,
    Comments,
    Favorites,
    Retweets,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Likes,
        Dimension::Comments,
        Dimension::Favorites,
        Dimension::Retweets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Likes => "likes",
            Dimension::Comments => "comments",
            Dimension::Favorites => "favorites",
            Dimension::Retweets => "retweets",
        }
    }
}

impl FromStr for Dimension {
    type Err = UnknownDimension;

    // Exact, case-sensitive match: "Likes" is not a dimension.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownDimension(s.to_string()))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
