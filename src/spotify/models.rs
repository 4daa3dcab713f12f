use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;

/// Snapshot of a track as returned by the top-tracks endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// First listed artist, empty when Spotify returns none.
    pub artist: String,
    pub popularity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub image_url: Option<String>,
}

/// Recommendation results carry every credited artist but no popularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "Last 4 weeks",
            TimeRange::MediumTerm => "Last 6 months",
            TimeRange::LongTerm => "All time",
        }
    }

    pub const ALL: [TimeRange; 3] = [
        TimeRange::ShortTerm,
        TimeRange::MediumTerm,
        TimeRange::LongTerm,
    ];
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "short_term" => Ok(TimeRange::ShortTerm),
            "medium_term" => Ok(TimeRange::MediumTerm),
            "long_term" => Ok(TimeRange::LongTerm),
            other => Err(AppError::InvalidInput(format!(
                "unknown time range '{}'",
                other
            ))),
        }
    }
}

impl From<TimeRange> for rspotify::model::TimeRange {
    fn from(range: TimeRange) -> Self {
        match range {
            TimeRange::ShortTerm => rspotify::model::TimeRange::ShortTerm,
            TimeRange::MediumTerm => rspotify::model::TimeRange::MediumTerm,
            TimeRange::LongTerm => rspotify::model::TimeRange::LongTerm,
        }
    }
}

/// One offset/limit window over a top-tracks listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub time_range: TimeRange,
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn first(time_range: TimeRange, limit: u32) -> Self {
        Self {
            time_range,
            offset: 0,
            limit,
        }
    }

    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            ..*self
        }
    }
}

#[cfg(test)]
impl Track {
    pub fn mock(id: &str, popularity: u8) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Track {}", id),
            artist: "Mock Artist".to_string(),
            popularity,
        }
    }
}
