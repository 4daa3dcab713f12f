use serde::{Deserialize, Serialize};

use crate::classifier::PopularityRange;
use crate::error::{AppError, Result};
use crate::spotify::TimeRange;

const MAX_POPULARITY: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub range: PopularityRange,
    pub target_count: usize,
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildRequest {
    pub playlist_name: String,
    pub criteria: FilterCriteria,
}

/// Raw values posted by the create-playlist form, all unchecked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistForm {
    pub playlist_name: String,
    pub min_pop: String,
    pub max_pop: String,
    pub time_range: String,
    pub max_songs: String,
}

impl PlaylistForm {
    pub fn validate(&self) -> Result<BuildRequest> {
        let playlist_name = self.playlist_name.trim();
        if playlist_name.is_empty() {
            return Err(AppError::InvalidInput("playlist name is required".into()));
        }

        let min = parse_popularity("min_pop", &self.min_pop)?;
        let max = parse_popularity("max_pop", &self.max_pop)?;
        if min > max {
            return Err(AppError::InvalidInput(format!(
                "min_pop ({}) must not exceed max_pop ({})",
                min, max
            )));
        }

        let target_count = parse_integer("max_songs", &self.max_songs)?;
        if target_count < 1 {
            return Err(AppError::InvalidInput("max_songs must be at least 1".into()));
        }

        let time_range = self.time_range.parse::<TimeRange>()?;

        Ok(BuildRequest {
            playlist_name: playlist_name.to_string(),
            criteria: FilterCriteria {
                range: PopularityRange::new(min, max),
                target_count: target_count as usize,
                time_range,
            },
        })
    }
}

fn parse_integer(field: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::InvalidInput(format!("{} must be a whole number, got '{}'", field, raw)))
}

fn parse_popularity(field: &str, raw: &str) -> Result<u8> {
    let value = parse_integer(field, raw)?;
    if !(0..=MAX_POPULARITY).contains(&value) {
        return Err(AppError::InvalidInput(format!(
            "{} must be between 0 and {}, got {}",
            field, MAX_POPULARITY, value
        )));
    }
    Ok(value as u8)
}
