use serde::{Deserialize, Serialize};

use crate::spotify::Track;

/// A playlist being filled by one build.
///
/// The id is assigned by Spotify when the playlist is created and never changes.
/// Track ids are kept in the order they were added, duplicates included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDraft {
    pub playlist_id: String,
    pub name: String,
    pub accepted: Vec<Track>,
    pub pages_fetched: usize,
}

impl PlaylistDraft {
    pub fn new(playlist_id: String, name: String) -> Self {
        Self {
            playlist_id,
            name,
            accepted: Vec::new(),
            pages_fetched: 0,
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.accepted.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn record_page(&mut self, accepted: Vec<Track>) {
        self.pages_fetched += 1;
        self.accepted.extend(accepted);
    }
}
