use std::future::Future;
use tracing::{debug, info};

use crate::error::Result;
use crate::playlist::criteria::{BuildRequest, FilterCriteria};
use crate::playlist::draft::PlaylistDraft;
use crate::spotify::{PageRequest, Track, TrackSource};

/// Page size used while filling a playlist.
pub const BUILD_PAGE_SIZE: u32 = 20;

/// Write side of the playlist API.
pub trait PlaylistSink {
    /// Creates an empty playlist and returns its id.
    fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Appends tracks in one call. An empty batch must be accepted.
    fn add_items(&self, playlist_id: &str, track_ids: &[String]) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug)]
enum BuildState {
    Idle,
    Created(PlaylistDraft),
    Populating {
        draft: PlaylistDraft,
        page: PageRequest,
    },
    Done(PlaylistDraft),
}

/// Creates a private playlist and fills it from the user's top tracks.
///
/// Each page of top tracks is filtered by the popularity range and the accepted
/// tracks are pushed to the playlist straight away, one call per page, until the
/// target count is reached or Spotify runs out of tracks. Every build creates a
/// new playlist; nothing is cleaned up on failure.
pub struct PlaylistBuilder<'a, C> {
    client: &'a C,
    page_size: u32,
}

impl<'a, C> PlaylistBuilder<'a, C>
where
    C: TrackSource + PlaylistSink + Sync,
{
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            page_size: BUILD_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub async fn build(&self, user_id: &str, request: &BuildRequest) -> Result<PlaylistDraft> {
        let criteria = &request.criteria;
        let mut state = BuildState::Idle;

        loop {
            state = match state {
                BuildState::Idle => {
                    let playlist_id = self
                        .client
                        .create_playlist(user_id, &request.playlist_name, false)
                        .await?;
                    info!(
                        "Created playlist '{}' ({}) for user {}",
                        request.playlist_name, playlist_id, user_id
                    );
                    BuildState::Created(PlaylistDraft::new(
                        playlist_id,
                        request.playlist_name.clone(),
                    ))
                }
                BuildState::Created(draft) => BuildState::Populating {
                    draft,
                    page: PageRequest::first(criteria.time_range, self.page_size),
                },
                BuildState::Populating { draft, page } => {
                    self.populate(draft, page, criteria).await?
                }
                BuildState::Done(draft) => {
                    info!(
                        "Playlist '{}' finished with {} tracks after {} pages",
                        draft.name,
                        draft.accepted_count(),
                        draft.pages_fetched
                    );
                    return Ok(draft);
                }
            };
        }
    }

    async fn populate(
        &self,
        mut draft: PlaylistDraft,
        page: PageRequest,
        criteria: &FilterCriteria,
    ) -> Result<BuildState> {
        let tracks = self.client.fetch_page(page).await?;

        if tracks.is_empty() {
            debug!("No tracks at offset {}, stopping", page.offset);
            return Ok(BuildState::Done(draft));
        }

        let accepted: Vec<Track> = tracks
            .into_iter()
            .filter(|t| criteria.range.accepts(t))
            .collect();
        let track_ids: Vec<String> = accepted.iter().map(|t| t.id.clone()).collect();

        // The batch goes out even when empty.
        self.client.add_items(&draft.playlist_id, &track_ids).await?;

        debug!(
            "Offset {}: accepted {} tracks ({} so far)",
            page.offset,
            track_ids.len(),
            draft.accepted_count() + track_ids.len()
        );
        draft.record_page(accepted);

        if draft.accepted_count() >= criteria.target_count {
            Ok(BuildState::Done(draft))
        } else {
            Ok(BuildState::Populating {
                draft,
                page: page.next(),
            })
        }
    }
}
