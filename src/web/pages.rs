use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
    Form,
};
use serde::Deserialize;
use tracing::info;

use crate::classifier::{classify, weighted_average};
use crate::error::Result;
use crate::playlist::{PlaylistBuilder, PlaylistForm, PlaylistSink, BUILD_PAGE_SIZE};
use crate::spotify::{
    fetch_sample, PageRequest, RecommendedTrack, SpotifyClient, TimeRange, TrackSource,
};
use crate::web::{render, AppState};

const TOP_ARTISTS_LIMIT: u32 = 50;
const RECENTLY_PLAYED_LIMIT: u32 = 50;

const RECOMMENDATION_SEEDS: usize = 5;
const RECOMMENDATION_ROUNDS: usize = 5;
const RECOMMENDATION_LIMIT: u32 = 20;
const RECOMMENDATION_MAX_POPULARITY: u8 = 30;
const RECOMMENDATION_PLAYLIST: &str = "Recommended";

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    time_range: Option<TimeRange>,
}

impl RangeQuery {
    fn or(&self, default: TimeRange) -> TimeRange {
        self.time_range.unwrap_or(default)
    }
}

pub async fn index() -> Html<String> {
    Html(render::login_page())
}

pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;

    let user = state.run(session_id, &client, client.current_user()).await?;
    info!("Loaded profile for {}", user.id);

    Ok(Html(render::profile_page(&user)))
}

pub async fn top_tracks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;
    let time_range = query.or(TimeRange::MediumTerm);

    let tracks = state
        .run(
            session_id,
            &client,
            fetch_sample(&client, time_range, state.config.sample_size),
        )
        .await?;

    Ok(Html(render::top_tracks_page(&tracks, time_range)))
}

pub async fn top_artists(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;
    let time_range = query.or(TimeRange::ShortTerm);

    let artists = state
        .run(session_id, &client, client.top_artists(time_range, TOP_ARTISTS_LIMIT))
        .await?;

    Ok(Html(render::top_artists_page(&artists, time_range)))
}

pub async fn recent_tracks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;
    let time_range = query.or(TimeRange::ShortTerm);

    let tracks = state
        .run(
            session_id,
            &client,
            fetch_sample(&client, time_range, state.config.sample_size),
        )
        .await?;
    let buckets = classify(&tracks);
    info!(
        "Bucketed {} tracks: {} popular, {} mid, {} indie",
        buckets.len(),
        buckets.popular.len(),
        buckets.mid.len(),
        buckets.indie.len()
    );

    Ok(Html(render::buckets_page(&buckets, time_range)))
}

pub async fn recently_played(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;

    let tracks = state
        .run(session_id, &client, client.recently_played(RECENTLY_PLAYED_LIMIT))
        .await?;

    Ok(Html(render::recently_played_page(&tracks)))
}

pub async fn average_popularity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;
    let time_range = query.or(TimeRange::ShortTerm);
    let sample_size = state.config.sample_size;

    let tracks = state
        .run(session_id, &client, fetch_sample(&client, time_range, sample_size))
        .await?;
    let average = weighted_average(&tracks, sample_size);
    info!(
        "Weighted average popularity over {} of {} tracks: {:.3}",
        tracks.len(),
        sample_size,
        average
    );

    Ok(Html(render::average_page(average, time_range)))
}

pub async fn create_playlist_form(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;

    let preview = state
        .run(
            session_id,
            &client,
            client.fetch_page(PageRequest::first(TimeRange::MediumTerm, BUILD_PAGE_SIZE)),
        )
        .await?;

    Ok(Html(render::playlist_form_page(&preview)))
}

pub async fn create_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PlaylistForm>,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;
    let request = form.validate()?;

    let draft = state
        .run(session_id, &client, async {
            let user = client.current_user().await?;
            info!(
                "Building playlist '{}' with popularity in ({}, {}), target {} from {}",
                request.playlist_name,
                request.criteria.range.min,
                request.criteria.range.max,
                request.criteria.target_count,
                request.criteria.time_range
            );

            PlaylistBuilder::new(&client).build(&user.id, &request).await
        })
        .await?;

    Ok(Html(render::playlist_created_page(&draft)))
}

/// Seeds recommendations with the user's short-term top artists, asks for
/// low-popularity tracks several times and saves the last batch as a playlist.
pub async fn recommendation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>> {
    let (session_id, client) = state.authorize(&headers).await?;

    let shown = state
        .run(session_id, &client, recommend_and_save(&client))
        .await?;

    Ok(Html(match shown {
        Some(tracks) => render::recommendation_page(&tracks, Some(RECOMMENDATION_PLAYLIST)),
        None => render::recommendation_page(&[], None),
    }))
}

/// Every recommended track shown to the user, or `None` without saving
/// anything when the user has no top artists to seed from.
async fn recommend_and_save(client: &SpotifyClient) -> Result<Option<Vec<RecommendedTrack>>> {
    let seeds: Vec<String> = client
        .top_artists(TimeRange::ShortTerm, RECOMMENDATION_LIMIT)
        .await?
        .into_iter()
        .take(RECOMMENDATION_SEEDS)
        .map(|artist| artist.id)
        .collect();

    if seeds.is_empty() {
        return Ok(None);
    }

    let mut rounds = Vec::with_capacity(RECOMMENDATION_ROUNDS);
    for _ in 0..RECOMMENDATION_ROUNDS {
        rounds.push(
            client
                .recommendations(&seeds, RECOMMENDATION_MAX_POPULARITY, RECOMMENDATION_LIMIT)
                .await?,
        );
    }
    let shown: Vec<RecommendedTrack> = rounds.iter().flatten().cloned().collect();
    let latest = rounds.last().map(Vec::as_slice).unwrap_or_default();

    let user = client.current_user().await?;
    let playlist_id = client
        .create_playlist(&user.id, RECOMMENDATION_PLAYLIST, true)
        .await?;
    let track_ids: Vec<String> = latest.iter().map(|t| t.id.clone()).collect();
    client.add_items(&playlist_id, &track_ids).await?;
    info!(
        "Saved {} recommended tracks to playlist {}",
        track_ids.len(),
        playlist_id
    );

    Ok(Some(shown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::AppError;
    use crate::session::{mock_token, SESSION_COOKIE};
    use axum::http::{header, HeaderValue};

    async fn logged_in() -> (AppState, HeaderMap) {
        let state = AppState::new(Config::mock());
        let id = state.sessions.start(mock_token(3600, None)).await;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, id)).unwrap(),
        );
        (state, headers)
    }

    fn form(min_pop: &str, max_pop: &str, max_songs: &str) -> PlaylistForm {
        PlaylistForm {
            playlist_name: "Deep cuts".to_string(),
            min_pop: min_pop.to_string(),
            max_pop: max_pop.to_string(),
            time_range: "short_term".to_string(),
            max_songs: max_songs.to_string(),
        }
    }

    // The session holds a fake token, so any Spotify call would fail upstream
    // rather than with InvalidInput.
    #[tokio::test]
    async fn test_create_playlist_rejects_invalid_form() {
        let (state, headers) = logged_in().await;

        let invalid = [
            form("80", "20", "10"),
            form("0", "101", "10"),
            form("0", "50", "0"),
        ];

        for bad in invalid {
            let result = create_playlist(State(state.clone()), headers.clone(), Form(bad)).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_create_playlist_rejects_missing_name() {
        let (state, headers) = logged_in().await;
        let mut unnamed = form("0", "50", "10");
        unnamed.playlist_name = "   ".to_string();

        let result = create_playlist(State(state), headers, Form(unnamed)).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_playlist_requires_session() {
        let state = AppState::new(Config::mock());

        let valid = form("0", "50", "10");

        let result = create_playlist(State(state), HeaderMap::new(), Form(valid)).await;

        assert!(matches!(result, Err(AppError::AuthMissing)));
    }
}
