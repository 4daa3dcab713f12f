use rspotify::{
    model::{ArtistId, FullTrack, PlayableId, PlaylistId, RecommendationsAttribute, TrackId, UserId},
    prelude::*,
    AuthCodeSpotify, Config as ClientConfig, Credentials, OAuth, Token,
};
use tracing::{debug, info};

use crate::config::{Config, SPOTIFY_SCOPES};
use crate::error::{AppError, Result};
use crate::playlist::PlaylistSink;
use crate::spotify::models::{Artist, PageRequest, RecommendedTrack, TimeRange, Track, UserProfile};
use crate::spotify::source::TrackSource;

/// OAuth settings shared by every client of one running server. Each login
/// overrides `state` with its own value.
pub fn oauth_settings(config: &Config) -> OAuth {
    OAuth {
        redirect_uri: config.spotify_redirect_uri.clone(),
        scopes: SPOTIFY_SCOPES.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub struct SpotifyClient {
    client: AuthCodeSpotify,
}

impl SpotifyClient {
    /// Client without a token, used to start and finish the login flow.
    pub fn unauthenticated(config: &Config, oauth: &OAuth) -> Self {
        let creds = Credentials::new(&config.spotify_client_id, &config.spotify_client_secret);
        let client = AuthCodeSpotify::with_config(
            creds,
            oauth.clone(),
            ClientConfig {
                token_refreshing: true,
                ..Default::default()
            },
        );

        Self { client }
    }

    /// Client acting for a logged-in user. Expired tokens are refreshed by rspotify
    /// on the next call when a refresh token is present.
    pub async fn with_token(config: &Config, oauth: &OAuth, token: Token) -> Result<Self> {
        let spotify = Self::unauthenticated(config, oauth);
        spotify.set_token(token).await?;

        Ok(spotify)
    }

    pub async fn set_token(&self, token: Token) -> Result<()> {
        *self
            .client
            .token
            .lock()
            .await
            .map_err(|_| AppError::Auth("token lock unavailable".into()))? = Some(token);

        Ok(())
    }

    pub fn authorize_url(&self) -> Result<String> {
        Ok(self.client.get_authorize_url(false)?)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        self.client.request_token(code).await?;

        let token = self
            .token()
            .await?
            .ok_or_else(|| AppError::Auth("Spotify returned no token".into()))?;

        info!("Exchanged authorization code for an access token");
        Ok(token)
    }

    /// Current token, which may have been refreshed since the client was built.
    pub async fn token(&self) -> Result<Option<Token>> {
        let token = self
            .client
            .token
            .lock()
            .await
            .map_err(|_| AppError::Auth("token lock unavailable".into()))?;

        Ok(token.clone())
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        let user = self.client.current_user().await?;
        let id = user.id.id().to_string();

        Ok(UserProfile {
            display_name: user.display_name.unwrap_or_else(|| id.clone()),
            image_url: user
                .images
                .and_then(|images| images.into_iter().next())
                .map(|image| image.url),
            id,
        })
    }

    pub async fn top_artists(&self, time_range: TimeRange, limit: u32) -> Result<Vec<Artist>> {
        let page = self
            .client
            .current_user_top_artists_manual(Some(time_range.into()), Some(limit), Some(0))
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(|artist| Artist {
                id: artist.id.id().to_string(),
                name: artist.name,
                genres: artist.genres,
                popularity: clamp_popularity(artist.popularity),
            })
            .collect())
    }

    pub async fn recently_played(&self, limit: u32) -> Result<Vec<Track>> {
        let page = self
            .client
            .current_user_recently_played(Some(limit), None)
            .await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(|history| convert_track(history.track))
            .collect())
    }

    pub async fn recommendations(
        &self,
        seed_artist_ids: &[String],
        max_popularity: u8,
        limit: u32,
    ) -> Result<Vec<RecommendedTrack>> {
        let seeds = seed_artist_ids
            .iter()
            .map(|id| ArtistId::from_id(id.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::MalformedResponse(format!("Invalid artist id: {}", e)))?;

        let recommendations = self
            .client
            .recommendations(
                [RecommendationsAttribute::MaxPopularity(i32::from(max_popularity))],
                Some(seeds),
                None::<Vec<&str>>,
                None::<Vec<TrackId<'_>>>,
                None,
                Some(limit),
            )
            .await?;

        Ok(recommendations
            .tracks
            .into_iter()
            .filter_map(|track| {
                Some(RecommendedTrack {
                    id: track.id?.id().to_string(),
                    name: track.name,
                    artists: track.artists.into_iter().map(|a| a.name).collect(),
                })
            })
            .collect())
    }
}

impl TrackSource for SpotifyClient {
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<Track>> {
        let page = self
            .client
            .current_user_top_tracks_manual(
                Some(request.time_range.into()),
                Some(request.limit),
                Some(request.offset),
            )
            .await?;

        Ok(page.items.into_iter().filter_map(convert_track).collect())
    }
}

impl PlaylistSink for SpotifyClient {
    async fn create_playlist(&self, user_id: &str, name: &str, public: bool) -> Result<String> {
        let user_id = UserId::from_id(user_id)
            .map_err(|e| AppError::MalformedResponse(format!("Invalid user id: {}", e)))?;

        let playlist = self
            .client
            .user_playlist_create(user_id, name, Some(public), Some(false), None)
            .await?;

        Ok(playlist.id.id().to_string())
    }

    async fn add_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let playlist_id = PlaylistId::from_id(playlist_id)
            .map_err(|e| AppError::MalformedResponse(format!("Invalid playlist id: {}", e)))?;

        let items = track_ids
            .iter()
            .map(|id| TrackId::from_id(id.as_str()).map(PlayableId::Track))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::MalformedResponse(format!("Invalid track id: {}", e)))?;

        self.client.playlist_add_items(playlist_id, items, None).await?;
        Ok(())
    }
}

fn convert_track(track: FullTrack) -> Option<Track> {
    // Local files have no Spotify id
    let Some(id) = track.id else {
        debug!("Skipping local track: {}", track.name);
        return None;
    };

    Some(Track {
        id: id.id().to_string(),
        artist: track
            .artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_default(),
        name: track.name,
        popularity: clamp_popularity(track.popularity),
    })
}

fn clamp_popularity(popularity: u32) -> u8 {
    popularity.min(100) as u8
}
