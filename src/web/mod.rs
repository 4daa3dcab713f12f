pub mod auth;
pub mod pages;
pub mod render;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use rspotify::OAuth;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::session::{cookie_value, session_id_from_cookie, SessionStore, LOGIN_COOKIE};
use crate::spotify::client::oauth_settings;
use crate::spotify::SpotifyClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub oauth: Arc<OAuth>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let oauth = oauth_settings(&config);
        Self {
            config: Arc::new(config),
            oauth: Arc::new(oauth),
            sessions: SessionStore::new(),
        }
    }

    /// Client for one login attempt, carrying that attempt's `state`.
    pub fn login_client(&self, oauth_state: &str) -> SpotifyClient {
        let oauth = OAuth {
            state: oauth_state.to_string(),
            ..(*self.oauth).clone()
        };
        SpotifyClient::unauthenticated(&self.config, &oauth)
    }

    /// Resolves the request's session into a client carrying its token.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<(Uuid, SpotifyClient)> {
        let session_id = session_id(headers).ok_or(AppError::AuthMissing)?;
        let token = self.sessions.credential(session_id).await?;
        let client = SpotifyClient::with_token(&self.config, &self.oauth, token).await?;

        Ok((session_id, client))
    }

    /// Writes back a token that rspotify refreshed while serving the request.
    pub async fn persist_token(&self, session_id: Uuid, client: &SpotifyClient) {
        match client.token().await {
            Ok(Some(token)) => self.sessions.update_token(session_id, token).await,
            Ok(None) => {}
            Err(e) => warn!("Could not read token for session {}: {}", session_id, e),
        }
    }

    /// Runs a handler's Spotify calls, then persists the client's token whether
    /// or not they succeeded.
    pub async fn run<T, F>(&self, session_id: Uuid, client: &SpotifyClient, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = work.await;
        self.persist_token(session_id, client).await;
        result
    }
}

pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_id_from_cookie)
}

/// The OAuth `state` this browser was given when it started logging in.
pub fn login_state(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| cookie_value(value, LOGIN_COOKIE))
        .map(str::to_string)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AuthMissing => Redirect::to("/").into_response(),
            AppError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                Html(render::error_page("Invalid input", &message)),
            )
                .into_response(),
            AppError::Auth(message) => {
                warn!("Login failed: {}", message);
                (
                    StatusCode::UNAUTHORIZED,
                    Html(render::error_page("Login failed", &message)),
                )
                    .into_response()
            }
            e if e.is_upstream() => {
                warn!("Spotify request failed: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    Html(render::error_page(
                        "Something went wrong",
                        "Spotify could not complete the request. Please try again.",
                    )),
                )
                    .into_response()
            }
            e => {
                error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(render::error_page("Something went wrong", "Internal error")),
                )
                    .into_response()
            }
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", get(auth::logout))
        .route("/profile", get(pages::profile))
        .route("/top-tracks", get(pages::top_tracks))
        .route("/top-artists", get(pages::top_artists))
        .route("/recent-tracks", get(pages::recent_tracks))
        .route("/recently-played", get(pages::recently_played))
        .route("/average_popularity", get(pages::average_popularity))
        .route(
            "/create_playlist",
            get(pages::create_playlist_form).post(pages::create_playlist),
        )
        .route("/recommendation", get(pages::recommendation))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn serve(config: Config, addr: SocketAddr) -> Result<()> {
    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{mock_token, SESSION_COOKIE};
    use axum::http::HeaderValue;

    #[test]
    fn test_session_id_from_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, id)).unwrap(),
        );

        assert_eq!(session_id(&headers), Some(id));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_authorize_without_cookie_is_auth_missing() {
        let state = AppState::new(Config::mock());

        let result = state.authorize(&HeaderMap::new()).await;

        assert!(matches!(result, Err(AppError::AuthMissing)));
    }

    #[tokio::test]
    async fn test_authorize_with_session_returns_client() {
        let state = AppState::new(Config::mock());
        let id = state.sessions.start(mock_token(3600, None)).await;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, id)).unwrap(),
        );

        let (session_id, client) = state.authorize(&headers).await.unwrap();

        assert_eq!(session_id, id);
        let token = client.token().await.unwrap().unwrap();
        assert_eq!(token.access_token, "access");
    }

    #[test]
    fn test_login_client_uses_given_state() {
        let state = AppState::new(Config::mock());

        let url = state.login_client("abc123").authorize_url().unwrap();
        let url = url::Url::parse(&url).unwrap();

        let oauth_state = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned());
        assert_eq!(oauth_state.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_run_persists_token_when_work_fails() {
        let state = AppState::new(Config::mock());
        let id = state.sessions.start(mock_token(3600, Some("refresh"))).await;
        let token = mock_token(3600, Some("refresh"));
        let client = SpotifyClient::with_token(&state.config, &state.oauth, token)
            .await
            .unwrap();

        let result: Result<()> = state
            .run(id, &client, async {
                let mut refreshed = mock_token(3600, Some("refresh"));
                refreshed.access_token = "refreshed".to_string();
                client.set_token(refreshed).await?;
                Err(AppError::MalformedResponse("upstream broke".into()))
            })
            .await;

        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
        let stored = state.sessions.credential(id).await.unwrap();
        assert_eq!(stored.access_token, "refreshed");
    }

    #[test]
    fn test_error_responses() {
        assert_eq!(
            AppError::AuthMissing.into_response().status(),
            StatusCode::SEE_OTHER
        );
        assert_eq!(
            AppError::InvalidInput("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MalformedResponse("bad".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Config("bad".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
