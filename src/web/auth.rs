use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chrono::Duration;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::session::{expired_login_cookie, expired_session_cookie, login_cookie, session_cookie};
use crate::web::{login_state, session_id, AppState};

/// Sessions unused for this long are dropped whenever someone logs in.
const MAX_SESSION_IDLE_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn login(State(state): State<AppState>) -> Result<Response> {
    let oauth_state = state.sessions.begin_login().await;
    let auth_url = state.login_client(&oauth_state).authorize_url()?;

    Ok((
        [(header::SET_COOKIE, login_cookie(&oauth_state))],
        Redirect::to(&auth_url),
    )
        .into_response())
}

pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    if let Some(error) = params.error {
        return Err(AppError::Auth(format!("Spotify denied access: {}", error)));
    }

    let oauth_state = verify_login_state(&state, &headers, params.state.as_deref()).await?;

    let code = params
        .code
        .ok_or_else(|| AppError::Auth("missing authorization code".into()))?;

    let token = state.login_client(&oauth_state).exchange_code(&code).await?;

    if let Some(previous) = session_id(&headers) {
        state.sessions.end(previous).await;
    }
    state
        .sessions
        .prune_idle(Duration::hours(MAX_SESSION_IDLE_HOURS))
        .await;

    let id = state.sessions.start(token).await;
    info!("User logged in");

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie(id)),
            (header::SET_COOKIE, expired_login_cookie()),
        ]),
        Redirect::to("/profile"),
    )
        .into_response())
}

/// The callback's `state` must match the one this browser was issued, and is
/// consumed so it cannot complete a second login.
async fn verify_login_state(
    state: &AppState,
    headers: &HeaderMap,
    returned: Option<&str>,
) -> Result<String> {
    let expected = login_state(headers)
        .ok_or_else(|| AppError::Auth("no login in progress".into()))?;

    if returned != Some(expected.as_str()) {
        return Err(AppError::Auth("state mismatch in callback".into()));
    }

    if !state.sessions.complete_login(&expected).await {
        warn!("Rejected unknown or reused login state");
        return Err(AppError::Auth("login expired or already used".into()));
    }

    Ok(expected)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.end(id).await;
    }

    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::LOGIN_COOKIE;
    use axum::http::HeaderValue;

    fn state_from(response: &Response) -> String {
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        url::Url::parse(location)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap()
    }

    fn login_headers(oauth_state: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", LOGIN_COOKIE, oauth_state)).unwrap(),
        );
        headers
    }

    fn params(oauth_state: &str) -> CallbackParams {
        CallbackParams {
            code: None,
            state: Some(oauth_state.to_string()),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_each_login_gets_its_own_state() {
        let state = AppState::new(Config::mock());

        let first = login(State(state.clone())).await.unwrap();
        let second = login(State(state.clone())).await.unwrap();

        let first_state = state_from(&first);
        let second_state = state_from(&second);
        assert_ne!(first_state, second_state);

        let cookie = first.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("{}={};", LOGIN_COOKIE, first_state)));
    }

    #[tokio::test]
    async fn test_login_state_is_consumed_once() {
        let state = AppState::new(Config::mock());
        let oauth_state = state.sessions.begin_login().await;
        let headers = login_headers(&oauth_state);

        let first = verify_login_state(&state, &headers, Some(&oauth_state)).await;
        assert_eq!(first.unwrap(), oauth_state);

        let replay = verify_login_state(&state, &headers, Some(&oauth_state)).await;
        assert!(matches!(replay, Err(AppError::Auth(_))));
    }

    #[tokio::test]
    async fn test_replayed_callback_is_rejected() {
        let state = AppState::new(Config::mock());
        let oauth_state = state.sessions.begin_login().await;
        assert!(state.sessions.complete_login(&oauth_state).await);

        let result = callback(
            State(state.clone()),
            login_headers(&oauth_state),
            Query(params(&oauth_state)),
        )
        .await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_state_from_another_browser_is_rejected() {
        let state = AppState::new(Config::mock());
        let mine = state.sessions.begin_login().await;
        let theirs = state.sessions.begin_login().await;

        let result = verify_login_state(&state, &login_headers(&mine), Some(&theirs)).await;
        assert!(matches!(result, Err(AppError::Auth(_))));

        // Neither attempt was consumed by the mismatch
        assert!(state.sessions.complete_login(&mine).await);
        assert!(state.sessions.complete_login(&theirs).await);
    }

    #[tokio::test]
    async fn test_callback_without_login_cookie_is_rejected() {
        let state = AppState::new(Config::mock());
        let oauth_state = state.sessions.begin_login().await;

        let result = verify_login_state(&state, &HeaderMap::new(), Some(&oauth_state)).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert!(state.sessions.complete_login(&oauth_state).await);
    }

    #[tokio::test]
    async fn test_unissued_state_is_rejected() {
        let state = AppState::new(Config::mock());

        let result = verify_login_state(&state, &login_headers("forged"), Some("forged")).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
    }
}
