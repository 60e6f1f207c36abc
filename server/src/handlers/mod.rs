//! Request handlers, one per screen

pub mod auth;
pub mod books;

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::{DateTime, Utc};

use bookman_core::{AuthError, CatalogError, CoreError, Session, SessionError};

use crate::cookies;
use crate::state::AppState;
use crate::views;

/// What every handler needs to know about the caller.
pub struct RequestContext {
    /// Raw session cookie, if the browser sent one
    pub session_id: Option<String>,
    /// Key for login throttling
    pub caller: String,
    pub now: DateTime<Utc>,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let config = state.manager().config();
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self {
            session_id: cookies::read(&parts.headers, &config.session.cookie_name)
                .map(str::to_string),
            caller: caller_key(&parts.headers, peer, &config.login.trusted_proxies),
            now: Utc::now(),
        })
    }
}

/// The TCP peer, unless the peer is a configured reverse proxy, in which
/// case the client address it forwarded. Headers from any other peer are
/// ignored since the client can set them to anything.
pub fn caller_key(headers: &HeaderMap, peer: Option<IpAddr>, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = peer else {
        return "unknown".into();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    for header_name in ["X-Forwarded-For", "X-Real-IP"] {
        if let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    peer.to_string()
}

pub async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

/// Attach the session cookie so rotated ids reach the browser.
pub(crate) fn with_session(state: &AppState, session_id: &str, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    cookies::set_session(&mut response, &state.manager().config().session, session_id);
    response
}

/// Protected-page gate. On failure the response sends the browser to the
/// login form with its cookie cleared.
pub(crate) fn require_session(state: &AppState, ctx: &RequestContext) -> Result<Session, Response> {
    match state.manager().authorize(ctx.session_id.as_deref(), ctx.now) {
        Ok(session) => Ok(session),
        Err(err) if err.is_internal() => Err(internal_error(&err)),
        Err(err) => {
            let target = match &err {
                CoreError::Session(SessionError::Expired) => "/login?timeout=1",
                _ => "/login",
            };
            tracing::debug!(caller = %ctx.caller, "Unauthorized request: {err}");

            let mut response = Redirect::to(target).into_response();
            cookies::clear_session(&mut response, &state.manager().config().session);
            Err(response)
        }
    }
}

pub(crate) fn set_flash(state: &AppState, session_id: &str, message: impl Into<String>) {
    if let Err(e) = state.manager().sessions().set_flash(session_id, message) {
        tracing::debug!("Dropped flash message: {e}");
    }
}

/// Flash a message and return to the listing.
pub(crate) fn back_to_list(state: &AppState, session_id: &str, message: impl Into<String>) -> Response {
    set_flash(state, session_id, message);
    with_session(state, session_id, Redirect::to("/books"))
}

pub(crate) fn status_for(err: &CoreError) -> StatusCode {
    if err.is_internal() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if err.is_csrf() {
        return StatusCode::FORBIDDEN;
    }
    match err {
        CoreError::Auth(AuthError::LockedOut { .. }) => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        CoreError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

pub(crate) fn internal_error(err: &CoreError) -> Response {
    tracing::error!("Request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(views::error_page(&err.user_message())),
    )
        .into_response()
}
