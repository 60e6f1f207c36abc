//! Login and logout screens

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use bookman_core::{AuthState, CoreError, LoginForm};

use super::{internal_error, require_session, set_flash, status_for, with_session, RequestContext};
use crate::cookies;
use crate::state::AppState;
use crate::views::{self, LoginView};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub timeout: Option<String>,
    pub logged_out: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CsrfForm {
    pub csrf_token: String,
}

/// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<LoginQuery>,
) -> Response {
    let manager = state.manager();
    let session = manager.open_session(ctx.session_id.as_deref(), ctx.now);

    if session.is_authenticated() {
        return with_session(&state, &session.id, Redirect::to("/books"));
    }

    let flash = manager.sessions().take_flash(&session.id);
    let notice = if query.timeout.is_some() {
        Some("Your session expired. Please sign in again.".to_string())
    } else if query.logged_out.is_some() {
        Some("You have been signed out.".to_string())
    } else {
        flash
    };

    let locked = manager.auth_state(&session, &ctx.caller, ctx.now) == AuthState::LockedOut;
    let error = if locked {
        manager
            .throttle()
            .check(&ctx.caller, ctx.now)
            .err()
            .map(|e| CoreError::from(e).user_message())
    } else {
        None
    };

    let html = views::login_page(&LoginView {
        csrf_token: &session.csrf_token,
        username: "",
        notice: notice.as_deref(),
        error: error.as_deref(),
        locked,
    });
    with_session(&state, &session.id, Html(html))
}

/// POST /login
pub async fn login_submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Response {
    let manager = state.manager();
    let session = manager.open_session(ctx.session_id.as_deref(), ctx.now);

    match manager.login(&session.id, &ctx.caller, &form, ctx.now) {
        Ok(session) => with_session(&state, &session.id, Redirect::to("/books")),
        Err(err) if err.is_internal() => internal_error(&err),
        Err(err) => {
            let current = manager
                .sessions()
                .get(&session.id)
                .unwrap_or(session);
            let locked = manager.auth_state(&current, &ctx.caller, ctx.now) == AuthState::LockedOut;

            let html = views::login_page(&LoginView {
                csrf_token: &current.csrf_token,
                username: form.username.trim(),
                notice: None,
                error: Some(&err.user_message()),
                locked,
            });
            with_session(&state, &current.id, (status_for(&err), Html(html)))
        }
    }
}

/// GET /logout shows a confirmation form; the session ends only on POST.
pub async fn logout_page(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let html = views::logout_page(session.username().unwrap_or_default(), &session.csrf_token);
    with_session(&state, &session.id, Html(html))
}

/// POST /logout
pub async fn logout_submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<CsrfForm>,
) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.manager().logout(&session.id, &form.csrf_token, &ctx.caller) {
        Ok(()) => {
            let mut response = Redirect::to("/login?logged_out=1").into_response();
            cookies::clear_session(&mut response, &state.manager().config().session);
            response
        }
        Err(err) => {
            set_flash(&state, &session.id, err.user_message());
            with_session(&state, &session.id, Redirect::to("/books"))
        }
    }
}
