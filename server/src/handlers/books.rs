//! Catalog screens: listing, add, edit and delete

use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use bookman_core::{parse_page_param, BookForm, CatalogError, CoreError, Session};

use super::{
    back_to_list, internal_error, require_session, status_for, with_session, RequestContext,
};
use crate::state::AppState;
use crate::views::{self, BookFormView};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Add/edit submission: the book fields plus the CSRF token.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookSubmission {
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    pub csrf_token: String,
}

impl BookSubmission {
    fn book(&self) -> BookForm {
        BookForm {
            title: self.title.clone(),
            author: self.author.clone(),
            year: self.year.clone(),
            genre: self.genre.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub id: String,
    pub csrf_token: String,
}

fn parse_id(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// GET /
pub async fn home() -> Redirect {
    Redirect::to("/books")
}

/// GET /books?page=N
pub async fn list(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let manager = state.manager();

    let page = match manager.list_books(parse_page_param(query.page.as_deref())) {
        Ok(page) => page,
        Err(err) => return internal_error(&err),
    };
    let flash = manager.sessions().take_flash(&session.id);

    let html = views::book_list(
        &page,
        session.username().unwrap_or_default(),
        &session.csrf_token,
        flash.as_deref(),
    );
    with_session(&state, &session.id, Html(html))
}

fn render_form(
    state: &AppState,
    session: &Session,
    heading: &str,
    action: &str,
    form: &BookForm,
    err: Option<&CoreError>,
) -> Response {
    let errors: Vec<String> = match err {
        Some(CoreError::Catalog(CatalogError::Validation(errors))) => errors.messages(),
        Some(other) => vec![other.user_message()],
        None => Vec::new(),
    };
    // The token may have changed since `session` was read
    let csrf_token = state
        .manager()
        .sessions()
        .get(&session.id)
        .map(|s| s.csrf_token)
        .unwrap_or_else(|| session.csrf_token.clone());

    let html = views::book_form(&BookFormView {
        heading,
        action,
        form,
        errors: &errors,
        username: session.username().unwrap_or_default(),
        csrf_token: &csrf_token,
    });

    match err {
        Some(err) => with_session(state, &session.id, (status_for(err), Html(html))),
        None => with_session(state, &session.id, Html(html)),
    }
}

/// GET /books/add
pub async fn add_page(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };

    render_form(&state, &session, "Add book", "/books/add", &BookForm::default(), None)
}

/// POST /books/add
pub async fn add_submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(submission): Form<BookSubmission>,
) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let form = submission.book();

    match state.manager().add_book(
        &session.id,
        &ctx.caller,
        &submission.csrf_token,
        &form,
        ctx.now,
    ) {
        Ok(id) => back_to_list(&state, &session.id, format!("Book added (id: {id}).")),
        Err(err) if err.is_internal() => internal_error(&err),
        Err(err) => render_form(&state, &session, "Add book", "/books/add", &form, Some(&err)),
    }
}

/// GET /books/{id}/edit
pub async fn edit_page(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(raw_id): Path<String>,
) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.manager().get_book(parse_id(&raw_id)) {
        Ok(book) => {
            let action = format!("/books/{}/edit", book.id);
            render_form(&state, &session, "Edit book", &action, &BookForm::from(&book), None)
        }
        Err(err) if err.is_internal() => internal_error(&err),
        Err(err) => back_to_list(&state, &session.id, err.user_message()),
    }
}

/// POST /books/{id}/edit
pub async fn edit_submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(raw_id): Path<String>,
    Form(submission): Form<BookSubmission>,
) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let id = parse_id(&raw_id);
    let form = submission.book();

    match state.manager().edit_book(
        &session.id,
        &ctx.caller,
        id,
        &submission.csrf_token,
        &form,
        ctx.now,
    ) {
        Ok(()) => back_to_list(&state, &session.id, "Book updated."),
        Err(err) if err.is_internal() => internal_error(&err),
        Err(err @ CoreError::Catalog(CatalogError::NotFound(_))) => {
            back_to_list(&state, &session.id, err.user_message())
        }
        Err(err) => {
            let action = format!("/books/{id}/edit");
            render_form(&state, &session, "Edit book", &action, &form, Some(&err))
        }
    }
}

/// POST /books/delete
pub async fn delete_submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<DeleteForm>,
) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let message = match state.manager().delete_book(
        &session.id,
        &ctx.caller,
        &form.csrf_token,
        parse_id(&form.id),
    ) {
        Ok(book) => format!("Book \"{}\" deleted.", book.title),
        Err(err) if err.is_internal() => {
            tracing::error!("Delete failed: {err}");
            err.user_message()
        }
        Err(err) => err.user_message(),
    };
    back_to_list(&state, &session.id, message)
}

/// GET /books/delete is never allowed to change anything.
pub async fn delete_via_get(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let session = match require_session(&state, &ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };

    back_to_list(&state, &session.id, "Method not allowed. Use the delete button.")
}
