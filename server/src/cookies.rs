//! Session cookie plumbing

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::Response;

use bookman_core::SessionConfig;

/// Value of the named cookie from the request's `Cookie` headers.
pub fn read<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn build(config: &SessionConfig, value: &str, max_age: Option<u64>) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict",
        config.cookie_name, value
    );
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

fn append(response: &mut Response, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Refusing to send malformed cookie: {e}"),
    }
}

/// Point the browser at `session_id`.
pub fn set_session(response: &mut Response, config: &SessionConfig, session_id: &str) {
    append(response, build(config, session_id, None));
}

pub fn clear_session(response: &mut Response, config: &SessionConfig) {
    append(response, build(config, "", Some(0)));
}
