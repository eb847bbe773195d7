use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::session;

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

/// Only same-site paths. Browsers read `/\host` as `//host` and drop tabs
/// and newlines, so those are refused too.
fn local_path(url: Option<String>) -> Option<String> {
    url.filter(|url| {
        url.starts_with('/')
            && !matches!(url.as_bytes().get(1), Some(b'/' | b'\\'))
            && !url.chars().any(char::is_control)
    })
}

#[debug_handler]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    session: Session,
) -> Redirect {
    session::sign_out(&session).await;
    Redirect::to(local_path(return_url).as_deref().unwrap_or("/login"))
}
