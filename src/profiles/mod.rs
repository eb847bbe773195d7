//! The signed-in user's own profile.

pub mod ops;
mod page;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(page::profile))
        .route("/profile/edit", get(page::edit_page).post(page::edit))
}
