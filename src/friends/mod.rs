//! Directional friend links ("following") and the people directory.

pub mod ops;
mod pages;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/friends", get(pages::index))
        .route("/friends/find", get(pages::find))
        .route("/friends/{id}", get(pages::details))
        .route("/friends/{id}/delete", get(pages::delete_page).post(pages::delete))
        .route("/friends/{id}/follow", post(pages::follow))
}
