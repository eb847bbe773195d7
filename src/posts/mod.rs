//! The shared post feed.

mod ajax;
pub mod ops;
mod pages;

use axum::{routing::{get, post}, Router};
use serde::Deserialize;

use crate::{
    db::DEFAULT_CATEGORY,
    error::ActionError,
    validate::{non_blank, FieldErrors},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(pages::index))
        .route("/posts/new", get(pages::new_page).post(pages::create))
        .route("/posts/{id}/edit", get(pages::edit_page).post(pages::edit))
        .route("/posts/{id}/delete", get(pages::delete_page).post(pages::delete))
        .route("/posts/{id}/edit-ajax", post(ajax::edit))
        .route("/posts/{id}/delete-ajax", post(ajax::delete))
}

/// What a user may submit for a post. Author fields are not part of it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl PostForm {
    pub fn check(&self) -> Result<(), ActionError> {
        let mut errors = FieldErrors::new();
        errors.required("title", &self.title, "Title is required");
        errors.max_len("title", &self.title, 200, "Title cannot exceed 200 characters");
        errors.required("content", &self.content, "Content is required");
        errors.max_len("content", &self.content, 5000, "Content cannot exceed 5000 characters");
        if let Some(url) = &self.image_url {
            errors.max_len("image_url", url, 500, "Image URL cannot exceed 500 characters");
        }
        errors.finish().map_err(ActionError::Invalid)
    }

    pub fn category(&self) -> String {
        self.category
            .as_deref()
            .and_then(non_blank)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned())
    }

    pub fn image_url(&self) -> Option<String> {
        self.image_url.as_deref().and_then(non_blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_category_falls_back_and_blank_image_is_dropped() {
        let form = PostForm {
            title: "Hi".into(),
            content: "Body".into(),
            category: Some("   ".into()),
            image_url: Some(" ".into()),
        };
        assert!(form.check().is_ok());
        assert_eq!(form.category(), "General");
        assert_eq!(form.image_url(), None);
    }

    #[test]
    fn limits_are_checked_per_field() {
        let form = PostForm {
            title: "x".repeat(201),
            content: String::new(),
            category: None,
            image_url: Some("u".repeat(501)),
        };
        let Err(ActionError::Invalid(errors)) = form.check() else { panic!("expected field errors") };
        assert!(errors.has("title"));
        assert!(errors.has("content"));
        assert!(errors.has("image_url"));
    }

    #[test]
    fn a_200_character_title_is_fine() {
        let form = PostForm { title: "x".repeat(200), content: "y".into(), ..Default::default() };
        assert!(form.check().is_ok());
    }
}
