//! Events people can host, join and leave.

mod membership;
pub mod ops;
mod pages;

use axum::{routing::{get, post}, Router};
use serde::Deserialize;
use time::{
    format_description::well_known::Rfc3339,
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime,
};

use crate::{
    error::ActionError,
    validate::{non_blank, FieldErrors},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(pages::index))
        .route("/events/new", get(pages::new_page).post(pages::create))
        .route("/events/{id}/edit", get(pages::edit_page).post(pages::edit))
        .route("/events/{id}/delete", get(pages::delete_page).post(pages::delete))
        .route("/events/{id}/join", post(membership::join))
        .route("/events/{id}/leave", post(membership::leave))
}

/// An event form as submitted. Everything arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub max_participants: String,
    #[serde(default)]
    pub image_url: String,
}

/// A checked and trimmed [`EventForm`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub event_date: OffsetDateTime,
    pub location: String,
    pub max_participants: Option<i32>,
    pub image_url: Option<String>,
}

/// `datetime-local` values carry no offset and are read as UTC. Full
/// RFC 3339 timestamps are accepted too.
pub fn parse_date(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    let minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    let seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

    PrimitiveDateTime::parse(text, minutes)
        .or_else(|_| PrimitiveDateTime::parse(text, seconds))
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|_| OffsetDateTime::parse(text, &Rfc3339))
        .ok()
}

/// The value a `datetime-local` input expects.
pub fn input_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .unwrap_or_default()
}

impl EventForm {
    /// With `not_before`, the date must lie strictly after it.
    pub fn check(&self, not_before: Option<OffsetDateTime>) -> Result<EventInput, ActionError> {
        let mut errors = FieldErrors::new();
        errors.required("title", &self.title, "Event title is required");
        errors.max_len("title", &self.title, 255, "Title cannot exceed 255 characters");
        errors.required("description", &self.description, "Description is required");
        errors.max_len("description", &self.description, 2000, "Description cannot exceed 2000 characters");
        errors.required("location", &self.location, "Location is required");
        errors.max_len("location", &self.location, 255, "Location cannot exceed 255 characters");
        errors.max_len("image_url", &self.image_url, 500, "Image URL cannot exceed 500 characters");

        let event_date = if self.event_date.trim().is_empty() {
            errors.add("event_date", "Event date is required");
            None
        } else {
            let parsed = parse_date(&self.event_date);
            match (parsed, not_before) {
                (None, _) => errors.add("event_date", "Event date is not a valid date"),
                (Some(date), Some(now)) if date <= now => {
                    errors.add("event_date", "Event date must be in the future.")
                }
                _ => {}
            }
            parsed
        };

        let max_participants = match self.max_participants.trim() {
            "" => None,
            text => match text.parse::<i32>() {
                Ok(n) if (1..=1000).contains(&n) => Some(n),
                _ => {
                    errors.add("max_participants", "Max participants must be between 1 and 1000");
                    None
                }
            },
        };

        errors.finish().map_err(ActionError::Invalid)?;
        let Some(event_date) = event_date else {
            return Err(ActionError::Rejected("Event date is required"));
        };

        Ok(EventInput {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            event_date,
            location: self.location.trim().to_owned(),
            max_participants,
            image_url: non_blank(&self.image_url),
        })
    }
}
