//! Row shapes of the remote tables, named after their columns.
//!
//! Full rows are used for reads that feed a page. Narrow "partial" rows
//! (`Credentials`, `PostOwner`, `EventOwner`, `FriendId`, ...) are decoded
//! when a handler only needs one or two columns.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "General";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub fullname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_joined: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_active: bool,
    pub bio: Option<String>,
    pub persona1: Option<String>,
    pub persona2: Option<String>,
    pub persona3: Option<String>,
}

impl User {
    pub const COLUMNS: &'static str =
        "id,fullname,email,phone,date_joined,is_active,bio,persona1,persona2,persona3";

    pub fn display_name(&self) -> &str {
        match self.fullname.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// What login needs to know about a user, and nothing more.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub const COLUMNS: &'static str = "id,email,password";
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserId {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    /// PHC-formatted hash, never the plain password.
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileChanges {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub bio: Option<String>,
    pub persona1: Option<String>,
    pub persona2: Option<String>,
    pub persona3: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Author email, denormalized.
    pub author: String,
    pub author_id: Option<Uuid>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub image_url: Option<String>,
    #[serde(default)]
    pub likes: i32,
    #[serde(default)]
    pub comments: i32,
    /// Present when the select embeds the author row.
    #[serde(default)]
    pub user: Option<UserInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostOwner {
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_id: Uuid,
    pub category: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub category: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
    pub location: String,
    pub max_participants: Option<i32>,
    /// Creator email, denormalized.
    pub created_by: String,
    pub creator_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventOwner {
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
    pub location: String,
    pub max_participants: Option<i32>,
    pub created_by: String,
    pub creator_id: Uuid,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventChanges {
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
    pub location: String,
    pub max_participants: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Upcoming,
    Completed,
}

impl EventStatus {
    /// Derived from the date on every read, never stored.
    pub fn at(event_date: OffsetDateTime, now: OffsetDateTime) -> Self {
        if event_date < now {
            EventStatus::Completed
        } else {
            EventStatus::Upcoming
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "Upcoming",
            EventStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParticipant {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Uuid,
    pub user_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// One row of the participation function: counted on the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipationRow {
    pub event_id: i64,
    pub participants: i64,
    pub joined: bool,
}

/// Participant count of one event, and whether the asking user is one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Participation {
    pub count: usize,
    pub joined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
    Full,
    Missing,
}

/// Directional: (a, b) says nothing about (b, a).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendLink {
    pub user_id: Uuid,
    pub friend_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendId {
    pub friend_id: Uuid,
}

// Declared by the schema; no handler reads or writes these yet.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_date: OffsetDateTime,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
    pub status: String,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn post_rows_fill_in_defaults() {
        let row = r#"{
            "id": 7,
            "title": "Hello",
            "content": "First!",
            "author": "alice@example.com",
            "author_id": null,
            "created_at": "2025-03-01T09:30:00.123456+00:00",
            "image_url": null
        }"#;
        let post: Post = serde_json::from_str(row).unwrap();
        assert_eq!(post.category, DEFAULT_CATEGORY);
        assert_eq!(post.likes, 0);
        assert!(post.user.is_none());
        assert_eq!(post.created_at.year(), 2025);
    }

    #[test]
    fn event_rows_ignore_stored_status() {
        let row = r#"{
            "id": 3,
            "title": "Meetup",
            "description": "Rust evening",
            "event_date": "2030-06-01T18:00:00+00:00",
            "location": "Library",
            "max_participants": 20,
            "created_by": "bob@example.com",
            "creator_id": "0192c1d2-8f00-7000-8000-000000000001",
            "status": "Completed",
            "image_url": null
        }"#;
        let event: Event = serde_json::from_str(row).unwrap();
        assert_eq!(event.max_participants, Some(20));
        assert_eq!(
            EventStatus::at(event.event_date, datetime!(2026-01-01 0:00 UTC)),
            EventStatus::Upcoming
        );
    }

    #[test]
    fn status_flips_once_the_date_has_passed() {
        let date = datetime!(2026-05-01 12:00 UTC);
        assert_eq!(EventStatus::at(date, datetime!(2026-05-01 11:59 UTC)), EventStatus::Upcoming);
        assert_eq!(EventStatus::at(date, datetime!(2026-05-01 12:00 UTC)), EventStatus::Upcoming);
        assert_eq!(EventStatus::at(date, datetime!(2026-05-01 12:01 UTC)), EventStatus::Completed);
    }

    #[test]
    fn join_outcomes_decode_from_rpc_text() {
        let outcome: JoinOutcome = serde_json::from_str(r#""already_joined""#).unwrap();
        assert_eq!(outcome, JoinOutcome::AlreadyJoined);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user = User {
            id: Uuid::nil(),
            fullname: Some("  ".into()),
            email: "carol@example.com".into(),
            phone: None,
            date_joined: None,
            is_active: true,
            bio: None,
            persona1: None,
            persona2: None,
            persona3: None,
        };
        assert_eq!(user.display_name(), "carol@example.com");
    }
}
