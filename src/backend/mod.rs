//! The hosted backend, as seen by the handlers.
//!
//! Every method is one logical backend operation. The REST implementation
//! turns most of them into a single HTTP call; the two multi-row writes
//! (joining an event, deleting an event with its participants) are single
//! RPC calls so that they are atomic on the server.

mod memory;
pub mod query;
mod rest;

use std::{collections::HashMap, sync::Arc};

use futures_util::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    Credentials, Event, EventChanges, JoinOutcome, NewEvent, NewPost, NewUser, Participation, Post,
    PostChanges, ProfileChanges, User,
};

pub use memory::MemoryBackend;
pub use rest::{RestBackend, Tables};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected backend payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("backend misconfigured: {0}")]
    Config(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

pub type SharedBackend = Arc<dyn Backend>;

/// Search over the user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    /// Only these ids.
    pub only: Option<Vec<Uuid>>,
    pub exclude_ids: Vec<Uuid>,
    pub exclude_email: Option<String>,
    /// Case-insensitive substring of fullname or email.
    pub search: Option<String>,
}

pub trait Backend: Send + Sync + 'static {
    // users

    fn credentials<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<Credentials>>>;

    fn insert_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, BackendResult<()>>;

    fn user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<User>>>;

    fn update_profile<'a>(&'a self, id: Uuid, changes: &'a ProfileChanges) -> BoxFuture<'a, BackendResult<()>>;

    // user directory, as used by friend management

    fn directory_user_id<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<Uuid>>>;

    fn directory_user<'a>(&'a self, id: Uuid) -> BoxFuture<'a, BackendResult<Option<User>>>;

    fn search_users<'a>(&'a self, query: &'a UserQuery) -> BoxFuture<'a, BackendResult<Vec<User>>>;

    // posts

    /// Newest first.
    fn list_posts(&self) -> BoxFuture<'_, BackendResult<Vec<Post>>>;

    fn post<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<Post>>>;

    fn post_author<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<String>>>;

    fn insert_post<'a>(&'a self, post: &'a NewPost) -> BoxFuture<'a, BackendResult<()>>;

    fn update_post<'a>(&'a self, id: i64, changes: &'a PostChanges) -> BoxFuture<'a, BackendResult<()>>;

    fn delete_post<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<()>>;

    // events

    /// Soonest first.
    fn list_events(&self) -> BoxFuture<'_, BackendResult<Vec<Event>>>;

    fn event<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<Event>>>;

    fn event_creator<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<String>>>;

    fn insert_event<'a>(&'a self, event: &'a NewEvent) -> BoxFuture<'a, BackendResult<()>>;

    fn update_event<'a>(&'a self, id: i64, changes: &'a EventChanges) -> BoxFuture<'a, BackendResult<()>>;

    /// Removes the event together with all of its participant rows.
    fn delete_event<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<()>>;

    /// Participant counts for every listed event in one lookup. Events
    /// without participants may be missing from the map.
    fn participation<'a>(
        &'a self,
        event_ids: &'a [i64],
        user_id: Option<Uuid>,
    ) -> BoxFuture<'a, BackendResult<HashMap<i64, Participation>>>;

    /// Membership check, capacity check and insert as one atomic step.
    fn join_event<'a>(&'a self, event_id: i64, user_id: Uuid, user_email: &'a str) -> BoxFuture<'a, BackendResult<JoinOutcome>>;

    fn leave_event<'a>(&'a self, event_id: i64, user_id: Uuid) -> BoxFuture<'a, BackendResult<()>>;

    // friend links

    fn friend_ids<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, BackendResult<Vec<Uuid>>>;

    /// Re-following is a no-op.
    fn follow<'a>(&'a self, user_id: Uuid, friend_id: Uuid) -> BoxFuture<'a, BackendResult<()>>;

    fn unfollow<'a>(&'a self, user_id: Uuid, friend_id: Uuid) -> BoxFuture<'a, BackendResult<()>>;
}
