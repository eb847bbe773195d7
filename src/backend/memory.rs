use std::collections::HashMap;

use futures_util::{FutureExt, future::BoxFuture};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::{
    Credentials, Event, EventChanges, EventParticipant, FriendLink, JoinOutcome, NewEvent, NewPost, NewUser,
    Participation, Post, PostChanges, ProfileChanges, User,
};

use super::{Backend, BackendError, BackendResult, UserQuery};

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRow>,
    posts: Vec<Post>,
    events: Vec<Event>,
    participants: Vec<EventParticipant>,
    friends: Vec<FriendLink>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local stand-in for the hosted backend. Holds the same tables and
/// enforces the same unique keys (user email, friend link, participant
/// pair); every operation runs under one lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

fn conflict(what: &str) -> BackendError {
    BackendError::Status {
        status: 409,
        body: format!("duplicate key value violates unique constraint on {what}"),
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participant rows for an event.
    pub async fn participant_count(&self, event_id: i64) -> usize {
        self.tables.lock().await.participants.iter().filter(|p| p.event_id == event_id).count()
    }

    pub async fn friend_links(&self) -> Vec<FriendLink> {
        self.tables.lock().await.friends.clone()
    }
}

impl Backend for MemoryBackend {
    fn credentials<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<Credentials>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.users.iter().find(|row| row.user.email == email).map(|row| Credentials {
                id: row.user.id,
                email: row.user.email.clone(),
                password: row.password.clone(),
            }))
        }.boxed()
    }

    fn insert_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if tables.users.iter().any(|row| row.user.email == user.email) {
                return Err(conflict("users.email"));
            }
            tables.users.push(UserRow {
                user: User {
                    id: Uuid::now_v7(),
                    fullname: Some(user.fullname.clone()),
                    email: user.email.clone(),
                    phone: None,
                    date_joined: Some(OffsetDateTime::now_utc()),
                    is_active: true,
                    bio: None,
                    persona1: None,
                    persona2: None,
                    persona3: None,
                },
                password: user.password.clone(),
            });
            Ok(())
        }.boxed()
    }

    fn user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<User>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.users.iter().find(|row| row.user.email == email).map(|row| row.user.clone()))
        }.boxed()
    }

    fn update_profile<'a>(&'a self, id: Uuid, changes: &'a ProfileChanges) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if let Some(row) = tables.users.iter_mut().find(|row| row.user.id == id) {
                let user = &mut row.user;
                user.fullname = changes.fullname.clone();
                user.phone = changes.phone.clone();
                user.is_active = changes.is_active;
                user.bio = changes.bio.clone();
                user.persona1 = changes.persona1.clone();
                user.persona2 = changes.persona2.clone();
                user.persona3 = changes.persona3.clone();
            }
            Ok(())
        }.boxed()
    }

    fn directory_user_id<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<Uuid>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.users.iter().find(|row| row.user.email == email).map(|row| row.user.id))
        }.boxed()
    }

    fn directory_user<'a>(&'a self, id: Uuid) -> BoxFuture<'a, BackendResult<Option<User>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.users.iter().find(|row| row.user.id == id).map(|row| row.user.clone()))
        }.boxed()
    }

    fn search_users<'a>(&'a self, query: &'a UserQuery) -> BoxFuture<'a, BackendResult<Vec<User>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.users.iter()
                .map(|row| &row.user)
                .filter(|u| query.only.as_ref().is_none_or(|ids| ids.contains(&u.id)))
                .filter(|u| !query.exclude_ids.contains(&u.id))
                .filter(|u| query.exclude_email.as_deref() != Some(u.email.as_str()))
                .filter(|u| query.search.as_deref().is_none_or(|term| {
                    contains_ci(u.fullname.as_deref(), term) || contains_ci(Some(u.email.as_str()), term)
                }))
                .cloned()
                .collect())
        }.boxed()
    }

    fn list_posts(&self) -> BoxFuture<'_, BackendResult<Vec<Post>>> {
        async move {
            let tables = self.tables.lock().await;
            let mut posts = tables.posts.clone();
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(posts)
        }.boxed()
    }

    fn post<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<Post>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.posts.iter().find(|p| p.id == id).cloned())
        }.boxed()
    }

    fn post_author<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<String>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.posts.iter().find(|p| p.id == id).map(|p| p.author.clone()))
        }.boxed()
    }

    fn insert_post<'a>(&'a self, post: &'a NewPost) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            let id = tables.next_id();
            tables.posts.push(Post {
                id,
                title: post.title.clone(),
                content: post.content.clone(),
                author: post.author.clone(),
                author_id: Some(post.author_id),
                category: post.category.clone(),
                created_at: OffsetDateTime::now_utc(),
                image_url: post.image_url.clone(),
                likes: 0,
                comments: 0,
                user: None,
            });
            Ok(())
        }.boxed()
    }

    fn update_post<'a>(&'a self, id: i64, changes: &'a PostChanges) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) {
                post.title = changes.title.clone();
                post.content = changes.content.clone();
                post.category = changes.category.clone();
                post.image_url = changes.image_url.clone();
            }
            Ok(())
        }.boxed()
    }

    fn delete_post<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            self.tables.lock().await.posts.retain(|p| p.id != id);
            Ok(())
        }.boxed()
    }

    fn list_events(&self) -> BoxFuture<'_, BackendResult<Vec<Event>>> {
        async move {
            let tables = self.tables.lock().await;
            let mut events = tables.events.clone();
            events.sort_by(|a, b| a.event_date.cmp(&b.event_date).then(a.id.cmp(&b.id)));
            Ok(events)
        }.boxed()
    }

    fn event<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<Event>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.events.iter().find(|e| e.id == id).cloned())
        }.boxed()
    }

    fn event_creator<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<String>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.events.iter().find(|e| e.id == id).map(|e| e.created_by.clone()))
        }.boxed()
    }

    fn insert_event<'a>(&'a self, event: &'a NewEvent) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            let id = tables.next_id();
            tables.events.push(Event {
                id,
                title: event.title.clone(),
                description: event.description.clone(),
                event_date: event.event_date,
                location: event.location.clone(),
                max_participants: event.max_participants,
                created_by: event.created_by.clone(),
                creator_id: Some(event.creator_id),
                created_at: Some(OffsetDateTime::now_utc()),
                image_url: event.image_url.clone(),
            });
            Ok(())
        }.boxed()
    }

    fn update_event<'a>(&'a self, id: i64, changes: &'a EventChanges) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            if let Some(event) = tables.events.iter_mut().find(|e| e.id == id) {
                event.title = changes.title.clone();
                event.description = changes.description.clone();
                event.event_date = changes.event_date;
                event.location = changes.location.clone();
                event.max_participants = changes.max_participants;
                event.image_url = changes.image_url.clone();
            }
            Ok(())
        }.boxed()
    }

    fn delete_event<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            tables.participants.retain(|p| p.event_id != id);
            tables.events.retain(|e| e.id != id);
            Ok(())
        }.boxed()
    }

    fn participation<'a>(
        &'a self,
        event_ids: &'a [i64],
        user_id: Option<Uuid>,
    ) -> BoxFuture<'a, BackendResult<HashMap<i64, Participation>>> {
        async move {
            let tables = self.tables.lock().await;
            let mut summary: HashMap<i64, Participation> = HashMap::new();
            for p in tables.participants.iter().filter(|p| event_ids.contains(&p.event_id)) {
                let entry = summary.entry(p.event_id).or_default();
                entry.count += 1;
                entry.joined |= Some(p.user_id) == user_id;
            }
            Ok(summary)
        }.boxed()
    }

    fn join_event<'a>(&'a self, event_id: i64, user_id: Uuid, user_email: &'a str) -> BoxFuture<'a, BackendResult<JoinOutcome>> {
        async move {
            let mut tables = self.tables.lock().await;
            let Some(capacity) = tables.events.iter().find(|e| e.id == event_id).map(|e| e.max_participants) else {
                return Ok(JoinOutcome::Missing);
            };

            let mut count = 0usize;
            for p in tables.participants.iter().filter(|p| p.event_id == event_id) {
                if p.user_id == user_id {
                    return Ok(JoinOutcome::AlreadyJoined);
                }
                count += 1;
            }
            if capacity.is_some_and(|cap| count >= usize::try_from(cap).unwrap_or(0)) {
                return Ok(JoinOutcome::Full);
            }

            let id = tables.next_id();
            tables.participants.push(EventParticipant {
                id,
                event_id,
                user_id,
                user_email: user_email.to_owned(),
                joined_at: OffsetDateTime::now_utc(),
            });
            Ok(JoinOutcome::Joined)
        }.boxed()
    }

    fn leave_event<'a>(&'a self, event_id: i64, user_id: Uuid) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            self.tables.lock().await.participants
                .retain(|p| !(p.event_id == event_id && p.user_id == user_id));
            Ok(())
        }.boxed()
    }

    fn friend_ids<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, BackendResult<Vec<Uuid>>> {
        async move {
            let tables = self.tables.lock().await;
            Ok(tables.friends.iter().filter(|l| l.user_id == user_id).map(|l| l.friend_id).collect())
        }.boxed()
    }

    fn follow<'a>(&'a self, user_id: Uuid, friend_id: Uuid) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let mut tables = self.tables.lock().await;
            let link = FriendLink { user_id, friend_id };
            if !tables.friends.contains(&link) {
                tables.friends.push(link);
            }
            Ok(())
        }.boxed()
    }

    fn unfollow<'a>(&'a self, user_id: Uuid, friend_id: Uuid) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            self.tables.lock().await.friends
                .retain(|l| !(l.user_id == user_id && l.friend_id == friend_id));
            Ok(())
        }.boxed()
    }
}
