use std::collections::HashMap;

use futures_util::{FutureExt, future::BoxFuture};
use reqwest::{
    RequestBuilder, Response,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{
    Credentials, Event, EventChanges, EventOwner, FriendId, FriendLink, JoinOutcome, NewEvent, NewPost,
    NewUser, Participation, ParticipationRow, Post, PostChanges, PostOwner, ProfileChanges, User, UserId,
};

use super::{
    Backend, BackendError, BackendResult, UserQuery,
    query::{Filter, Prefer, Select, params},
};

const PREFER: HeaderName = HeaderName::from_static("prefer");
const APIKEY: HeaderName = HeaderName::from_static("apikey");

/// Remote table and function names.
///
/// The deployment this talks to spells the friend tables `sosial_sync_*`
/// while everything else is `social_sync_*`; both are kept as defaults and
/// each name can be overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub users: String,
    pub posts: String,
    pub events: String,
    pub event_participants: String,
    pub friends: String,
    /// User table read by friend management.
    pub directory_users: String,
    pub join_event_fn: String,
    pub delete_event_fn: String,
    pub participation_fn: String,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: "social_sync_users".to_owned(),
            posts: "social_sync_posts".to_owned(),
            events: "social_sync_events".to_owned(),
            event_participants: "social_sync_event_participants".to_owned(),
            friends: "sosial_sync_friends".to_owned(),
            directory_users: "sosial_sync_users".to_owned(),
            join_event_fn: "social_sync_join_event".to_owned(),
            delete_event_fn: "social_sync_delete_event".to_owned(),
            participation_fn: "social_sync_participation".to_owned(),
        }
    }
}

/// PostgREST client preconfigured with the project's API key.
#[derive(Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    tables: Tables,
}

#[derive(Serialize)]
struct JoinArgs<'a> {
    p_event_id: i64,
    p_user_id: Uuid,
    p_user_email: &'a str,
}

#[derive(Serialize)]
struct DeleteEventArgs {
    p_event_id: i64,
}

#[derive(Serialize)]
struct ParticipationArgs<'a> {
    p_event_ids: &'a [i64],
    p_user_id: Option<Uuid>,
}

impl RestBackend {
    pub fn new(project_url: &str, api_key: &str, tables: Tables) -> BackendResult<Self> {
        let header = |value: String| {
            HeaderValue::from_str(&value).map_err(|e| BackendError::Config(format!("api key: {e}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert(APIKEY, header(api_key.to_owned())?);
        headers.insert(AUTHORIZATION, header(format!("Bearer {api_key}"))?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            tables,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%status, %body, "backend rejected request");
        Err(BackendError::Status { status: status.as_u16(), body })
    }

    async fn select<T: DeserializeOwned>(&self, select: Select<'_>) -> BackendResult<Vec<T>> {
        debug!(table = select.table, "select");
        let request = self.http.get(self.url(select.table)).query(&select.params());
        let bytes = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn first<T: DeserializeOwned>(&self, select: Select<'_>) -> BackendResult<Option<T>> {
        Ok(self.select(select).await?.into_iter().next())
    }

    async fn insert<R: Serialize + ?Sized>(&self, table: &str, row: &R, prefer: Prefer) -> BackendResult<()> {
        debug!(table, "insert");
        let request = self.http.post(self.url(table))
            .header(PREFER, prefer.as_str())
            .json(row);
        self.send(request).await?;
        Ok(())
    }

    async fn update<R: Serialize + ?Sized>(&self, table: &str, filters: &[Filter], changes: &R) -> BackendResult<()> {
        debug!(table, "update");
        let request = self.http.patch(self.url(table))
            .query(&params(filters))
            .header(PREFER, Prefer::Minimal.as_str())
            .json(changes);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> BackendResult<()> {
        debug!(table, "delete");
        let request = self.http.delete(self.url(table)).query(&params(filters));
        self.send(request).await?;
        Ok(())
    }

    async fn rpc<A: Serialize + ?Sized>(&self, function: &str, args: &A) -> BackendResult<Response> {
        debug!(function, "rpc");
        let request = self.http.post(self.url(&format!("rpc/{function}"))).json(args);
        self.send(request).await
    }
}

impl Backend for RestBackend {
    fn credentials<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<Credentials>>> {
        async move {
            self.first(
                Select::from(&self.tables.users)
                    .columns(Credentials::COLUMNS)
                    .filter(Filter::eq("email", email)),
            ).await
        }.boxed()
    }

    fn insert_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.insert(&self.tables.users, user, Prefer::Minimal).await }.boxed()
    }

    fn user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<User>>> {
        async move {
            self.first(
                Select::from(&self.tables.users)
                    .columns(User::COLUMNS)
                    .filter(Filter::eq("email", email)),
            ).await
        }.boxed()
    }

    fn update_profile<'a>(&'a self, id: Uuid, changes: &'a ProfileChanges) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.update(&self.tables.users, &[Filter::eq("id", id)], changes).await }.boxed()
    }

    fn directory_user_id<'a>(&'a self, email: &'a str) -> BoxFuture<'a, BackendResult<Option<Uuid>>> {
        async move {
            let row: Option<UserId> = self.first(
                Select::from(&self.tables.directory_users)
                    .columns("id")
                    .filter(Filter::eq("email", email)),
            ).await?;
            Ok(row.map(|r| r.id))
        }.boxed()
    }

    fn directory_user<'a>(&'a self, id: Uuid) -> BoxFuture<'a, BackendResult<Option<User>>> {
        async move {
            self.first(
                Select::from(&self.tables.directory_users)
                    .columns(User::COLUMNS)
                    .filter(Filter::eq("id", id)),
            ).await
        }.boxed()
    }

    fn search_users<'a>(&'a self, query: &'a UserQuery) -> BoxFuture<'a, BackendResult<Vec<User>>> {
        async move {
            let select = Select::from(&self.tables.directory_users)
                .columns(User::COLUMNS)
                .filter_opt(query.only.as_deref().map(|ids| Filter::is_in("id", ids)))
                .filter_opt(query.exclude_email.as_deref().map(|email| Filter::neq("email", email)))
                .filter_opt((!query.exclude_ids.is_empty()).then(|| Filter::not_in("id", &query.exclude_ids)))
                .filter_opt(query.search.as_deref().map(|term| Filter::any_contains(&["fullname", "email"], term)));
            self.select(select).await
        }.boxed()
    }

    fn list_posts(&self) -> BoxFuture<'_, BackendResult<Vec<Post>>> {
        async move {
            self.select(Select::from(&self.tables.posts).order("created_at.desc")).await
        }.boxed()
    }

    fn post<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<Post>>> {
        async move {
            self.first(Select::from(&self.tables.posts).filter(Filter::eq("id", id))).await
        }.boxed()
    }

    fn post_author<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<String>>> {
        async move {
            let row: Option<PostOwner> = self.first(
                Select::from(&self.tables.posts)
                    .columns("author")
                    .filter(Filter::eq("id", id)),
            ).await?;
            Ok(row.map(|r| r.author))
        }.boxed()
    }

    fn insert_post<'a>(&'a self, post: &'a NewPost) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.insert(&self.tables.posts, post, Prefer::Representation).await }.boxed()
    }

    fn update_post<'a>(&'a self, id: i64, changes: &'a PostChanges) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.update(&self.tables.posts, &[Filter::eq("id", id)], changes).await }.boxed()
    }

    fn delete_post<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.delete(&self.tables.posts, &[Filter::eq("id", id)]).await }.boxed()
    }

    fn list_events(&self) -> BoxFuture<'_, BackendResult<Vec<Event>>> {
        async move {
            self.select(Select::from(&self.tables.events).order("event_date.asc")).await
        }.boxed()
    }

    fn event<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<Event>>> {
        async move {
            self.first(Select::from(&self.tables.events).filter(Filter::eq("id", id))).await
        }.boxed()
    }

    fn event_creator<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<Option<String>>> {
        async move {
            let row: Option<EventOwner> = self.first(
                Select::from(&self.tables.events)
                    .columns("created_by")
                    .filter(Filter::eq("id", id)),
            ).await?;
            Ok(row.map(|r| r.created_by))
        }.boxed()
    }

    fn insert_event<'a>(&'a self, event: &'a NewEvent) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.insert(&self.tables.events, event, Prefer::Representation).await }.boxed()
    }

    fn update_event<'a>(&'a self, id: i64, changes: &'a EventChanges) -> BoxFuture<'a, BackendResult<()>> {
        async move { self.update(&self.tables.events, &[Filter::eq("id", id)], changes).await }.boxed()
    }

    fn delete_event<'a>(&'a self, id: i64) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            self.rpc(&self.tables.delete_event_fn, &DeleteEventArgs { p_event_id: id }).await?;
            Ok(())
        }.boxed()
    }

    fn participation<'a>(
        &'a self,
        event_ids: &'a [i64],
        user_id: Option<Uuid>,
    ) -> BoxFuture<'a, BackendResult<HashMap<i64, Participation>>> {
        async move {
            if event_ids.is_empty() {
                return Ok(HashMap::new());
            }

            // counted server side; a plain select stops at max_rows
            let args = ParticipationArgs { p_event_ids: event_ids, p_user_id: user_id };
            let bytes = self.rpc(&self.tables.participation_fn, &args).await?.bytes().await?;
            let rows: Vec<ParticipationRow> = serde_json::from_slice(&bytes)?;

            Ok(rows
                .into_iter()
                .map(|row| {
                    let count = usize::try_from(row.participants).unwrap_or_default();
                    (row.event_id, Participation { count, joined: row.joined })
                })
                .collect())
        }.boxed()
    }

    fn join_event<'a>(&'a self, event_id: i64, user_id: Uuid, user_email: &'a str) -> BoxFuture<'a, BackendResult<JoinOutcome>> {
        async move {
            let args = JoinArgs { p_event_id: event_id, p_user_id: user_id, p_user_email: user_email };
            let bytes = self.rpc(&self.tables.join_event_fn, &args).await?.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        }.boxed()
    }

    fn leave_event<'a>(&'a self, event_id: i64, user_id: Uuid) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            self.delete(
                &self.tables.event_participants,
                &[Filter::eq("event_id", event_id), Filter::eq("user_id", user_id)],
            ).await
        }.boxed()
    }

    fn friend_ids<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, BackendResult<Vec<Uuid>>> {
        async move {
            let rows: Vec<FriendId> = self.select(
                Select::from(&self.tables.friends)
                    .columns("friend_id")
                    .filter(Filter::eq("user_id", user_id)),
            ).await?;
            Ok(rows.into_iter().map(|r| r.friend_id).collect())
        }.boxed()
    }

    fn follow<'a>(&'a self, user_id: Uuid, friend_id: Uuid) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            let link = FriendLink { user_id, friend_id };
            self.insert(&self.tables.friends, &link, Prefer::IgnoreDuplicates).await
        }.boxed()
    }

    fn unfollow<'a>(&'a self, user_id: Uuid, friend_id: Uuid) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            self.delete(
                &self.tables.friends,
                &[Filter::eq("user_id", user_id), Filter::eq("friend_id", friend_id)],
            ).await
        }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let backend = RestBackend::new("https://project.supabase.co/", "anon", Tables::default()).unwrap();
        assert_eq!(backend.url("social_sync_posts"), "https://project.supabase.co/rest/v1/social_sync_posts");
        assert_eq!(backend.url("rpc/social_sync_join_event"), "https://project.supabase.co/rest/v1/rpc/social_sync_join_event");
    }

    #[test]
    fn rejects_keys_that_cannot_be_headers() {
        let err = RestBackend::new("https://project.supabase.co", "bad\nkey", Tables::default()).err();
        assert!(matches!(err, Some(BackendError::Config(_))));
    }

    #[test]
    fn friend_tables_keep_their_deployed_spelling() {
        let tables = Tables::default();
        assert_eq!(tables.friends, "sosial_sync_friends");
        assert_eq!(tables.users, "social_sync_users");
    }

    mod wire {
        use std::sync::Arc;

        use axum::{
            Json, Router,
            body::Bytes,
            extract::State,
            http::{HeaderMap, Method, StatusCode, Uri},
            response::{IntoResponse, Response},
        };
        use serde_json::{Value, json};
        use tokio::sync::Mutex;

        use super::*;

        #[derive(Debug, Clone)]
        struct Seen {
            method: Method,
            path: String,
            query: Option<String>,
            prefer: Option<String>,
            apikey: Option<String>,
            authorization: Option<String>,
            body: Value,
        }

        type Log = Arc<Mutex<Vec<Seen>>>;

        async fn record(State(log): State<Log>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
            let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
            let path = uri.path().to_owned();
            log.lock().await.push(Seen {
                method: method.clone(),
                path: path.clone(),
                query: uri.query().map(str::to_owned),
                prefer: header("prefer"),
                apikey: header("apikey"),
                authorization: header("authorization"),
                body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            });

            match path.as_str() {
                "/rest/v1/rpc/social_sync_join_event" => Json(json!("already_joined")).into_response(),
                "/rest/v1/rpc/social_sync_participation" => {
                    Json(json!([{ "event_id": 1, "participants": 1200, "joined": true }])).into_response()
                }
                "/rest/v1/social_sync_users" if method == Method::POST => {
                    (StatusCode::CONFLICT, "duplicate key value violates unique constraint").into_response()
                }
                _ if method == Method::GET => Json(json!([])).into_response(),
                _ => StatusCode::NO_CONTENT.into_response(),
            }
        }

        async fn postgrest() -> (RestBackend, Log) {
            let log = Log::default();
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let app = Router::new().fallback(record).with_state(log.clone());
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            let backend = RestBackend::new(&format!("http://{addr}/"), "anon", Tables::default()).unwrap();
            (backend, log)
        }

        async fn last(log: &Log) -> Seen {
            log.lock().await.last().cloned().unwrap()
        }

        #[tokio::test]
        async fn every_request_carries_the_api_key() {
            let (backend, log) = postgrest().await;
            assert!(backend.credentials("alice@example.com").await.unwrap().is_none());

            let seen = last(&log).await;
            assert_eq!(seen.method, Method::GET);
            assert_eq!(seen.path, "/rest/v1/social_sync_users");
            assert!(seen.query.unwrap().contains("email=eq.alice%40example.com"));
            assert_eq!(seen.apikey.as_deref(), Some("anon"));
            assert_eq!(seen.authorization.as_deref(), Some("Bearer anon"));
        }

        #[tokio::test]
        async fn follow_ignores_duplicate_links() {
            let (backend, log) = postgrest().await;
            let (me, them) = (Uuid::now_v7(), Uuid::now_v7());
            backend.follow(me, them).await.unwrap();

            let seen = last(&log).await;
            assert_eq!(seen.method, Method::POST);
            assert_eq!(seen.path, "/rest/v1/sosial_sync_friends");
            assert_eq!(seen.prefer.as_deref(), Some("resolution=ignore-duplicates"));
            assert_eq!(seen.body, json!({ "user_id": me, "friend_id": them }));
        }

        #[tokio::test]
        async fn unfollow_filters_on_both_ends() {
            let (backend, log) = postgrest().await;
            let (me, them) = (Uuid::now_v7(), Uuid::now_v7());
            backend.unfollow(me, them).await.unwrap();

            let seen = last(&log).await;
            assert_eq!(seen.method, Method::DELETE);
            assert_eq!(seen.path, "/rest/v1/sosial_sync_friends");
            assert_eq!(seen.query.as_deref(), Some(format!("user_id=eq.{me}&friend_id=eq.{them}").as_str()));
        }

        #[tokio::test]
        async fn profile_update_patches_one_row() {
            let (backend, log) = postgrest().await;
            let id = Uuid::now_v7();
            let changes = ProfileChanges {
                fullname: Some("Alice A".into()),
                phone: None,
                is_active: true,
                bio: Some("hi".into()),
                persona1: None,
                persona2: None,
                persona3: None,
            };
            backend.update_profile(id, &changes).await.unwrap();

            let seen = last(&log).await;
            assert_eq!(seen.method, Method::PATCH);
            assert_eq!(seen.path, "/rest/v1/social_sync_users");
            assert_eq!(seen.query.as_deref(), Some(format!("id=eq.{id}").as_str()));
            assert_eq!(seen.prefer.as_deref(), Some("return=minimal"));
            assert_eq!(seen.body["fullname"], "Alice A");
            assert_eq!(seen.body["is_active"], true);
        }

        #[tokio::test]
        async fn join_goes_through_the_locking_function() {
            let (backend, log) = postgrest().await;
            let user = Uuid::now_v7();
            let outcome = backend.join_event(7, user, "alice@example.com").await.unwrap();
            assert_eq!(outcome, JoinOutcome::AlreadyJoined);

            let seen = last(&log).await;
            assert_eq!(seen.method, Method::POST);
            assert_eq!(seen.path, "/rest/v1/rpc/social_sync_join_event");
            assert_eq!(
                seen.body,
                json!({ "p_event_id": 7, "p_user_id": user, "p_user_email": "alice@example.com" }),
            );
        }

        #[tokio::test]
        async fn participation_is_counted_by_the_server() {
            let (backend, log) = postgrest().await;
            let user = Uuid::now_v7();
            let summary = backend.participation(&[1, 2], Some(user)).await.unwrap();
            assert_eq!(summary.get(&1), Some(&Participation { count: 1200, joined: true }));
            assert_eq!(summary.get(&2), None);

            let seen = last(&log).await;
            assert_eq!(seen.path, "/rest/v1/rpc/social_sync_participation");
            assert_eq!(seen.body, json!({ "p_event_ids": [1, 2], "p_user_id": user }));

            let before = log.lock().await.len();
            assert!(backend.participation(&[], None).await.unwrap().is_empty());
            assert_eq!(log.lock().await.len(), before);
        }

        #[tokio::test]
        async fn rejected_requests_keep_status_and_body() {
            let (backend, _log) = postgrest().await;
            let user = NewUser {
                fullname: "Alice".into(),
                email: "alice@example.com".into(),
                password: "$argon2id$...".into(),
            };
            let err = backend.insert_user(&user).await.unwrap_err();
            let BackendError::Status { status, body } = err else { panic!("expected a status error") };
            assert_eq!(status, 409);
            assert!(body.contains("duplicate key"));
        }
    }
}
