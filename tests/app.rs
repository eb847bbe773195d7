use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use socialsync::{app, backend::{Backend, MemoryBackend}, AppState};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

/// One browser: the router plus whatever session cookie it was handed last.
struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    fn new(app: &Router) -> Self {
        Self { app: app.clone(), cookie: None }
    }

    async fn send(&mut self, mut request: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
        }
        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(set) = response.headers().get(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn form(&mut self, uri: &str, body: &str) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    async fn json(&mut self, uri: &str, body: Value) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn register_and_login(&mut self, email: &str) {
        let encoded = email.replace('@', "%40");
        let response = self.form("/register", &format!("fullname=Someone&email={encoded}&password=Secret123")).await;
        assert_eq!(location(&response), "/login");
        let response = self.form("/login", &format!("email={encoded}&password=Secret123")).await;
        assert_eq!(location(&response), "/");
    }
}

fn setup() -> (Router, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let state = AppState::new(backend.clone());
    let layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    (app(state, layer), backend)
}

fn location(response: &Response) -> &str {
    assert!(response.status().is_redirection(), "expected a redirect, got {}", response.status());
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn reply(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_then_login() {
    let (app, _) = setup();
    let mut browser = Browser::new(&app);

    let response = browser.get("/").await;
    assert_eq!(location(&response), "/login");

    browser.register_and_login("alice@example.com").await;

    let home = text(browser.get("/").await).await;
    assert!(home.contains("Login successful!"));
    assert!(home.contains("Signed in as alice@example.com."));
}

#[tokio::test]
async fn wrong_password_goes_back_to_login() {
    let (app, _) = setup();
    let mut browser = Browser::new(&app);
    browser.form("/register", "email=alice%40example.com&password=Secret123").await;

    let response = browser.form("/login", "email=alice%40example.com&password=Wrong123").await;
    assert_eq!(location(&response), "/login");

    let page = text(browser.get("/login").await).await;
    assert!(page.contains("Incorrect password."));

    let response = browser.get("/").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (app, _) = setup();
    let mut browser = Browser::new(&app);
    browser.register_and_login("alice@example.com").await;

    let response = browser.form("/logout", "").await;
    assert_eq!(location(&response), "/login");
    let response = browser.get("/").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn posts_belong_to_the_session_user() {
    let (app, _) = setup();
    let mut alice = Browser::new(&app);
    alice.register_and_login("alice@example.com").await;

    let response = alice
        .form("/posts/new", "title=Hello&content=First+post&author=mallory%40example.com")
        .await;
    assert_eq!(location(&response), "/posts");

    let feed = text(alice.get("/posts").await).await;
    assert!(feed.contains("Post created successfully!"));
    assert!(feed.contains("by alice@example.com"));
    assert!(!feed.contains("mallory"));
    assert!(feed.contains(r#"id="post-1""#));

    let mut bob = Browser::new(&app);
    bob.register_and_login("bob@example.com").await;

    let response = bob.json("/posts/1/edit-ajax", json!({"title": "Mine", "content": "Now"})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(reply(response).await["success"], false);

    let response = bob.json("/posts/1/delete-ajax", json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = alice.json("/posts/1/edit-ajax", json!({"title": "Hello again", "content": "Edited"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(reply(response).await["success"], true);

    let feed = text(bob.get("/posts").await).await;
    assert!(feed.contains("Hello again"));
}

#[tokio::test]
async fn ajax_edits_need_a_session_and_valid_input() {
    let (app, _) = setup();
    let mut alice = Browser::new(&app);
    alice.register_and_login("alice@example.com").await;
    alice.form("/posts/new", "title=Hello&content=Body").await;

    let response = alice.json("/posts/1/edit-ajax", json!({"title": "", "content": "Body"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut stranger = Browser::new(&app);
    let response = stranger.json("/posts/1/edit-ajax", json!({"title": "x", "content": "y"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn join_and_leave_events() {
    let (app, backend) = setup();
    let mut alice = Browser::new(&app);
    alice.register_and_login("alice@example.com").await;

    let response = alice
        .form(
            "/events/new",
            "title=Picnic&description=Snacks&event_date=2099-06-01T12%3A00&location=Park&max_participants=&image_url=",
        )
        .await;
    assert_eq!(location(&response), "/events");

    let events = text(alice.get("/events").await).await;
    assert!(events.contains(r#"<form method="post" action="/events/1/join""#));
    assert!(!events.contains("data-action"));

    let joined = reply(alice.form("/events/1/join", "").await).await;
    assert_eq!(joined, json!({"success": true, "message": "Successfully joined event!"}));

    let again = alice.form("/events/1/join", "").await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(reply(again).await, json!({"success": false, "message": "You already joined this event."}));
    assert_eq!(backend.participant_count(1).await, 1);

    let events = text(alice.get("/events").await).await;
    assert!(events.contains("1 joined"));
    assert!(events.contains(r#"<form method="post" action="/events/1/leave""#));

    let left = reply(alice.form("/events/1/leave", "").await).await;
    assert_eq!(left["message"], "Successfully left event!");
    assert_eq!(backend.participant_count(1).await, 0);

    let mut stranger = Browser::new(&app);
    let refused = reply(stranger.form("/events/1/join", "").await).await;
    assert_eq!(refused["message"], "Please login to join events.");
}

#[tokio::test]
async fn following_twice_keeps_one_link() {
    let (app, backend) = setup();
    let mut alice = Browser::new(&app);
    alice.register_and_login("alice@example.com").await;
    let mut bob = Browser::new(&app);
    bob.register_and_login("bob@example.com").await;

    let bob_id = backend.directory_user_id("bob@example.com").await.unwrap().unwrap();
    let alice_id = backend.directory_user_id("alice@example.com").await.unwrap().unwrap();

    let found = text(alice.get("/friends/find?search=bob").await).await;
    assert!(found.contains(&format!(r#"<form method="post" action="/friends/{bob_id}/follow""#)));

    for _ in 0..2 {
        let response = alice.form(&format!("/friends/{bob_id}/follow"), "").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(backend.friend_links().await.len(), 1);

    let response = alice.form(&format!("/friends/{alice_id}/follow"), "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let friends = text(alice.get("/friends").await).await;
    assert!(friends.contains("bob@example.com"));

    let response = alice.form(&format!("/friends/{bob_id}/delete"), "").await;
    assert_eq!(location(&response), "/friends");
    assert!(backend.friend_links().await.is_empty());
}

#[tokio::test]
async fn profile_edits_apply_to_the_session_user() {
    let (app, backend) = setup();
    let mut alice = Browser::new(&app);
    alice.register_and_login("alice@example.com").await;
    let mut bob = Browser::new(&app);
    bob.register_and_login("bob@example.com").await;

    let bob_id = backend.directory_user_id("bob@example.com").await.unwrap().unwrap();
    let response = alice
        .form("/profile/edit", &format!("id={bob_id}&fullname=Alice+L&bio=Hi&is_active=true"))
        .await;
    assert_eq!(location(&response), "/profile");

    let alice_row = backend.user_by_email("alice@example.com").await.unwrap().unwrap();
    assert_eq!(alice_row.fullname.as_deref(), Some("Alice L"));
    let bob_row = backend.user_by_email("bob@example.com").await.unwrap().unwrap();
    assert_eq!(bob_row.fullname.as_deref(), Some("Someone"));

    let page = text(alice.get("/profile").await).await;
    assert!(page.contains("Profile updated successfully."));
    assert!(page.contains("Alice L"));
}
