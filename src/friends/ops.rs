use tracing::info;
use uuid::Uuid;

use crate::{
    backend::{Backend, UserQuery},
    db::User,
    error::{ActionError, OrFail},
    session::Identity,
    validate::non_blank,
};

/// The caller's id as the user directory knows it.
pub async fn current_user_id(backend: &dyn Backend, me: Option<&Identity>) -> Result<Option<Uuid>, ActionError> {
    let Some(me) = me else {
        return Ok(None);
    };
    backend.directory_user_id(&me.email).await.or_fail("Failed to load your account.")
}

/// People the caller follows, optionally narrowed by name or email.
pub async fn index(backend: &dyn Backend, me: Option<&Identity>, search: Option<&str>) -> Result<Vec<User>, ActionError> {
    let my_id = current_user_id(backend, me)
        .await?
        .ok_or(ActionError::LoginRequired("Please login."))?;

    let friend_ids = backend.friend_ids(my_id).await.or_fail("Failed to load friends.")?;
    if friend_ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = UserQuery {
        only: Some(friend_ids),
        search: search.and_then(non_blank),
        ..Default::default()
    };
    backend.search_users(&query).await.or_fail("Failed to load friends.")
}

/// Everyone the caller does not follow yet, themselves excluded.
pub async fn find(backend: &dyn Backend, me: Option<&Identity>, search: Option<&str>) -> Result<Vec<User>, ActionError> {
    let (Some(my_id), Some(me)) = (current_user_id(backend, me).await?, me) else {
        return Err(ActionError::LoginRequired("Please login."));
    };

    let friend_ids = backend.friend_ids(my_id).await.or_fail("Failed to search users.")?;
    let query = UserQuery {
        only: None,
        exclude_ids: friend_ids,
        exclude_email: Some(me.email.clone()),
        search: search.and_then(non_blank),
    };
    backend.search_users(&query).await.or_fail("Failed to search users.")
}

pub async fn details(backend: &dyn Backend, id: Uuid) -> Result<User, ActionError> {
    if id.is_nil() {
        return Err(ActionError::NotFound("User not found."));
    }
    backend
        .directory_user(id)
        .await
        .or_fail("User not found.")?
        .ok_or(ActionError::NotFound("User not found."))
}

/// Re-following someone is not an error.
pub async fn follow(backend: &dyn Backend, me: Option<&Identity>, target: Uuid) -> Result<(), ActionError> {
    let my_id = current_user_id(backend, me)
        .await?
        .ok_or(ActionError::LoginRequired("Please login."))?;
    if my_id == target {
        return Err(ActionError::Rejected("You cannot follow yourself."));
    }

    backend.follow(my_id, target).await.or_fail("Failed to follow.")?;
    info!(user = %my_id, friend = %target, "followed");
    Ok(())
}

/// Removes only the caller's link; the other direction stays.
pub async fn unfollow(backend: &dyn Backend, me: Option<&Identity>, target: Uuid) -> Result<(), ActionError> {
    let Some(my_id) = current_user_id(backend, me).await? else {
        return Err(ActionError::Rejected("Invalid action."));
    };
    if target.is_nil() {
        return Err(ActionError::Rejected("Invalid action."));
    }

    backend.unfollow(my_id, target).await.or_fail("Failed to remove friend.")?;
    info!(user = %my_id, friend = %target, "unfollowed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::{backend::MemoryBackend, db::{FriendLink, NewUser}};

    async fn member(backend: &MemoryBackend, fullname: &str, email: &str) -> Identity {
        let user = NewUser { fullname: fullname.into(), email: email.into(), password: "x".into() };
        backend.insert_user(&user).await.unwrap();
        let id = backend.directory_user_id(email).await.unwrap().unwrap();
        Identity { id, email: email.into() }
    }

    fn emails(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.email.as_str()).collect()
    }

    #[tokio::test]
    async fn follow_twice_yields_one_link() {
        let backend = MemoryBackend::new();
        let alice = member(&backend, "Alice", "alice@example.com").await;
        let bob = member(&backend, "Bob", "bob@example.com").await;

        follow(&backend, Some(&alice), bob.id).await.unwrap();
        follow(&backend, Some(&alice), bob.id).await.unwrap();
        assert_eq!(backend.friend_links().await, vec![FriendLink { user_id: alice.id, friend_id: bob.id }]);
    }

    #[tokio::test]
    async fn unfollow_leaves_the_other_direction() {
        let backend = MemoryBackend::new();
        let alice = member(&backend, "Alice", "alice@example.com").await;
        let bob = member(&backend, "Bob", "bob@example.com").await;
        follow(&backend, Some(&alice), bob.id).await.unwrap();
        follow(&backend, Some(&bob), alice.id).await.unwrap();

        unfollow(&backend, Some(&alice), bob.id).await.unwrap();
        assert_eq!(backend.friend_links().await, vec![FriendLink { user_id: bob.id, friend_id: alice.id }]);
    }

    #[tokio::test]
    async fn self_follow_is_refused() {
        let backend = MemoryBackend::new();
        let alice = member(&backend, "Alice", "alice@example.com").await;
        let err = follow(&backend, Some(&alice), alice.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(backend.friend_links().await.is_empty());
    }

    #[tokio::test]
    async fn index_lists_followed_people_and_filters() {
        let backend = MemoryBackend::new();
        let alice = member(&backend, "Alice", "alice@example.com").await;
        let bob = member(&backend, "Bob Stone", "bob@example.com").await;
        let carol = member(&backend, "Carol", "carol@example.com").await;
        member(&backend, "Dave", "dave@example.com").await;

        assert!(index(&backend, Some(&alice), None).await.unwrap().is_empty());

        follow(&backend, Some(&alice), bob.id).await.unwrap();
        follow(&backend, Some(&alice), carol.id).await.unwrap();
        let mut all = emails(&index(&backend, Some(&alice), None).await.unwrap()).join(",");
        assert_eq!(all, "bob@example.com,carol@example.com");

        all = emails(&index(&backend, Some(&alice), Some("stone")).await.unwrap()).join(",");
        assert_eq!(all, "bob@example.com");
    }

    #[tokio::test]
    async fn find_skips_self_and_friends() {
        let backend = MemoryBackend::new();
        let alice = member(&backend, "Alice", "alice@example.com").await;
        let bob = member(&backend, "Bob", "bob@example.com").await;
        member(&backend, "Carol", "carol@example.com").await;
        follow(&backend, Some(&alice), bob.id).await.unwrap();

        let found = find(&backend, Some(&alice), Some("  ")).await.unwrap();
        assert_eq!(emails(&found), vec!["carol@example.com"]);

        let err = find(&backend, None, None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn details_need_a_real_id() {
        let backend = MemoryBackend::new();
        let bob = member(&backend, "Bob", "bob@example.com").await;
        assert_eq!(details(&backend, bob.id).await.unwrap().email, "bob@example.com");
        assert_eq!(details(&backend, Uuid::nil()).await.unwrap_err().status(), StatusCode::NOT_FOUND);
        assert_eq!(details(&backend, Uuid::now_v7()).await.unwrap_err().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unfollow_needs_a_session() {
        let backend = MemoryBackend::new();
        let err = unfollow(&backend, None, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid action.");
    }
}
