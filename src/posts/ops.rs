use tracing::info;

use crate::{
    backend::Backend,
    db::{NewPost, Post, PostChanges},
    error::{ActionError, OrFail},
    session::Identity,
};

use super::PostForm;

pub const EDIT_DENIED: &str = "You don't have permission to edit this post.";
pub const DELETE_DENIED: &str = "You don't have permission to delete this post.";

/// Newest first.
pub async fn list(backend: &dyn Backend) -> Result<Vec<Post>, ActionError> {
    backend.list_posts().await.or_fail("Failed to load posts.")
}

pub async fn create(backend: &dyn Backend, me: Option<&Identity>, form: &PostForm) -> Result<(), ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login to create a post."))?;
    form.check()?;

    let post = NewPost {
        title: form.title.trim().to_owned(),
        content: form.content.trim().to_owned(),
        author: me.email.clone(),
        author_id: me.id,
        category: form.category(),
        image_url: form.image_url(),
    };
    backend.insert_post(&post).await.or_fail("Failed to create post.")?;
    info!(author = %me.email, title = %post.title, "post created");
    Ok(())
}

/// The full post, for pages that act on it. `denied` is reported when the
/// post belongs to someone else.
pub async fn owned(
    backend: &dyn Backend,
    me: Option<&Identity>,
    id: i64,
    denied: &'static str,
) -> Result<Post, ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    let post = backend
        .post(id)
        .await
        .or_fail("Post not found.")?
        .ok_or(ActionError::NotFound("Post not found."))?;
    if post.author != me.email {
        return Err(ActionError::Forbidden(denied));
    }
    Ok(post)
}

/// Fetches the author right before a write.
async fn check_owner(
    backend: &dyn Backend,
    me: &Identity,
    id: i64,
    denied: &'static str,
    failed: &'static str,
) -> Result<(), ActionError> {
    match backend.post_author(id).await.or_fail(failed)? {
        Some(author) if author == me.email => Ok(()),
        _ => Err(ActionError::Forbidden(denied)),
    }
}

pub async fn edit(backend: &dyn Backend, me: Option<&Identity>, id: i64, form: &PostForm) -> Result<(), ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    form.check()?;
    check_owner(backend, me, id, EDIT_DENIED, "Failed to update post.").await?;

    let changes = PostChanges {
        title: form.title.trim().to_owned(),
        content: form.content.trim().to_owned(),
        category: form.category(),
        image_url: form.image_url(),
    };
    backend.update_post(id, &changes).await.or_fail("Failed to update post.")?;
    info!(id, author = %me.email, "post updated");
    Ok(())
}

pub async fn delete(backend: &dyn Backend, me: Option<&Identity>, id: i64) -> Result<(), ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    check_owner(backend, me, id, DELETE_DENIED, "Failed to delete post.").await?;

    backend.delete_post(id).await.or_fail("Failed to delete post.")?;
    info!(id, author = %me.email, "post deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use uuid::Uuid;

    use super::*;
    use crate::backend::MemoryBackend;

    fn someone(email: &str) -> Identity {
        Identity { id: Uuid::now_v7(), email: email.into() }
    }

    fn form(title: &str) -> PostForm {
        PostForm { title: title.into(), content: "Hello **world**".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn posts_are_owned_by_the_session_user() {
        let backend = MemoryBackend::new();
        let alice = someone("alice@example.com");
        create(&backend, Some(&alice), &form("First")).await.unwrap();

        let posts = list(&backend).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "alice@example.com");
        assert_eq!(posts[0].author_id, Some(alice.id));
        assert_eq!(posts[0].category, "General");
    }

    #[tokio::test]
    async fn creating_needs_a_session() {
        let backend = MemoryBackend::new();
        let err = create(&backend, None, &form("First")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(list(&backend).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_author_edits_or_deletes() {
        let backend = MemoryBackend::new();
        let alice = someone("alice@example.com");
        let bob = someone("bob@example.com");
        create(&backend, Some(&alice), &form("First")).await.unwrap();
        let id = list(&backend).await.unwrap()[0].id;

        let err = edit(&backend, Some(&bob), id, &form("Hijacked")).await.unwrap_err();
        assert_eq!(err.to_string(), EDIT_DENIED);
        let err = delete(&backend, Some(&bob), id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(list(&backend).await.unwrap()[0].title, "First");

        edit(&backend, Some(&alice), id, &form("  Second  ")).await.unwrap();
        assert_eq!(list(&backend).await.unwrap()[0].title, "Second");

        delete(&backend, Some(&alice), id).await.unwrap();
        assert!(list(&backend).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_posts_are_reported() {
        let backend = MemoryBackend::new();
        let alice = someone("alice@example.com");
        let err = owned(&backend, Some(&alice), 42, EDIT_DENIED).await.unwrap_err();
        assert_eq!(err.to_string(), "Post not found.");

        let err = edit(&backend, Some(&alice), 42, &form("x")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_edits_change_nothing() {
        let backend = MemoryBackend::new();
        let alice = someone("alice@example.com");
        create(&backend, Some(&alice), &form("First")).await.unwrap();
        let id = list(&backend).await.unwrap()[0].id;

        let err = edit(&backend, Some(&alice), id, &form("")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(list(&backend).await.unwrap()[0].title, "First");
    }
}
