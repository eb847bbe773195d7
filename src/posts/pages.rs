use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Response}, Form};
use tower_sessions::Session;
use tracing::warn;

use crate::{
    db::Post,
    error::ActionError,
    include_res,
    res::{self, escape},
    session::{self, Flash, Identity},
    AppResult, AppState,
};

use super::{ops, PostForm};

fn post_html(post: &Post, me: Option<&Identity>) -> String {
    let image = match &post.image_url {
        Some(url) => format!(r#"<img src="{}" alt="">"#, escape(url)),
        None => String::new(),
    };
    let actions = match me {
        Some(me) if me.email == post.author => res::fill(
            include_res!(str, "/pages/posts/actions.html"),
            &[("id", post.id.to_string().as_str())],
        ),
        _ => String::new(),
    };

    res::fill(
        include_res!(str, "/pages/posts/item.html"),
        &[
            ("id", post.id.to_string().as_str()),
            ("title", escape(&post.title).as_ref()),
            ("category", escape(&post.category).as_ref()),
            ("author", escape(&post.author).as_ref()),
            ("created_at", res::when(post.created_at).as_str()),
            ("likes", post.likes.to_string().as_str()),
            ("comments", post.comments.to_string().as_str()),
            ("image", image.as_str()),
            ("content", res::markdown(&post.content).as_str()),
            ("actions", actions.as_str()),
        ],
    )
}

fn form_html(heading: &str, action: &str, form: &PostForm, err: Option<&ActionError>) -> String {
    res::fill(
        include_res!(str, "/pages/posts/form.html"),
        &[
            ("heading", heading),
            ("errors", res::errors_html(err).as_str()),
            ("action", action),
            ("title", escape(&form.title).as_ref()),
            ("category", escape(form.category.as_deref().unwrap_or_default()).as_ref()),
            ("image_url", escape(form.image_url.as_deref().unwrap_or_default()).as_ref()),
            ("content", escape(&form.content).as_ref()),
        ],
    )
}

/// Page flows land on the login form or the post list after a refusal.
async fn bounce(session: &Session, err: ActionError) -> AppResult<Response> {
    let to = match err {
        ActionError::LoginRequired(_) => "/login",
        _ => "/posts",
    };
    session::redirect_with(session, Flash::error(err.to_string()), to).await
}

#[debug_handler]
pub(crate) async fn index(State(state): State<AppState>, session: Session) -> AppResult<Html<String>> {
    let me = session::identity(&session).await?;
    let mut flash = session::take_flash(&session).await?;

    let posts = match ops::list(state.backend.as_ref()).await {
        Ok(posts) => posts,
        Err(err) => {
            warn!("post list unavailable: {err}");
            flash = Some(Flash::error(err.to_string()));
            Vec::new()
        }
    };

    let items: String = posts.iter().map(|post| post_html(post, me.as_ref())).collect();
    let body = res::fill(include_res!(str, "/pages/posts/index.html"), &[("posts", items.as_str())]);
    Ok(res::page("Posts", me.as_ref(), flash.as_ref(), &body))
}

#[debug_handler]
pub(crate) async fn new_page(session: Session) -> AppResult<Response> {
    let Some(me) = session::identity(&session).await? else {
        return bounce(&session, ActionError::LoginRequired("Please login to create a post.")).await;
    };
    let flash = session::take_flash(&session).await?;
    let body = form_html("New post", "/posts/new", &PostForm::default(), None);
    Ok(res::page("New post", Some(&me), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn create(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::create(state.backend.as_ref(), me.as_ref(), &form).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Post created successfully!"), "/posts").await,
        Err(err @ ActionError::LoginRequired(_)) => bounce(&session, err).await,
        Err(err) => {
            let body = form_html("New post", "/posts/new", &form, Some(&err));
            Ok((err.status(), res::page("New post", me.as_ref(), None, &body)).into_response())
        }
    }
}

#[debug_handler]
pub(crate) async fn edit_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let post = match ops::owned(state.backend.as_ref(), me.as_ref(), id, ops::EDIT_DENIED).await {
        Ok(post) => post,
        Err(err) => return bounce(&session, err).await,
    };

    let flash = session::take_flash(&session).await?;
    let form = PostForm {
        title: post.title,
        content: post.content,
        category: Some(post.category),
        image_url: post.image_url,
    };
    let body = form_html("Edit post", &format!("/posts/{id}/edit"), &form, None);
    Ok(res::page("Edit post", me.as_ref(), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::edit(state.backend.as_ref(), me.as_ref(), id, &form).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Post updated successfully!"), "/posts").await,
        Err(err @ (ActionError::LoginRequired(_) | ActionError::Forbidden(_))) => bounce(&session, err).await,
        Err(err) => {
            let body = form_html("Edit post", &format!("/posts/{id}/edit"), &form, Some(&err));
            Ok((err.status(), res::page("Edit post", me.as_ref(), None, &body)).into_response())
        }
    }
}

#[debug_handler]
pub(crate) async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let post = match ops::owned(state.backend.as_ref(), me.as_ref(), id, ops::DELETE_DENIED).await {
        Ok(post) => post,
        Err(err) => return bounce(&session, err).await,
    };

    let flash = session::take_flash(&session).await?;
    let body = res::fill(
        include_res!(str, "/pages/posts/delete.html"),
        &[
            ("title", escape(&post.title).as_ref()),
            ("content", res::markdown(&post.content).as_str()),
            ("id", id.to_string().as_str()),
        ],
    );
    Ok(res::page("Delete post", me.as_ref(), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::delete(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Post deleted successfully!"), "/posts").await,
        Err(err @ (ActionError::LoginRequired(_) | ActionError::Forbidden(_))) => bounce(&session, err).await,
        Err(err) => {
            session::redirect_with(&session, Flash::error(err.to_string()), &format!("/posts/{id}/delete")).await
        }
    }
}
