//! Modal edit and delete. Replies are `{success, message}` with the status
//! of the failure.

use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Response}, Json};
use tower_sessions::Session;

use crate::{res::Reply, session, AppResult, AppState};

use super::{ops, PostForm};

#[debug_handler]
pub(crate) async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
    Json(form): Json<PostForm>,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    Ok(match ops::edit(state.backend.as_ref(), me.as_ref(), id, &form).await {
        Ok(()) => Reply::ok("Post updated successfully!").into_response(),
        Err(err) => Reply::from_error(&err),
    })
}

#[debug_handler]
pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    Ok(match ops::delete(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(()) => Reply::ok("Post deleted successfully!").into_response(),
        Err(err) => Reply::from_error(&err),
    })
}
