//! Join and leave buttons. Both always answer 200 with `{success, message}`.

use axum::{debug_handler, extract::{Path, State}, Json};
use tower_sessions::Session;
use tracing::warn;

use crate::{res::Reply, session, AppResult, AppState};

use super::ops;

#[debug_handler]
pub(crate) async fn join(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Json<Reply>> {
    let me = session::identity(&session).await?;
    Ok(match ops::join(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(message) => Reply::ok(message),
        Err(err) => {
            warn!(id, "join refused: {err}");
            Reply::failed(err.to_string())
        }
    })
}

#[debug_handler]
pub(crate) async fn leave(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    session: Session,
) -> AppResult<Json<Reply>> {
    let me = session::identity(&session).await?;
    Ok(match ops::leave(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(message) => Reply::ok(message),
        Err(err) => Reply::failed(err.to_string()),
    })
}
