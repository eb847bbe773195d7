use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use crate::{
    db::User,
    error::ActionError,
    include_res,
    res::{self, escape, Reply},
    session::{self, Flash},
    AppResult, AppState,
};

use super::ops;

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    pub(crate) search: Option<String>,
}

fn person(template: &str, user: &User) -> String {
    res::fill(
        template,
        &[
            ("id", user.id.to_string().as_str()),
            ("name", escape(user.display_name()).as_ref()),
            ("email", escape(&user.email).as_ref()),
        ],
    )
}

#[debug_handler]
pub(crate) async fn index(
    State(state): State<AppState>,
    Query(SearchQuery { search }): Query<SearchQuery>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let mut flash = session::take_flash(&session).await?;

    let friends = match ops::index(state.backend.as_ref(), me.as_ref(), search.as_deref()).await {
        Ok(friends) => friends,
        Err(err @ ActionError::LoginRequired(_)) => {
            return session::redirect_with(&session, Flash::error(err.to_string()), "/login").await;
        }
        Err(err) => {
            warn!("friend list unavailable: {err}");
            flash = Some(Flash::error(err.to_string()));
            Vec::new()
        }
    };

    let items: String = friends
        .iter()
        .map(|u| person(include_res!(str, "/pages/friends/item.html"), u))
        .collect();
    let body = res::fill(
        include_res!(str, "/pages/friends/index.html"),
        &[
            ("search", escape(search.as_deref().unwrap_or_default()).as_ref()),
            ("friends", items.as_str()),
        ],
    );
    Ok(res::page("Friends", me.as_ref(), flash.as_ref(), &body).into_response())
}

/// Fragment for the find-people modal.
#[debug_handler]
pub(crate) async fn find(
    State(state): State<AppState>,
    Query(SearchQuery { search }): Query<SearchQuery>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let candidates = match ops::find(state.backend.as_ref(), me.as_ref(), search.as_deref()).await {
        Ok(candidates) => candidates,
        Err(err @ ActionError::LoginRequired(_)) => return Ok((err.status(), err.to_string()).into_response()),
        Err(err) => {
            warn!("user search failed: {err}");
            Vec::new()
        }
    };

    let items: String = candidates
        .iter()
        .map(|u| person(include_res!(str, "/pages/friends/candidate.html"), u))
        .collect();
    Ok(Html(res::fill(
        include_res!(str, "/pages/friends/find.html"),
        &[
            ("search", escape(search.as_deref().unwrap_or_default()).as_ref()),
            ("candidates", items.as_str()),
        ],
    ))
    .into_response())
}

#[debug_handler]
pub(crate) async fn details(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let user = match ops::details(state.backend.as_ref(), id).await {
        Ok(user) => user,
        Err(_) => return Ok(res::sorry("person")),
    };

    let text = |value: &Option<String>| escape(value.as_deref().unwrap_or_default()).into_owned();
    Ok(Html(res::fill(
        include_res!(str, "/pages/friends/details.html"),
        &[
            ("name", escape(user.display_name()).as_ref()),
            ("email", escape(&user.email).as_ref()),
            ("bio", text(&user.bio).as_str()),
            ("persona1", text(&user.persona1).as_str()),
            ("persona2", text(&user.persona2).as_str()),
            ("persona3", text(&user.persona3).as_str()),
        ],
    ))
    .into_response())
}

#[debug_handler]
pub(crate) async fn delete_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    match ops::details(state.backend.as_ref(), id).await {
        Ok(user) => Ok(Html(person(include_res!(str, "/pages/friends/delete.html"), &user)).into_response()),
        Err(_) => Ok(res::sorry("person")),
    }
}

#[debug_handler]
pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let flash = match ops::unfollow(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(()) => Flash::success("Friend removed successfully."),
        Err(err) => Flash::error(err.to_string()),
    };
    session::redirect_with(&session, flash, "/friends").await
}

/// 401 without a session, 400 for anything else that goes wrong.
#[debug_handler]
pub(crate) async fn follow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    Ok(match ops::follow(state.backend.as_ref(), me.as_ref(), id).await {
        Ok(()) => Reply::ok("Followed.").into_response(),
        Err(err) => {
            let status = match err {
                ActionError::LoginRequired(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, Reply::failed(err.to_string())).into_response()
        }
    })
}
