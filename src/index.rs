use axum::{debug_handler, response::{IntoResponse, Redirect, Response}};
use tower_sessions::Session;

use crate::{include_res, res::{self, escape}, session, AppResult};

#[debug_handler]
pub async fn index(session: Session) -> AppResult<Response> {
    let Some(me) = session::identity(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let flash = session::take_flash(&session).await?;
    let body = res::fill(include_res!(str, "/pages/index.html"), &[("email", escape(&me.email).as_ref())]);
    Ok(res::page("SocialSync", Some(&me), flash.as_ref(), &body).into_response())
}
