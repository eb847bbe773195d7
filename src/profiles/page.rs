use axum::{debug_handler, extract::State, response::{IntoResponse, Response}, Form};
use tower_sessions::Session;

use crate::{
    db::User,
    error::ActionError,
    include_res,
    res::{self, escape},
    session::{self, Flash},
    AppResult, AppState,
};

use super::ops::{self, ProfileForm};

fn text(value: &Option<String>) -> String {
    escape(value.as_deref().unwrap_or_default()).into_owned()
}

fn profile_html(user: &User) -> String {
    let joined = user.date_joined.map(res::when).unwrap_or_default();
    res::fill(
        include_res!(str, "/pages/profiles/profile.html"),
        &[
            ("name", escape(user.display_name()).as_ref()),
            ("email", escape(&user.email).as_ref()),
            ("phone", text(&user.phone).as_str()),
            ("active", if user.is_active { "Active" } else { "Inactive" }),
            ("joined", joined.as_str()),
            ("bio", text(&user.bio).as_str()),
            ("persona1", text(&user.persona1).as_str()),
            ("persona2", text(&user.persona2).as_str()),
            ("persona3", text(&user.persona3).as_str()),
        ],
    )
}

fn edit_html(form: &ProfileForm, err: Option<&ActionError>) -> String {
    res::fill(
        include_res!(str, "/pages/profiles/edit.html"),
        &[
            ("errors", res::errors_html(err).as_str()),
            ("fullname", escape(&form.fullname).as_ref()),
            ("phone", escape(&form.phone).as_ref()),
            ("active_checked", if form.active() { "checked" } else { "" }),
            ("bio", escape(&form.bio).as_ref()),
            ("persona1", escape(&form.persona1).as_ref()),
            ("persona2", escape(&form.persona2).as_ref()),
            ("persona3", escape(&form.persona3).as_ref()),
        ],
    )
}

async fn bounce(session: &Session, err: ActionError) -> AppResult<Response> {
    let to = match err {
        ActionError::LoginRequired(_) => "/login",
        _ => "/",
    };
    session::redirect_with(session, Flash::error(err.to_string()), to).await
}

#[debug_handler]
pub(crate) async fn profile(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let user = match ops::view(state.backend.as_ref(), me.as_ref()).await {
        Ok(user) => user,
        Err(err) => return bounce(&session, err).await,
    };

    let flash = session::take_flash(&session).await?;
    Ok(res::page("Profile", me.as_ref(), flash.as_ref(), &profile_html(&user)).into_response())
}

#[debug_handler]
pub(crate) async fn edit_page(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    let user = match ops::view(state.backend.as_ref(), me.as_ref()).await {
        Ok(user) => user,
        Err(err) => return bounce(&session, err).await,
    };

    let flash = session::take_flash(&session).await?;
    let body = edit_html(&ProfileForm::from_user(&user), None);
    Ok(res::page("Edit profile", me.as_ref(), flash.as_ref(), &body).into_response())
}

#[debug_handler]
pub(crate) async fn edit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let me = session::identity(&session).await?;
    match ops::edit(state.backend.as_ref(), me.as_ref(), &form).await {
        Ok(()) => session::redirect_with(&session, Flash::success("Profile updated successfully."), "/profile").await,
        Err(err @ ActionError::LoginRequired(_)) => bounce(&session, err).await,
        Err(err) => {
            let body = edit_html(&form, Some(&err));
            Ok((err.status(), res::page("Edit profile", me.as_ref(), None, &body)).into_response())
        }
    }
}
