use axum::{debug_handler, extract::State, response::{Html, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::{include_res, res, session::{self, Flash}, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) password: String,
}

#[debug_handler]
pub(crate) async fn login_page(session: Session) -> AppResult<Html<String>> {
    let identity = session::identity(&session).await?;
    let flash = session::take_flash(&session).await?;
    let body = res::fill(include_res!(str, "/pages/auth/login.html"), &[("email", "")]);
    Ok(res::page("Log in", identity.as_ref(), flash.as_ref(), &body))
}

#[debug_handler]
pub(crate) async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(LoginForm { email, password }): Form<LoginForm>,
) -> AppResult<Response> {
    match super::login(state.backend.as_ref(), &email, &password).await {
        Ok(identity) => {
            session::sign_in(&session, &identity).await?;
            info!(email = %identity.email, "signed in");
            session::redirect_with(&session, Flash::success("Login successful!"), "/").await
        }
        Err(err) => {
            warn!(email = %email.trim(), "login refused: {err}");
            session::redirect_with(&session, Flash::error(err.to_string()), "/login").await
        }
    }
}
