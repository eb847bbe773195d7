use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Response}, Form};
use tower_sessions::Session;
use tracing::warn;

use crate::{error::ActionError, include_res, res::{self, escape}, session::{self, Flash}, AppResult, AppState};

use super::RegisterForm;

fn register_html(form: &RegisterForm, err: Option<&ActionError>) -> String {
    res::fill(
        include_res!(str, "/pages/auth/register.html"),
        &[
            ("errors", res::errors_html(err).as_str()),
            ("fullname", escape(&form.fullname).as_ref()),
            ("email", escape(&form.email).as_ref()),
        ],
    )
}

#[debug_handler]
pub(crate) async fn register_page(session: Session) -> AppResult<Html<String>> {
    let identity = session::identity(&session).await?;
    let flash = session::take_flash(&session).await?;
    let body = register_html(&RegisterForm::default(), None);
    Ok(res::page("Register", identity.as_ref(), flash.as_ref(), &body))
}

#[debug_handler]
pub(crate) async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    match super::register(state.backend.as_ref(), &form).await {
        Ok(()) => {
            session::redirect_with(&session, Flash::success("Account created successfully!"), "/login").await
        }
        Err(err @ ActionError::Invalid(_)) => {
            let body = register_html(&form, Some(&err));
            Ok((err.status(), res::page("Register", None, None, &body)).into_response())
        }
        Err(err) => {
            warn!(email = %form.email.trim(), "registration failed: {err}");
            session::redirect_with(&session, Flash::error(err.to_string()), "/register").await
        }
    }
}
