mod login;
mod logout;
pub mod password;
mod register;

use axum::{routing::{get, post}, Router};
use serde::Deserialize;
use tracing::info;

use crate::{
    backend::Backend,
    db::NewUser,
    error::{ActionError, OrFail},
    session::Identity,
    validate::FieldErrors,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", get(register::register_page).post(register::register))
        .route("/logout", post(logout::logout))
}

/// Succeeds iff a user with this email exists and the password matches its
/// stored hash.
pub async fn login(backend: &dyn Backend, email: &str, password: &str) -> Result<Identity, ActionError> {
    let credentials = backend
        .credentials(email.trim())
        .await
        .or_fail("Login failed. Try again.")?
        .ok_or(ActionError::NotFound("Email not found."))?;

    if !password::verify(password, &credentials.password) {
        return Err(ActionError::Rejected("Incorrect password."));
    }

    Ok(Identity { id: credentials.id, email: credentials.email })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Duplicate emails are left to the backend's unique key.
pub async fn register(backend: &dyn Backend, form: &RegisterForm) -> Result<(), ActionError> {
    let mut errors = FieldErrors::new();
    errors.required("email", &form.email, "Email is required");
    errors.required("password", &form.password, "Password is required");
    errors.finish().map_err(ActionError::Invalid)?;

    let password = password::hash(&form.password).map_err(|e| ActionError::Hashing(e.to_string()))?;
    let user = NewUser {
        fullname: form.fullname.trim().to_owned(),
        email: form.email.trim().to_owned(),
        password,
    };

    backend.insert_user(&user).await.or_fail("Failed to create account.")?;
    info!(email = %user.email, "registered");
    Ok(())
}
