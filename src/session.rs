//! Session keys, the signed-in identity and one-shot flash messages.

use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;
use uuid::Uuid;

use crate::AppResult;

pub const USER_EMAIL: &str = "user_email";
pub const USER_ID: &str = "user_id";
pub const FLASH: &str = "flash";

/// Who is making the request. Read from the session by handlers and passed
/// to every operation explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

pub async fn identity(session: &Session) -> AppResult<Option<Identity>> {
    let email = session.get::<String>(USER_EMAIL).await?;
    let id = session.get::<String>(USER_ID).await?;
    let (Some(email), Some(id)) = (email, id) else {
        return Ok(None);
    };

    match Uuid::parse_str(&id) {
        Ok(id) => Ok(Some(Identity { id, email })),
        Err(e) => {
            warn!("ignoring session with malformed user id {id:?}: {e}");
            Ok(None)
        }
    }
}

pub async fn sign_in(session: &Session, identity: &Identity) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_EMAIL, &identity.email).await?;
    session.insert(USER_ID, identity.id.to_string()).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) {
    session.clear().await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Error, message: message.into() }
    }
}

pub async fn flash(session: &Session, flash: Flash) -> AppResult<()> {
    session.insert(FLASH, flash).await?;
    Ok(())
}

/// Removes the pending flash, so it is shown exactly once.
pub async fn take_flash(session: &Session) -> AppResult<Option<Flash>> {
    Ok(session.remove::<Flash>(FLASH).await?)
}

pub async fn redirect_with(session: &Session, message: Flash, to: &str) -> AppResult<Response> {
    flash(session, message).await?;
    Ok(Redirect::to(to).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn identity_round_trips_through_the_session() {
        let session = session();
        assert_eq!(identity(&session).await.unwrap(), None);

        let me = Identity { id: Uuid::now_v7(), email: "alice@example.com".into() };
        sign_in(&session, &me).await.unwrap();
        assert_eq!(identity(&session).await.unwrap(), Some(me));

        sign_out(&session).await;
        assert_eq!(identity(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_user_id_means_signed_out() {
        let session = session();
        session.insert(USER_EMAIL, "alice@example.com").await.unwrap();
        session.insert(USER_ID, "not-a-uuid").await.unwrap();
        assert_eq!(identity(&session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn flash_is_shown_once() {
        let session = session();
        flash(&session, Flash::error("Incorrect password.")).await.unwrap();
        assert_eq!(take_flash(&session).await.unwrap(), Some(Flash::error("Incorrect password.")));
        assert_eq!(take_flash(&session).await.unwrap(), None);
    }
}
