use serde::Deserialize;
use tracing::info;

use crate::{
    backend::Backend,
    db::{ProfileChanges, User},
    error::{ActionError, OrFail},
    session::Identity,
    validate::non_blank,
};

/// Editable profile fields. There is no id: the row to change
/// is always the caller's.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub phone: String,
    /// Checkbox; absent when unticked.
    #[serde(default)]
    pub is_active: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub persona1: String,
    #[serde(default)]
    pub persona2: String,
    #[serde(default)]
    pub persona3: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            fullname: text(&user.fullname),
            phone: text(&user.phone),
            is_active: user.is_active.then(|| "true".to_owned()),
            bio: text(&user.bio),
            persona1: text(&user.persona1),
            persona2: text(&user.persona2),
            persona3: text(&user.persona3),
        }
    }

    pub fn active(&self) -> bool {
        self.is_active
            .as_deref()
            .is_some_and(|value| !matches!(value.trim(), "" | "false" | "off" | "0"))
    }

    fn changes(&self) -> ProfileChanges {
        ProfileChanges {
            fullname: non_blank(&self.fullname),
            phone: non_blank(&self.phone),
            is_active: self.active(),
            bio: non_blank(&self.bio),
            persona1: non_blank(&self.persona1),
            persona2: non_blank(&self.persona2),
            persona3: non_blank(&self.persona3),
        }
    }
}

pub async fn view(backend: &dyn Backend, me: Option<&Identity>) -> Result<User, ActionError> {
    let me = me.ok_or(ActionError::LoginRequired("Please login."))?;
    backend
        .user_by_email(&me.email)
        .await
        .or_fail("Profile not found.")?
        .ok_or(ActionError::NotFound("Profile not found."))
}

/// Re-reads the caller's row and patches exactly that one.
pub async fn edit(backend: &dyn Backend, me: Option<&Identity>, form: &ProfileForm) -> Result<(), ActionError> {
    let user = view(backend, me).await?;
    backend
        .update_profile(user.id, &form.changes())
        .await
        .or_fail("Profile update failed.")?;
    info!(email = %user.email, "profile updated");
    Ok(())
}
