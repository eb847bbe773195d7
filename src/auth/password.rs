use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::warn;

/// Argon2id with a fresh random salt, as a PHC string.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// False for a wrong password and for a stored value that is neither a PHC
/// hash nor a bcrypt hash. Bcrypt rows predate Argon2 and are only read.
pub fn verify(password: &str, stored: &str) -> bool {
    if BCRYPT_PREFIXES.iter().any(|prefix| stored.starts_with(prefix)) {
        return match bcrypt::verify(password, stored) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("stored bcrypt hash is unreadable: {e}");
                false
            }
        };
    }

    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("stored password hash is unreadable: {e}");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_are_salted() {
        let first = hash("Secret123").unwrap();
        let second = hash("Secret123").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));

        assert!(verify("Secret123", &first));
        assert!(!verify("Wrong123", &first));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify("Secret123", "Secret123"));
        assert!(!verify("", ""));
        assert!(!verify("Secret123", "$2b$10$short"));
    }

    #[test]
    fn legacy_bcrypt_rows_still_verify() {
        let stored = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
        assert!(verify("U*U", stored));
        assert!(!verify("U*V", stored));

        let own = bcrypt::hash("Secret123", 4).unwrap();
        assert!(own.starts_with("$2b$"));
        assert!(verify("Secret123", &own));
        assert!(!verify("Wrong123", &own));
    }
}
