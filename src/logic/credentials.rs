use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash};

use crate::dto::user::User;
use crate::http::{Error, Result};
use crate::logic::users::UsersHandler;

/// Builds an unsaved `User` with a freshly salted password hash.
///
/// Persisting it, and reporting a taken username or email, is up to the caller.
pub async fn register(
    username: String,
    password: String,
    email: String,
    first_name: String,
    last_name: String,
) -> Result<User> {
    let password = hash_password(password).await?;

    Ok(User {
        username,
        password,
        email,
        first_name,
        last_name,
    })
}

/// Returns `None` for an unknown username as well as for a wrong password, so callers
/// cannot tell the two apart.
pub async fn authenticate(
    users: &impl UsersHandler,
    username: &str,
    password: String,
) -> Result<Option<User>> {
    let Some(user) = users.find_by_username(username).await? else {
        log::debug!("[authenticate] no user named {username}");
        return Ok(None);
    };

    if verify_password(password, user.password.clone()).await? {
        Ok(Some(user))
    } else {
        log::debug!("[authenticate] wrong password for {username}");
        Ok(None)
    }
}

pub async fn hash_password(password: String) -> Result<String> {
    Ok(tokio::task::spawn_blocking(move || -> Result<String> {
        let salt = SaltString::generate(rand::thread_rng());
        Ok(PasswordHash::generate(Argon2::default(), password, &salt)
            .map_err(|e| anyhow::anyhow!("failed to generate password hash: {}", e))?
            .to_string())
    })
    .await
    .context("panic in generating password hash")??)
}

pub async fn verify_password(password: String, password_hash: String) -> Result<bool> {
    Ok(tokio::task::spawn_blocking(move || -> Result<bool> {
        let hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("invalid password hash: {}", e))?;

        match hash.verify_password(&[&Argon2::default()], password) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Anyhow(anyhow::anyhow!(
                "failed to verify password hash: {}",
                e
            ))),
        }
    })
    .await
    .context("panic in verifying password hash")??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::test_db;
    use crate::logic::users;

    #[tokio::test]
    async fn register_hashes_the_password() {
        let user = register(
            "alice".into(),
            "correct horse".into(),
            "alice@example.com".into(),
            "Alice".into(),
            "Liddell".into(),
        )
        .await
        .unwrap();

        assert_eq!(user.username, "alice");
        assert_ne!(user.password, "correct horse");
        assert!(user.password.starts_with("$argon2"));
        assert!(verify_password("correct horse".into(), user.password.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong horse".into(), user.password)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_different_salts() {
        let a = hash_password("password123".into()).await.unwrap();
        let b = hash_password("password123".into()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let err = verify_password("password123".into(), "plaintext".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Anyhow(_)));
    }

    #[tokio::test]
    async fn authenticate_checks_username_and_password() {
        let db = test_db().await;
        let handler = users::Handler::new(db);

        let alice = register(
            "alice".into(),
            "correct horse".into(),
            "alice@example.com".into(),
            "Alice".into(),
            "Liddell".into(),
        )
        .await
        .unwrap();
        handler.insert(&alice).await.unwrap();

        let found = authenticate(&handler, "alice", "correct horse".into())
            .await
            .unwrap();
        assert_eq!(found, Some(alice));

        let wrong_password = authenticate(&handler, "alice", "battery staple".into())
            .await
            .unwrap();
        assert_eq!(wrong_password, None);

        let unknown = authenticate(&handler, "bob", "correct horse".into())
            .await
            .unwrap();
        assert_eq!(unknown, None);
    }
}
