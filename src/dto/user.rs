use validator::{Validate, ValidationError};

/// A row of the `users` table.
///
/// `password` holds the argon2 hash, never the plaintext.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(serde::Deserialize, Validate, Default)]
#[serde(default)] // missing fields fail validation instead of the extractor
pub struct RegisterForm {
    #[validate(
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom = "validate_username"
    )]
    pub username: String,
    #[validate(length(min = 8, max = 30, message = "must be between 8 and 30 characters"))]
    pub password: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 50, message = "must be at most 50 characters")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 30, message = "must be between 1 and 30 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 30, message = "must be between 1 and 30 characters"))]
    pub last_name: String,
}

#[derive(serde::Deserialize, Validate, Default)]
#[serde(default)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 30, message = "must be between 8 and 30 characters"))]
    pub password: String,
}

// Usernames end up in URL paths, so keep them to characters that need no escaping.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Ok(());
    }

    let mut err = ValidationError::new("username_charset");
    err.message = Some("may only contain letters, digits, '.', '_' and '-'".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegisterForm {
        RegisterForm {
            username: "alice".into(),
            password: "correct horse".into(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
        }
    }

    #[test]
    fn accepts_a_complete_registration() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn rejects_bad_registration_fields() {
        let form = RegisterForm {
            username: "al ice/..".into(),
            password: "short".into(),
            email: "not-an-email".into(),
            ..valid_form()
        };

        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("first_name"));
    }

    #[test]
    fn rejects_overlong_username() {
        let form = RegisterForm {
            username: "a".repeat(21),
            ..valid_form()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn empty_login_is_invalid() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }
}
