use std::borrow::Cow;
use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::error::DatabaseError;

use super::views;

pub type FieldErrors = HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>;

/// A common error type that can be used throughout the application.
///
/// Handlers that render forms intercept `UnprocessableEntity` and show the messages next
/// to the offending fields; everything else falls through to `IntoResponse` and becomes
/// an error page.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Return `404 Not Found`
    #[error("request path not found")]
    NotFound,

    /// Return `422 Unprocessable Entity`
    ///
    /// Keyed by form field name. A single field may carry several messages.
    #[error("error in the request body")]
    UnprocessableEntity { errors: FieldErrors },

    /// Automatically return `500 Internal Server Error` on a `sqlx::Error`.
    ///
    /// The error text is only logged; clients get a generic message.
    #[error("an error occurred with the database")]
    Sqlx(#[from] sqlx::Error),

    /// Return `500 Internal Server Error` on a `anyhow::Error`.
    #[error("an internal server error occurred")]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Convenient constructor for `Error::UnprocessableEntity`.
    ///
    /// ```rust,ignore
    /// Err(Error::unprocessable_entity([("username", "username or email taken")]))
    /// ```
    pub fn unprocessable_entity<K, V>(errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        let mut error_map = HashMap::new();

        for (key, val) in errors {
            error_map
                .entry(key.into())
                .or_insert_with(Vec::new)
                .push(val.into());
        }

        Self::UnprocessableEntity { errors: error_map }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Sqlx(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Flattens validator output into per-field messages, falling back to the error code
/// when a rule has no message.
pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    let mut error_map = FieldErrors::new();

    for (field, errors) in errors.field_errors() {
        error_map.entry(field.into()).or_default().extend(
            errors
                .iter()
                .map(|e| e.message.clone().unwrap_or_else(|| e.code.clone())),
        );
    }

    error_map
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::UnprocessableEntity {
            errors: field_errors(&errors),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Self::UnprocessableEntity { errors } => {
                return (
                    self.status_code(),
                    views::error_page(self.status_code(), &self.to_string(), Some(errors)),
                )
                    .into_response();
            }
            Self::Sqlx(e) => {
                log::error!("SQLx error: {:?}", e);
            }
            Self::Anyhow(e) => {
                log::error!("Generic error: {:?}", e);
            }
            Self::NotFound => (),
        }

        (
            self.status_code(),
            views::error_page(self.status_code(), &self.to_string(), None),
        )
            .into_response()
    }
}

/// A little helper trait for more easily converting database constraint errors into
/// domain errors.
///
/// Works on the violation kind rather than the constraint name because SQLite does not
/// report which constraint fired.
pub trait ResultExt<T> {
    /// If `self` contains a SQLx database error for a unique constraint, transform the
    /// error. Otherwise, the result is passed through unchanged.
    fn on_unique_violation(
        self,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error>;

    /// Same as `on_unique_violation`, for foreign key constraints.
    fn on_foreign_key_violation(
        self,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error>;

    /// Same as `on_unique_violation`, for `CHECK` constraints.
    fn on_check_violation(
        self,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn on_unique_violation(
        self,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error> {
        self.map_err(|e| match e.into() {
            Error::Sqlx(sqlx::Error::Database(dbe)) if dbe.is_unique_violation() => map_err(dbe),
            e => e,
        })
    }

    fn on_foreign_key_violation(
        self,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error> {
        self.map_err(|e| match e.into() {
            Error::Sqlx(sqlx::Error::Database(dbe)) if dbe.is_foreign_key_violation() => {
                map_err(dbe)
            }
            e => e,
        })
    }

    fn on_check_violation(
        self,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error> {
        self.map_err(|e| match e.into() {
            Error::Sqlx(sqlx::Error::Database(dbe)) if dbe.is_check_violation() => map_err(dbe),
            e => e,
        })
    }
}
