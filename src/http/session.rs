//! Cookie-backed session state.
//!
//! The whole session (logged-in username plus queued flash messages) lives in a single
//! HMAC-signed JWT inside an HttpOnly cookie. Nothing is stored server-side, so logging
//! out only forgets the username in the client's copy.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Extension, FromRequestParts};
use axum::response::{IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts};
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use http::header::{COOKIE, SET_COOKIE};
use http::request::Parts;
use http::HeaderValue;
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha384;
use time::OffsetDateTime;

use crate::config::Config;
use crate::http::error::Error;
use crate::http::ApiContext;

pub const SESSION_COOKIE: &str = "session";

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Info => "info",
            FlashCategory::Warning => "warning",
            FlashCategory::Danger => "danger",
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

#[derive(serde::Serialize, serde::Deserialize, Default, Clone, Debug, PartialEq, Eq)]
struct SessionClaims {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    flashes: Vec<Flash>,
    exp: i64,
}

/// The session of the current client.
///
/// Add this as a parameter to a handler function to read the session, and return it as
/// part of the response to write any changes back to the cookie.
pub struct Session {
    claims: SessionClaims,
    config: Arc<Config>,
}

/// Extracts the logged-in username, or redirects to `/` with a warning.
///
/// Only checks that *someone* is logged in. It does not compare against path parameters.
pub struct LoggedIn {
    pub username: String,
    pub session: Session,
}

impl Session {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            claims: SessionClaims::default(),
            config,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.claims.username.as_deref()
    }

    pub fn log_in(&mut self, username: &str) {
        self.claims.username = Some(username.to_owned());
    }

    pub fn log_out(&mut self) {
        self.claims.username = None;
    }

    pub fn flash(&mut self, category: FlashCategory, message: impl Into<String>) {
        self.claims.flashes.push(Flash {
            category,
            message: message.into(),
        });
    }

    /// Removes and returns every pending flash message.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.claims.flashes)
    }

    fn hmac(config: &Config) -> Hmac<Sha384> {
        Hmac::<Sha384>::new_from_slice(config.hmac_key.as_bytes())
            .expect("HMAC-SHA-384 can accept any key length")
    }

    pub fn to_token(&self) -> String {
        let claims = SessionClaims {
            exp: (OffsetDateTime::now_utc() + time::Duration::hours(self.config.session_ttl_hours))
                .unix_timestamp(),
            ..self.claims.clone()
        };

        claims
            .sign_with_key(&Self::hmac(&self.config))
            .expect("HMAC signing should be infallible")
    }

    /// Decodes a cookie value. Anything that fails verification yields an empty session.
    pub fn from_token(config: Arc<Config>, token: &str) -> Self {
        let verified: Result<SessionClaims, jwt::Error> =
            VerifyWithKey::verify_with_key(token, &Self::hmac(&config));
        let claims = match verified {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("[session] discarding session cookie: {e}");
                return Self::new(config);
            }
        };

        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            log::debug!("[session] discarding expired session cookie");
            return Self::new(config);
        }

        Self { claims, config }
    }

    fn to_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, self.to_token()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.secure_cookies)
            .max_age(time::Duration::hours(self.config.session_ttl_hours))
            .build()
    }

    fn from_parts(config: Arc<Config>, parts: &Parts) -> Self {
        let token = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned());

        match token {
            Some(token) => Self::from_token(config, &token),
            None => Self::new(config),
        }
    }
}

impl IntoResponseParts for Session {
    type Error = Error;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let value = HeaderValue::from_str(&self.to_cookie().to_string())
            .map_err(|e| anyhow::anyhow!("invalid session cookie header: {e}"))?;
        res.headers_mut().append(SET_COOKIE, value);
        Ok(res)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx: Extension<ApiContext> = Extension::from_request_parts(parts, state)
            .await
            .expect("BUG: ApiContext was not added as an extension");

        Ok(Self::from_parts(ctx.config.clone(), parts))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for LoggedIn
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match session.username().map(str::to_owned) {
            Some(username) => Ok(Self { username, session }),
            None => {
                log::debug!("[session] anonymous request to {}", parts.uri.path());
                session.flash(FlashCategory::Warning, "Please log in first!");
                Err((session, Redirect::to("/")).into_response())
            }
        }
    }
}
