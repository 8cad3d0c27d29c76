use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use validator::Validate;

use crate::dto::user::{LoginForm, RegisterForm, User};
use crate::http::error::{Error, FieldErrors};
use crate::http::session::{FlashCategory, LoggedIn, Session};
use crate::http::views::{self, Field, Input};
use crate::http::{ApiContext, Result};
use crate::logic::credentials;
use crate::logic::feedback::{self, FeedbackHandler};
use crate::logic::users::{self, UsersHandler};

pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/register", get(show_register).post(register))
        .route("/login", get(show_login).post(login))
        .route("/logout", get(logout))
        .route("/users/:username", get(show_user))
        .route("/users/:username/delete", post(delete_user))
}

pub fn user_path(username: &str) -> String {
    format!("/users/{username}")
}

async fn home() -> Redirect {
    Redirect::to("/register")
}

fn register_page(
    mut session: Session,
    status: StatusCode,
    form: &RegisterForm,
    errors: &FieldErrors,
) -> Response {
    let body = views::form(
        "/register",
        &[
            Field::new("username", "Username", Input::Text, &form.username),
            Field::new("password", "Password", Input::Password, ""),
            Field::new("email", "Email", Input::Email, &form.email),
            Field::new("first_name", "First Name", Input::Text, &form.first_name),
            Field::new("last_name", "Last Name", Input::Text, &form.last_name),
        ],
        errors,
        "Register",
    );
    let page = views::layout("Register", &session.take_flashes(), &body);
    (status, session, page).into_response()
}

async fn show_register(session: Session) -> Response {
    if let Some(username) = session.username() {
        let to = user_path(username);
        return Redirect::to(&to).into_response();
    }

    register_page(
        session,
        StatusCode::OK,
        &RegisterForm::default(),
        &FieldErrors::new(),
    )
}

async fn register(
    ctx: Extension<ApiContext>,
    mut session: Session,
    Form(req): Form<RegisterForm>,
) -> Result<Response> {
    let user = match create_user(&ctx, &req).await {
        Ok(user) => user,
        Err(Error::UnprocessableEntity { errors }) => {
            return Ok(register_page(
                session,
                StatusCode::UNPROCESSABLE_ENTITY,
                &req,
                &errors,
            ));
        }
        Err(e) => return Err(e),
    };

    session.log_in(&user.username);
    session.flash(
        FlashCategory::Success,
        "Welcome! Successfully created your account!",
    );

    Ok((session, Redirect::to(&user_path(&user.username))).into_response())
}

async fn create_user(ctx: &ApiContext, req: &RegisterForm) -> Result<User> {
    req.validate()?;

    let user = credentials::register(
        req.username.clone(),
        req.password.clone(),
        req.email.clone(),
        req.first_name.clone(),
        req.last_name.clone(),
    )
    .await?;

    users::Handler::new(ctx.db.clone()).insert(&user).await?;

    Ok(user)
}

fn login_page(
    mut session: Session,
    status: StatusCode,
    form: &LoginForm,
    errors: &FieldErrors,
) -> Response {
    let body = views::form(
        "/login",
        &[
            Field::new("username", "Username", Input::Text, &form.username),
            Field::new("password", "Password", Input::Password, ""),
        ],
        errors,
        "Log in",
    );
    let page = views::layout("Log in", &session.take_flashes(), &body);
    (status, session, page).into_response()
}

async fn show_login(session: Session) -> Response {
    if let Some(username) = session.username() {
        let to = user_path(username);
        return Redirect::to(&to).into_response();
    }

    login_page(
        session,
        StatusCode::OK,
        &LoginForm::default(),
        &FieldErrors::new(),
    )
}

async fn login(
    ctx: Extension<ApiContext>,
    mut session: Session,
    Form(req): Form<LoginForm>,
) -> Result<Response> {
    let user = match check_login(&ctx, &req).await {
        Ok(user) => user,
        Err(Error::UnprocessableEntity { errors }) => {
            return Ok(login_page(
                session,
                StatusCode::UNPROCESSABLE_ENTITY,
                &req,
                &errors,
            ));
        }
        Err(e) => return Err(e),
    };

    session.log_in(&user.username);
    session.flash(
        FlashCategory::Info,
        format!("Welcome back, {}!", user.first_name),
    );

    Ok((session, Redirect::to(&user_path(&user.username))).into_response())
}

async fn check_login(ctx: &ApiContext, req: &LoginForm) -> Result<User> {
    req.validate()?;

    let handler = users::Handler::new(ctx.db.clone());
    credentials::authenticate(&handler, &req.username, req.password.clone())
        .await?
        .ok_or_else(|| Error::unprocessable_entity([("username", "Invalid username/password.")]))
}

async fn logout(mut session: Session) -> impl IntoResponse {
    if let Some(username) = session.username() {
        log::debug!("[logout] {username} logged out");
    }
    session.log_out();
    session.flash(FlashCategory::Info, "Goodbye!");

    (session, Redirect::to("/"))
}

async fn show_user(
    ctx: Extension<ApiContext>,
    LoggedIn {
        username: current,
        mut session,
    }: LoggedIn,
    Path(username): Path<String>,
) -> Result<Response> {
    let Some(user) = users::Handler::new(ctx.db.clone())
        .find_by_username(&username)
        .await?
    else {
        // The session outlived its account (deleted by another user).
        if current == username {
            log::debug!("[show_user] dropping session of deleted user {username}");
            session.log_out();
            session.flash(FlashCategory::Warning, "Your account no longer exists.");
            return Ok((session, Redirect::to("/")).into_response());
        }
        return Err(Error::NotFound);
    };

    let feedback = feedback::Handler::new(ctx.db.clone())
        .list_by_user(&username)
        .await?;

    let page = views::layout(
        &user.username,
        &session.take_flashes(),
        &views::user_detail(&user, &feedback),
    );

    Ok((session, page).into_response())
}

// Any logged-in user may delete any other user; there is no ownership check.
async fn delete_user(
    ctx: Extension<ApiContext>,
    LoggedIn {
        username: current,
        mut session,
    }: LoggedIn,
    Path(username): Path<String>,
) -> Result<Response> {
    match users::Handler::new(ctx.db.clone()).delete(&username).await {
        Ok(true) => (),
        Ok(false) => return Err(Error::NotFound),
        Err(Error::UnprocessableEntity { .. }) => {
            session.flash(
                FlashCategory::Danger,
                "Delete this user's feedback before deleting the account.",
            );
            return Ok((session, Redirect::to(&user_path(&username))).into_response());
        }
        Err(e) => return Err(e),
    }

    if current == username {
        session.log_out();
    }
    session.flash(FlashCategory::Info, format!("Deleted user {username}."));

    Ok((session, Redirect::to("/")).into_response())
}
