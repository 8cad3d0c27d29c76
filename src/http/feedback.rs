use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use validator::Validate;

use crate::dto::feedback::{Feedback, FeedbackForm};
use crate::http::error::{field_errors, Error, FieldErrors};
use crate::http::session::{FlashCategory, LoggedIn, Session};
use crate::http::users::user_path;
use crate::http::views::{self, Field, Input};
use crate::http::{ApiContext, Result};
use crate::logic::feedback::{self, FeedbackHandler};
use crate::logic::users::{self, UsersHandler};

pub fn router() -> Router {
    Router::new()
        .route(
            "/users/:username/feedback/new",
            get(show_new_feedback).post(create_feedback),
        )
        .route(
            "/feedback/:id/update",
            get(show_update_feedback).post(update_feedback),
        )
        .route("/feedback/:id/delete", post(delete_feedback))
}

fn feedback_page(
    mut session: Session,
    status: StatusCode,
    title: &str,
    action: &str,
    form: &FeedbackForm,
    errors: &FieldErrors,
) -> Response {
    let body = views::form(
        action,
        &[
            Field::new("title", "Title", Input::Text, &form.title),
            Field::new("content", "Content", Input::TextArea, &form.content),
        ],
        errors,
        "Save",
    );
    let page = views::layout(title, &session.take_flashes(), &body);
    (status, session, page).into_response()
}

fn new_feedback_action(username: &str) -> String {
    format!("/users/{username}/feedback/new")
}

fn update_feedback_action(id: i64) -> String {
    format!("/feedback/{id}/update")
}

async fn ensure_user_exists(ctx: &ApiContext, username: &str) -> Result<()> {
    users::Handler::new(ctx.db.clone())
        .find_by_username(username)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(())
}

async fn find_feedback(ctx: &ApiContext, id: i64) -> Result<Feedback> {
    feedback::Handler::new(ctx.db.clone())
        .find(id)
        .await?
        .ok_or(Error::NotFound)
}

async fn show_new_feedback(
    ctx: Extension<ApiContext>,
    LoggedIn { session, .. }: LoggedIn,
    Path(username): Path<String>,
) -> Result<Response> {
    ensure_user_exists(&ctx, &username).await?;

    Ok(feedback_page(
        session,
        StatusCode::OK,
        "Add Feedback",
        &new_feedback_action(&username),
        &FeedbackForm::default(),
        &FieldErrors::new(),
    ))
}

async fn create_feedback(
    ctx: Extension<ApiContext>,
    LoggedIn { mut session, .. }: LoggedIn,
    Path(username): Path<String>,
    Form(req): Form<FeedbackForm>,
) -> Result<Response> {
    if let Err(e) = req.validate() {
        let errors = field_errors(&e);
        // Still 404 for unknown users rather than showing a form for them.
        ensure_user_exists(&ctx, &username).await?;
        return Ok(feedback_page(
            session,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Add Feedback",
            &new_feedback_action(&username),
            &req,
            &errors,
        ));
    }

    feedback::Handler::new(ctx.db.clone())
        .create(&username, &req.title, &req.content)
        .await?;

    session.flash(FlashCategory::Success, "Feedback added!");
    Ok((session, Redirect::to(&user_path(&username))).into_response())
}

async fn show_update_feedback(
    ctx: Extension<ApiContext>,
    LoggedIn { session, .. }: LoggedIn,
    Path(id): Path<i64>,
) -> Result<Response> {
    let feedback = find_feedback(&ctx, id).await?;

    Ok(feedback_page(
        session,
        StatusCode::OK,
        "Edit Feedback",
        &update_feedback_action(id),
        &FeedbackForm::from(&feedback),
        &FieldErrors::new(),
    ))
}

// Any logged-in user may edit any feedback; there is no ownership check.
async fn update_feedback(
    ctx: Extension<ApiContext>,
    LoggedIn { mut session, .. }: LoggedIn,
    Path(id): Path<i64>,
    Form(req): Form<FeedbackForm>,
) -> Result<Response> {
    if let Err(e) = req.validate() {
        let errors = field_errors(&e);
        find_feedback(&ctx, id).await?;
        return Ok(feedback_page(
            session,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Edit Feedback",
            &update_feedback_action(id),
            &req,
            &errors,
        ));
    }

    let feedback = feedback::Handler::new(ctx.db.clone())
        .update(id, &req.title, &req.content)
        .await?
        .ok_or(Error::NotFound)?;

    session.flash(FlashCategory::Success, "Feedback updated!");
    Ok((session, Redirect::to(&user_path(&feedback.username))).into_response())
}

async fn delete_feedback(
    ctx: Extension<ApiContext>,
    LoggedIn { mut session, .. }: LoggedIn,
    Path(id): Path<i64>,
) -> Result<Response> {
    let feedback = feedback::Handler::new(ctx.db.clone())
        .delete(id)
        .await?
        .ok_or(Error::NotFound)?;

    session.flash(FlashCategory::Info, "Feedback deleted.");
    Ok((session, Redirect::to(&user_path(&feedback.username))).into_response())
}
