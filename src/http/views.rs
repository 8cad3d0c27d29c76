//! Server-rendered HTML.
//!
//! Deliberately bare: a layout, a generic form renderer and a handful of pages.

use axum::http::StatusCode;
use axum::response::Html;

use crate::dto::feedback::Feedback;
use crate::dto::user::User;
use crate::http::error::FieldErrors;
use crate::http::session::Flash;

pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn layout(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    let flashes: String = flashes
        .iter()
        .map(|f| {
            format!(
                r#"<div class="alert alert-{}">{}</div>"#,
                f.category.as_str(),
                escape(&f.message)
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Feedback</title>
</head>
<body>
<nav><a href="/register">Register</a> <a href="/login">Log in</a> <a href="/logout">Log out</a></nav>
{flashes}
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

pub enum Input {
    Text,
    Password,
    Email,
    TextArea,
}

pub struct Field<'a> {
    pub name: &'static str,
    pub label: &'static str,
    pub input: Input,
    pub value: &'a str,
}

impl<'a> Field<'a> {
    pub fn new(name: &'static str, label: &'static str, input: Input, value: &'a str) -> Self {
        Self {
            name,
            label,
            input,
            value,
        }
    }
}

pub fn form(action: &str, fields: &[Field<'_>], errors: &FieldErrors, submit: &str) -> String {
    let mut html = format!(r#"<form method="post" action="{}">"#, escape(action));

    for field in fields {
        let value = escape(field.value);
        let control = match field.input {
            Input::TextArea => format!(
                r#"<textarea id="{0}" name="{0}">{1}</textarea>"#,
                field.name, value
            ),
            // Passwords are never echoed back.
            Input::Password => format!(
                r#"<input id="{0}" name="{0}" type="password">"#,
                field.name
            ),
            Input::Email => format!(
                r#"<input id="{0}" name="{0}" type="email" value="{1}">"#,
                field.name, value
            ),
            Input::Text => format!(
                r#"<input id="{0}" name="{0}" type="text" value="{1}">"#,
                field.name, value
            ),
        };

        html.push_str(&format!(
            r#"<p><label for="{}">{}</label> {}"#,
            field.name, field.label, control
        ));
        for message in errors.get(field.name).into_iter().flatten() {
            html.push_str(&format!(
                r#" <small class="error">{}</small>"#,
                escape(message)
            ));
        }
        html.push_str("</p>");
    }

    html.push_str(&format!(
        r#"<button type="submit">{}</button></form>"#,
        escape(submit)
    ));
    html
}

fn button_form(action: &str, label: &str) -> String {
    format!(
        r#"<form method="post" action="{}" style="display:inline"><button type="submit">{}</button></form>"#,
        escape(action),
        escape(label)
    )
}

pub fn user_detail(user: &User, feedback: &[Feedback]) -> String {
    let mut html = format!(
        r#"<dl>
<dt>Username</dt><dd>{}</dd>
<dt>Email</dt><dd>{}</dd>
<dt>Name</dt><dd>{}</dd>
</dl>
<h2>Feedback</h2>
"#,
        escape(&user.username),
        escape(&user.email),
        escape(&user.full_name()),
    );

    if feedback.is_empty() {
        html.push_str("<p>No feedback yet.</p>");
    } else {
        html.push_str("<ul>");
        for f in feedback {
            html.push_str(&format!(
                r#"<li><b>{}</b> <p>{}</p> <a href="/feedback/{}/update">Edit</a> {}</li>"#,
                escape(&f.title),
                escape(&f.content),
                f.id,
                button_form(&format!("/feedback/{}/delete", f.id), "Delete"),
            ));
        }
        html.push_str("</ul>");
    }

    html.push_str(&format!(
        r#"<p><a href="/users/{0}/feedback/new">Add feedback</a></p>{1}"#,
        escape(&user.username),
        button_form(&format!("/users/{}/delete", user.username), "Delete user"),
    ));
    html
}

pub fn error_page(status: StatusCode, message: &str, errors: Option<&FieldErrors>) -> Html<String> {
    let mut body = format!("<p>{}</p>", escape(message));

    if let Some(errors) = errors {
        body.push_str("<ul>");
        for (field, messages) in errors {
            for message in messages {
                body.push_str(&format!(
                    "<li>{}: {}</li>",
                    escape(field),
                    escape(message)
                ));
            }
        }
        body.push_str("</ul>");
    }

    layout(status.canonical_reason().unwrap_or("Error"), &[], &body)
}
