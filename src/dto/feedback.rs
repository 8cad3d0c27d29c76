use validator::Validate;

/// A row of the `feedback` table.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Feedback {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
}

#[derive(serde::Deserialize, Validate, Default)]
#[serde(default)]
pub struct FeedbackForm {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub content: String,
}

impl From<&Feedback> for FeedbackForm {
    fn from(feedback: &Feedback) -> Self {
        Self {
            title: feedback.title.clone(),
            content: feedback.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_bounded() {
        let form = FeedbackForm {
            title: "t".repeat(101),
            content: "fine".into(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let form = FeedbackForm {
            title: "t".repeat(100),
            content: "fine".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn content_is_required() {
        let form = FeedbackForm {
            title: "Title".into(),
            content: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("content"));
    }
}
