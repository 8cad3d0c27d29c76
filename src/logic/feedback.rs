use crate::{
    dto::feedback::Feedback,
    http::{Error, Result, ResultExt},
};

use sqlx::AnyPool;

pub trait FeedbackHandler {
    fn create(
        &self,
        username: &str,
        title: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Feedback, Error>> + Send;

    fn find(&self, id: i64) -> impl std::future::Future<Output = Result<Option<Feedback>, Error>> + Send;

    fn list_by_user(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Feedback>, Error>> + Send;

    fn update(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Option<Feedback>, Error>> + Send;

    fn delete(&self, id: i64) -> impl std::future::Future<Output = Result<Option<Feedback>, Error>> + Send;
}

pub struct Handler {
    db: AnyPool,
}

impl Handler {
    pub fn new(db: AnyPool) -> Self {
        Self { db }
    }
}

impl FeedbackHandler for Handler {
    // Fails with `NotFound` if `username` does not exist.
    async fn create(&self, username: &str, title: &str, content: &str) -> Result<Feedback, Error> {
        let id: i64 = sqlx::query_scalar(
            r#"insert into feedback (title, content, username) values ($1, $2, $3) returning id"#,
        )
        .bind(title)
        .bind(content)
        .bind(username)
        .fetch_one(&self.db)
        .await
        .on_foreign_key_violation(|_| Error::NotFound)
        .on_check_violation(|_| {
            Error::unprocessable_entity([("title", "must be between 1 and 100 characters")])
        })?;

        log::info!("[create_feedback] {username} added feedback {id}");

        Ok(Feedback {
            id,
            title: title.to_owned(),
            content: content.to_owned(),
            username: username.to_owned(),
        })
    }

    async fn find(&self, id: i64) -> Result<Option<Feedback>, Error> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"select id, title, content, username from feedback where id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(feedback)
    }

    async fn list_by_user(&self, username: &str) -> Result<Vec<Feedback>, Error> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            select id, title, content, username
            from feedback
            where username = $1
            order by id
            "#,
        )
        .bind(username)
        .fetch_all(&self.db)
        .await?;

        Ok(feedback)
    }

    async fn update(&self, id: i64, title: &str, content: &str) -> Result<Option<Feedback>, Error> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            update feedback
            set title = $1,
                content = $2
            where id = $3
            returning id, title, content, username
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .on_check_violation(|_| {
            Error::unprocessable_entity([("title", "must be between 1 and 100 characters")])
        })?;

        if feedback.is_some() {
            log::info!("[update_feedback] updated feedback {id}");
        }
        Ok(feedback)
    }

    // Returns the removed row so callers know whose page to go back to.
    async fn delete(&self, id: i64) -> Result<Option<Feedback>, Error> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"delete from feedback where id = $1 returning id, title, content, username"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        if feedback.is_some() {
            log::info!("[delete_feedback] deleted feedback {id}");
        }
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::test_db;
    use crate::dto::user::User;
    use crate::logic::users::{self, UsersHandler};

    async fn setup() -> (AnyPool, Handler) {
        let db = test_db().await;
        for name in ["alice", "bob"] {
            users::Handler::new(db.clone())
                .insert(&User {
                    username: name.into(),
                    password: "hash".into(),
                    email: format!("{name}@example.com"),
                    first_name: name.into(),
                    last_name: "Example".into(),
                })
                .await
                .unwrap();
        }
        (db.clone(), Handler::new(db))
    }

    #[tokio::test]
    async fn feedback_requires_an_existing_user() {
        let (db, handler) = setup().await;

        let err = handler.create("ghost", "Boo", "...").await.unwrap_err();
        assert!(matches!(err, Error::NotFound));

        let rows: i64 = sqlx::query_scalar("select count(*) from feedback")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn schema_rejects_out_of_range_titles() {
        let (db, handler) = setup().await;

        for title in [String::new(), "t".repeat(101)] {
            let err = handler.create("alice", &title, "body").await.unwrap_err();
            assert!(
                matches!(err, Error::UnprocessableEntity { .. }),
                "expected a form error, got {err:?}"
            );
        }

        let rows: i64 = sqlx::query_scalar("select count(*) from feedback")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(rows, 0);

        let note = handler.create("alice", "Fine", "body").await.unwrap();
        let err = handler
            .update(note.id, &"t".repeat(101), "body")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnprocessableEntity { .. }));
        assert_eq!(handler.find(note.id).await.unwrap(), Some(note));
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_owner_and_ordered() {
        let (_db, handler) = setup().await;

        let first = handler.create("alice", "First", "one").await.unwrap();
        handler.create("bob", "Other", "two").await.unwrap();
        let second = handler.create("alice", "Second", "three").await.unwrap();

        assert_eq!(
            handler.list_by_user("alice").await.unwrap(),
            vec![first, second]
        );
        assert!(handler.list_by_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_the_owner() {
        let (_db, handler) = setup().await;

        let note = handler.create("alice", "Draft", "tbd").await.unwrap();
        let updated = handler
            .update(note.id, "Final", "done")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, note.id);
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content, "done");
        assert_eq!(updated.username, "alice");
        assert_eq!(handler.find(note.id).await.unwrap(), Some(updated));

        assert_eq!(handler.update(9999, "x", "y").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_returns_the_removed_row() {
        let (_db, handler) = setup().await;

        let note = handler.create("bob", "Bye", "gone soon").await.unwrap();

        assert_eq!(handler.delete(note.id).await.unwrap(), Some(note.clone()));
        assert_eq!(handler.delete(note.id).await.unwrap(), None);
        assert_eq!(handler.find(note.id).await.unwrap(), None);
    }
}
