use crate::{
    dto::user::User,
    http::{Error, Result, ResultExt},
};

use sqlx::AnyPool;

pub trait UsersHandler {
    fn insert(&self, user: &User) -> impl std::future::Future<Output = Result<(), Error>> + Send;

    fn find_by_username(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, Error>> + Send;

    fn delete(&self, username: &str)
        -> impl std::future::Future<Output = Result<bool, Error>> + Send;
}

pub struct Handler {
    db: AnyPool,
}

impl Handler {
    pub fn new(db: AnyPool) -> Self {
        Self { db }
    }
}

impl UsersHandler for Handler {
    // Persists a user built by `credentials::register`.
    // A collision on either unique column reports the same generic error.
    async fn insert(&self, user: &User) -> Result<(), Error> {
        sqlx::query(
            r#"
            insert into users (username, password, email, first_name, last_name)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.db)
        .await
        .on_unique_violation(|_| {
            Error::unprocessable_entity([("username", "username or email taken")])
        })
        // Only reachable when form validation was bypassed.
        .on_check_violation(|_| {
            Error::unprocessable_entity([("user", "a field is empty or too long")])
        })?;

        log::info!("[insert_user] created user {}", user.username);
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            select username, password, email, first_name, last_name
            from users
            where username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    // Returns `false` when no such user exists. Users that still own feedback are
    // refused by the foreign key rather than cascaded.
    async fn delete(&self, username: &str) -> Result<bool, Error> {
        let result = sqlx::query("delete from users where username = $1")
            .bind(username)
            .execute(&self.db)
            .await
            .on_foreign_key_violation(|_| {
                Error::unprocessable_entity([("username", "user still has feedback")])
            })?;

        if result.rows_affected() > 0 {
            log::info!("[delete_user] deleted user {username}");
        }
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::test_db;
    use crate::logic::feedback::{self, FeedbackHandler};

    fn user(username: &str, email: &str) -> User {
        User {
            username: username.into(),
            password: "not-a-real-hash".into(),
            email: email.into(),
            first_name: "First".into(),
            last_name: "Last".into(),
        }
    }

    async fn count_users(db: &AnyPool) -> i64 {
        sqlx::query_scalar("select count(*) from users")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_leaves_one_row() {
        let db = test_db().await;
        let handler = Handler::new(db.clone());

        handler.insert(&user("alice", "a@example.com")).await.unwrap();
        let err = handler
            .insert(&user("alice", "other@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnprocessableEntity { .. }));
        assert_eq!(count_users(&db).await, 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = test_db().await;
        let handler = Handler::new(db.clone());

        handler.insert(&user("alice", "a@example.com")).await.unwrap();
        let err = handler
            .insert(&user("bob", "a@example.com"))
            .await
            .unwrap_err();

        let Error::UnprocessableEntity { errors } = err else {
            panic!("expected a form error, got {err:?}");
        };
        assert_eq!(errors["username"], vec!["username or email taken"]);
        assert_eq!(count_users(&db).await, 1);
    }

    #[tokio::test]
    async fn schema_rejects_out_of_range_user_fields() {
        let db = test_db().await;
        let handler = Handler::new(db.clone());

        let too_long_username = user(&"a".repeat(21), "a@example.com");
        let too_long_email = user("alice", &format!("{}@example.com", "a".repeat(39)));
        let empty_username = user("", "b@example.com");
        assert_eq!(too_long_email.email.len(), 51);

        for bad in [too_long_username, too_long_email, empty_username] {
            let err = handler.insert(&bad).await.unwrap_err();
            let Error::UnprocessableEntity { errors } = err else {
                panic!("expected a form error, got {err:?}");
            };
            assert!(errors.contains_key("user"));
        }

        assert_eq!(count_users(&db).await, 0);
    }

    #[tokio::test]
    async fn find_by_username() {
        let db = test_db().await;
        let handler = Handler::new(db);

        let alice = user("alice", "a@example.com");
        handler.insert(&alice).await.unwrap();

        assert_eq!(handler.find_by_username("alice").await.unwrap(), Some(alice));
        assert_eq!(handler.find_by_username("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_without_feedback_removes_the_user() {
        let db = test_db().await;
        let handler = Handler::new(db.clone());

        handler.insert(&user("alice", "a@example.com")).await.unwrap();

        assert!(handler.delete("alice").await.unwrap());
        assert!(!handler.delete("alice").await.unwrap());
        assert_eq!(count_users(&db).await, 0);
    }

    #[tokio::test]
    async fn delete_with_feedback_is_refused() {
        let db = test_db().await;
        let users = Handler::new(db.clone());
        let feedback = feedback::Handler::new(db.clone());

        users.insert(&user("alice", "a@example.com")).await.unwrap();
        let note = feedback.create("alice", "Hi", "There").await.unwrap();

        let err = users.delete("alice").await.unwrap_err();
        assert!(matches!(err, Error::UnprocessableEntity { .. }));

        assert_eq!(count_users(&db).await, 1);
        assert_eq!(feedback.find(note.id).await.unwrap(), Some(note));
    }
}
