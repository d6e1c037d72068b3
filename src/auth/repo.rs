use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    auth::repo_types::{ProfileUpdate, User},
    error::{AppError, AppResult},
};

/// Credential store. Implementations must enforce username uniqueness
/// atomically in `create`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> AppResult<()>;
    async fn find(&self, username: &str) -> AppResult<Option<User>>;
    async fn update_profile(&self, username: &str, profile: ProfileUpdate) -> AppResult<User>;
    async fn set_password_hash(&self, username: &str, password_hash: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, disabled, photo, sex, age, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.disabled)
        .bind(&user.photo)
        .bind(&user.sex)
        .bind(user.age)
        .bind(&user.phone)
        .execute(&self.db)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateUser(user.username))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT username, password_hash, disabled, photo, sex, age, phone
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, username: &str, profile: ProfileUpdate) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET sex = $2, age = $3, phone = $4
            WHERE username = $1
            RETURNING username, password_hash, disabled, photo, sex, age, phone
            "#,
        )
        .bind(username)
        .bind(&profile.sex)
        .bind(profile.age)
        .bind(&profile.phone)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {username}")))
    }

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> AppResult<()> {
        let res = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE username = $1"#)
            .bind(username)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user {username}")));
        }
        Ok(())
    }
}
