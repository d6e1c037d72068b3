use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::{
    auth::{
        jwt::TokenService,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
    memory::{MemoryQuestionStore, MemoryUserStore},
    qa::repo::{PgQuestionStore, QuestionStore},
};

#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: Arc<dyn UserStore>,
    pub questions: Arc<dyn QuestionStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let tokens = TokenService::new(&config.jwt);

        let Some(database_url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
            return Ok(Self::in_memory(tokens));
        };

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database migrations applied");

        Ok(Self::from_parts(
            tokens,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgQuestionStore::new(db)),
        ))
    }

    pub fn from_parts(
        tokens: TokenService,
        users: Arc<dyn UserStore>,
        questions: Arc<dyn QuestionStore>,
    ) -> Self {
        Self {
            tokens,
            users,
            questions,
        }
    }

    pub fn in_memory(tokens: TokenService) -> Self {
        Self::from_parts(
            tokens,
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryQuestionStore::default()),
        )
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let tokens = TokenService::new(&crate::config::JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 30,
        });
        Self::in_memory(tokens)
    }
}
