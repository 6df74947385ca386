use std::sync::Arc;

use chrono::FixedOffset;
use sqlx::PgPool;

use crate::{auth::JwtService, config::ServerConfig, llm::LlmClient, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ServerConfig,
    pub jwt: Arc<JwtService>,
    pub mailer: Arc<dyn Mailer>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: ServerConfig,
        jwt: Arc<JwtService>,
        mailer: Arc<dyn Mailer>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        Self {
            pool,
            config,
            jwt,
            mailer,
            llm,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn jwt(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt)
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        Arc::clone(&self.mailer)
    }

    /// `None` when no LLM key is configured.
    pub fn llm(&self) -> Option<Arc<dyn LlmClient>> {
        self.llm.clone()
    }

    /// The fixed timezone used for local dates and time-of-day.
    pub fn utc_offset(&self) -> FixedOffset {
        self.config.scheduler.utc_offset
    }
}
