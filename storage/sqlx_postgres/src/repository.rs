use crate::configuration::Settings;
use sqlx::postgres::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct Repository {
    pg_pool: Arc<PgPool>,
}

impl Repository {
    pub fn pool(&self) -> &PgPool {
        self.pg_pool.as_ref()
    }

    pub async fn new() -> anyhow::Result<Self> {
        use anyhow::Context;

        let pg_connection = Settings::with_db()?;
        let pg_pool = PgPool::connect_with(pg_connection)
            .await
            .context("Failed to connect to DB")
            .map(Arc::new)?;

        Ok(Self { pg_pool })
    }
}
