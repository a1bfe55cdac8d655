mod error;
pub mod postgres;
pub mod repos;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    projects: Arc<dyn ProjectRepo>,
    launches: Arc<dyn LaunchRepo>,
    logs: Arc<dyn LogRepo>,
    attachments: Arc<dyn AttachmentRepo>,
    users: Arc<dyn UserRepo>,
    activity: Arc<dyn ActivityRepo>,
    locks: Arc<dyn LockRepo>,
}

/// PostgreSQL pool with cached repositories.
///
/// Repositories are built at construction time to avoid allocation on each
/// access.
pub struct DbPool {
    pool: sqlx::PgPool,
    repos: CachedRepos,
}

impl DbPool {
    /// Wrap an existing pool. Primarily useful for testing.
    pub fn from_postgres(pool: sqlx::PgPool) -> Self {
        let repos = CachedRepos {
            projects: Arc::new(postgres::PostgresProjectRepo::new(pool.clone())),
            launches: Arc::new(postgres::PostgresLaunchRepo::new(pool.clone())),
            logs: Arc::new(postgres::PostgresLogRepo::new(pool.clone())),
            attachments: Arc::new(postgres::PostgresAttachmentRepo::new(pool.clone())),
            users: Arc::new(postgres::PostgresUserRepo::new(pool.clone())),
            activity: Arc::new(postgres::PostgresActivityRepo::new(pool.clone())),
            locks: Arc::new(postgres::PostgresLockRepo::new(pool.clone())),
        };
        DbPool { pool, repos }
    }

    /// Create a database pool from configuration.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self::from_postgres(pool))
    }

    /// Run pending migrations using sqlx's migration runner.
    pub async fn run_migrations(&self) -> DbResult<()> {
        tracing::info!("Running PostgreSQL migrations");
        sqlx::migrate!("./migrations/postgres").run(&self.pool).await?;
        tracing::info!("PostgreSQL migrations completed successfully");
        Ok(())
    }

    pub fn projects(&self) -> Arc<dyn ProjectRepo> {
        Arc::clone(&self.repos.projects)
    }

    pub fn launches(&self) -> Arc<dyn LaunchRepo> {
        Arc::clone(&self.repos.launches)
    }

    pub fn logs(&self) -> Arc<dyn LogRepo> {
        Arc::clone(&self.repos.logs)
    }

    pub fn attachments(&self) -> Arc<dyn AttachmentRepo> {
        Arc::clone(&self.repos.attachments)
    }

    pub fn users(&self) -> Arc<dyn UserRepo> {
        Arc::clone(&self.repos.users)
    }

    pub fn activity(&self) -> Arc<dyn ActivityRepo> {
        Arc::clone(&self.repos.activity)
    }

    pub fn locks(&self) -> Arc<dyn LockRepo> {
        Arc::clone(&self.repos.locks)
    }

    /// Direct access to the underlying pool.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}
