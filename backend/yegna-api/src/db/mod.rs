use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
    pub redis: Option<redis::Client>,
}

impl Database {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        // PostgreSQL connection
        let pg = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");

        Ok(Self {
            pg,
            redis: Self::redis_client(config)?,
        })
    }

    /// Pool that connects on first use. Used where no query is expected up front.
    pub fn connect_lazy(config: &Config) -> anyhow::Result<Self> {
        let pg = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect_lazy(&config.database.url)?;

        Ok(Self {
            pg,
            redis: Self::redis_client(config)?,
        })
    }

    fn redis_client(config: &Config) -> anyhow::Result<Option<redis::Client>> {
        match config.redis.url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => {
                let client = redis::Client::open(url)?;
                tracing::info!("Redis client created");
                Ok(Some(client))
            }
            None => {
                tracing::info!("Redis not configured; token revocation disabled");
                Ok(None)
            }
        }
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    pub async fn get_redis_conn(&self) -> anyhow::Result<Option<redis::aio::MultiplexedConnection>> {
        match &self.redis {
            Some(client) => Ok(Some(client.get_multiplexed_async_connection().await?)),
            None => Ok(None),
        }
    }
}
