use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::migrator::Migrator;
use metrics::{counter, gauge};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement,
};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    /// Log every statement through sqlx
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
            sqlx_logging: false,
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
            sqlx_logging: cfg.is_development(),
        }
    }
}

/// Establishes a connection pool with default tuning
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };
    establish_connection_with_config(&config).await
}

pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(config.sqlx_logging);

    gauge!("steel_erp_db.max_connections", config.max_connections as f64);

    let pool = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "database connection failed");
        ServiceError::db_error(e)
    })?;

    info!(
        backend = ?pool.get_database_backend(),
        "Database connection pool established"
    );
    Ok(pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&cfg.into()).await
}

/// Applies every pending embedded migration
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = Migrator::up(pool, None).await.map_err(|e| {
        ServiceError::MigrationError(e.to_string())
    });

    match &result {
        Ok(()) => info!(elapsed = ?start.elapsed(), "Database migrations completed"),
        Err(e) => error!(elapsed = ?start.elapsed(), error = %e, "Database migrations failed"),
    }
    result
}

/// Names of applied and pending migrations, in order
pub async fn migration_status(pool: &DbPool) -> Result<(Vec<String>, Vec<String>), ServiceError> {
    let applied = Migrator::get_applied_migrations(pool)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))?
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    let pending = Migrator::get_pending_migrations(pool)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))?
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    Ok((applied, pending))
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = std::time::Instant::now();
    let result = pool.ping().await.map_err(ServiceError::db_error);

    match &result {
        Ok(()) => {
            gauge!(
                "steel_erp_db.connection_latency",
                start.elapsed().as_millis() as f64
            );
        }
        Err(e) => {
            error!(error = %e, "Database connection check failed");
            counter!("steel_erp_db.connection_failures", 1);
        }
    }
    result
}

pub fn backend_name(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "postgres",
        DbBackend::Sqlite => "sqlite",
        DbBackend::MySql => "mysql",
    }
}

/// Server version string reported by the database
pub async fn server_version(pool: &DbPool) -> Result<Option<String>, ServiceError> {
    let backend = pool.get_database_backend();
    let sql = match backend {
        DbBackend::Sqlite => "SELECT sqlite_version() AS version",
        DbBackend::Postgres | DbBackend::MySql => "SELECT version() AS version",
    };
    let row = pool
        .query_one(Statement::from_string(backend, sql))
        .await
        .map_err(ServiceError::db_error)?;
    Ok(match row {
        Some(row) => row.try_get::<String>("", "version").ok(),
        None => None,
    })
}

/// User tables present in the connected database, sorted by name
pub async fn list_tables(pool: &DbPool) -> Result<Vec<String>, ServiceError> {
    let backend = pool.get_database_backend();
    let sql = match backend {
        DbBackend::Sqlite => {
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
        }
        DbBackend::Postgres => {
            "SELECT table_name AS name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'"
        }
        DbBackend::MySql => {
            "SELECT table_name AS name FROM information_schema.tables \
             WHERE table_schema = DATABASE()"
        }
    };

    let rows = pool
        .query_all(Statement::from_string(backend, sql))
        .await
        .map_err(ServiceError::db_error)?;
    let mut tables = rows
        .iter()
        .map(|row| row.try_get::<String>("", "name"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ServiceError::db_error)?;
    tables.sort();
    Ok(tables)
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");
    pool.close().await.map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> DbPool {
        establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn migrations_create_every_managed_table() {
        let pool = memory_pool().await;
        let (_, pending) = migration_status(&pool).await.unwrap();
        assert_eq!(pending.len(), Migrator::migrations().len());

        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();

        let tables = list_tables(&pool).await.unwrap();
        for table in crate::migrator::MANAGED_TABLES {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }

        let (applied, pending) = migration_status(&pool).await.unwrap();
        assert!(pending.is_empty());
        assert_eq!(applied.len(), Migrator::migrations().len());
    }

    #[tokio::test]
    async fn sqlite_reports_its_version() {
        let pool = memory_pool().await;
        let version = server_version(&pool).await.unwrap();
        assert!(version.is_some_and(|v| v.starts_with('3')));
        assert_eq!(backend_name(pool.get_database_backend()), "sqlite");
    }
}
