//! Read-mostly inspection of the connected database for administrators.

use crate::{db, errors::ServiceError, migrator::MANAGED_TABLES};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use sea_orm::{ConnectionTrait, DatabaseConnection};

/// Bookkeeping table of sea-orm-migration, never reported as extra
const MIGRATIONS_TABLE: &str = "seaql_migrations";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub backend: String,
    pub version: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TableState {
    Ok,
    Missing,
    Extra,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableStatus {
    pub name: String,
    pub status: TableState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct IntegritySummary {
    pub expected: usize,
    pub present: usize,
    pub missing: usize,
    pub extra: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IntegrityReport {
    pub tables: Vec<TableStatus>,
    pub summary: IntegritySummary,
    /// Every missing table can be created by running migrations
    pub can_synchronize: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MigrationReport {
    /// `up-to-date` or `pending`
    pub status: String,
    pub applied: Vec<String>,
    pub pending: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MigrationRunReport {
    pub executed: Vec<String>,
    pub status: MigrationReport,
}

/// Compares the managed tables with what the database holds
pub fn compare_tables(expected: &[&str], actual: &[String]) -> IntegrityReport {
    let expected: BTreeSet<&str> = expected.iter().copied().collect();
    let actual: BTreeSet<&str> = actual
        .iter()
        .map(String::as_str)
        .filter(|name| *name != MIGRATIONS_TABLE)
        .collect();

    let mut tables = Vec::with_capacity(expected.len() + actual.len());
    let mut summary = IntegritySummary {
        expected: expected.len(),
        ..Default::default()
    };
    for name in expected.union(&actual) {
        let status = match (expected.contains(name), actual.contains(name)) {
            (true, true) => {
                summary.present += 1;
                TableState::Ok
            }
            (true, false) => {
                summary.missing += 1;
                TableState::Missing
            }
            _ => {
                summary.extra += 1;
                TableState::Extra
            }
        };
        tables.push(TableStatus {
            name: name.to_string(),
            status,
        });
    }

    IntegrityReport {
        tables,
        summary,
        can_synchronize: true,
    }
}

fn migration_report(applied: Vec<String>, pending: Vec<String>) -> MigrationReport {
    MigrationReport {
        status: if pending.is_empty() { "up-to-date" } else { "pending" }.to_string(),
        applied,
        pending,
    }
}

#[derive(Clone)]
pub struct DatabaseAdminService {
    db: Arc<DatabaseConnection>,
}

impl DatabaseAdminService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Never fails; a broken connection is reported in the body
    #[instrument(skip(self))]
    pub async fn connection(&self) -> ConnectionStatus {
        let backend = db::backend_name(self.db.get_database_backend()).to_string();
        if let Err(e) = db::check_connection(&self.db).await {
            return ConnectionStatus {
                connected: false,
                backend,
                version: None,
                error: Some(e.response_message()),
            };
        }
        let version = match db::server_version(&self.db).await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "could not read database server version");
                None
            }
        };
        ConnectionStatus {
            connected: true,
            backend,
            version,
            error: None,
        }
    }

    #[instrument(skip(self))]
    pub async fn integrity(&self) -> Result<IntegrityReport, ServiceError> {
        let actual = db::list_tables(&self.db).await?;
        let mut report = compare_tables(MANAGED_TABLES, &actual);
        if report.summary.missing > 0 {
            // missing tables are only recoverable when their migrations have not run yet
            let (_, pending) = db::migration_status(&self.db).await?;
            report.can_synchronize = !pending.is_empty();
        }
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn migrations(&self) -> Result<MigrationReport, ServiceError> {
        let (applied, pending) = db::migration_status(&self.db).await?;
        Ok(migration_report(applied, pending))
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<MigrationRunReport, ServiceError> {
        let (_, executed) = db::migration_status(&self.db).await?;
        if !executed.is_empty() {
            db::run_migrations(&self.db).await?;
            info!(count = executed.len(), "pending migrations applied");
        }
        Ok(MigrationRunReport {
            executed,
            status: self.migrations().await?,
        })
    }
}
