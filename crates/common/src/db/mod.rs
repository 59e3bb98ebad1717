//! Database layer for Resplain
//!
//! Provides:
//! - SeaORM entity models
//! - The `Store` abstraction used by services
//! - A SeaORM-backed repository and an in-memory store
//! - Connection pool management

mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryStore;
pub use repository::Repository;
pub use store::{escape_like, GalleryFilter, GalleryRow, NewPaper, Store, GALLERY_LIMIT};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::{PaperEntity, UserEntity};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, Schema,
    Statement,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: Arc<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self::from(conn))
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Create the users and papers tables and their indexes if they are missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        for statement in schema_statements(backend) {
            self.conn.execute(statement).await?;
        }
        info!("Database schema verified");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}

impl From<DatabaseConnection> for DbPool {
    fn from(conn: DatabaseConnection) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }
}

/// Idempotent DDL for every entity, tables before indexes
pub fn schema_statements(backend: DbBackend) -> Vec<Statement> {
    let schema = Schema::new(backend);
    let mut statements = Vec::new();

    statements.extend(table_statements(&schema, backend, UserEntity));
    statements.extend(table_statements(&schema, backend, PaperEntity));

    statements
}

fn table_statements<E: EntityTrait>(
    schema: &Schema,
    backend: DbBackend,
    entity: E,
) -> Vec<Statement> {
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();

    let mut statements = vec![backend.build(&table)];
    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        statements.push(backend.build(&index));
    }

    statements
}
