use std::{collections::HashSet, path::PathBuf};

use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
};
use tokio::fs;

pub type OrmConn = DatabaseConnection;

const MIGRATIONS_DIR: &str = "migrations";

pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(20).sqlx_logging(false);
    Ok(Database::connect(options).await?)
}

/// Apply every `migrations/*.sql` file not yet recorded in `schema_migrations`,
/// in filename order. Each file runs in its own transaction.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    let backend = conn.get_database_backend();
    conn.execute(Statement::from_string(
        backend,
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            filename VARCHAR(255) PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ))
    .await?;

    let applied: HashSet<String> = conn
        .query_all(Statement::from_string(
            backend,
            "SELECT filename FROM schema_migrations",
        ))
        .await?
        .iter()
        .filter_map(|row| row.try_get::<String>("", "filename").ok())
        .collect();

    for file in migration_files().await? {
        let Some(name) = file.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if applied.contains(&name) {
            continue;
        }

        let sql = fs::read_to_string(&file).await?;
        let txn = conn.begin().await?;
        // Prepared statements take one command at a time.
        for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            txn.execute(Statement::from_string(backend, format!("{stmt};")))
                .await?;
        }
        txn.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO schema_migrations (filename) VALUES ($1)",
            [name.clone().into()],
        ))
        .await?;
        txn.commit().await?;
        tracing::info!(migration = %name, "migration applied");
    }

    Ok(())
}

async fn migration_files() -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(MIGRATIONS_DIR).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
