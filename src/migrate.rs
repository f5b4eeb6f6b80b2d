use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an open pool. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Create devices table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id TEXT PRIMARY KEY,
            domain TEXT NOT NULL CHECK(domain IN ('hardware', 'software', 'protocol')),
            type TEXT NOT NULL,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            metadata TEXT NOT NULL DEFAULT '{}',
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create pinouts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pinouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            physical_pin INTEGER NOT NULL,
            gpio_num INTEGER,
            name TEXT NOT NULL,
            default_pull TEXT CHECK(default_pull IN ('high', 'low', 'none')),
            alt_functions TEXT,
            description TEXT,
            UNIQUE(device_id, physical_pin),
            FOREIGN KEY (device_id) REFERENCES devices(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create specifications table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS specifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            unit TEXT,
            UNIQUE(device_id, key),
            FOREIGN KEY (device_id) REFERENCES devices(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='search_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE search_fts USING fts5(
                device_id UNINDEXED,
                name,
                content,
                tags,
                tokenize='porter unicode61'
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    // Create indexes
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_devices_domain ON devices(domain)",
        "CREATE INDEX IF NOT EXISTS idx_devices_type ON devices(type)",
        "CREATE INDEX IF NOT EXISTS idx_devices_name ON devices(name)",
        "CREATE INDEX IF NOT EXISTS idx_pinouts_device ON pinouts(device_id)",
        "CREATE INDEX IF NOT EXISTS idx_pinouts_gpio ON pinouts(gpio_num)",
        "CREATE INDEX IF NOT EXISTS idx_specs_device ON specifications(device_id)",
    ];
    for stmt in indexes {
        sqlx::query(stmt).execute(pool).await?;
    }

    Ok(())
}
