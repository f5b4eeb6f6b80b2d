//! SQLite-backed [`DeviceStore`] implementation.
//!
//! Devices live in a normalized `devices` table with pinouts and
//! specifications as cascade-deleted children. The `search_fts` FTS5 table
//! mirrors each device's name, body, and tags and is written in the same
//! transaction as the device row.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db;
use crate::error::{IndexError, Result};
use crate::migrate;
use crate::models::{
    DatabaseStats, DefaultPull, Device, DeviceSummary, Domain, Metadata, MetadataValue, Pinout,
    SearchOptions, SearchResult, Specification,
};
use crate::search::build_fts_query;
use crate::store::DeviceStore;

/// SQLite implementation of the [`DeviceStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    reindex: Mutex<()>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            reindex: Mutex::new(()),
        }
    }

    /// Connect using `config` and make sure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Every distinct tag, sorted.
    pub async fn all_tags(&self) -> Result<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT j.value
            FROM devices, json_each(devices.metadata, '$.tags') AS j
            ORDER BY j.value
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    /// Distinct categories with device counts.
    pub async fn all_categories(&self) -> Result<Vec<(String, i64)>> {
        self.count_by_metadata_field("category").await
    }

    /// Distinct manufacturers with device counts.
    pub async fn all_manufacturers(&self) -> Result<Vec<(String, i64)>> {
        self.count_by_metadata_field("manufacturer").await
    }

    async fn count_by_metadata_field(&self, field: &str) -> Result<Vec<(String, i64)>> {
        let path = format!("$.{}", field);
        let rows = sqlx::query(
            r#"
            SELECT json_extract(metadata, ?) AS value, COUNT(*) AS count
            FROM devices
            WHERE json_extract(metadata, ?) IS NOT NULL
            GROUP BY value
            ORDER BY value
            "#,
        )
        .bind(&path)
        .bind(&path)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("value"), row.get("count")))
            .collect())
    }

    /// Every metadata key seen across devices, with the value kinds observed
    /// for it (`string`, `number`, `bool`, `list`, `map`).
    pub async fn metadata_schema(&self) -> Result<BTreeMap<String, BTreeSet<&'static str>>> {
        let docs: Vec<String> = sqlx::query_scalar("SELECT metadata FROM devices")
            .fetch_all(&self.pool)
            .await?;

        let mut schema: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();
        for doc in docs {
            let Ok(metadata) = serde_json::from_str::<Metadata>(&doc) else {
                continue;
            };
            for (key, value) in metadata {
                schema.entry(key).or_default().insert(value.kind());
            }
        }
        Ok(schema)
    }
}

fn decode_domain(raw: &str) -> Result<Domain> {
    raw.parse::<Domain>()
        .map_err(|e| IndexError::Database(sqlx::Error::Decode(e.into())))
}

fn decode_metadata(raw: &str) -> Result<Metadata> {
    Ok(serde_json::from_str(raw)?)
}

fn decode_timestamp(ts: i64) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

/// Space-joined tags for the full-text `tags` column.
fn flatten_tags(metadata: &Metadata) -> String {
    metadata
        .get("tags")
        .and_then(MetadataValue::as_list)
        .map(|tags| tags.join(" "))
        .unwrap_or_default()
}

fn row_to_pinout(row: &SqliteRow) -> Result<Pinout> {
    let alt_json: Option<String> = row.get("alt_functions");
    let alt_functions = match alt_json {
        Some(json) if !json.is_empty() => serde_json::from_str(&json)?,
        _ => Vec::new(),
    };
    let default_pull: Option<String> = row.get("default_pull");

    Ok(Pinout {
        physical_pin: row.get("physical_pin"),
        gpio_num: row.get("gpio_num"),
        name: row.get("name"),
        default_pull: default_pull.as_deref().and_then(DefaultPull::from_text),
        alt_functions,
        description: row.get("description"),
    })
}

const PINOUT_COLUMNS: &str =
    "physical_pin, gpio_num, name, default_pull, alt_functions, description";

#[async_trait]
impl DeviceStore for SqliteStore {
    async fn upsert_device(&self, device: &Device) -> Result<()> {
        let write_err = |source| IndexError::StorageWrite {
            id: device.id.clone(),
            source,
        };
        let metadata_json = serde_json::to_string(&device.metadata)?;

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query(
            r#"
            INSERT INTO devices (id, domain, type, name, path, content, metadata, indexed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                domain = excluded.domain,
                type = excluded.type,
                name = excluded.name,
                path = excluded.path,
                content = excluded.content,
                metadata = excluded.metadata,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(&device.id)
        .bind(device.domain.as_str())
        .bind(&device.device_type)
        .bind(&device.name)
        .bind(&device.path)
        .bind(&device.content)
        .bind(&metadata_json)
        .bind(device.indexed_at.timestamp())
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        // FTS5 has no key constraint; drop the old entry before inserting
        sqlx::query("DELETE FROM search_fts WHERE device_id = ?")
            .bind(&device.id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        sqlx::query("INSERT INTO search_fts (device_id, name, content, tags) VALUES (?, ?, ?, ?)")
            .bind(&device.id)
            .bind(&device.name)
            .bind(&device.content)
            .bind(flatten_tags(&device.metadata))
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    async fn upsert_pinouts(&self, device_id: &str, pinouts: &[Pinout]) -> Result<()> {
        let write_err = |source| IndexError::SecondaryWrite {
            id: device_id.to_string(),
            source,
        };

        let mut encoded = Vec::with_capacity(pinouts.len());
        for pin in pinouts {
            let alt = if pin.alt_functions.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&pin.alt_functions)?)
            };
            encoded.push((pin, alt));
        }

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query("DELETE FROM pinouts WHERE device_id = ?")
            .bind(device_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        for (pin, alt) in encoded {
            sqlx::query(
                r#"
                INSERT INTO pinouts (device_id, physical_pin, gpio_num, name, default_pull, alt_functions, description)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(device_id, physical_pin) DO UPDATE SET
                    gpio_num = excluded.gpio_num,
                    name = excluded.name,
                    default_pull = excluded.default_pull,
                    alt_functions = excluded.alt_functions,
                    description = excluded.description
                "#,
            )
            .bind(device_id)
            .bind(pin.physical_pin)
            .bind(pin.gpio_num)
            .bind(&pin.name)
            .bind(pin.default_pull.map(|p| p.as_str()))
            .bind(alt)
            .bind(&pin.description)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    async fn upsert_specifications(
        &self,
        device_id: &str,
        specs: &[Specification],
    ) -> Result<()> {
        let write_err = |source| IndexError::SecondaryWrite {
            id: device_id.to_string(),
            source,
        };

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query("DELETE FROM specifications WHERE device_id = ?")
            .bind(device_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        for spec in specs {
            sqlx::query(
                r#"
                INSERT INTO specifications (device_id, key, value, unit) VALUES (?, ?, ?, ?)
                ON CONFLICT(device_id, key) DO UPDATE SET
                    value = excluded.value,
                    unit = excluded.unit
                "#,
            )
            .bind(device_id)
            .bind(&spec.key)
            .bind(&spec.value)
            .bind(&spec.unit)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(IndexError::Clear)?;

        for stmt in [
            "DELETE FROM search_fts",
            "DELETE FROM specifications",
            "DELETE FROM pinouts",
            "DELETE FROM devices",
        ] {
            sqlx::query(stmt)
                .execute(&mut *tx)
                .await
                .map_err(IndexError::Clear)?;
        }

        tx.commit().await.map_err(IndexError::Clear)?;
        Ok(())
    }

    async fn search(&self, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        let fts_query = build_fts_query(&opts.query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r#"
            SELECT d.id, d.name, d.domain, d.type, d.path, d.metadata,
                   search_fts.rank AS relevance
            FROM search_fts
            JOIN devices d ON d.id = search_fts.device_id
            WHERE search_fts MATCH ?
            "#,
        );
        if opts.domain.is_some() {
            sql.push_str(" AND d.domain = ?");
        }
        if opts.device_type.is_some() {
            sql.push_str(" AND d.type = ?");
        }
        sql.push_str(" ORDER BY search_fts.rank LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql).bind(&fts_query);
        if let Some(domain) = opts.domain {
            query = query.bind(domain.as_str());
        }
        if let Some(device_type) = &opts.device_type {
            query = query.bind(device_type);
        }
        let rows = query
            .bind(opts.limit)
            .bind(opts.offset.max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let domain: String = row.get("domain");
                let metadata: String = row.get("metadata");
                Ok(SearchResult {
                    id: row.get("id"),
                    name: row.get("name"),
                    domain: decode_domain(&domain)?,
                    device_type: row.get("type"),
                    path: row.get("path"),
                    metadata: decode_metadata(&metadata)?,
                    relevance: row.get("relevance"),
                })
            })
            .collect()
    }

    async fn get_device(&self, id: &str) -> Result<Option<Device>> {
        let row = sqlx::query(
            "SELECT id, domain, type, name, path, content, metadata, indexed_at FROM devices WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let domain: String = row.get("domain");
        let metadata: String = row.get("metadata");
        Ok(Some(Device {
            id: row.get("id"),
            domain: decode_domain(&domain)?,
            device_type: row.get("type"),
            name: row.get("name"),
            path: row.get("path"),
            metadata: decode_metadata(&metadata)?,
            content: row.get("content"),
            indexed_at: decode_timestamp(row.get("indexed_at")),
        }))
    }

    async fn get_pinouts(&self, device_id: &str) -> Result<Vec<Pinout>> {
        let sql = format!(
            "SELECT {} FROM pinouts WHERE device_id = ? ORDER BY physical_pin",
            PINOUT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(device_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_pinout).collect()
    }

    async fn find_pinouts_by_interface(
        &self,
        device_id: &str,
        interface: &str,
    ) -> Result<Vec<Pinout>> {
        let pattern = format!("%{}%", interface.to_lowercase());
        let sql = format!(
            r#"
            SELECT {} FROM pinouts
            WHERE device_id = ?
              AND (LOWER(name) LIKE ? OR LOWER(COALESCE(alt_functions, '')) LIKE ?)
            ORDER BY physical_pin
            "#,
            PINOUT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(device_id)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_pinout).collect()
    }

    async fn get_specifications(&self, device_id: &str) -> Result<Vec<Specification>> {
        let rows = sqlx::query(
            "SELECT key, value, unit FROM specifications WHERE device_id = ? ORDER BY key",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Specification {
                key: row.get("key"),
                value: row.get("value"),
                unit: row.get("unit"),
            })
            .collect())
    }

    async fn list_devices(&self, domain: Option<Domain>) -> Result<Vec<DeviceSummary>> {
        let mut sql =
            String::from("SELECT id, domain, type, name, path, metadata, indexed_at FROM devices");
        if domain.is_some() {
            sql.push_str(" WHERE domain = ?");
        }
        sql.push_str(" ORDER BY name, id");

        let mut query = sqlx::query(&sql);
        if let Some(d) = domain {
            query = query.bind(d.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let domain: String = row.get("domain");
                let metadata: String = row.get("metadata");
                Ok(DeviceSummary {
                    id: row.get("id"),
                    domain: decode_domain(&domain)?,
                    device_type: row.get("type"),
                    name: row.get("name"),
                    path: row.get("path"),
                    metadata: decode_metadata(&metadata)?,
                    indexed_at: decode_timestamp(row.get("indexed_at")),
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<DatabaseStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM devices) AS total_devices,
                (SELECT COUNT(*) FROM devices WHERE domain = 'hardware') AS hardware_count,
                (SELECT COUNT(*) FROM devices WHERE domain = 'software') AS software_count,
                (SELECT COUNT(*) FROM devices WHERE domain = 'protocol') AS protocol_count,
                (SELECT COUNT(*) FROM pinouts) AS total_pinouts,
                (SELECT COUNT(*) FROM specifications) AS total_specs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            total_devices: row.get("total_devices"),
            hardware_count: row.get("hardware_count"),
            software_count: row.get("software_count"),
            protocol_count: row.get("protocol_count"),
            total_pinouts: row.get("total_pinouts"),
            total_specs: row.get("total_specs"),
        })
    }

    fn reindex_lock(&self) -> &Mutex<()> {
        &self.reindex
    }
}
