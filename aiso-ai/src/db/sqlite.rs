//! Durable sample store on SQLite
//!
//! Tag, characteristic and analysis values are stored as JSON text; tag
//! filtering and tag search go through `json_each`.

use aiso_common::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use super::{now, SampleStore, StorageKind};
use crate::models::{NewSample, Sample, SampleUpdate, TagAssignment};

const SAMPLE_COLUMNS: &str = "id, name, path, size, duration, bitrate, sample_rate, channels, \
    category, subcategory, mood, energy, style, bpm, confidence, musical_key, description, \
    tags, characteristics, analysis, created_at, updated_at, last_played, play_count, favorite";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Create the samples table and its indexes if they don't exist
pub(crate) async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS samples (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            size INTEGER,
            duration REAL,
            bitrate INTEGER,
            sample_rate INTEGER,
            channels INTEGER,
            category TEXT,
            subcategory TEXT,
            mood TEXT,
            energy TEXT,
            style TEXT,
            bpm REAL,
            confidence REAL,
            musical_key TEXT,
            description TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            characteristics TEXT NOT NULL DEFAULT '[]',
            analysis TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_played TEXT,
            play_count INTEGER NOT NULL DEFAULT 0,
            favorite INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_category ON samples(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_created_at ON samples(created_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (samples)");
    Ok(())
}

/// SQLite-backed [`SampleStore`]
#[derive(Clone)]
pub struct SqliteSampleStore {
    pool: SqlitePool,
}

impl SqliteSampleStore {
    /// Open (creating if needed) the database file and initialize tables
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = super::init_database_pool(db_path).await?;
        Ok(Self { pool })
    }

    /// Wrap a pool whose tables are already initialized
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read, change and write back one record inside a single transaction
    ///
    /// The transaction takes the write lock before reading, so concurrent
    /// modifications of the same database serialize instead of overwriting
    /// each other. `change` returns whether it altered the sample; if not,
    /// nothing is written and `updated_at` is kept.
    async fn modify<F>(&self, id: Uuid, change: F) -> Result<(Sample, bool)>
    where
        F: FnOnce(&mut Sample) -> bool + Send,
    {
        let mut tx = self.pool.begin().await?;

        // A write as the first statement makes SQLite reserve the database
        let claimed = sqlx::query("UPDATE samples SET updated_at = updated_at WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Sample {}", id)));
        }

        let sql = format!("SELECT {} FROM samples WHERE id = ?", SAMPLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let mut sample = sample_from_row(&row)?;

        let changed = change(&mut sample);
        if changed {
            sample.updated_at = now();
            write_editable(&mut *tx, &sample).await?;
        }
        tx.commit().await?;

        Ok((sample, changed))
    }

    async fn fetch_where(&self, condition: &str, value: &str) -> Result<Vec<Sample>> {
        let sql = format!(
            "SELECT {} FROM samples WHERE {} ORDER BY created_at DESC, path",
            SAMPLE_COLUMNS, condition
        );
        let rows = sqlx::query(&sql).bind(value.to_string()).fetch_all(&self.pool).await?;
        rows.iter().map(sample_from_row).collect()
    }
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Durable
    }

    async fn save_sample(&self, sample: NewSample) -> Result<Sample> {
        let candidate = sample.into_sample(Uuid::new_v4(), now());

        // Re-import keeps id, created_at, play statistics and favorite
        let sql = format!(
            r#"
            INSERT INTO samples ({columns})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                name = excluded.name,
                size = excluded.size,
                duration = excluded.duration,
                bitrate = excluded.bitrate,
                sample_rate = excluded.sample_rate,
                channels = excluded.channels,
                category = excluded.category,
                subcategory = excluded.subcategory,
                mood = excluded.mood,
                energy = excluded.energy,
                style = excluded.style,
                bpm = excluded.bpm,
                confidence = excluded.confidence,
                musical_key = excluded.musical_key,
                description = excluded.description,
                tags = excluded.tags,
                characteristics = excluded.characteristics,
                analysis = excluded.analysis,
                updated_at = excluded.updated_at
            RETURNING {columns}
            "#,
            columns = SAMPLE_COLUMNS
        );

        let row = bind_sample(sqlx::query(&sql), &candidate)?
            .fetch_one(&self.pool)
            .await?;
        let saved = sample_from_row(&row)?;

        tracing::debug!(
            id = %saved.id,
            path = %saved.path,
            replaced = saved.id != candidate.id,
            "Sample saved"
        );
        Ok(saved)
    }

    async fn get_sample(&self, id: Uuid) -> Result<Option<Sample>> {
        let sql = format!("SELECT {} FROM samples WHERE id = ?", SAMPLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(sample_from_row).transpose()
    }

    async fn list_samples(&self) -> Result<Vec<Sample>> {
        let sql = format!(
            "SELECT {} FROM samples ORDER BY created_at DESC, path",
            SAMPLE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(sample_from_row).collect()
    }

    async fn update_sample(&self, id: Uuid, update: SampleUpdate) -> Result<Sample> {
        let (sample, _) = self
            .modify(id, |sample| {
                update.apply_to(sample);
                true
            })
            .await?;
        Ok(sample)
    }

    async fn add_tag(&self, id: Uuid, tag: &str) -> Result<TagAssignment> {
        let (sample, added) = self
            .modify(id, |sample| {
                if sample.tags.iter().any(|t| t == tag) {
                    return false;
                }
                sample.tags.push(tag.to_string());
                true
            })
            .await?;
        Ok(TagAssignment { sample, added })
    }

    async fn delete_sample(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM samples WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_samples(&self, query: &str) -> Result<Vec<Sample>> {
        let pattern = format!("%{}%", escape_like(&query.to_ascii_lowercase()));
        let sql = format!(
            r#"
            SELECT {columns},
                CASE
                    WHEN LOWER(name) LIKE ?1 ESCAPE '\' THEN 1
                    WHEN LOWER(category) LIKE ?1 ESCAPE '\' THEN 2
                    WHEN EXISTS (
                        SELECT 1 FROM json_each(samples.tags)
                        WHERE LOWER(json_each.value) LIKE ?1 ESCAPE '\'
                    ) THEN 3
                    ELSE 4
                END AS match_rank
            FROM samples
            WHERE LOWER(name) LIKE ?1 ESCAPE '\'
               OR LOWER(category) LIKE ?1 ESCAPE '\'
               OR EXISTS (
                    SELECT 1 FROM json_each(samples.tags)
                    WHERE LOWER(json_each.value) LIKE ?1 ESCAPE '\'
               )
               OR LOWER(description) LIKE ?1 ESCAPE '\'
            ORDER BY match_rank, created_at DESC, path
            "#,
            columns = SAMPLE_COLUMNS
        );

        let rows = sqlx::query(&sql).bind(pattern).fetch_all(&self.pool).await?;
        rows.iter().map(sample_from_row).collect()
    }

    async fn samples_by_category(&self, category: &str) -> Result<Vec<Sample>> {
        self.fetch_where("category = ?", category).await
    }

    async fn samples_by_tag(&self, tag: &str) -> Result<Vec<Sample>> {
        self.fetch_where(
            "EXISTS (SELECT 1 FROM json_each(samples.tags) WHERE json_each.value = ?)",
            tag,
        )
        .await
    }

    async fn record_play(&self, id: Uuid) -> Result<Sample> {
        let result = sqlx::query(
            "UPDATE samples SET play_count = play_count + 1, last_played = ? WHERE id = ?",
        )
        .bind(timestamp(&now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Sample {}", id)));
        }

        self.get_sample(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Sample {}", id)))
    }
}

/// Write the user-editable columns of `sample`
async fn write_editable(conn: &mut SqliteConnection, sample: &Sample) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE samples SET
            name = ?, category = ?, subcategory = ?, mood = ?, energy = ?, style = ?,
            bpm = ?, confidence = ?, musical_key = ?, description = ?,
            tags = ?, characteristics = ?, analysis = ?, favorite = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(sample.name.clone())
    .bind(sample.category.clone())
    .bind(sample.subcategory.clone())
    .bind(sample.mood.clone())
    .bind(sample.energy.clone())
    .bind(sample.style.clone())
    .bind(sample.bpm)
    .bind(sample.confidence)
    .bind(sample.key.clone())
    .bind(sample.description.clone())
    .bind(serde_json::to_string(&sample.tags)?)
    .bind(serde_json::to_string(&sample.characteristics)?)
    .bind(serde_json::to_string(&sample.analysis)?)
    .bind(sample.favorite)
    .bind(timestamp(&sample.updated_at))
    .bind(sample.id.to_string())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Sample {}", sample.id)));
    }
    Ok(())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp {:?}: {}", value, e)))
}

fn bind_sample<'q>(query: SqliteQuery<'q>, sample: &Sample) -> Result<SqliteQuery<'q>> {
    Ok(query
        .bind(sample.id.to_string())
        .bind(sample.name.clone())
        .bind(sample.path.clone())
        .bind(sample.size.map(|s| s as i64))
        .bind(sample.duration)
        .bind(sample.bitrate.map(i64::from))
        .bind(sample.sample_rate.map(i64::from))
        .bind(sample.channels.map(i64::from))
        .bind(sample.category.clone())
        .bind(sample.subcategory.clone())
        .bind(sample.mood.clone())
        .bind(sample.energy.clone())
        .bind(sample.style.clone())
        .bind(sample.bpm)
        .bind(sample.confidence)
        .bind(sample.key.clone())
        .bind(sample.description.clone())
        .bind(serde_json::to_string(&sample.tags)?)
        .bind(serde_json::to_string(&sample.characteristics)?)
        .bind(serde_json::to_string(&sample.analysis)?)
        .bind(timestamp(&sample.created_at))
        .bind(timestamp(&sample.updated_at))
        .bind(sample.last_played.as_ref().map(timestamp))
        .bind(i64::from(sample.play_count))
        .bind(sample.favorite))
}

/// Stored JSON list; unparsable text reads back as empty
fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let text: Option<String> = row.try_get(column)?;
    Ok(text
        .and_then(|t| match serde_json::from_str(&t) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(column, error = %e, "Unparsable stored JSON list");
                None
            }
        })
        .unwrap_or_default())
}

fn json_object(row: &SqliteRow, column: &str) -> Result<serde_json::Value> {
    let text: Option<String> = row.try_get(column)?;
    Ok(text
        .and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_else(|| serde_json::json!({})))
}

fn opt_u32(row: &SqliteRow, column: &str) -> Result<Option<u32>> {
    let value: Option<i64> = row.try_get(column)?;
    Ok(value.and_then(|v| u32::try_from(v).ok()))
}

fn sample_from_row(row: &SqliteRow) -> Result<Sample> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid stored sample id {:?}: {}", id, e)))?;

    let size: Option<i64> = row.try_get("size")?;
    let channels: Option<i64> = row.try_get("channels")?;
    let play_count: i64 = row.try_get("play_count")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let last_played: Option<String> = row.try_get("last_played")?;

    Ok(Sample {
        id,
        name: row.try_get("name")?,
        path: row.try_get("path")?,
        size: size.and_then(|s| u64::try_from(s).ok()),
        duration: row.try_get("duration")?,
        bitrate: opt_u32(row, "bitrate")?,
        sample_rate: opt_u32(row, "sample_rate")?,
        channels: channels.and_then(|c| u8::try_from(c).ok()),
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        mood: row.try_get("mood")?,
        energy: row.try_get("energy")?,
        style: row.try_get("style")?,
        bpm: row.try_get("bpm")?,
        confidence: row.try_get("confidence")?,
        key: row.try_get("musical_key")?,
        description: row.try_get("description")?,
        tags: json_list(row, "tags")?,
        characteristics: json_list(row, "characteristics")?,
        analysis: json_object(row, "analysis")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        last_played: last_played.as_deref().map(parse_timestamp).transpose()?,
        play_count: u32::try_from(play_count).unwrap_or(0),
        favorite: row.try_get("favorite")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteSampleStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteSampleStore::open(&dir.path().join("samples.db")).await.unwrap();
        (dir, store)
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[tokio::test]
    async fn percent_in_query_matches_literally() {
        let (_dir, store) = store().await;
        store
            .save_sample(NewSample {
                name: "kick_100%.wav".to_string(),
                path: "/s/kick_100%.wav".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .save_sample(NewSample {
                name: "kick_1000.wav".to_string(),
                path: "/s/kick_1000.wav".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let found = store.search_samples("100%").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "kick_100%.wav");
    }

    #[tokio::test]
    async fn corrupt_json_columns_read_back_empty() {
        let (_dir, store) = store().await;
        let saved = store
            .save_sample(NewSample {
                name: "a.wav".to_string(),
                path: "/s/a.wav".to_string(),
                tags: vec!["x".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        sqlx::query("UPDATE samples SET characteristics = 'not json', analysis = '{' WHERE id = ?")
            .bind(saved.id.to_string())
            .execute(store.pool())
            .await
            .unwrap();

        let loaded = store.get_sample(saved.id).await.unwrap().unwrap();
        assert!(loaded.characteristics.is_empty());
        assert_eq!(loaded.analysis, serde_json::json!({}));
        assert_eq!(loaded.tags, vec!["x"]);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("samples.db");
        let id = {
            let store = SqliteSampleStore::open(&path).await.unwrap();
            let saved = store
                .save_sample(NewSample {
                    name: "pad.wav".to_string(),
                    path: "/s/pad.wav".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
            store.pool().close().await;
            saved.id
        };

        let reopened = SqliteSampleStore::open(&path).await.unwrap();
        assert!(reopened.get_sample(id).await.unwrap().is_some());
    }
}
