//! `PostgreSQL` record store for Conference Central.
//!
//! Records live in a single `records` table as `jsonb` documents keyed by their URL-safe
//! encoded key. Every row carries a version used for optimistic concurrency, and the
//! encoded keys of its whole lineage so ancestor queries are a simple array membership
//! test.
//!
//! # Commit protocol
//!
//! [`RecordStore::commit`] runs in one SQL transaction:
//!
//! 1. Every read key is locked (`FOR UPDATE` if it is also written, `FOR SHARE`
//!    otherwise, in key order) and its version compared with what the client saw.
//! 2. Writes to keys read as absent are `INSERT ... ON CONFLICT DO NOTHING`, writes to
//!    keys read at version `v` are `UPDATE ... WHERE version = v`; either affecting no row
//!    is a conflict. Writes to unread keys are plain upserts.
//!
//! Serialization failures, deadlocks and unique violations reported by the server are
//! also surfaced as conflicts so the caller's retry loop handles them.
//!
//! # Example
//!
//! ```ignore
//! use conference_central_postgres::PostgresRecordStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresRecordStore::connect("postgres://localhost/conference", 5).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// SQL rendering for property queries
pub mod query;

use conference_central_core::entity::{Record, VersionedRecord};
use conference_central_core::error::StoreError;
use conference_central_core::key::{Key, Version};
use conference_central_core::query::Query;
use conference_central_core::record_store::{CommitRequest, RecordStore, StoreFuture};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::HashMap;

// Postgres SQLSTATEs that mean "another transaction got there first".
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

fn database_error(context: &str, err: &sqlx::Error) -> StoreError {
    StoreError::DatabaseError(format!("{context}: {err}"))
}

fn commit_error(key: &Key, context: &str, err: &sqlx::Error) -> StoreError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code().map(|code| code.to_string()));
    match code.as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | UNIQUE_VIOLATION) => {
            StoreError::ConcurrencyConflict {
                key: key.clone(),
                expected: None,
                actual: None,
            }
        }
        _ => database_error(context, err),
    }
}

fn to_version(raw: i64) -> Version {
    Version::new(u64::try_from(raw).unwrap_or_default())
}

fn to_raw(version: Version) -> i64 {
    i64::try_from(version.value()).unwrap_or(i64::MAX)
}

fn decode_key(raw: &str) -> Result<Key, StoreError> {
    Key::from_urlsafe(raw).map_err(|e| StoreError::SerializationError(format!("stored key: {e}")))
}

fn lineage(key: &Key) -> Vec<String> {
    key.lineage().iter().map(Key::to_urlsafe).collect()
}

/// `PostgreSQL`-backed [`RecordStore`].
#[derive(Clone, Debug)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| database_error("Failed to connect", &e))?;
        Ok(Self::from_pool(pool))
    }

    /// Create the `records` table, its indexes and the id sequence if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn commit_request(&self, request: CommitRequest) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to begin transaction", &e))?;

        for (key, expected) in &request.reads {
            let written = request.writes.iter().any(|record| &record.key == key);
            let sql = if written {
                "SELECT version FROM records WHERE key = $1 FOR UPDATE"
            } else {
                "SELECT version FROM records WHERE key = $1 FOR SHARE"
            };
            let row: Option<(i64,)> = sqlx::query_as(sql)
                .bind(key.to_urlsafe())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| commit_error(key, "Failed to lock record", &e))?;

            let actual = row.map(|(version,)| to_version(version));
            if actual != *expected {
                return Err(StoreError::ConcurrencyConflict {
                    key: key.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }

        for record in &request.writes {
            let key = record.key.to_urlsafe();
            let data = Json(&record.properties);

            let affected = match request.read_version(&record.key) {
                Some(None) => sqlx::query(
                    r"
                    INSERT INTO records (key, kind, lineage, version, data)
                    VALUES ($1, $2, $3, 1, $4)
                    ON CONFLICT (key) DO NOTHING
                    ",
                )
                .bind(&key)
                .bind(record.key.kind())
                .bind(lineage(&record.key))
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(|e| commit_error(&record.key, "Failed to insert record", &e))?
                .rows_affected(),
                Some(Some(version)) => sqlx::query(
                    r"
                    UPDATE records
                    SET data = $2, version = version + 1, updated_at = now()
                    WHERE key = $1 AND version = $3
                    ",
                )
                .bind(&key)
                .bind(data)
                .bind(to_raw(version))
                .execute(&mut *tx)
                .await
                .map_err(|e| commit_error(&record.key, "Failed to update record", &e))?
                .rows_affected(),
                None => sqlx::query(
                    r"
                    INSERT INTO records (key, kind, lineage, version, data)
                    VALUES ($1, $2, $3, 1, $4)
                    ON CONFLICT (key) DO UPDATE
                    SET data = EXCLUDED.data, version = records.version + 1, updated_at = now()
                    ",
                )
                .bind(&key)
                .bind(record.key.kind())
                .bind(lineage(&record.key))
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(|e| commit_error(&record.key, "Failed to upsert record", &e))?
                .rows_affected(),
            };

            if affected != 1 {
                return Err(StoreError::ConcurrencyConflict {
                    key: record.key.clone(),
                    expected: request.read_version(&record.key).flatten(),
                    actual: None,
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit transaction", &e))?;

        tracing::debug!(
            reads = request.reads.len(),
            writes = request.writes.len(),
            "Committed record transaction"
        );
        metrics::counter!("record_store_commits_total").increment(1);
        Ok(())
    }
}

impl RecordStore for PostgresRecordStore {
    fn get(&self, key: &Key) -> StoreFuture<'_, Option<VersionedRecord>> {
        let key = key.clone();
        Box::pin(async move {
            let row: Option<(Json<Value>, i64)> =
                sqlx::query_as("SELECT data, version FROM records WHERE key = $1")
                    .bind(key.to_urlsafe())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| database_error("Failed to load record", &e))?;

            Ok(row.map(|(Json(properties), version)| VersionedRecord {
                record: Record::new(key, properties),
                version: to_version(version),
            }))
        })
    }

    fn get_multi(&self, keys: &[Key]) -> StoreFuture<'_, Vec<Option<VersionedRecord>>> {
        let keys = keys.to_vec();
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(Vec::new());
            }
            let encoded: Vec<String> = keys.iter().map(Key::to_urlsafe).collect();
            let rows: Vec<(String, Json<Value>, i64)> =
                sqlx::query_as("SELECT key, data, version FROM records WHERE key = ANY($1)")
                    .bind(&encoded)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| database_error("Failed to load records", &e))?;

            let found: HashMap<String, (Value, i64)> = rows
                .into_iter()
                .map(|(key, Json(properties), version)| (key, (properties, version)))
                .collect();

            // Duplicate keys in the request each get their own copy.
            Ok(keys
                .into_iter()
                .zip(encoded)
                .map(|(key, encoded)| {
                    found.get(&encoded).cloned().map(|(properties, version)| {
                        VersionedRecord {
                            record: Record::new(key, properties),
                            version: to_version(version),
                        }
                    })
                })
                .collect())
        })
    }

    fn put(&self, record: Record) -> StoreFuture<'_, Version> {
        Box::pin(async move {
            let (version,): (i64,) = sqlx::query_as(
                r"
                INSERT INTO records (key, kind, lineage, version, data)
                VALUES ($1, $2, $3, 1, $4)
                ON CONFLICT (key) DO UPDATE
                SET data = EXCLUDED.data, version = records.version + 1, updated_at = now()
                RETURNING version
                ",
            )
            .bind(record.key.to_urlsafe())
            .bind(record.key.kind())
            .bind(lineage(&record.key))
            .bind(Json(&record.properties))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Failed to store record", &e))?;

            Ok(to_version(version))
        })
    }

    fn allocate_id(&self, kind: &str, parent: Option<&Key>) -> StoreFuture<'_, Key> {
        let kind = kind.to_string();
        let parent = parent.cloned();
        Box::pin(async move {
            let (id,): (i64,) = sqlx::query_as("SELECT nextval('record_ids')")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| database_error("Failed to allocate id", &e))?;

            Ok(match parent {
                Some(parent) => parent.child(kind, id),
                None => Key::new(kind, id),
            })
        })
    }

    fn run_query(&self, query: Query) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(async move {
            query.validate()?;

            let mut builder = query::select_records(&query);
            let rows: Vec<(String, Json<Value>)> = builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| database_error("Failed to run query", &e))?;

            metrics::counter!("record_store_queries_total", "kind" => query.kind.clone())
                .increment(1);

            rows.into_iter()
                .map(|(key, Json(properties))| Ok(Record::new(decode_key(&key)?, properties)))
                .collect()
        })
    }

    fn commit(&self, request: CommitRequest) -> StoreFuture<'_, ()> {
        Box::pin(self.commit_request(request))
    }
}
