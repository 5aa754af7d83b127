//! SQLite backend (embedded, through sqlx)
//!
//! One process-wide session: a transaction begun lazily on first access,
//! committed by `save` and rolled back by `close`. Callers serialize their
//! units of work (see `storage::session`); `save` fails when the writes it
//! would commit were already rolled back.

use async_trait::async_trait;
use hbnb_core::ports::storage::check_relation;
use hbnb_core::{Amenity, Entity, Kind, Storage, StorageError, StorageResult};
use serde_json::{Map, Value};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const JOIN_TABLE: &str = "place_amenity";

/// Children before parents
const DROP_ORDER: &[&str] = &[
    JOIN_TABLE,
    "reviews",
    "places",
    "cities",
    "amenities",
    "users",
    "states",
];

/// Parent ids on cities, places and reviews are plain columns: the API checks
/// them on create, and deleting a parent leaves its children in place. Only
/// join rows follow their place or amenity.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS states (
        id VARCHAR(60) PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name VARCHAR(128) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cities (
        id VARCHAR(60) PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        state_id VARCHAR(60) NOT NULL,
        name VARCHAR(128) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id VARCHAR(60) PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        email VARCHAR(128) NOT NULL,
        password VARCHAR(128) NOT NULL,
        first_name VARCHAR(128),
        last_name VARCHAR(128)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS amenities (
        id VARCHAR(60) PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        name VARCHAR(128) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS places (
        id VARCHAR(60) PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        city_id VARCHAR(60) NOT NULL,
        user_id VARCHAR(60) NOT NULL,
        name VARCHAR(128) NOT NULL,
        description VARCHAR(1024),
        number_rooms INTEGER NOT NULL DEFAULT 0,
        number_bathrooms INTEGER NOT NULL DEFAULT 0,
        max_guest INTEGER NOT NULL DEFAULT 0,
        price_by_night INTEGER NOT NULL DEFAULT 0,
        latitude REAL,
        longitude REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id VARCHAR(60) PRIMARY KEY,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        place_id VARCHAR(60) NOT NULL,
        user_id VARCHAR(60) NOT NULL,
        text VARCHAR(1024) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS place_amenity (
        place_id VARCHAR(60) NOT NULL
            REFERENCES places(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        amenity_id VARCHAR(60) NOT NULL
            REFERENCES amenities(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        PRIMARY KEY (place_id, amenity_id)
    )
    "#,
];

/// Storage class of a mapped column
#[derive(Debug, Clone, Copy)]
enum Column {
    Text,
    Integer,
    Real,
}

/// Mapped columns of a kind's table, `id` first
fn columns(kind: Kind) -> &'static [(&'static str, Column)] {
    use Column::*;
    match kind {
        Kind::State => &[
            ("id", Text),
            ("created_at", Text),
            ("updated_at", Text),
            ("name", Text),
        ],
        Kind::City => &[
            ("id", Text),
            ("created_at", Text),
            ("updated_at", Text),
            ("state_id", Text),
            ("name", Text),
        ],
        Kind::User => &[
            ("id", Text),
            ("created_at", Text),
            ("updated_at", Text),
            ("email", Text),
            ("password", Text),
            ("first_name", Text),
            ("last_name", Text),
        ],
        Kind::Amenity => &[
            ("id", Text),
            ("created_at", Text),
            ("updated_at", Text),
            ("name", Text),
        ],
        Kind::Place => &[
            ("id", Text),
            ("created_at", Text),
            ("updated_at", Text),
            ("city_id", Text),
            ("user_id", Text),
            ("name", Text),
            ("description", Text),
            ("number_rooms", Integer),
            ("number_bathrooms", Integer),
            ("max_guest", Integer),
            ("price_by_night", Integer),
            ("latitude", Real),
            ("longitude", Real),
        ],
        Kind::Review => &[
            ("id", Text),
            ("created_at", Text),
            ("updated_at", Text),
            ("place_id", Text),
            ("user_id", Text),
            ("text", Text),
        ],
    }
}

/// `SELECT` of every mapped column, qualified by table name
fn select_sql(kind: Kind) -> String {
    let table = kind.plural();
    let mut fields: Vec<String> = columns(kind)
        .iter()
        .map(|(name, _)| format!("{}.{}", table, name))
        .collect();
    if kind == Kind::Place {
        fields.push(format!(
            "(SELECT group_concat(amenity_id, ',') FROM {} WHERE place_id = places.id) AS amenity_ids",
            JOIN_TABLE
        ));
    }
    format!("SELECT {} FROM {}", fields.join(", "), table)
}

fn upsert_sql(kind: Kind) -> String {
    let names: Vec<&str> = columns(kind).iter().map(|(name, _)| *name).collect();
    let placeholders = vec!["?"; names.len()].join(", ");
    let updates: Vec<String> = names
        .iter()
        .skip(1)
        .map(|name| format!("{name} = excluded.{name}"))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        kind.plural(),
        names.join(", "),
        placeholders,
        updates.join(", ")
    )
}

fn row_to_entity(kind: Kind, row: &SqliteRow) -> StorageResult<Entity> {
    let mut dict = Map::new();
    for (name, column) in columns(kind) {
        let value = match column {
            Column::Text => row
                .try_get::<Option<String>, _>(*name)
                .map_err(db_error)?
                .map(Value::from),
            Column::Integer => row
                .try_get::<Option<i64>, _>(*name)
                .map_err(db_error)?
                .map(Value::from),
            Column::Real => row
                .try_get::<Option<f64>, _>(*name)
                .map_err(db_error)?
                .map(Value::from),
        };
        // NULL falls back to the attribute default
        if let Some(value) = value {
            dict.insert(name.to_string(), value);
        }
    }

    if kind == Kind::Place {
        let joined: Option<String> = row.try_get("amenity_ids").map_err(db_error)?;
        let mut ids: Vec<String> = joined
            .unwrap_or_default()
            .split(',')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        ids.sort();
        dict.insert("amenity_ids".to_string(), Value::from(ids));
    }

    dict.insert(hbnb_core::CLASS_FIELD.to_string(), Value::from(kind.name()));
    Ok(Entity::from_dict(dict)?)
}

fn db_error(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        let constraint = !matches!(db.kind(), ErrorKind::Other)
            || db.message().to_ascii_lowercase().contains("constraint");
        if constraint {
            return StorageError::Constraint(db.message().to_string());
        }
    }
    StorageError::Database(e.to_string())
}

#[derive(Default)]
struct Session {
    tx: Option<Transaction<'static, Sqlite>>,
    /// `tx` holds writes not yet committed
    dirty: bool,
    /// Writes were rolled back and nothing has been staged since
    lost: bool,
}

impl Session {
    fn stage(&mut self) -> StorageResult<&mut SqliteConnection> {
        self.dirty = true;
        self.lost = false;
        conn(self)
    }
}

fn conn(session: &mut Session) -> StorageResult<&mut SqliteConnection> {
    session
        .tx
        .as_deref_mut()
        .ok_or_else(|| StorageError::Database("no open session".to_string()))
}

pub struct DbStorage {
    pool: SqlitePool,
    session: Mutex<Session>,
}

impl DbStorage {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema. `drop_existing` wipes every table first.
    pub async fn open(path: &Path, drop_existing: bool) -> StorageResult<Self> {
        info!("Opening SQLite database at: {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error)?;

        if drop_existing {
            warn!("Dropping all tables");
            for table in DROP_ORDER {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(&pool)
                    .await
                    .map_err(db_error)?;
            }
        }

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(db_error)?;
        }

        info!("Database initialization complete");
        Ok(Self {
            pool,
            session: Mutex::new(Session::default()),
        })
    }

    /// The current session, begun on first access
    async fn session(&self) -> StorageResult<MutexGuard<'_, Session>> {
        let mut session = self.session.lock().await;
        if session.tx.is_none() {
            session.tx = Some(self.pool.begin().await.map_err(db_error)?);
            debug!("Session opened");
        }
        Ok(session)
    }

    async fn select(&self, kind: Kind, filter: Option<(&str, &str)>) -> StorageResult<Vec<Entity>> {
        let mut sql = select_sql(kind);
        if let Some((column, _)) = filter {
            sql.push_str(&format!(" WHERE {}.{} = ?", kind.plural(), column));
        }

        let mut session = self.session().await?;
        let conn = conn(&mut session)?;
        let mut query = sqlx::query(&sql);
        if let Some((_, value)) = filter {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&mut *conn).await.map_err(db_error)?;
        rows.iter().map(|row| row_to_entity(kind, row)).collect()
    }

    async fn discard(&self) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        if let Some(tx) = session.tx.take() {
            if std::mem::take(&mut session.dirty) {
                session.lost = true;
                debug!("Rolling back uncommitted writes");
            }
            tx.rollback().await.map_err(db_error)?;
            debug!("Session rolled back");
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn all(&self, kind: Option<Kind>) -> StorageResult<BTreeMap<String, Entity>> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => Kind::ALL.to_vec(),
        };
        let mut objects = BTreeMap::new();
        for kind in kinds {
            for entity in self.select(kind, None).await? {
                objects.insert(entity.key(), entity);
            }
        }
        Ok(objects)
    }

    async fn get(&self, kind: Kind, id: &str) -> StorageResult<Option<Entity>> {
        Ok(self.select(kind, Some(("id", id))).await?.into_iter().next())
    }

    async fn count(&self, kind: Option<Kind>) -> StorageResult<usize> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => Kind::ALL.to_vec(),
        };
        let mut session = self.session().await?;
        let conn = conn(&mut session)?;
        let mut total = 0;
        for kind in kinds {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.plural()))
                .fetch_one(&mut *conn)
                .await
                .map_err(db_error)?;
            total += count as usize;
        }
        Ok(total)
    }

    async fn new(&self, entity: Entity) -> StorageResult<()> {
        let kind = entity.kind();
        let dict = entity.to_dict();
        let sql = upsert_sql(kind);

        let mut session = self.session().await?;
        let conn = session.stage()?;

        let mut query = sqlx::query(&sql);
        for (name, column) in columns(kind) {
            let value = dict.get(*name);
            query = match column {
                Column::Text => query.bind(value.and_then(Value::as_str).unwrap_or_default().to_string()),
                Column::Integer => query.bind(value.and_then(Value::as_i64).unwrap_or_default()),
                Column::Real => query.bind(value.and_then(Value::as_f64).unwrap_or_default()),
            };
        }
        query.execute(&mut *conn).await.map_err(db_error)?;

        if let Entity::Place(place) = &entity {
            sqlx::query(&format!("DELETE FROM {} WHERE place_id = ?", JOIN_TABLE))
                .bind(&place.base.id)
                .execute(&mut *conn)
                .await
                .map_err(db_error)?;
            for amenity_id in &place.amenity_ids {
                sqlx::query(&format!(
                    "INSERT OR IGNORE INTO {} (place_id, amenity_id) VALUES (?, ?)",
                    JOIN_TABLE
                ))
                .bind(&place.base.id)
                .bind(amenity_id)
                .execute(&mut *conn)
                .await
                .map_err(db_error)?;
            }
        }
        Ok(())
    }

    async fn save(&self) -> StorageResult<()> {
        let mut session = self.session.lock().await;
        if std::mem::take(&mut session.lost) {
            return Err(StorageError::Database(
                "staged changes were discarded before save".to_string(),
            ));
        }
        session.dirty = false;
        if let Some(tx) = session.tx.take() {
            // A failed commit drops the transaction, which rolls it back
            tx.commit().await.map_err(db_error)?;
            debug!("Session committed");
        }
        Ok(())
    }

    async fn delete(&self, entity: &Entity) -> StorageResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", entity.kind().plural());
        let mut session = self.session().await?;
        let conn = session.stage()?;
        sqlx::query(&sql)
            .bind(entity.id())
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn reload(&self) -> StorageResult<()> {
        self.discard().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.discard().await
    }

    async fn related(
        &self,
        kind: Kind,
        foreign_key: &str,
        id: &str,
    ) -> StorageResult<Vec<Entity>> {
        check_relation(kind, foreign_key)?;
        self.select(kind, Some((foreign_key, id))).await
    }

    async fn place_amenities(&self, place_id: &str) -> StorageResult<Vec<Amenity>> {
        let sql = format!(
            "{} JOIN {join} ON {join}.amenity_id = amenities.id WHERE {join}.place_id = ? ORDER BY amenities.id",
            select_sql(Kind::Amenity),
            join = JOIN_TABLE
        );
        let mut session = self.session().await?;
        let conn = conn(&mut session)?;
        let rows = sqlx::query(&sql)
            .bind(place_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?;
        let mut amenities = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Entity::Amenity(amenity) = row_to_entity(Kind::Amenity, row)? {
                amenities.push(amenity);
            }
        }
        Ok(amenities)
    }
}
