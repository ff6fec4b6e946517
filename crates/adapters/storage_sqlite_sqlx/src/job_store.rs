//! `SQLite` implementation of [`JobStore`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use gridcharge_app::ports::JobStore;
use gridcharge_domain::error::GridChargeError;
use gridcharge_domain::id::JobId;
use gridcharge_domain::job::{ActionKind, Job, TimeOfDay};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Job`].
struct Wrapper(Job);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Job> {
        value.map(|w| w.0)
    }
}

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let hour: i64 = row.try_get("hour")?;
        let minute: i64 = row.try_get("minute")?;
        let action: String = row.try_get("action")?;
        let power_kw: f64 = row.try_get("power_kw")?;
        let name: String = row.try_get("name")?;
        let created_at: String = row.try_get("created_at")?;

        let id = JobId::from_str(&id).map_err(decode_err)?;
        let trigger = TimeOfDay::new(
            u32::try_from(hour).map_err(decode_err)?,
            u32::try_from(minute).map_err(decode_err)?,
        )
        .map_err(decode_err)?;
        let action = ActionKind::from_str(&action).map_err(decode_err)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.to_utc())
            .map_err(decode_err)?;

        Ok(Self(Job {
            id,
            trigger,
            action,
            power_kw,
            name,
            created_at,
        }))
    }
}

const UPSERT: &str = "INSERT OR REPLACE INTO jobs (id, hour, minute, action, power_kw, name, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM jobs WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM jobs ORDER BY hour, minute, id";
const DELETE_BY_ID: &str = "DELETE FROM jobs WHERE id = ?";

/// `SQLite`-backed job store.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl JobStore for SqliteJobStore {
    fn put(&self, job: Job) -> impl Future<Output = Result<(), GridChargeError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(UPSERT)
                .bind(job.id.to_string())
                .bind(i64::from(job.trigger.hour()))
                .bind(i64::from(job.trigger.minute()))
                .bind(job.action.as_str())
                .bind(job.power_kw)
                .bind(&job.name)
                .bind(job.created_at.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn get(&self, id: JobId) -> impl Future<Output = Result<Option<Job>, GridChargeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<Job>, GridChargeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn delete(&self, id: JobId) -> impl Future<Output = Result<bool, GridChargeError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected() > 0)
        }
    }
}
