//! Session repository.
//!
//! A session row is written and removed as a whole; there is no statement
//! that updates only part of `{token, role, company_id}`.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::ConsoleRole;
use crate::session::Session;

/// Database repository for console sessions.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new session.
    pub async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (id, token, role, company_id, created_at, last_seen_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.token)
        .bind(session.role.as_str())
        .bind(session.company_id)
        .bind(timestamp(&session.created_at))
        .bind(timestamp(&session.last_seen_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query(
            "SELECT id, token, role, company_id, created_at, last_seen_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(session_from_row))
    }

    /// Record activity on a session.
    pub async fn touch_session(&self, id: &str, at: &DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE id = ?")
            .bind(timestamp(at))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a session. Returns whether a row was removed.
    pub async fn delete_session(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session last seen before `cutoff`. Returns the ids of the
    /// removed sessions.
    pub async fn delete_sessions_idle_since(
        &self,
        cutoff: &DateTime<Utc>,
    ) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("DELETE FROM sessions WHERE last_seen_at < ? RETURNING id")
            .bind(timestamp(cutoff))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}

/// Fixed-width UTC timestamps so that string order is time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unparseable timestamps read as the distant past, which expires the session.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Session {
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");
    let last_seen_at: String = row.get("last_seen_at");
    Session {
        id: row.get("id"),
        token: row.get("token"),
        role: ConsoleRole::parse(&role),
        company_id: row.get("company_id"),
        created_at: parse_timestamp(&created_at),
        last_seen_at: parse_timestamp(&last_seen_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    fn session(id: &str, last_seen_at: DateTime<Utc>) -> Session {
        Session {
            id: id.to_string(),
            token: format!("token-{}", id),
            role: ConsoleRole::CompanyAdmin,
            company_id: Some(2),
            created_at: last_seen_at,
            last_seen_at,
        }
    }

    #[tokio::test]
    async fn test_session_round_trip_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("s.sqlite")).await.unwrap();
        let repo = Repository::new(pool);

        let now = Utc::now();
        repo.insert_session(&session("abc", now)).await.unwrap();

        let loaded = repo.get_session("abc").await.unwrap().unwrap();
        assert_eq!(loaded.token, "token-abc");
        assert_eq!(loaded.role, ConsoleRole::CompanyAdmin);
        assert_eq!(loaded.company_id, Some(2));
        assert_eq!(timestamp(&loaded.last_seen_at), timestamp(&now));

        assert!(repo.delete_session("abc").await.unwrap());
        assert!(!repo.delete_session("abc").await.unwrap());
        assert!(repo.get_session("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_idle_purge() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("s.sqlite")).await.unwrap();
        let repo = Repository::new(pool);

        let now = Utc::now();
        repo.insert_session(&session("old", now - chrono::Duration::hours(2)))
            .await
            .unwrap();
        repo.insert_session(&session("fresh", now)).await.unwrap();

        let removed = repo
            .delete_sessions_idle_since(&(now - chrono::Duration::minutes(30)))
            .await
            .unwrap();
        assert_eq!(removed, vec!["old".to_string()]);
        assert!(repo.get_session("fresh").await.unwrap().is_some());
    }

    #[test]
    fn test_garbage_timestamp_is_ancient() {
        assert_eq!(parse_timestamp("yesterday-ish"), DateTime::<Utc>::MIN_UTC);
    }
}
