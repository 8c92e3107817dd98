//! Console session lifecycle.
//!
//! A session is `{token, role, company_id}` plus bookkeeping. It is created
//! on login and cleared on logout, on idle expiry, and whenever the backend
//! rejects its token. Handlers receive it as an explicit value. Ending a
//! session also drops its role-menu editor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Repository;
use crate::editor::EditorRegistry;
use crate::errors::AppError;
use crate::models::{ConsoleRole, LoginResponse};

/// An authenticated console session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    /// Backend bearer token; never sent to the browser.
    pub token: String,
    pub role: ConsoleRole,
    pub company_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// What the browser may see of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub role: ConsoleRole,
    pub company_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            role: session.role.clone(),
            company_id: session.company_id,
            created_at: session.created_at,
        }
    }
}

/// Creates, resolves and clears sessions.
#[derive(Clone)]
pub struct SessionManager {
    repo: Repository,
    editors: Arc<EditorRegistry>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(repo: Repository, editors: Arc<EditorRegistry>, idle_timeout: Duration) -> Self {
        Self {
            repo,
            editors,
            idle_timeout,
        }
    }

    /// Per-session editors; entries live exactly as long as their session.
    pub fn editors(&self) -> &Arc<EditorRegistry> {
        &self.editors
    }

    /// Start a session from a successful backend login.
    pub async fn init(&self, login: LoginResponse) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            token: login.token,
            role: login.role,
            company_id: login.company_id.filter(|id| *id != 0),
            created_at: now,
            last_seen_at: now,
        };
        self.repo.insert_session(&session).await?;
        tracing::info!(
            "Session {} started for role {} (company {:?})",
            session.id,
            session.role,
            session.company_id
        );
        Ok(session)
    }

    /// Look up a live session and record the activity.
    pub async fn resolve(&self, id: &str) -> Result<Session, AppError> {
        let unauthorized = || AppError::Unauthorized("Session expired or invalid".to_string());

        let mut session = self.repo.get_session(id).await?.ok_or_else(unauthorized)?;

        let now = Utc::now();
        if self.is_idle(&session, &now) {
            tracing::info!("Session {} idle since {}, logging out", id, session.last_seen_at);
            self.repo.delete_session(id).await?;
            self.editors.remove(id).await;
            return Err(unauthorized());
        }

        self.repo.touch_session(id, &now).await?;
        session.last_seen_at = now;
        Ok(session)
    }

    /// End a session. Clearing an unknown session is not an error.
    pub async fn clear(&self, id: &str) -> Result<(), AppError> {
        if self.repo.delete_session(id).await? {
            tracing::info!("Session {} cleared", id);
        }
        self.editors.remove(id).await;
        Ok(())
    }

    /// Remove every idle session and its editor. Returns the purged ids.
    pub async fn purge_idle(&self) -> Result<Vec<String>, AppError> {
        let cutoff = Utc::now()
            .checked_sub_signed(self.idle_delta())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.repo.delete_sessions_idle_since(&cutoff).await?;
        for id in &removed {
            self.editors.remove(id).await;
        }
        if !removed.is_empty() {
            tracing::info!("Purged {} idle sessions", removed.len());
        }
        Ok(removed)
    }

    fn is_idle(&self, session: &Session, now: &DateTime<Utc>) -> bool {
        *now - session.last_seen_at > self.idle_delta()
    }

    fn idle_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.idle_timeout).unwrap_or(chrono::Duration::MAX)
    }
}
