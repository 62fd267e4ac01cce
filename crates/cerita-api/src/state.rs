use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Utc};
use tracing::error;

use cerita_db::Database;

use crate::error::ApiError;
use crate::storage::ObjectStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub auth: AuthConfig,
    /// Code a teacher must present at registration.
    pub teacher_code: String,
    pub storage: ObjectStore,
    /// Offset that decides where one mood day ends and the next begins.
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub cookie_secure: bool,
}

impl AppStateInner {
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }
}

/// Run a blocking database call off the async executor.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("database task failed"))
        })?
        .map_err(ApiError::from)
}
