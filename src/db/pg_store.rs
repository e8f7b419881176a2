use crate::db::{queries, CameraDirectory, CaptureLog, DbPool, IncidentStore, StoreError};
use crate::models::camera::Camera;
use crate::models::incident::{ClearedIncident, Incident};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use std::path::Path;
use tracing::warn;

/// Postgres-backed store for incidents, cameras and capture records.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs `query` and decodes each row, skipping rows that fail to decode.
    async fn fetch_decoded<T>(&self, query: &'static str) -> Result<Vec<T>, StoreError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut rows = sqlx::query(query).fetch(&self.pool);
        let mut decoded = Vec::new();

        while let Some(row) = rows.try_next().await? {
            match T::from_row(&row) {
                Ok(value) => decoded.push(value),
                Err(e) => warn!(error = %e, "skipping undecodable incident row"),
            }
        }
        Ok(decoded)
    }
}

#[async_trait]
impl IncidentStore for PgStore {
    async fn unnotified_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        self.fetch_decoded(queries::SELECT_UNNOTIFIED_INCIDENTS).await
    }

    async fn active_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        self.fetch_decoded(queries::SELECT_ACTIVE_INCIDENTS).await
    }

    async fn cleared_notified_incidents(&self) -> Result<Vec<ClearedIncident>, StoreError> {
        self.fetch_decoded(queries::SELECT_CLEARED_NOTIFIED_INCIDENTS).await
    }

    async fn set_notification_id(&self, incident_id: i64, message_id: &str) -> Result<(), StoreError> {
        sqlx::query(queries::SET_NOTIFICATION_ID)
            .bind(message_id)
            .bind(incident_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_notification_id(&self, incident_id: i64) -> Result<(), StoreError> {
        sqlx::query(queries::CLEAR_NOTIFICATION_ID)
            .bind(incident_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CameraDirectory for PgStore {
    async fn nearest_cameras(&self, lat: f64, lon: f64, limit: i64) -> Result<Vec<Camera>, StoreError> {
        // ST_MakePoint takes (x, y), i.e. longitude first.
        let cameras = sqlx::query_as::<_, Camera>(queries::SELECT_NEAREST_CAMERAS)
            .bind(lon)
            .bind(lat)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(cameras)
    }
}

#[async_trait]
impl CaptureLog for PgStore {
    async fn record_capture(&self, incident_id: i64, camera_name: &str, file_path: &Path) -> Result<(), StoreError> {
        sqlx::query(queries::INSERT_CAMERA_CAPTURE)
            .bind(incident_id)
            .bind(camera_name)
            .bind(file_path.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
