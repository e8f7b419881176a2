use crate::models::camera::Camera;
use crate::models::incident::{ClearedIncident, Incident};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::path::Path;

pub mod pg_store;
pub mod queries;

pub type DbPool = Pool<Postgres>;
pub type StoreError = sqlx::Error;

pub async fn init_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Incident rows and their notification id column.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Active incidents without a notification id.
    async fn unnotified_incidents(&self) -> Result<Vec<Incident>, StoreError>;
    /// Every active incident, notified or not.
    async fn active_incidents(&self) -> Result<Vec<Incident>, StoreError>;
    /// Cleared incidents that still have a notification id.
    async fn cleared_notified_incidents(&self) -> Result<Vec<ClearedIncident>, StoreError>;
    async fn set_notification_id(&self, incident_id: i64, message_id: &str) -> Result<(), StoreError>;
    async fn clear_notification_id(&self, incident_id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CameraDirectory: Send + Sync {
    /// Up to `limit` cameras ordered by distance from the point.
    async fn nearest_cameras(&self, lat: f64, lon: f64, limit: i64) -> Result<Vec<Camera>, StoreError>;
}

/// Audit trail of downloaded camera frames.
#[async_trait]
pub trait CaptureLog: Send + Sync {
    async fn record_capture(&self, incident_id: i64, camera_name: &str, file_path: &Path) -> Result<(), StoreError>;
}
