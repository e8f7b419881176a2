use crate::camera_capture::{CapturedFrame, FrameSource};
use crate::config::{AppConfig, CameraMode};
use crate::db::{CameraDirectory, IncidentStore};
use crate::models::camera::Camera;
use crate::models::incident::{ClearedIncident, Incident, IncidentSource};
use crate::processor::payload_builder::{builder_for, cleared_payload, BuildContext};
use crate::sent_state::SentState;
use crate::webhook::{NotificationChannel, WebhookError};
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

pub const NEARBY_CAMERA_LIMIT: i64 = 3;

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub maps_api_key: Option<String>,
    pub camera_mode: CameraMode,
    pub notify: bool,
    pub send_delay: Duration,
}

impl From<&AppConfig> for RunSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            maps_api_key: config.maps_api_key.clone(),
            camera_mode: config.camera_mode,
            notify: config.notify,
            send_delay: config.send_delay,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub notified: usize,
    pub cleared: usize,
}

/// One pass over the store: announce new incidents, then mark cleared ones.
pub struct RunDriver<'a> {
    store: &'a dyn IncidentStore,
    cameras: &'a dyn CameraDirectory,
    frames: &'a dyn FrameSource,
    channel: &'a dyn NotificationChannel,
    settings: RunSettings,
}

impl<'a> RunDriver<'a> {
    pub fn new(
        store: &'a dyn IncidentStore,
        cameras: &'a dyn CameraDirectory,
        frames: &'a dyn FrameSource,
        channel: &'a dyn NotificationChannel,
        settings: RunSettings,
    ) -> Self {
        Self {
            store,
            cameras,
            frames,
            channel,
            settings,
        }
    }

    pub async fn run_once(&self, sent_state: Option<&mut SentState>) -> Result<RunSummary> {
        let notified = self.notify_new_incidents(sent_state).await?;
        let cleared = self.clear_resolved_incidents().await?;
        Ok(RunSummary { notified, cleared })
    }

    /// Pass 1. Returns the number of alerts posted.
    pub async fn notify_new_incidents(&self, mut sent_state: Option<&mut SentState>) -> Result<usize> {
        let incidents: Vec<Incident> = match sent_state.as_deref() {
            Some(state) => self
                .store
                .active_incidents()
                .await
                .context("querying active incidents")?
                .into_iter()
                // An incident with a live message stays owned by it, even if the file lost track.
                .filter(|incident| incident.notification_id.is_none() && !state.contains(incident.id))
                .collect(),
            None => self
                .store
                .unnotified_incidents()
                .await
                .context("querying new incidents")?,
        };

        let mut notified = 0;
        let mut throttle = Throttle::new(self.settings.send_delay);

        for incident in &incidents {
            info!(
                incident_id = incident.id,
                source = %incident.source,
                source_id = %incident.source_id,
                event_type = %incident.event_type,
                "found new incident"
            );

            if !self.settings.notify {
                log_debug_details(incident);
                continue;
            }

            let source: IncidentSource = match incident.source.parse() {
                Ok(source) => source,
                Err(e) => {
                    warn!(incident_id = incident.id, error = %e, "skipping incident");
                    continue;
                }
            };

            throttle.wait().await;
            let message_id = match self.notify_incident(incident, source).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(incident_id = incident.id, error = %e, "failed to send alert");
                    continue;
                }
            };

            if let Err(e) = self.store.set_notification_id(incident.id, &message_id).await {
                warn!(incident_id = incident.id, message_id = %message_id, error = %e, "failed to save notification id");
            }
            if let Some(state) = sent_state.as_deref_mut() {
                state.mark_sent(incident.id);
            }
            info!(incident_id = incident.id, message_id = %message_id, "alert sent");
            notified += 1;
        }

        if let Some(state) = sent_state.as_deref() {
            if notified > 0 {
                state.save().await.context("saving sent-state file")?;
                info!(tracked = state.len(), "sent-state file updated");
            }
        }

        info!(notified, "processed new alerts");
        Ok(notified)
    }

    /// Pass 2. Returns the number of messages edited to the cleared variant.
    pub async fn clear_resolved_incidents(&self) -> Result<usize> {
        let incidents = self
            .store
            .cleared_notified_incidents()
            .await
            .context("querying cleared incidents")?;

        let mut cleared = 0;
        let mut throttle = Throttle::new(self.settings.send_delay);

        for incident in &incidents {
            info!(
                incident_id = incident.id,
                source = %incident.source,
                message_id = %incident.notification_id,
                "found cleared incident"
            );

            // Debug mode holds back edits as well as new alerts, so no message changes at all.
            if !self.settings.notify {
                info!(incident_id = incident.id, "notifications disabled, leaving message untouched");
                continue;
            }

            throttle.wait().await;
            if let Err(e) = self.mark_cleared(incident).await {
                warn!(incident_id = incident.id, error = %e, "failed to update alert");
                continue;
            }

            if let Err(e) = self.store.clear_notification_id(incident.id).await {
                warn!(incident_id = incident.id, error = %e, "failed to clear notification id");
            }
            cleared += 1;
        }

        info!(cleared, "processed cleared alerts");
        Ok(cleared)
    }

    async fn notify_incident(&self, incident: &Incident, source: IncidentSource) -> Result<String, WebhookError> {
        let cameras = if source.uses_cameras() {
            self.nearby_cameras(incident).await
        } else {
            Vec::new()
        };

        let frame = match (self.settings.camera_mode, cameras.first()) {
            (CameraMode::Attach, Some(nearest)) => self.capture_frame(incident, nearest).await,
            _ => None,
        };

        let ctx = BuildContext {
            maps_api_key: self.settings.maps_api_key.as_deref(),
            camera_mode: self.settings.camera_mode,
        };
        let payload = builder_for(source).build(
            &ctx,
            incident,
            &cameras,
            frame.as_ref().map(CapturedFrame::file_name),
        );

        let sent = self
            .channel
            .send(&payload, frame.as_ref().map(CapturedFrame::path))
            .await;
        drop(frame);
        sent
    }

    async fn nearby_cameras(&self, incident: &Incident) -> Vec<Camera> {
        let Some((lat, lon)) = incident.coordinates() else {
            return Vec::new();
        };
        match self.cameras.nearest_cameras(lat, lon, NEARBY_CAMERA_LIMIT).await {
            Ok(cameras) => cameras,
            Err(e) => {
                warn!(incident_id = incident.id, error = %e, "could not fetch nearby cameras");
                Vec::new()
            }
        }
    }

    async fn capture_frame(&self, incident: &Incident, camera: &Camera) -> Option<CapturedFrame> {
        match self.frames.capture(incident.id, camera).await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(incident_id = incident.id, camera = %camera.name, error = %e, "failed to capture camera image");
                None
            }
        }
    }

    async fn mark_cleared(&self, incident: &ClearedIncident) -> Result<(), WebhookError> {
        let payload = cleared_payload(incident, Utc::now());
        self.channel.edit(&incident.notification_id, &payload).await
    }
}

/// Enforces a fixed gap between consecutive outbound calls.
struct Throttle {
    delay: Duration,
    primed: bool,
}

impl Throttle {
    fn new(delay: Duration) -> Self {
        Self { delay, primed: false }
    }

    async fn wait(&mut self) {
        if self.primed && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.primed = true;
    }
}

fn log_debug_details(incident: &Incident) {
    match serde_json::to_string_pretty(&incident.details) {
        Ok(pretty) => info!(incident_id = incident.id, "notifications disabled, details:\n{}", pretty),
        Err(e) => warn!(incident_id = incident.id, error = %e, "failed to format details"),
    }
}
