use crate::db::CaptureLog;
use crate::models::camera::Camera;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to download image: {0}")]
    Http(#[from] reqwest::Error),
    #[error("received non-200 status code for image: {0}")]
    Status(StatusCode),
    #[error("failed to save image to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A camera frame written to disk. The file is removed when this is dropped.
#[derive(Debug)]
pub struct CapturedFrame {
    path: PathBuf,
    file_name: String,
}

impl CapturedFrame {
    pub fn new(dir: &Path, file_name: String) -> Self {
        Self {
            path: dir.join(&file_name),
            file_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for CapturedFrame {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove camera frame"),
        }
    }
}

/// Source of current camera frames.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn capture(&self, incident_id: i64, camera: &Camera) -> Result<CapturedFrame, CaptureError>;
}

/// Downloads frames over HTTP into `dir` and records each capture.
pub struct HttpCameraCapture<L> {
    client: Client,
    dir: PathBuf,
    log: L,
}

impl<L: CaptureLog> HttpCameraCapture<L> {
    pub fn new(dir: PathBuf, timeout: Duration, log: L) -> Result<Self, CaptureError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, dir, log })
    }
}

pub fn frame_file_name(incident_id: i64, at: DateTime<Utc>) -> String {
    format!("incident_{}_cam_{}.jpg", incident_id, at.format("%Y%m%d%H%M%S"))
}

#[async_trait]
impl<L: CaptureLog> FrameSource for HttpCameraCapture<L> {
    async fn capture(&self, incident_id: i64, camera: &Camera) -> Result<CapturedFrame, CaptureError> {
        info!(incident_id, camera = %camera.name, "capturing camera frame");

        let response = self.client.get(&camera.image_url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(CaptureError::Status(response.status()));
        }
        let bytes = response.bytes().await?;

        let frame = CapturedFrame::new(&self.dir, frame_file_name(incident_id, Utc::now()));
        tokio::fs::write(frame.path(), &bytes)
            .await
            .map_err(|source| CaptureError::Io {
                path: frame.path().to_path_buf(),
                source,
            })?;

        if let Err(e) = self.log.record_capture(incident_id, &camera.name, frame.path()).await {
            warn!(incident_id, error = %e, "failed to log camera capture");
        }

        info!(incident_id, path = %frame.path().display(), "saved camera frame");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use crate::test_support::serve_once;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLog {
        fail: bool,
        rows: Mutex<Vec<(i64, String, PathBuf)>>,
    }

    #[async_trait]
    impl CaptureLog for RecordingLog {
        async fn record_capture(&self, incident_id: i64, camera_name: &str, file_path: &Path) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::PoolClosed);
            }
            self.rows
                .lock()
                .unwrap()
                .push((incident_id, camera_name.to_string(), file_path.to_path_buf()));
            Ok(())
        }
    }

    fn camera(url: String) -> Camera {
        Camera {
            name: "I-40 @ Exit 12".to_string(),
            image_url: url,
        }
    }

    #[test]
    fn file_name_carries_incident_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(frame_file_name(31, at), "incident_31_cam_20240309070501.jpg");
    }

    #[test]
    fn dropping_frame_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let frame = CapturedFrame::new(dir.path(), "f.jpg".to_string());
        std::fs::write(frame.path(), b"x").unwrap();
        let path = frame.path().to_path_buf();

        drop(frame);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn capture_writes_frame_and_logs_it() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _request) = serve_once("200 OK", "image/jpeg", b"JPEGBYTES".to_vec()).await;
        let capture = HttpCameraCapture::new(dir.path().to_path_buf(), Duration::from_secs(5), RecordingLog::default()).unwrap();

        let frame = capture.capture(12, &camera(format!("{}/cam.jpg", base))).await.unwrap();

        assert!(frame.file_name().starts_with("incident_12_cam_"));
        assert_eq!(std::fs::read(frame.path()).unwrap(), b"JPEGBYTES");
        let rows = capture.log.rows.lock().unwrap().clone();
        assert_eq!(rows, vec![(12, "I-40 @ Exit 12".to_string(), frame.path().to_path_buf())]);
    }

    #[tokio::test]
    async fn non_200_is_an_error_and_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _request) = serve_once("404 Not Found", "text/plain", b"gone".to_vec()).await;
        let capture = HttpCameraCapture::new(dir.path().to_path_buf(), Duration::from_secs(5), RecordingLog::default()).unwrap();

        let err = capture.capture(1, &camera(format!("{}/cam.jpg", base))).await.unwrap_err();

        assert!(matches!(err, CaptureError::Status(s) if s == StatusCode::NOT_FOUND));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(capture.log.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_capture() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _request) = serve_once("200 OK", "image/jpeg", b"JPEG".to_vec()).await;
        let log = RecordingLog {
            fail: true,
            ..Default::default()
        };
        let capture = HttpCameraCapture::new(dir.path().to_path_buf(), Duration::from_secs(5), log).unwrap();

        let frame = capture.capture(2, &camera(format!("{}/cam.jpg", base))).await.unwrap();
        assert!(frame.path().exists());
    }
}
