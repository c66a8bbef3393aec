use crate::{
    camera::{Camera, CameraDevice},
    config::DisplayConfig,
    letterbox::letterbox_into,
    response::Detection,
    session::{CaptureTimer, UploadSession},
    telemetry::Metrics,
    uploader::{encode_jpeg, snapshot_filename, UploadClient},
};
use bytes::Bytes;
use chrono::Local;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};

pub type LatestDetections = Arc<Mutex<Vec<Detection>>>;

/// Per-frame driver: camera -> canvas -> preview, plus the upload timer.
pub struct CaptureLoop {
    camera: Arc<Camera>,
    session: Arc<UploadSession>,
    uploader: UploadClient,
    metrics: Arc<Metrics>,
    detections: LatestDetections,
    preview_tx: watch::Sender<Option<Bytes>>,
    display: DisplayConfig,
    jpeg_quality: u8,
    frame_delay: Duration,
}

#[allow(clippy::too_many_arguments)]
impl CaptureLoop {
    pub fn new(
        camera: Arc<Camera>,
        session: Arc<UploadSession>,
        uploader: UploadClient,
        metrics: Arc<Metrics>,
        detections: LatestDetections,
        preview_tx: watch::Sender<Option<Bytes>>,
        display: DisplayConfig,
        jpeg_quality: u8,
        frame_delay_ms: u64,
    ) -> Self {
        Self {
            camera,
            session,
            uploader,
            metrics,
            detections,
            preview_tx,
            display,
            jpeg_quality,
            frame_delay: Duration::from_millis(frame_delay_ms.max(1)),
        }
    }

    pub fn run(
        self,
        mut selection_rx: watch::Receiver<Option<CameraDevice>>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let background = Rgb(self.display.background);
            let mut canvas =
                RgbImage::from_pixel(self.display.width, self.display.height, background);
            let mut latest_jpeg: Option<Bytes> = None;
            let mut timer = CaptureTimer::new();

            let mut ticker = interval(self.frame_delay);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let initial = selection_rx.borrow_and_update().clone();
            self.switch_camera(initial.as_ref()).await;

            let mut last_tick = Instant::now();
            let mut fps_window = (Instant::now(), 0u32);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Capture loop received shutdown signal");
                        break;
                    }
                    changed = selection_rx.changed() => {
                        if changed.is_err() {
                            tracing::warn!("Device selector closed, stopping capture loop");
                            break;
                        }
                        let device = selection_rx.borrow_and_update().clone();
                        self.switch_camera(device.as_ref()).await;
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                let now = Instant::now();
                let delta = now - last_tick;
                last_tick = now;

                if let Some(jpeg) = self.render_frame(&mut canvas, background).await {
                    self.preview_tx.send_replace(Some(jpeg.clone()));
                    latest_jpeg = Some(jpeg);
                    fps_window.1 += 1;
                }

                let window = now.duration_since(fps_window.0);
                if window >= Duration::from_secs(1) {
                    self.metrics
                        .record_camera_fps(fps_window.1 as f64 / window.as_secs_f64());
                    fps_window = (now, 0);
                }

                let (uploading, url, upload_interval) = self.session.snapshot();
                if timer.tick(delta, upload_interval, uploading) {
                    let jpeg = match &latest_jpeg {
                        Some(jpeg) => jpeg.clone(),
                        None => match encode_jpeg(&canvas, self.jpeg_quality) {
                            Ok(jpeg) => Bytes::from(jpeg),
                            Err(e) => {
                                self.session.log().push(format!("Upload failed: {}", e));
                                tracing::error!("Upload failed: {}", e);
                                continue;
                            }
                        },
                    };
                    self.spawn_upload(url, jpeg);
                }
            }

            self.camera.stop().await;
            tracing::info!("Capture loop stopped");
        })
    }

    async fn switch_camera(&self, device: Option<&CameraDevice>) {
        match self.camera.start(device).await {
            Ok(index) => tracing::info!("Camera {} playing", index),
            Err(e) => tracing::error!("Failed to start camera: {}", e),
        }
    }

    /// Letterboxes the next camera frame into `canvas` and returns it as JPEG.
    async fn render_frame(&self, canvas: &mut RgbImage, background: Rgb<u8>) -> Option<Bytes> {
        let frame = match self.camera.capture_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Error getting frame: {:?}", e);
                return None;
            }
        };

        letterbox_into(&frame, canvas, background);

        match encode_jpeg(canvas, self.jpeg_quality) {
            Ok(jpeg) => Some(Bytes::from(jpeg)),
            Err(e) => {
                tracing::error!("Error encoding frame: {:?}", e);
                None
            }
        }
    }

    fn spawn_upload(&self, url: String, jpeg: Bytes) {
        tracing::debug!("Capture and upload triggered");
        tokio::spawn(upload_snapshot(
            self.uploader.clone(),
            self.session.clone(),
            self.metrics.clone(),
            self.detections.clone(),
            url,
            jpeg,
        ));
    }
}

/// One upload attempt; the outcome only surfaces in the activity log.
pub async fn upload_snapshot(
    uploader: UploadClient,
    session: Arc<UploadSession>,
    metrics: Arc<Metrics>,
    detections: LatestDetections,
    url: String,
    jpeg: Bytes,
) {
    let started = Instant::now();
    let filename = snapshot_filename(Local::now());
    let result = uploader.upload(&url, jpeg.to_vec(), filename).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(parsed) => {
            session.log().push("Upload complete");
            tracing::info!(duration_ms, "Upload complete");
            metrics.record_upload(duration_ms, true);
            if let Some(parsed) = parsed {
                *detections.lock() = parsed;
            }
        }
        Err(e) => {
            session.log().push(format!("Upload failed: {}", e));
            tracing::error!("Upload failed: {}", e);
            metrics.record_upload(duration_ms, false);
        }
    }
}
