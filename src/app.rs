use crate::camera::Camera;
use crate::capture_loop::{CaptureLoop, LatestDetections};
use crate::config::Config;
use crate::device_selector::DeviceSelector;
use crate::server::{HttpServer, SharedState};
use crate::session::UploadSession;
use crate::stream::VideoStream;
use crate::telemetry::Metrics;
use crate::uploader::UploadClient;

use std::{error::Error, sync::Arc, time::Duration};
use tokio::{
    signal,
    sync::{broadcast, watch},
};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    if config.upload.endpoints.is_empty() {
        tracing::warn!("No upload endpoints configured, uploads cannot be started");
    }

    let metrics = Arc::new(Metrics::new()?);
    let session = Arc::new(UploadSession::new(
        config.upload.endpoints.clone(),
        config.upload.default_interval_secs,
        config.upload.max_log_lines,
    ));
    let uploader = match UploadClient::new(config.upload.request_timeout_secs.map(Duration::from_secs)) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to initialize upload client: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let (selector, selection_rx) = DeviceSelector::new(config.camera.max_devices);
    let selector = Arc::new(selector);
    // Nothing is open yet, so every index is probed.
    let options = selector.refresh(None).await;
    tracing::info!("Camera devices: {:?}", options.devices);

    let (preview_tx, preview_rx) = watch::channel(None);
    let detections = LatestDetections::default();
    let camera = Arc::new(Camera::new(config.camera.default_index));

    let state = SharedState {
        selector: selector.clone(),
        camera: camera.clone(),
        session: session.clone(),
        detections: detections.clone(),
        video_stream: VideoStream::new(preview_rx),
        metrics: metrics.clone(),
        default_interval_secs: config.upload.default_interval_secs,
    };
    let server = HttpServer::new(state, &config.server.get_address()).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();
    let capture_shutdown_rx = shutdown_tx.subscribe();

    let capture_handle = CaptureLoop::new(
        camera,
        session,
        uploader,
        metrics,
        detections,
        preview_tx,
        config.display.clone(),
        config.upload.jpeg_quality,
        config.camera.get_stream_delay_ms(),
    )
    .run(selection_rx, capture_shutdown_rx);

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = capture_handle.await;
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
