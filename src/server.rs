use crate::{
    camera::Camera, capture_loop::LatestDetections, device_selector::DeviceSelector,
    routes::api_routes, session::UploadSession, stream::VideoStream, telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

#[derive(Clone)]
pub struct SharedState {
    pub selector: Arc<DeviceSelector>,
    pub camera: Arc<Camera>,
    pub session: Arc<UploadSession>,
    pub detections: LatestDetections,
    pub video_stream: VideoStream,
    pub metrics: Arc<Metrics>,
    pub default_interval_secs: f32,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(state: SharedState, addr: &str) -> anyhow::Result<Self> {
        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let router = Router::new()
            .merge(api_routes())
            .with_state(state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(
        self,
        mut shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await.ok();
                })
                .await?;
            Ok(())
        });

        Ok(server_handle)
    }
}
