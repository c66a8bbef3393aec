use crate::response::{Detection, UploadResponse};
use chrono::{DateTime, Local};
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use reqwest::multipart;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

pub const IMAGE_FIELD: &str = "image";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP/{0}")]
    Status(reqwest::StatusCode),
}

pub fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>, UploadError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(canvas)?;
    Ok(buf)
}

pub fn snapshot_filename(now: DateTime<Local>) -> String {
    format!("webcam{}.jpg", now.format("%Y%m%d_%H%M%S"))
}

#[derive(Clone)]
pub struct UploadClient {
    client: reqwest::Client,
}

impl UploadClient {
    pub fn new(request_timeout: Option<Duration>) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Posts one JPEG as the `image` form field.
    ///
    /// A JSON body in the expected shape is turned into detections; any other
    /// body is accepted and ignored.
    #[instrument(skip(self, jpeg), fields(bytes = jpeg.len()))]
    pub async fn upload(
        &self,
        url: &str,
        jpeg: Vec<u8>,
        filename: String,
    ) -> Result<Option<Vec<Detection>>, UploadError> {
        let part = multipart::Part::bytes(jpeg)
            .file_name(filename)
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }

        let body = response.bytes().await?;
        match UploadResponse::from_slice(&body) {
            Ok(parsed) => Ok(Some(parsed.detections())),
            Err(e) => {
                tracing::debug!("Upload response is not a detection payload: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, State},
        http::StatusCode,
        routing::post,
        Json, Router,
    };
    use chrono::TimeZone;
    use std::sync::Arc;
    use tokio::{net::TcpListener, sync::Mutex};

    #[derive(Debug, Default, Clone)]
    struct Received {
        field: String,
        filename: String,
        content_type: String,
        bytes: usize,
    }

    type Inbox = Arc<Mutex<Vec<Received>>>;

    async fn receive(State(inbox): State<Inbox>, mut multipart: Multipart) -> Json<serde_json::Value> {
        while let Some(field) = multipart.next_field().await.unwrap() {
            let received = Received {
                field: field.name().unwrap_or_default().to_string(),
                filename: field.file_name().unwrap_or_default().to_string(),
                content_type: field.content_type().unwrap_or_default().to_string(),
                bytes: field.bytes().await.unwrap().len(),
            };
            inbox.lock().await.push(received);
        }
        Json(serde_json::json!({
            "content": { "bboxes": [1.0, 2.0, 3.0, 4.0], "pred_labels": ["person"] }
        }))
    }

    async fn spawn_server(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/upload", addr)
    }

    #[test]
    fn test_snapshot_filename() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(snapshot_filename(now), "webcam20240309_070502.jpg");
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg() {
        let canvas = RgbImage::from_pixel(16, 8, image::Rgb([200, 10, 10]));
        let jpeg = encode_jpeg(&canvas, 75).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn test_upload_sends_image_field() {
        let inbox: Inbox = Arc::default();
        let url = spawn_server(
            Router::new()
                .route("/upload", post(receive))
                .with_state(inbox.clone()),
        )
        .await;

        let client = UploadClient::new(None).unwrap();
        let jpeg = encode_jpeg(&RgbImage::new(4, 4), 75).unwrap();
        let size = jpeg.len();
        let detections = client
            .upload(&url, jpeg, "webcam20240101_000000.jpg".into())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");

        let inbox = inbox.lock().await;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].field, IMAGE_FIELD);
        assert_eq!(inbox[0].filename, "webcam20240101_000000.jpg");
        assert_eq!(inbox[0].content_type, "image/jpeg");
        assert_eq!(inbox[0].bytes, size);
    }

    #[tokio::test]
    async fn test_upload_accepts_plain_body() {
        let url = spawn_server(Router::new().route("/upload", post(|| async { "saved" }))).await;

        let client = UploadClient::new(None).unwrap();
        let result = client.upload(&url, vec![0xFF, 0xD8], "a.jpg".into()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_upload_reports_server_error() {
        let url = spawn_server(Router::new().route(
            "/upload",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let client = UploadClient::new(None).unwrap();
        let err = client
            .upload(&url, vec![1, 2, 3], "a.jpg".into())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.to_string(), "HTTP/500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_upload_reports_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UploadClient::new(Some(Duration::from_secs(2))).unwrap();
        let err = client
            .upload(&format!("http://{}/upload", addr), vec![1], "a.jpg".into())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Request(_)));
    }
}
