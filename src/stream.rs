use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub const FRAME_BOUNDARY: &str = "frame";

/// MJPEG stream of the letterboxed preview canvas.
#[derive(Clone)]
pub struct VideoStream {
    preview_rx: watch::Receiver<Option<Bytes>>,
}

impl VideoStream {
    pub fn new(preview_rx: watch::Receiver<Option<Bytes>>) -> Self {
        Self { preview_rx }
    }

    /// One multipart part per published frame; frames published faster than
    /// the client reads are skipped.
    pub fn generate_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> {
        WatchStream::new(self.preview_rx).filter_map(|frame| async move {
            frame.map(|frame| Ok(Bytes::from(encode_part(&frame))))
        })
    }
}

fn encode_part(frame: &[u8]) -> Vec<u8> {
    let part_header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        FRAME_BOUNDARY,
        frame.len()
    );
    let mut body = part_header.into_bytes();
    body.extend_from_slice(frame);
    body.extend_from_slice(b"\r\n");
    body
}
