use image::RgbImage;
use opencv::{core::Mat, imgproc, prelude::*, videoio};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera {0}: {1}")]
    OpenCameraFailed(i32, opencv::Error),
    #[error("Camera {0} is not available")]
    CameraUnavailable(i32),
    #[error("Failed to read frame: {0}")]
    ReadFrameFailed(opencv::Error),
    #[error("Frame buffer does not match {0}x{1} RGB")]
    InvalidFrame(u32, u32),
    #[error("OpenCV error: {0}")]
    OpenCvError(opencv::Error),
}

impl From<opencv::Error> for CameraError {
    fn from(err: opencv::Error) -> Self {
        CameraError::OpenCvError(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraDevice {
    pub index: i32,
    pub name: String,
}

/// Probes capture indices `0..max_devices` and returns those that open.
///
/// `active` is the device this process has open; it is reported without
/// probing since a second open of the same index may be refused.
pub fn list_devices(max_devices: i32, active: Option<&CameraDevice>) -> Vec<CameraDevice> {
    let mut devices = Vec::new();
    for index in 0..max_devices {
        if let Some(active) = active.filter(|d| d.index == index) {
            devices.push(active.clone());
            continue;
        }
        match probe(index) {
            Ok(Some(device)) => devices.push(device),
            Ok(None) => {}
            Err(e) => tracing::debug!("Probing camera {} failed: {:?}", index, e),
        }
    }
    devices
}

fn probe(index: i32) -> Result<Option<CameraDevice>, opencv::Error> {
    let mut capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
    if !capture.is_opened()? {
        return Ok(None);
    }
    let device = describe(index, &capture);
    capture.release()?;
    Ok(Some(device))
}

fn describe(index: i32, capture: &videoio::VideoCapture) -> CameraDevice {
    let backend = capture.get_backend_name().unwrap_or_else(|_| "unknown".into());
    CameraDevice {
        index,
        name: format!("Camera {} ({})", index, backend),
    }
}

struct ActiveCapture {
    device: CameraDevice,
    capture: videoio::VideoCapture,
}

pub struct Camera {
    default_index: i32,
    active: Mutex<Option<ActiveCapture>>,
}

impl Camera {
    pub fn new(default_index: i32) -> Self {
        Self {
            default_index,
            active: Mutex::new(None),
        }
    }

    /// Stops the playing device, if any, and opens `device` (or the default one).
    pub async fn start(&self, device: Option<&CameraDevice>) -> Result<i32, CameraError> {
        let index = device.map(|d| d.index).unwrap_or(self.default_index);
        tracing::info!("Switching camera to device {}", index);

        let mut active = self.active.lock().await;
        if let Some(mut previous) = active.take() {
            if let Err(e) = previous.capture.release() {
                tracing::warn!("Failed to release camera {}: {:?}", previous.device.index, e);
            }
        }

        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| CameraError::OpenCameraFailed(index, e))?;
        if !capture.is_opened()? {
            return Err(CameraError::CameraUnavailable(index));
        }
        let device = match device {
            Some(device) => device.clone(),
            None => describe(index, &capture),
        };
        *active = Some(ActiveCapture { device, capture });

        Ok(index)
    }

    pub async fn stop(&self) {
        if let Some(mut previous) = self.active.lock().await.take() {
            let _ = previous.capture.release();
        }
    }

    /// The device currently open, whether selected or opened by default.
    pub async fn active_device(&self) -> Option<CameraDevice> {
        self.active.lock().await.as_ref().map(|a| a.device.clone())
    }

    /// Reads one frame as RGB. `None` when no device is open or the frame is empty.
    pub async fn capture_frame(&self) -> Result<Option<RgbImage>, CameraError> {
        let mut active = self.active.lock().await;
        let Some(active) = active.as_mut() else {
            return Ok(None);
        };

        let mut frame = Mat::default();
        if !active
            .capture
            .read(&mut frame)
            .map_err(CameraError::ReadFrameFailed)?
            || frame.empty()
        {
            return Ok(None);
        }

        mat_to_rgb(&frame).map(Some)
    }
}

fn mat_to_rgb(frame: &Mat) -> Result<RgbImage, CameraError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    if !rgb.is_continuous() {
        rgb = rgb.try_clone()?;
    }

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb.data_bytes()?.to_vec();

    RgbImage::from_raw(width, height, data).ok_or(CameraError::InvalidFrame(width, height))
}
