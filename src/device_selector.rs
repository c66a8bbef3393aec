use crate::camera::{list_devices, CameraDevice};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

pub const NO_CAMERA_OPTION: &str = "No camera found";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceOptions {
    pub devices: Vec<String>,
    pub selected: Option<String>,
}

/// Lists capture devices and tells the listener which one was picked.
pub struct DeviceSelector {
    max_devices: i32,
    devices: Mutex<Vec<CameraDevice>>,
    selection_tx: watch::Sender<Option<CameraDevice>>,
}

impl DeviceSelector {
    pub fn new(max_devices: i32) -> (Self, watch::Receiver<Option<CameraDevice>>) {
        let (selection_tx, selection_rx) = watch::channel(None);
        let selector = Self {
            max_devices,
            devices: Mutex::new(Vec::new()),
            selection_tx,
        };
        (selector, selection_rx)
    }

    /// Re-enumerates devices. `active` is the device the camera has open, which
    /// is listed as-is instead of being probed again.
    pub async fn refresh(&self, active: Option<CameraDevice>) -> DeviceOptions {
        let max_devices = self.max_devices;
        let devices =
            match tokio::task::spawn_blocking(move || list_devices(max_devices, active.as_ref()))
                .await
            {
                Ok(devices) => devices,
                Err(e) => {
                    tracing::error!("Device enumeration task failed: {:?}", e);
                    Vec::new()
                }
            };
        self.set_devices(devices);
        self.options()
    }

    fn set_devices(&self, devices: Vec<CameraDevice>) {
        if devices.is_empty() {
            tracing::info!("No camera device found.");
        } else {
            tracing::debug!("Found {} camera devices", devices.len());
        }
        *self.devices.lock() = devices;
    }

    pub fn options(&self) -> DeviceOptions {
        let devices = self.devices.lock();
        let names = if devices.is_empty() {
            vec![NO_CAMERA_OPTION.to_string()]
        } else {
            devices.iter().map(|d| d.name.clone()).collect()
        };
        DeviceOptions {
            devices: names,
            selected: self.selection_tx.borrow().as_ref().map(|d| d.name.clone()),
        }
    }

    /// Selects the device at `index` of the last listing. Out of range is a no-op.
    pub fn select(&self, index: usize) -> Option<CameraDevice> {
        let device = self.devices.lock().get(index).cloned()?;
        tracing::info!("Selected Camera: {}", device.name);
        self.selection_tx.send_replace(Some(device.clone()));
        Some(device)
    }
}
