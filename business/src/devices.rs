//! Camera enumeration with a cached outcome.

use std::sync::Arc;

use log::{info, warn};
use qrdesk_input::{CameraBackend, CameraDevice, CameraError};

/// What enumeration has revealed about camera access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionState {
    /// Enumeration has not run yet.
    #[default]
    Unknown,
    Granted,
    Denied,
    /// Access was not refused but there is nothing to capture from.
    Unavailable,
}

/// Lists cameras once per session and remembers the answer.
///
/// Repeated calls to [`DeviceEnumerator::list_cameras`] return the cached
/// outcome. Only [`DeviceEnumerator::retry`] asks the backend again.
pub struct DeviceEnumerator {
    backend: Arc<dyn CameraBackend>,
    outcome: Option<Result<Vec<CameraDevice>, CameraError>>,
}

impl DeviceEnumerator {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self {
            backend,
            outcome: None,
        }
    }

    pub async fn list_cameras(&mut self) -> Result<&[CameraDevice], CameraError> {
        if self.outcome.is_none() {
            let outcome = self.backend.list_cameras().await.and_then(|devices| {
                if devices.is_empty() {
                    Err(CameraError::NoDevices)
                } else {
                    Ok(devices)
                }
            });
            match &outcome {
                Ok(devices) => info!("Found {} camera(s)", devices.len()),
                Err(e) => warn!("Camera enumeration failed: {e}"),
            }
            self.outcome = Some(outcome);
        }

        match &self.outcome {
            Some(Ok(devices)) => Ok(devices.as_slice()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(CameraError::NoDevices),
        }
    }

    /// Drops the cached outcome and enumerates again.
    pub async fn retry(&mut self) -> Result<&[CameraDevice], CameraError> {
        self.outcome = None;
        self.list_cameras().await
    }

    /// Devices from the last successful enumeration.
    pub fn devices(&self) -> &[CameraDevice] {
        match &self.outcome {
            Some(Ok(devices)) => devices.as_slice(),
            _ => &[],
        }
    }

    pub fn default_device(&self) -> Option<&CameraDevice> {
        self.devices().first()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices().iter().any(|d| d.id == device_id)
    }

    pub fn permission(&self) -> PermissionState {
        match &self.outcome {
            None => PermissionState::Unknown,
            Some(Ok(_)) => PermissionState::Granted,
            Some(Err(CameraError::PermissionDenied(_))) => PermissionState::Denied,
            Some(Err(_)) => PermissionState::Unavailable,
        }
    }
}
