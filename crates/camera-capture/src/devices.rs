//! Capture device enumeration

use serde::Serialize;
use std::path::Path;

/// Highest `/dev/videoN` index probed
const MAX_DEVICE_INDEX: u32 = 16;

/// A discovered capture device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub index: u32,
    pub path: String,
    pub name: String,
}

/// List video capture devices present on this machine.
///
/// Without the `v4l` feature only device node presence is checked and the
/// name is left empty.
pub fn list_devices() -> Vec<DeviceInfo> {
    let devices: Vec<DeviceInfo> = (0..MAX_DEVICE_INDEX)
        .filter_map(|index| {
            let path = format!("/dev/video{index}");
            if !Path::new(&path).exists() {
                return None;
            }
            probe(index, path)
        })
        .collect();

    tracing::debug!(count = devices.len(), "enumerated capture devices");
    devices
}

#[cfg(feature = "v4l")]
fn probe(index: u32, path: String) -> Option<DeviceInfo> {
    let device = v4l::Device::with_path(&path).ok()?;
    let caps = device.query_caps().ok()?;
    if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
        return None;
    }
    Some(DeviceInfo {
        index,
        path,
        name: caps.card,
    })
}

#[cfg(not(feature = "v4l"))]
fn probe(index: u32, path: String) -> Option<DeviceInfo> {
    Some(DeviceInfo {
        index,
        path,
        name: String::new(),
    })
}
