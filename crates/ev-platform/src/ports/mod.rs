//! Platform-internal ports. Capture backends implement these; the camera
//! adapter consumes them.

pub mod media_devices;

pub use media_devices::{
    BackendError, MediaDeviceInfo, MediaDeviceKind, MediaDevicesPort, MediaStreamPort, RawFrame,
};
