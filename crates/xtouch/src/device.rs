//! Input device enumeration results and the selection policy
//!
//! The server reports every input device with the list of classes it
//! carries. Touch events are only generated by devices with a touch class,
//! so the default policy picks the first such device.
//!
//! `FirstNonTouch` keeps the selection the bridge historically shipped with,
//! which picks the first device *without* a touch class. That reads as an
//! inverted condition, but hosts that depended on it (e.g. testing with a
//! mouse through the motion path) can still opt in.

use serde::{Deserialize, Serialize};

/// XInput's "all devices" id
pub const ALL_DEVICES: u16 = 0;

/// Kind of a device class entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClassKind {
    Key,
    Button,
    Valuator,
    Scroll,
    Touch,
    Gesture,
    Other,
}

/// One enumerated input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: u16,
    pub name: String,
    pub classes: Vec<DeviceClassKind>,
}

impl DeviceInfo {
    pub fn new(id: u16, name: impl Into<String>, classes: Vec<DeviceClassKind>) -> Self {
        Self {
            id,
            name: name.into(),
            classes,
        }
    }

    /// Whether any class entry is a touch class
    pub fn has_touch_class(&self) -> bool {
        self.classes.contains(&DeviceClassKind::Touch)
    }
}

/// How to choose the device whose events get selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevicePolicy {
    /// First device in enumeration order with a touch class
    #[default]
    FirstTouch,
    /// First device in enumeration order without a touch class
    FirstNonTouch,
    /// Every device (XIAllDevices)
    All,
    /// A specific device id, which must be present in the enumeration
    Id(u16),
}

impl std::fmt::Display for DevicePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePolicy::FirstTouch => write!(f, "first-touch"),
            DevicePolicy::FirstNonTouch => write!(f, "first-non-touch"),
            DevicePolicy::All => write!(f, "all"),
            DevicePolicy::Id(id) => write!(f, "id={id}"),
        }
    }
}

/// Outcome of device selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// Subscribe on every device
    All,
    /// Subscribe on one enumerated device
    Device { id: u16, name: String },
}

impl DeviceTarget {
    /// Device id to put in the event mask
    pub fn id(&self) -> u16 {
        match self {
            DeviceTarget::All => ALL_DEVICES,
            DeviceTarget::Device { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeviceTarget::All => "all devices",
            DeviceTarget::Device { name, .. } => name,
        }
    }
}

/// Pick a device from `devices` according to `policy`.
///
/// Returns `None` when nothing matches; `All` always matches.
pub fn select_device(devices: &[DeviceInfo], policy: DevicePolicy) -> Option<DeviceTarget> {
    let found = match policy {
        DevicePolicy::All => return Some(DeviceTarget::All),
        DevicePolicy::FirstTouch => devices.iter().find(|d| d.has_touch_class()),
        DevicePolicy::FirstNonTouch => devices.iter().find(|d| !d.has_touch_class()),
        DevicePolicy::Id(id) => devices.iter().find(|d| d.id == id),
    };

    found.map(|d| DeviceTarget::Device {
        id: d.id,
        name: d.name.clone(),
    })
}
