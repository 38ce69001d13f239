//! Display session setup
//!
//! Runs the fixed setup sequence against a backend: extension check,
//! version check, surface creation, device selection, event selection,
//! flush. A [`Session`] only exists once every step has succeeded, so a
//! failed initialization leaves nothing to poll.

use std::num::NonZeroUsize;

use crate::backend::{
    EventKind, ExtensionInfo, SurfaceId, TouchBackend, MIN_TOUCH_VERSION, TOUCH_EXTENSION_NAME,
};
use crate::config::{Config, VersionConfig};
use crate::device::{select_device, DeviceInfo, DeviceTarget};
use crate::error::InitError;

/// Touch events every session selects
const TOUCH_EVENTS: [EventKind; 3] = [
    EventKind::TouchBegin,
    EventKind::TouchUpdate,
    EventKind::TouchEnd,
];

/// What initialization settled on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Selected device (or all devices)
    pub device: DeviceTarget,
    /// Event-receiving surface
    pub surface: SurfaceId,
    /// Opcode of the touch extension
    pub extension_opcode: u8,
    /// Version reported by the server
    pub version: (u16, u16),
    /// Event kinds selected on the surface
    pub selected: Vec<EventKind>,
}

impl DeviceHandle {
    pub fn device_id(&self) -> u16 {
        self.device.id()
    }
}

/// Extension check and version negotiation.
///
/// XInput requires `XIQueryVersion` before any other XI2 request, so every
/// path that talks to the extension goes through here first.
pub fn negotiate_touch_support<B: TouchBackend>(
    backend: &mut B,
    requested: VersionConfig,
) -> Result<(ExtensionInfo, (u16, u16)), InitError> {
    let extension = backend
        .query_extension(TOUCH_EXTENSION_NAME)?
        .ok_or(InitError::ExtensionMissing {
            name: TOUCH_EXTENSION_NAME,
        })?;

    let version = backend.query_version(requested.major, requested.minor)?;
    if version < MIN_TOUCH_VERSION {
        return Err(InitError::UnsupportedVersion {
            major: version.0,
            minor: version.1,
        });
    }
    tracing::info!(
        opcode = extension.major_opcode,
        requested = ?(requested.major, requested.minor),
        ?version,
        "XInput available"
    );
    Ok((extension, version))
}

/// Devices the server reports, and the one `config.device` would pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListing {
    pub version: (u16, u16),
    pub devices: Vec<DeviceInfo>,
    pub selected: Option<DeviceTarget>,
}

/// Negotiate the extension and enumerate devices without creating a surface
pub fn enumerate_devices<B: TouchBackend>(
    backend: &mut B,
    config: &Config,
) -> Result<DeviceListing, InitError> {
    let (_, version) = negotiate_touch_support(backend, config.version)?;
    let devices = backend.list_devices()?;
    let selected = select_device(&devices, config.device);
    Ok(DeviceListing {
        version,
        devices,
        selected,
    })
}

/// An initialized connection with touch events selected
pub struct Session<B: TouchBackend> {
    backend: B,
    handle: DeviceHandle,
    max_events_per_poll: Option<NonZeroUsize>,
}

impl<B: TouchBackend> Session<B> {
    /// Run the setup sequence on an already-connected backend
    pub fn initialize_with(mut backend: B, config: &Config) -> Result<Self, InitError> {
        let (extension, version) = negotiate_touch_support(&mut backend, config.version)?;

        let surface = backend.create_surface(&config.window)?;

        let devices = backend.list_devices()?;
        let device = select_device(&devices, config.device).ok_or_else(|| {
            InitError::NoTouchDeviceFound {
                policy: config.device.to_string(),
            }
        })?;
        tracing::info!(
            device = device.id(),
            name = device.name(),
            policy = %config.device,
            candidates = devices.len(),
            "selected input device"
        );

        let mut selected = TOUCH_EVENTS.to_vec();
        if config.diagnostic_motion {
            selected.push(EventKind::Motion);
        }
        backend.select_events(surface, device.id(), &selected)?;
        backend.flush()?;

        tracing::info!(surface, events = ?selected, "touch session initialized");

        Ok(Self {
            backend,
            handle: DeviceHandle {
                device,
                surface,
                extension_opcode: extension.major_opcode,
                version,
                selected,
            },
            max_events_per_poll: config.max_events_per_poll,
        })
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub fn max_events_per_poll(&self) -> Option<NonZeroUsize> {
        self.max_events_per_poll
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(feature = "x11-backend")]
impl Session<crate::backend::x11::X11Backend> {
    /// Connect to the configured X display and initialize
    pub fn initialize(config: &Config) -> Result<Self, InitError> {
        let backend = crate::backend::x11::X11Backend::connect(config.display.as_deref())?;
        Self::initialize_with(backend, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{HeadlessBackend, HeadlessServer, HEADLESS_XI_OPCODE};
    use crate::device::{DeviceClassKind, DeviceInfo, DevicePolicy};

    fn touch_server() -> HeadlessServer {
        HeadlessServer {
            devices: vec![
                DeviceInfo::new(2, "Virtual core pointer", vec![DeviceClassKind::Button]),
                DeviceInfo::new(9, "Touchscreen", vec![DeviceClassKind::Touch]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn initializes_on_first_touch_device() {
        let backend = HeadlessBackend::new(touch_server());
        let server = backend.handle();

        let session = Session::initialize_with(backend, &Config::default()).unwrap();
        let handle = session.handle();

        assert_eq!(handle.device_id(), 9);
        assert_eq!(handle.extension_opcode, HEADLESS_XI_OPCODE);
        assert_eq!(handle.version, (2, 3));
        assert_eq!(server.requested_version(), Some((2, 3)));

        let selections = server.selections();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].device, 9);
        assert_eq!(selections[0].surface, handle.surface);
        assert_eq!(
            selections[0].kinds,
            vec![
                EventKind::TouchBegin,
                EventKind::TouchUpdate,
                EventKind::TouchEnd,
                EventKind::Motion,
            ]
        );
        assert_eq!(server.flushes(), 1);
    }

    #[test]
    fn surface_uses_configured_geometry() {
        let backend = HeadlessBackend::new(touch_server());
        let server = backend.handle();
        let mut config = Config::default();
        config.window.width = 320;

        Session::initialize_with(backend, &config).unwrap();

        let surfaces = server.surfaces();
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].1.width, 320);
        assert_eq!(surfaces[0].1.height, 500);
    }

    #[test]
    fn motion_selection_can_be_disabled() {
        let backend = HeadlessBackend::new(touch_server());
        let config = Config {
            diagnostic_motion: false,
            ..Config::default()
        };

        let session = Session::initialize_with(backend, &config).unwrap();
        assert!(!session.handle().selected.contains(&EventKind::Motion));
    }

    #[test]
    fn missing_extension_stops_before_any_request() {
        let backend = HeadlessBackend::new(HeadlessServer {
            touch_extension: false,
            ..touch_server()
        });
        let server = backend.handle();

        let err = Session::initialize_with(backend, &Config::default()).err().unwrap();
        assert!(matches!(err, InitError::ExtensionMissing { .. }));
        assert!(server.surfaces().is_empty());
        assert_eq!(server.requested_version(), None);
    }

    #[test]
    fn xi_before_touch_is_unsupported() {
        let backend = HeadlessBackend::new(HeadlessServer {
            version: (2, 1),
            ..touch_server()
        });

        let err = Session::initialize_with(backend, &Config::default()).err().unwrap();
        assert!(matches!(
            err,
            InitError::UnsupportedVersion { major: 2, minor: 1 }
        ));
    }

    #[test]
    fn no_matching_device() {
        let backend = HeadlessBackend::new(HeadlessServer {
            devices: vec![DeviceInfo::new(3, "Keyboard", vec![DeviceClassKind::Key])],
            ..Default::default()
        });

        let err = Session::initialize_with(backend, &Config::default()).err().unwrap();
        match err {
            InitError::NoTouchDeviceFound { policy } => assert_eq!(policy, "first-touch"),
            other => panic!("expected NoTouchDeviceFound, got {other:?}"),
        }
    }

    #[test]
    fn all_devices_policy_selects_device_zero() {
        let backend = HeadlessBackend::new(HeadlessServer::default());
        let server = backend.handle();
        let config = Config {
            device: DevicePolicy::All,
            ..Config::default()
        };

        Session::initialize_with(backend, &config).unwrap();
        assert_eq!(server.selections()[0].device, 0);
    }

    #[test]
    fn device_listing_negotiates_version_first() {
        let mut backend = HeadlessBackend::new(touch_server());
        let server = backend.handle();

        let listing = enumerate_devices(&mut backend, &Config::default()).unwrap();
        assert_eq!(server.requested_version(), Some((2, 3)));
        assert_eq!(listing.version, (2, 3));
        assert_eq!(listing.devices.len(), 2);
        assert_eq!(listing.selected.map(|d| d.id()), Some(9));
        assert!(server.surfaces().is_empty());
        assert!(server.selections().is_empty());
    }

    #[test]
    fn device_listing_reports_old_servers() {
        let mut backend = HeadlessBackend::new(HeadlessServer {
            version: (2, 0),
            ..touch_server()
        });

        let err = enumerate_devices(&mut backend, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            InitError::UnsupportedVersion { major: 2, minor: 0 }
        ));
    }

    #[test]
    fn device_listing_without_a_match() {
        let mut backend = HeadlessBackend::new(HeadlessServer {
            devices: vec![DeviceInfo::new(3, "Keyboard", vec![DeviceClassKind::Key])],
            ..Default::default()
        });

        let listing = enumerate_devices(&mut backend, &Config::default()).unwrap();
        assert_eq!(listing.devices.len(), 1);
        assert_eq!(listing.selected, None);
    }
}
