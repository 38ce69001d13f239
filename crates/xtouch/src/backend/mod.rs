//! Windowing backend abstraction
//!
//! The session and the pump only talk to the server through
//! [`TouchBackend`], which lists the primitives a windowing system has to
//! offer for this bridge to work: extension discovery by name, a versioned
//! capability query, surface creation, device enumeration with per-device
//! classes, per-device/per-surface event selection, and a non-blocking event
//! fetch.
//!
//! # Backends
//!
//! - **X11Backend** (feature: `x11-backend`): XInput2 over `x11rb`.
//! - **HeadlessBackend** (feature: `headless-backend`): scripted server with
//!   injectable events. No display required.

#[cfg(feature = "x11-backend")]
pub mod x11;

#[cfg(any(test, feature = "headless-backend"))]
pub mod headless;

use std::time::Duration;

use crate::config::WindowConfig;
use crate::device::DeviceInfo;
use crate::error::BackendError;

/// Server-side identifier of the event-receiving surface
pub type SurfaceId = u32;

/// Name under which the server advertises the touch input extension
pub const TOUCH_EXTENSION_NAME: &str = "XInputExtension";

/// Oldest XInput version that carries touch events
pub const MIN_TOUCH_VERSION: (u16, u16) = (2, 2);

/// Result of a successful extension query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionInfo {
    /// Major opcode assigned to the extension by the server
    pub major_opcode: u8,
}

/// Extension event kinds the bridge subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TouchBegin,
    TouchUpdate,
    TouchEnd,
    /// Pointer motion, only selected for diagnostics
    Motion,
}

/// Backend-neutral view of one queued server event
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// A device event of the touch extension
    Device {
        kind: EventKind,
        /// Touch id for touch events, button/detail for motion
        detail: u32,
        /// Surface-local coordinates
        event_x: f64,
        event_y: f64,
        device: u16,
        surface: SurfaceId,
    },
    /// Core key press delivered to `surface`
    KeyPress { surface: SurfaceId },
    /// Anything else; ignored by the pump
    Other,
}

/// Primitives the bridge needs from a windowing system
pub trait TouchBackend {
    /// Look up an extension by name; `None` when the server lacks it
    fn query_extension(&mut self, name: &str) -> Result<Option<ExtensionInfo>, BackendError>;

    /// Announce the version we speak and return the version the server reports
    fn query_version(&mut self, major: u16, minor: u16) -> Result<(u16, u16), BackendError>;

    /// Create and map the event-receiving surface, then round-trip so later
    /// requests see it realized
    fn create_surface(&mut self, window: &WindowConfig) -> Result<SurfaceId, BackendError>;

    /// Enumerate all input devices in server order
    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, BackendError>;

    /// Subscribe `surface` to `kinds` coming from `device`
    fn select_events(
        &mut self,
        surface: SurfaceId,
        device: u16,
        kinds: &[EventKind],
    ) -> Result<(), BackendError>;

    /// Push buffered requests to the server
    fn flush(&mut self) -> Result<(), BackendError>;

    /// Take the next queued event without blocking
    fn poll_event(&mut self) -> Result<Option<RawEvent>, BackendError>;

    /// Block up to `timeout` until an event is available.
    ///
    /// Returns whether an event can be taken with `poll_event`.
    fn wait_for_event(&mut self, timeout: Duration) -> Result<bool, BackendError>;
}
