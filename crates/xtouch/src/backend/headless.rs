//! Headless backend for testing
//!
//! A scripted stand-in for the display server. Tests describe what the
//! server advertises (extension, version, devices), inject events through a
//! [`HeadlessHandle`] and inspect the requests the session made.
//!
//! The handle shares state with the backend, so events can still be
//! injected after the backend has been moved into a session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{EventKind, ExtensionInfo, RawEvent, SurfaceId, TouchBackend, TOUCH_EXTENSION_NAME};
use crate::config::WindowConfig;
use crate::device::DeviceInfo;
use crate::error::BackendError;

/// Opcode handed out for the scripted touch extension
pub const HEADLESS_XI_OPCODE: u8 = 131;

/// First surface id handed out
const FIRST_SURFACE_ID: SurfaceId = 0x0040_0001;

/// What the scripted server advertises
#[derive(Debug, Clone)]
pub struct HeadlessServer {
    /// Whether the touch extension is present
    pub touch_extension: bool,
    /// Version reported by the version query
    pub version: (u16, u16),
    /// Devices in enumeration order
    pub devices: Vec<DeviceInfo>,
}

impl Default for HeadlessServer {
    fn default() -> Self {
        Self {
            touch_extension: true,
            version: (2, 3),
            devices: Vec::new(),
        }
    }
}

/// An event selection recorded by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub surface: SurfaceId,
    pub device: u16,
    pub kinds: Vec<EventKind>,
}

#[derive(Debug, Default)]
struct HeadlessState {
    queue: VecDeque<RawEvent>,
    surfaces: Vec<(SurfaceId, WindowConfig)>,
    selections: Vec<Selection>,
    requested_version: Option<(u16, u16)>,
    flushes: usize,
    fail_next_poll: Option<String>,
}

/// Scripted backend
pub struct HeadlessBackend {
    server: HeadlessServer,
    state: Arc<Mutex<HeadlessState>>,
}

/// Shared handle for injecting events and inspecting requests
#[derive(Clone)]
pub struct HeadlessHandle {
    state: Arc<Mutex<HeadlessState>>,
}

fn lock(state: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    // A panicking test thread must not hide the state from the others
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// XI2 requests are rejected until the client has announced its version
fn require_version(state: &HeadlessState, request: &str) -> Result<(), BackendError> {
    match state.requested_version {
        Some(_) => Ok(()),
        None => Err(BackendError::Request(format!(
            "BadRequest: {request} before XIQueryVersion"
        ))),
    }
}

impl HeadlessBackend {
    pub fn new(server: HeadlessServer) -> Self {
        Self {
            server,
            state: Arc::new(Mutex::new(HeadlessState::default())),
        }
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl HeadlessHandle {
    /// Queue one event at the back
    pub fn inject(&self, event: RawEvent) {
        lock(&self.state).queue.push_back(event);
    }

    /// Queue several events in order
    pub fn inject_all(&self, events: impl IntoIterator<Item = RawEvent>) {
        lock(&self.state).queue.extend(events);
    }

    /// Number of events still queued
    pub fn pending(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Make the next `poll_event` fail as if the connection dropped
    pub fn fail_next_poll(&self, reason: impl Into<String>) {
        lock(&self.state).fail_next_poll = Some(reason.into());
    }

    pub fn surfaces(&self) -> Vec<(SurfaceId, WindowConfig)> {
        lock(&self.state).surfaces.clone()
    }

    pub fn selections(&self) -> Vec<Selection> {
        lock(&self.state).selections.clone()
    }

    pub fn requested_version(&self) -> Option<(u16, u16)> {
        lock(&self.state).requested_version
    }

    pub fn flushes(&self) -> usize {
        lock(&self.state).flushes
    }
}

impl TouchBackend for HeadlessBackend {
    fn query_extension(&mut self, name: &str) -> Result<Option<ExtensionInfo>, BackendError> {
        let present = self.server.touch_extension && name == TOUCH_EXTENSION_NAME;
        Ok(present.then_some(ExtensionInfo {
            major_opcode: HEADLESS_XI_OPCODE,
        }))
    }

    fn query_version(&mut self, major: u16, minor: u16) -> Result<(u16, u16), BackendError> {
        lock(&self.state).requested_version = Some((major, minor));
        // Servers answer with the lower of the two versions
        Ok(self.server.version.min((major, minor)))
    }

    fn create_surface(&mut self, window: &WindowConfig) -> Result<SurfaceId, BackendError> {
        let mut state = lock(&self.state);
        let id = FIRST_SURFACE_ID + state.surfaces.len() as SurfaceId;
        state.surfaces.push((id, window.clone()));
        Ok(id)
    }

    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, BackendError> {
        require_version(&lock(&self.state), "XIQueryDevice")?;
        Ok(self.server.devices.clone())
    }

    fn select_events(
        &mut self,
        surface: SurfaceId,
        device: u16,
        kinds: &[EventKind],
    ) -> Result<(), BackendError> {
        let mut state = lock(&self.state);
        require_version(&state, "XISelectEvents")?;
        if !state.surfaces.iter().any(|(id, _)| *id == surface) {
            return Err(BackendError::Request(format!("BadWindow {surface:#x}")));
        }
        state.selections.push(Selection {
            surface,
            device,
            kinds: kinds.to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        lock(&self.state).flushes += 1;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<RawEvent>, BackendError> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.fail_next_poll.take() {
            return Err(BackendError::Connection(reason));
        }
        Ok(state.queue.pop_front())
    }

    fn wait_for_event(&mut self, _timeout: Duration) -> Result<bool, BackendError> {
        // Nothing can arrive while the caller is blocked here
        Ok(!lock(&self.state).queue.is_empty())
    }
}
