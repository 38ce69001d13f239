//! X11 backend: XInput2 touch events over `x11rb`
//!
//! Event decoding is split out into [`convert_event`] so the pump never sees
//! protocol structs. Events are read with `poll_for_event`, which never
//! blocks; [`X11Backend::wait_for_event`] blocks on the connection socket with
//! a timeout instead.

use std::time::Duration;

use rustix::event::{poll, PollFd, PollFlags};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xinput::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    AtomEnum, ConnectionExt as _, CreateWindowAux, EventMask, PropMode, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::COPY_DEPTH_FROM_PARENT;

use super::{EventKind, ExtensionInfo, RawEvent, SurfaceId, TouchBackend, TOUCH_EXTENSION_NAME};
use crate::config::WindowConfig;
use crate::device::{DeviceClassKind, DeviceInfo, ALL_DEVICES};
use crate::error::{BackendError, InitError};

impl From<ConnectionError> for BackendError {
    fn from(e: ConnectionError) -> Self {
        BackendError::Connection(e.to_string())
    }
}

impl From<ReplyError> for BackendError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::ConnectionError(e) => e.into(),
            ReplyError::X11Error(e) => BackendError::Request(format!("{:?}", e.error_kind)),
        }
    }
}

impl From<ReplyOrIdError> for BackendError {
    fn from(e: ReplyOrIdError) -> Self {
        match e {
            ReplyOrIdError::ConnectionError(e) => e.into(),
            ReplyOrIdError::X11Error(e) => BackendError::Request(format!("{:?}", e.error_kind)),
            ReplyOrIdError::IdsExhausted => BackendError::Request("X11 ids exhausted".into()),
        }
    }
}

/// XInput2 backend on an `x11rb` connection
pub struct X11Backend {
    connection: RustConnection,
    screen_num: usize,
    /// Window created by `create_surface`, destroyed on drop
    window: Option<Window>,
    /// Event read by `wait_for_event` but not yet handed out
    peeked: Option<Event>,
}

impl X11Backend {
    /// Connect to `display`, or to `$DISPLAY` when `None`
    pub fn connect(display: Option<&str>) -> Result<Self, InitError> {
        let (connection, screen_num) =
            x11rb::connect(display).map_err(|e| InitError::NoDisplay {
                display: display.map(str::to_string),
                reason: e.to_string(),
            })?;
        let display_name = display;
        tracing::info!(display_name = ?display_name, screen_num, "connected to X server");

        Ok(Self {
            connection,
            screen_num,
            window: None,
            peeked: None,
        })
    }

    pub fn screen_num(&self) -> usize {
        self.screen_num
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        if let Some(window) = self.window.take() {
            if let Err(e) = self.connection.destroy_window(window) {
                tracing::debug!(?e, "failed to destroy touch window");
                return;
            }
            if let Err(e) = self.connection.flush() {
                tracing::debug!(?e, "failed to flush after destroying touch window");
            }
        }
    }
}

impl TouchBackend for X11Backend {
    fn query_extension(&mut self, name: &str) -> Result<Option<ExtensionInfo>, BackendError> {
        // Going through the extension cache lets the connection parse XI2
        // generic events into typed events later on
        if name == TOUCH_EXTENSION_NAME {
            let info = self.connection.extension_information(xinput::X11_EXTENSION_NAME)?;
            return Ok(info.map(|info| ExtensionInfo {
                major_opcode: info.major_opcode,
            }));
        }

        let reply = self.connection.query_extension(name.as_bytes())?.reply()?;
        Ok(reply.present.then_some(ExtensionInfo {
            major_opcode: reply.major_opcode,
        }))
    }

    fn query_version(&mut self, major: u16, minor: u16) -> Result<(u16, u16), BackendError> {
        match self.connection.xinput_xi_query_version(major, minor)?.reply() {
            Ok(reply) => Ok((reply.major_version, reply.minor_version)),
            Err(ReplyError::X11Error(e)) => {
                // Pre-XI2 servers reject XIQueryVersion; ask the XI1 way so
                // the caller can report what the server does speak
                tracing::debug!(error = ?e.error_kind, "XIQueryVersion rejected");
                let reply = self
                    .connection
                    .xinput_get_extension_version(TOUCH_EXTENSION_NAME.as_bytes())?
                    .reply()?;
                Ok((reply.server_major, reply.server_minor))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create_surface(&mut self, window: &WindowConfig) -> Result<SurfaceId, BackendError> {
        let screen = &self.connection.setup().roots[self.screen_num];
        let (root, visual) = (screen.root, screen.root_visual);
        let id = self.connection.generate_id()?;

        let aux = CreateWindowAux::new()
            .background_pixel(0)
            .event_mask(EventMask::KEY_PRESS);
        self.connection.create_window(
            COPY_DEPTH_FROM_PARENT,
            id,
            root,
            window.x,
            window.y,
            window.width,
            window.height,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &aux,
        )?;
        self.window = Some(id);

        self.connection.change_property8(
            PropMode::REPLACE,
            id,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            window.title.as_bytes(),
        )?;
        self.connection.map_window(id)?;

        // Round-trip so the window is realized before devices are queried
        self.connection.get_input_focus()?.reply()?;

        tracing::debug!(window = id, width = window.width, height = window.height, "created touch window");
        Ok(id)
    }

    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, BackendError> {
        let reply = self.connection.xinput_xi_query_device(ALL_DEVICES)?.reply()?;

        Ok(reply
            .infos
            .iter()
            .map(|info| {
                let classes = info
                    .classes
                    .iter()
                    .map(|class| class_kind(&class.data))
                    .collect();
                DeviceInfo::new(
                    info.deviceid,
                    String::from_utf8_lossy(&info.name).into_owned(),
                    classes,
                )
            })
            .collect())
    }

    fn select_events(
        &mut self,
        surface: SurfaceId,
        device: u16,
        kinds: &[EventKind],
    ) -> Result<(), BackendError> {
        let mask = kinds
            .iter()
            .map(|kind| event_mask(*kind))
            .fold(xinput::XIEventMask::from(0u32), |acc, bit| acc | bit);

        self.connection
            .xinput_xi_select_events(
                surface,
                &[xinput::EventMask {
                    deviceid: device,
                    mask: vec![mask],
                }],
            )?
            .check()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.connection.flush()?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<RawEvent>, BackendError> {
        let event = match self.peeked.take() {
            Some(event) => Some(event),
            None => self.connection.poll_for_event()?,
        };
        Ok(event.map(convert_event))
    }

    fn wait_for_event(&mut self, timeout: Duration) -> Result<bool, BackendError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        // Already-buffered events never wake the socket
        if let Some(event) = self.connection.poll_for_event()? {
            self.peeked = Some(event);
            return Ok(true);
        }

        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let mut fds = [PollFd::new(self.connection.stream(), PollFlags::IN)];
        let ready = poll(&mut fds, timeout_ms).map_err(std::io::Error::from)?;
        if ready == 0 {
            return Ok(false);
        }

        self.peeked = self.connection.poll_for_event()?;
        Ok(self.peeked.is_some())
    }
}

fn class_kind(data: &xinput::DeviceClassData) -> DeviceClassKind {
    match data {
        xinput::DeviceClassData::Key(_) => DeviceClassKind::Key,
        xinput::DeviceClassData::Button(_) => DeviceClassKind::Button,
        xinput::DeviceClassData::Valuator(_) => DeviceClassKind::Valuator,
        xinput::DeviceClassData::Scroll(_) => DeviceClassKind::Scroll,
        xinput::DeviceClassData::Touch(_) => DeviceClassKind::Touch,
        xinput::DeviceClassData::Gesture(_) => DeviceClassKind::Gesture,
        xinput::DeviceClassData::InvalidValue(_) => DeviceClassKind::Other,
    }
}

fn event_mask(kind: EventKind) -> xinput::XIEventMask {
    match kind {
        EventKind::TouchBegin => xinput::XIEventMask::TOUCH_BEGIN,
        EventKind::TouchUpdate => xinput::XIEventMask::TOUCH_UPDATE,
        EventKind::TouchEnd => xinput::XIEventMask::TOUCH_END,
        EventKind::Motion => xinput::XIEventMask::MOTION,
    }
}

/// Convert a 16.16 fixed-point protocol value
pub fn fp1616_to_f64(value: xinput::Fp1616) -> f64 {
    f64::from(value) / 65536.0
}

/// Convert an X11 event into the backend-neutral form
pub fn convert_event(event: Event) -> RawEvent {
    match event {
        Event::XinputTouchBegin(e) => device_event(
            EventKind::TouchBegin,
            e.detail,
            e.deviceid,
            e.event,
            e.event_x,
            e.event_y,
        ),
        Event::XinputTouchUpdate(e) => device_event(
            EventKind::TouchUpdate,
            e.detail,
            e.deviceid,
            e.event,
            e.event_x,
            e.event_y,
        ),
        Event::XinputTouchEnd(e) => device_event(
            EventKind::TouchEnd,
            e.detail,
            e.deviceid,
            e.event,
            e.event_x,
            e.event_y,
        ),
        Event::XinputMotion(e) => device_event(
            EventKind::Motion,
            e.detail,
            e.deviceid,
            e.event,
            e.event_x,
            e.event_y,
        ),
        Event::KeyPress(e) => RawEvent::KeyPress { surface: e.event },
        _ => RawEvent::Other,
    }
}

fn device_event(
    kind: EventKind,
    detail: u32,
    device: u16,
    surface: Window,
    event_x: xinput::Fp1616,
    event_y: xinput::Fp1616,
) -> RawEvent {
    RawEvent::Device {
        kind,
        detail,
        event_x: fp1616_to_f64(event_x),
        event_y: fp1616_to_f64(event_y),
        device,
        surface,
    }
}
