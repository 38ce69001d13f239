//! Test fixtures for common test scenarios

use xtouch::backend::headless::HeadlessServer;
use xtouch::backend::{EventKind, RawEvent};
use xtouch::{DeviceClassKind, DeviceInfo};

/// Id of the touchscreen in [`touch_server`]
pub const TOUCHSCREEN_ID: u16 = 11;

/// Id of the core pointer in [`touch_server`]
pub const POINTER_ID: u16 = 2;

/// A typical laptop: core devices first, then a touchscreen
pub fn typical_devices() -> Vec<DeviceInfo> {
    use DeviceClassKind::*;
    vec![
        DeviceInfo::new(POINTER_ID, "Virtual core pointer", vec![Button, Valuator]),
        DeviceInfo::new(3, "Virtual core keyboard", vec![Key]),
        DeviceInfo::new(TOUCHSCREEN_ID, "ELAN Touchscreen", vec![Button, Valuator, Touch]),
        DeviceInfo::new(12, "AT Translated Set 2 keyboard", vec![Key]),
    ]
}

/// Server with XInput 2.3 and [`typical_devices`]
pub fn touch_server() -> HeadlessServer {
    HeadlessServer {
        devices: typical_devices(),
        ..Default::default()
    }
}

/// Server without the touch extension
pub fn server_without_extension() -> HeadlessServer {
    HeadlessServer {
        touch_extension: false,
        ..touch_server()
    }
}

/// Touch begin on the touchscreen
pub fn touch_begin(id: u32, x: f64, y: f64) -> RawEvent {
    device_event(EventKind::TouchBegin, id, x, y)
}

/// Touch update on the touchscreen
pub fn touch_update(id: u32, x: f64, y: f64) -> RawEvent {
    device_event(EventKind::TouchUpdate, id, x, y)
}

/// Touch end on the touchscreen
pub fn touch_end(id: u32, x: f64, y: f64) -> RawEvent {
    device_event(EventKind::TouchEnd, id, x, y)
}

pub fn device_event(kind: EventKind, id: u32, x: f64, y: f64) -> RawEvent {
    RawEvent::Device {
        kind,
        detail: id,
        event_x: x,
        event_y: y,
        device: TOUCHSCREEN_ID,
        surface: 0,
    }
}

/// A full begin/update.../end stroke for one contact
pub fn stroke(id: u32, points: &[(f64, f64)]) -> Vec<RawEvent> {
    let Some((first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let mut events = vec![touch_begin(id, first.0, first.1)];
    match rest.split_last() {
        Some((last, middle)) => {
            events.extend(middle.iter().map(|p| touch_update(id, p.0, p.1)));
            events.push(touch_end(id, last.0, last.1));
        }
        None => events.push(touch_end(id, first.0, first.1)),
    }
    events
}
