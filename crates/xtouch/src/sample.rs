//! Touch records handed to the host

use serde::Serialize;

/// Phase of a single touch contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Contact started
    Down,
    /// Contact moved
    Move,
    /// Contact released
    Up,
}

impl TouchPhase {
    /// Integer code used by hosts that expect the flat C-style record
    /// (down = 0, move = 1, up = 2)
    pub fn code(self) -> i32 {
        match self {
            TouchPhase::Down => 0,
            TouchPhase::Move => 1,
            TouchPhase::Up => 2,
        }
    }
}

/// One touch sample, built fresh for every dispatched event.
///
/// `identifier` is stable for a physical contact until its `Up` sample has
/// been delivered; the server is free to reuse it afterwards. Coordinates are
/// surface-local and passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TouchSample {
    pub identifier: u32,
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
}

impl TouchSample {
    pub fn new(identifier: u32, phase: TouchPhase, x: f32, y: f32) -> Self {
        Self { identifier, phase, x, y }
    }
}
