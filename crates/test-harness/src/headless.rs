//! Headless bridge wrapper for testing

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use xtouch::backend::headless::{HeadlessBackend, HeadlessHandle, HeadlessServer};
use xtouch::backend::RawEvent;
use xtouch::{
    Config, DeviceHandle, Dispatch, InitError, PollSummary, PumpError, Session, TouchPump,
    TouchSample,
};

#[derive(Error, Debug)]
pub enum TestError {
    #[error("initialization failed: {0}")]
    Init(#[from] InitError),

    #[error("poll failed: {0}")]
    Pump(#[from] PumpError),
}

/// Samples seen by one handler, shared with the test body
#[derive(Debug, Clone, Default)]
pub struct Recording {
    samples: Rc<RefCell<Vec<TouchSample>>>,
    stop_after: Option<usize>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recording whose handler asks the pump to stop after `count` samples
    pub fn stopping_after(count: usize) -> Self {
        Self {
            stop_after: Some(count),
            ..Self::default()
        }
    }

    /// Handler closure that appends to this recording
    pub fn handler(&self) -> impl FnMut(&TouchSample) -> Dispatch + 'static {
        let samples = Rc::clone(&self.samples);
        let stop_after = self.stop_after;
        move |sample: &TouchSample| {
            let mut samples = samples.borrow_mut();
            samples.push(*sample);
            match stop_after {
                Some(limit) if samples.len() >= limit => Dispatch::Stop,
                _ => Dispatch::Continue,
            }
        }
    }

    pub fn samples(&self) -> Vec<TouchSample> {
        self.samples.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Touch bridge running on the headless backend
pub struct TestBridge {
    pump: TouchPump<HeadlessBackend>,
    server: HeadlessHandle,
    recording: Recording,
}

impl TestBridge {
    /// Initialize against `server` with the default config and a recording handler
    pub fn new(server: HeadlessServer) -> Result<Self, TestError> {
        Self::with_config(server, &Config::default())
    }

    pub fn with_config(server: HeadlessServer, config: &Config) -> Result<Self, TestError> {
        let mut bridge = Self::without_handler(server, config)?;
        let recording = bridge.recording.clone();
        bridge.pump.set_handler(recording.handler());
        Ok(bridge)
    }

    /// Initialize but leave the handler slot empty
    pub fn without_handler(server: HeadlessServer, config: &Config) -> Result<Self, TestError> {
        let backend = HeadlessBackend::new(server);
        let handle = backend.handle();
        let session = Session::initialize_with(backend, config)?;
        tracing::debug!(device = session.handle().device_id(), "test bridge ready");

        Ok(Self {
            pump: TouchPump::new(session),
            server: handle,
            recording: Recording::new(),
        })
    }

    pub fn device(&self) -> &DeviceHandle {
        self.pump.session().handle()
    }

    /// Id of the session's surface, for building key presses
    pub fn surface(&self) -> u32 {
        self.device().surface
    }

    pub fn server(&self) -> &HeadlessHandle {
        &self.server
    }

    /// Samples seen by the harness's own recording handler
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn samples(&self) -> Vec<TouchSample> {
        self.recording.samples()
    }

    pub fn inject(&self, event: RawEvent) {
        self.server.inject(event);
    }

    pub fn inject_all(&self, events: impl IntoIterator<Item = RawEvent>) {
        self.server.inject_all(events);
    }

    pub fn pending(&self) -> usize {
        self.server.pending()
    }

    pub fn poll(&mut self) -> Result<PollSummary, PumpError> {
        self.pump.poll()
    }

    /// Swap in a new recording handler; the harness keeps tracking the old one
    pub fn replace_handler(&mut self, recording: &Recording) {
        self.pump.set_handler(recording.handler());
    }

    pub fn clear_handler(&mut self) {
        self.pump.clear_handler();
    }

    pub fn pump(&mut self) -> &mut TouchPump<HeadlessBackend> {
        &mut self.pump
    }
}
