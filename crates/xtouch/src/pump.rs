//! Touch event pump
//!
//! [`TouchPump::poll`] drains what the server has queued, turns touch
//! events into [`TouchSample`]s and hands each one to the registered
//! handler, in arrival order. It never blocks; hosts call it once per frame
//! (optionally after [`TouchPump::wait`]).
//!
//! A drain pass ends early on a key press in the session's surface, when
//! the handler returns [`Dispatch::Stop`], or when the configured event
//! budget runs out. Events behind the stopping point stay queued for the
//! next call.

use std::time::Duration;

use crate::backend::{EventKind, RawEvent, TouchBackend};
use crate::error::PumpError;
use crate::sample::{TouchPhase, TouchSample};
use crate::session::Session;

/// What the handler wants the pump to do after a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    #[default]
    Continue,
    /// End the current drain pass
    Stop,
}

/// Receiver for touch samples
pub trait TouchHandler {
    fn on_touch(&mut self, sample: &TouchSample) -> Dispatch;
}

impl<F> TouchHandler for F
where
    F: FnMut(&TouchSample) -> Dispatch,
{
    fn on_touch(&mut self, sample: &TouchSample) -> Dispatch {
        self(sample)
    }
}

/// Why a drain pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassEnd {
    /// The queue ran empty
    Drained,
    /// A key press arrived on the session surface
    KeyPress,
    /// The handler returned `Dispatch::Stop`
    HandlerStop,
    /// `max_events_per_poll` events were consumed
    Budget,
}

/// Result of one `poll()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Samples handed to the handler
    pub delivered: usize,
    /// Events consumed without producing a sample
    pub ignored: usize,
    pub end: PassEnd,
}

impl PollSummary {
    /// Whether a key press ended this pass
    pub fn stopped_by_key(&self) -> bool {
        self.end == PassEnd::KeyPress
    }
}

/// Map a device event to a sample; `None` for anything that is not one
pub fn sample_for(event: &RawEvent) -> Option<TouchSample> {
    let RawEvent::Device {
        kind,
        detail,
        event_x,
        event_y,
        ..
    } = event
    else {
        return None;
    };

    let phase = match kind {
        EventKind::TouchBegin => TouchPhase::Down,
        EventKind::TouchUpdate => TouchPhase::Move,
        EventKind::TouchEnd => TouchPhase::Up,
        // Pointer motion stands in for touch-down when testing without a
        // touchscreen
        EventKind::Motion => TouchPhase::Down,
    };

    Some(TouchSample::new(
        *detail,
        phase,
        *event_x as f32,
        *event_y as f32,
    ))
}

/// Drains a session's events into a handler
pub struct TouchPump<B: TouchBackend> {
    session: Session<B>,
    handler: Option<Box<dyn TouchHandler>>,
}

impl<B: TouchBackend> TouchPump<B> {
    /// Create a pump with no handler registered
    pub fn new(session: Session<B>) -> Self {
        Self {
            session,
            handler: None,
        }
    }

    pub fn with_handler(session: Session<B>, handler: impl TouchHandler + 'static) -> Self {
        let mut pump = Self::new(session);
        pump.set_handler(handler);
        pump
    }

    /// Register `handler`, returning the one it replaces
    pub fn set_handler(
        &mut self,
        handler: impl TouchHandler + 'static,
    ) -> Option<Box<dyn TouchHandler>> {
        let previous = self.handler.replace(Box::new(handler));
        tracing::debug!(replaced = previous.is_some(), "touch handler registered");
        previous
    }

    /// Remove the registered handler
    pub fn clear_handler(&mut self) -> Option<Box<dyn TouchHandler>> {
        self.handler.take()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<B> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<B> {
        self.session
    }

    /// Block up to `timeout` for an event to arrive
    pub fn wait(&mut self, timeout: Duration) -> Result<bool, PumpError> {
        Ok(self.session.backend_mut().wait_for_event(timeout)?)
    }

    /// Drain queued events into the handler.
    ///
    /// Without a registered handler this fails with
    /// [`PumpError::NoCallbackRegistered`] and leaves the queue untouched.
    pub fn poll(&mut self) -> Result<PollSummary, PumpError> {
        let handler = self
            .handler
            .as_mut()
            .ok_or(PumpError::NoCallbackRegistered)?;

        let surface = self.session.handle().surface;
        let budget = self.session.max_events_per_poll();
        let backend = self.session.backend_mut();

        let mut delivered = 0;
        let mut ignored = 0;

        let end = loop {
            if budget.is_some_and(|max| delivered + ignored >= max.get()) {
                break PassEnd::Budget;
            }
            let Some(event) = backend.poll_event()? else {
                break PassEnd::Drained;
            };

            if let Some(sample) = sample_for(&event) {
                tracing::trace!(?sample, "dispatching touch sample");
                delivered += 1;
                if handler.on_touch(&sample) == Dispatch::Stop {
                    break PassEnd::HandlerStop;
                }
                continue;
            }

            ignored += 1;
            match event {
                RawEvent::KeyPress { surface: target } if target == surface => {
                    tracing::debug!(surface, "key press ends drain pass");
                    break PassEnd::KeyPress;
                }
                RawEvent::KeyPress { surface: target } => {
                    tracing::warn!(target, surface, "ignoring key press on foreign window");
                }
                _ => {}
            }
        };

        Ok(PollSummary {
            delivered,
            ignored,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::num::NonZeroUsize;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::backend::headless::{HeadlessBackend, HeadlessHandle, HeadlessServer};
    use crate::config::Config;
    use crate::device::{DeviceClassKind, DeviceInfo};

    fn pump_with(config: Config) -> (TouchPump<HeadlessBackend>, HeadlessHandle) {
        let backend = HeadlessBackend::new(HeadlessServer {
            devices: vec![DeviceInfo::new(9, "Touchscreen", vec![DeviceClassKind::Touch])],
            ..Default::default()
        });
        let handle = backend.handle();
        let session = Session::initialize_with(backend, &config).unwrap();
        (TouchPump::new(session), handle)
    }

    fn touch(kind: EventKind, id: u32, x: f64, y: f64) -> RawEvent {
        RawEvent::Device {
            kind,
            detail: id,
            event_x: x,
            event_y: y,
            device: 9,
            surface: 0,
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<TouchSample>>>, impl TouchHandler + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |sample: &TouchSample| {
            sink.borrow_mut().push(*sample);
            Dispatch::Continue
        })
    }

    #[test]
    fn maps_phases_and_copies_fields() {
        let (mut pump, server) = pump_with(Config::default());
        let (seen, handler) = recorder();
        pump.set_handler(handler);

        server.inject_all([
            touch(EventKind::TouchBegin, 4, 10.0, 20.0),
            touch(EventKind::TouchUpdate, 4, 11.5, 21.5),
            touch(EventKind::TouchEnd, 4, 12.0, 22.0),
        ]);

        let summary = pump.poll().unwrap();
        assert_eq!(summary.delivered, 3);
        assert_eq!(summary.end, PassEnd::Drained);
        assert_eq!(
            *seen.borrow(),
            vec![
                TouchSample::new(4, TouchPhase::Down, 10.0, 20.0),
                TouchSample::new(4, TouchPhase::Move, 11.5, 21.5),
                TouchSample::new(4, TouchPhase::Up, 12.0, 22.0),
            ]
        );
    }

    #[test]
    fn motion_reports_touch_down() {
        let sample = sample_for(&touch(EventKind::Motion, 0, 1.0, 2.0)).unwrap();
        assert_eq!(sample.phase, TouchPhase::Down);
        assert_eq!(sample_for(&RawEvent::Other), None);
        assert_eq!(sample_for(&RawEvent::KeyPress { surface: 1 }), None);
    }

    #[test]
    fn no_handler_consumes_nothing() {
        let (mut pump, server) = pump_with(Config::default());
        server.inject(touch(EventKind::TouchBegin, 1, 0.0, 0.0));

        let err = pump.poll().unwrap_err();
        assert!(matches!(err, PumpError::NoCallbackRegistered));
        assert_eq!(server.pending(), 1);
    }

    #[test]
    fn handler_stop_ends_pass() {
        let (mut pump, server) = pump_with(Config::default());
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        pump.set_handler(move |_: &TouchSample| {
            *counter.borrow_mut() += 1;
            Dispatch::Stop
        });

        server.inject_all([
            touch(EventKind::TouchBegin, 1, 0.0, 0.0),
            touch(EventKind::TouchBegin, 2, 0.0, 0.0),
        ]);

        let summary = pump.poll().unwrap();
        assert_eq!(summary.end, PassEnd::HandlerStop);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(server.pending(), 1);
    }

    #[test]
    fn budget_limits_one_pass() {
        let config = Config {
            max_events_per_poll: NonZeroUsize::new(2),
            ..Config::default()
        };
        let (mut pump, server) = pump_with(config);
        let (seen, handler) = recorder();
        pump.set_handler(handler);

        server.inject_all([
            touch(EventKind::TouchBegin, 1, 0.0, 0.0),
            RawEvent::Other,
            touch(EventKind::TouchEnd, 1, 0.0, 0.0),
        ]);

        let first = pump.poll().unwrap();
        assert_eq!(first.end, PassEnd::Budget);
        assert_eq!((first.delivered, first.ignored), (1, 1));

        let second = pump.poll().unwrap();
        assert_eq!(second.end, PassEnd::Drained);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn key_press_elsewhere_is_ignored() {
        let (mut pump, server) = pump_with(Config::default());
        let (seen, handler) = recorder();
        pump.set_handler(handler);
        let foreign = pump.session().handle().surface + 1;

        server.inject_all([
            RawEvent::KeyPress { surface: foreign },
            touch(EventKind::TouchBegin, 1, 0.0, 0.0),
        ]);

        let summary = pump.poll().unwrap();
        assert_eq!(summary.end, PassEnd::Drained);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn backend_failure_propagates() {
        let (mut pump, server) = pump_with(Config::default());
        let (_seen, handler) = recorder();
        pump.set_handler(handler);
        server.fail_next_poll("connection reset");

        assert!(matches!(pump.poll(), Err(PumpError::Backend(_))));
    }

    fn any_kind() -> impl Strategy<Value = EventKind> {
        prop_oneof![
            Just(EventKind::TouchBegin),
            Just(EventKind::TouchUpdate),
            Just(EventKind::TouchEnd),
            Just(EventKind::Motion),
        ]
    }

    proptest! {
        /// Every device event maps to exactly one sample with its fields intact
        #[test]
        fn device_events_map_to_one_sample(
            kind in any_kind(),
            detail in any::<u32>(),
            x in -10_000.0f64..10_000.0,
            y in -10_000.0f64..10_000.0,
            device in any::<u16>(),
            surface in any::<u32>(),
        ) {
            let event = RawEvent::Device { kind, detail, event_x: x, event_y: y, device, surface };
            let sample = sample_for(&event).unwrap();

            let phase = match kind {
                EventKind::TouchBegin | EventKind::Motion => TouchPhase::Down,
                EventKind::TouchUpdate => TouchPhase::Move,
                EventKind::TouchEnd => TouchPhase::Up,
            };
            prop_assert_eq!(sample.phase, phase);
            prop_assert_eq!(sample.identifier, detail);
            prop_assert_eq!(sample.x, x as f32);
            prop_assert_eq!(sample.y, y as f32);
        }

        /// Key presses never produce samples, whatever window they target
        #[test]
        fn key_presses_map_to_nothing(surface in any::<u32>()) {
            prop_assert_eq!(sample_for(&RawEvent::KeyPress { surface }), None);
        }
    }
}
