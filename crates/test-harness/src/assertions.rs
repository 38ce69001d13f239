//! Test assertions for delivered samples

use xtouch::backend::{EventKind, RawEvent};
use xtouch::{TouchPhase, TouchSample};

/// Phase the pump is expected to report for an event kind
pub fn expected_phase(kind: EventKind) -> TouchPhase {
    match kind {
        EventKind::TouchBegin | EventKind::Motion => TouchPhase::Down,
        EventKind::TouchUpdate => TouchPhase::Move,
        EventKind::TouchEnd => TouchPhase::Up,
    }
}

/// Assert that `samples` are exactly the device events of `events`, in order,
/// with identifier and coordinates copied verbatim
pub fn assert_samples_match_events(samples: &[TouchSample], events: &[RawEvent]) {
    let expected: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            RawEvent::Device {
                kind,
                detail,
                event_x,
                event_y,
                ..
            } => Some(TouchSample::new(
                *detail,
                expected_phase(*kind),
                *event_x as f32,
                *event_y as f32,
            )),
            _ => None,
        })
        .collect();

    assert_eq!(
        samples.len(),
        expected.len(),
        "sample count mismatch: got {:?}, expected {:?}",
        samples,
        expected
    );
    for (i, (got, want)) in samples.iter().zip(&expected).enumerate() {
        assert_eq!(got, want, "sample {} differs", i);
    }
}

/// Assert that every contact that went down came back up, in between
/// without a second down for the same id
pub fn assert_contacts_balanced(samples: &[TouchSample]) {
    let mut active = std::collections::HashSet::new();
    for sample in samples {
        match sample.phase {
            TouchPhase::Down => assert!(
                active.insert(sample.identifier),
                "touch {} went down twice",
                sample.identifier
            ),
            TouchPhase::Move => assert!(
                active.contains(&sample.identifier),
                "touch {} moved while up",
                sample.identifier
            ),
            TouchPhase::Up => assert!(
                active.remove(&sample.identifier),
                "touch {} released while up",
                sample.identifier
            ),
        }
    }
    assert!(active.is_empty(), "touches still down: {:?}", active);
}
