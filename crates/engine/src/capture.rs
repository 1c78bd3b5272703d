//! Intent capture: raw per-tick input into timestamped timeline events.
//!
//! Only the *cause* is recorded — the direction held, the ability edge — and
//! never the resulting pose. That keeps a replay immune to changes in the
//! movement implementation, shrinks storage by an order of magnitude over
//! per-frame transforms, and makes externally imposed motion (knockback)
//! invisible to the recording by construction: capture never looks at the
//! subject's transform at all.

use bevy::prelude::*;
use timeline::{AbilityId, CastTarget, EventKind, MoveDir, TimelineEvent, Timestamp};

use crate::config::CAPTURE_DWELL;
use crate::session::{RecorderState, RecordingSession};
use crate::zones::Zones;
use crate::{GlobalPause, SimulationSet};

/// Per-tick intent supplied by the external input source. The engine does
/// not define how these are read from hardware; presentation writes this
/// resource every tick and clears the edges it set.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct InputSample {
    /// Direction held this tick, quantized 8-way.
    pub direction: MoveDir,
    /// Set on the tick an ability input is edge-pressed, with the target
    /// resolved at the moment of the cast.
    pub cast: Option<(AbilityId, Option<CastTarget>)>,
    /// Set on the tick the subject dies.
    pub died: bool,
}

/// Pure movement coalescer. A `Movement` event is emitted only when the
/// held direction differs from the last recorded one and at least
/// [`CAPTURE_DWELL`] has elapsed since the last movement record; a change
/// suppressed by the dwell window is picked up on a later tick if it is
/// still in effect. Ability and death edges always pass through.
#[derive(Debug, Clone, Default)]
pub struct IntentSampler {
    last_dir: MoveDir,
    last_move_at: Option<Timestamp>,
}

impl IntentSampler {
    /// Produce the events this tick's input adds at zone-clock instant
    /// `now`, appending them to `out`.
    pub fn sample(&mut self, now: Timestamp, input: &InputSample, out: &mut Vec<TimelineEvent>) {
        let changed = input.direction != self.last_dir;
        let dwell_ok = match self.last_move_at {
            None => true,
            Some(prev) => prev.duration_to(now) >= CAPTURE_DWELL,
        };
        if changed && dwell_ok {
            out.push(TimelineEvent::new(now, EventKind::Movement(input.direction)));
            self.last_dir = input.direction;
            self.last_move_at = Some(now);
        }

        if let Some((ability, target)) = input.cast {
            out.push(TimelineEvent::new(
                now,
                EventKind::AbilityCast { ability, target },
            ));
        }
        if input.died {
            out.push(TimelineEvent::new(now, EventKind::Death));
        }
    }

    pub fn reset(&mut self) {
        *self = IntentSampler::default();
    }
}

/// Coalescing state of the capture pipeline, reset whenever a new recording
/// epoch begins.
#[derive(Resource, Default)]
pub struct CaptureState {
    pub sampler: IntentSampler,
    epoch: u64,
}

/// Appends this tick's intent to the session draft. The draft has exactly
/// one mutator: this system.
pub fn capture_intent(
    pause: Res<GlobalPause>,
    zones: Res<Zones>,
    input: Res<InputSample>,
    mut session: ResMut<RecordingSession>,
    mut state: ResMut<CaptureState>,
    mut scratch: Local<Vec<TimelineEvent>>,
) {
    if pause.paused || session.state != RecorderState::Recording {
        return;
    }
    if state.epoch != session.epoch {
        state.sampler.reset();
        state.epoch = session.epoch;
    }
    let Some(zone) = session.zone else {
        return;
    };
    let now = zones.now(zone);

    scratch.clear();
    state.sampler.sample(now, &input, &mut scratch);

    let Some(draft) = session.draft.as_mut() else {
        return;
    };
    for event in scratch.drain(..) {
        draft.add_event(event);
    }
}

pub struct CapturePlugin;

impl Plugin for CapturePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InputSample>()
            .init_resource::<CaptureState>()
            .add_systems(
                FixedUpdate,
                capture_intent.in_set(SimulationSet::Simulate),
            );
    }
}
