//! The recording state machine.
//!
//! States: `Idle -> Countdown -> Recording -> Idle`, plus an orthogonal
//! `DialogPaused` state entered from anywhere a blocking confirmation opens
//! and left back into whatever it interrupted.
//!
//! Nothing transitions the session directly. Detectors (countdown expiry,
//! time limit) and external collaborators (key presses, zone transitions,
//! the confirmation UI) only push a [`SessionRequest`] into the bounded
//! [`SessionInbox`]; the one orchestrator system drains it once per tick,
//! validates each request against the current state, performs at most one
//! transition per request, and logs `(from, to, reason)`. Invalid requests
//! are dropped with a warning — a stalled recorder is worse than a rejected
//! edge case.

use std::sync::Arc;

use bevy::prelude::*;
use timeline::{
    compress, DraftTimeline, EventKind, MoveDir, PublishedTimeline, TimelineEvent, Timestamp,
};

use crate::config::{
    COMPACT_THRESHOLD, COUNTDOWN_DURATION, RECORD_TIME_LIMIT, SESSION_INBOX_CAP, TICK_DT,
};
use crate::ghost::spawn_ghost;
use crate::registry::{AdmissionError, GhostRegistry};
use crate::zones::{ZoneId, Zones};
use crate::{GlobalPause, SimulationSet};

/// Externally assigned id of the recording subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    /// Armed; capture begins when the countdown expires.
    Countdown,
    /// Actively capturing intent into the draft.
    Recording,
    /// A blocking confirmation is open; the interrupted state is parked in
    /// `RecordingSession::resume`.
    DialogPaused,
}

/// Why a recording is being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    UserInput,
    TimeLimit,
    /// The subject left its zone mid-recording.
    ZoneTransition,
    /// Control switched to a different subject mid-recording.
    SubjectSwitch,
}

impl StopReason {
    fn label(self) -> &'static str {
        match self {
            StopReason::UserInput => "user-stop",
            StopReason::TimeLimit => "time-limit-complete",
            StopReason::ZoneTransition => "zone-transition-blocked",
            StopReason::SubjectSwitch => "subject-switch-blocked",
        }
    }
}

/// The confirmation UI's answer to a decision dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    /// Publish the draft and spawn a ghost.
    Commit,
    /// Throw the draft away.
    Discard,
    /// Throw the draft away and re-arm the countdown.
    Retry,
    /// Dismiss the dialog and resume whatever it interrupted.
    Cancel,
}

/// A requested state change. Producers enqueue; only the orchestrator acts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionRequest {
    /// Arm a recording for `subject`, currently in `zone` at `origin`.
    Start {
        subject: SubjectId,
        zone: ZoneId,
        origin: Vec2,
    },
    /// The countdown detector saw the timer expire.
    CountdownComplete,
    Stop(StopReason),
    /// Some blocking dialog opened over the game (not ours).
    DialogOpened,
    /// The confirmation UI answered.
    DialogClosed(DialogChoice),
}

/// Bounded inbox of pending session requests, drained exactly once per tick
/// by the orchestrator. Many producers, one consumer: this is what prevents
/// the input/time-limit/interruption detectors from racing each other over
/// the session state within a tick.
#[derive(Resource, Default)]
pub struct SessionInbox {
    pending: Vec<SessionRequest>,
}

impl SessionInbox {
    /// Enqueue a request. Never blocks; overflow beyond the cap is dropped
    /// with a warning.
    pub fn push(&mut self, request: SessionRequest) {
        if self.pending.len() >= SESSION_INBOX_CAP {
            warn!("session inbox full, dropping {:?}", request);
            return;
        }
        self.pending.push(request);
    }

    fn drain(&mut self) -> Vec<SessionRequest> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// The single authoritative record of the recording session.
///
/// `state` is written only by the orchestrator; the draft is appended to
/// only by the capture pipeline; `countdown_remaining` is decremented only
/// by the countdown detector. No other module touches this resource.
#[derive(Resource, Debug, Default)]
pub struct RecordingSession {
    pub state: RecorderState,
    /// State a dialog interrupted, restored on `Cancel`/close.
    resume: Option<RecorderState>,
    pub subject: Option<SubjectId>,
    pub zone: Option<ZoneId>,
    pub origin: Vec2,
    pub countdown_remaining: f32,
    /// Zone clock value when capture began.
    pub started_at: Timestamp,
    /// Zone clock value when recording was interrupted; stamps the terminating
    /// movement sample on commit. Cleared when recording resumes.
    stopped_at: Option<Timestamp>,
    /// Time spent in `Recording`, accumulated tick by tick. Deliberately not
    /// derived from the zone clock: the clock keeps running while a dialog is
    /// open, and a dialog can outlast a whole cycle.
    recorded_elapsed: f32,
    pub draft: Option<DraftTimeline>,
    /// Bumped every time capture begins, so the capture pipeline knows to
    /// reset its coalescing state.
    pub epoch: u64,
}

/// Raised when a stop needs a blocking confirmation; consumed by the
/// external UI layer, which answers via `SessionRequest::DialogClosed`.
#[derive(Event, Debug, Clone, Copy)]
pub struct DecisionDialogRequest {
    pub reason: StopReason,
}

/// A commit published a timeline and spawned a ghost.
#[derive(Event, Debug, Clone, Copy)]
pub struct TimelineCommitted {
    pub ghost: Entity,
    pub zone: ZoneId,
    pub events: usize,
}

/// A commit was refused by the population ceiling. Reported, not fatal; the
/// draft is discarded and nothing is evicted.
#[derive(Event, Debug, Clone, Copy)]
pub struct CommitRefused {
    pub error: AdmissionError,
}

// ---------------------------------------------------------------------------
// Detectors — enqueue only, never transition
// ---------------------------------------------------------------------------

/// Ticks the arm countdown down and requests the transition to `Recording`
/// when it crosses zero.
pub fn detect_countdown(
    pause: Res<GlobalPause>,
    mut session: ResMut<RecordingSession>,
    mut inbox: ResMut<SessionInbox>,
) {
    if pause.paused || session.state != RecorderState::Countdown {
        return;
    }
    let before = session.countdown_remaining;
    session.countdown_remaining = before - TICK_DT;
    if before > 0.0 && session.countdown_remaining <= 0.0 {
        inbox.push(SessionRequest::CountdownComplete);
    }
}

/// Requests a stop when the recording window is used up. Elapsed time is
/// accumulated while actually recording, so time spent under an open dialog
/// never counts against (or wraps back into) the window.
pub fn detect_time_limit(
    pause: Res<GlobalPause>,
    mut session: ResMut<RecordingSession>,
    mut inbox: ResMut<SessionInbox>,
) {
    if pause.paused || session.state != RecorderState::Recording {
        return;
    }
    session.recorded_elapsed += TICK_DT;
    if session.recorded_elapsed >= RECORD_TIME_LIMIT {
        inbox.push(SessionRequest::Stop(StopReason::TimeLimit));
    }
}

// ---------------------------------------------------------------------------
// Orchestrator — the only writer of session state
// ---------------------------------------------------------------------------

/// Drains the inbox and applies each request in order, one transition at a
/// time. Runs in the `Orchestrate` phase so a transition requested this tick
/// is fully applied before capture and playback read the state.
#[allow(clippy::too_many_arguments)]
pub fn drive_session(
    mut inbox: ResMut<SessionInbox>,
    mut session: ResMut<RecordingSession>,
    mut registry: ResMut<GhostRegistry>,
    zones: Res<Zones>,
    mut commands: Commands,
    mut dialogs: EventWriter<DecisionDialogRequest>,
    mut committed: EventWriter<TimelineCommitted>,
    mut refused: EventWriter<CommitRefused>,
) {
    for request in inbox.drain() {
        let from = session.state;
        match (from, request) {
            (RecorderState::Idle, SessionRequest::Start { subject, zone, origin }) => {
                session.subject = Some(subject);
                session.zone = Some(zone);
                session.origin = origin;
                session.countdown_remaining = COUNTDOWN_DURATION;
                transition(&mut session, RecorderState::Countdown, "user-start");
            }
            (RecorderState::Countdown, SessionRequest::CountdownComplete) => {
                let Some(zone) = session.zone else {
                    warn!("session: countdown finished with no zone, resetting");
                    reset_to_idle(&mut session, "countdown-complete");
                    continue;
                };
                session.draft = Some(DraftTimeline::new());
                session.started_at = zones.now(zone);
                session.stopped_at = None;
                session.recorded_elapsed = 0.0;
                session.epoch = session.epoch.wrapping_add(1);
                transition(&mut session, RecorderState::Recording, "countdown-complete");
            }
            (RecorderState::Countdown, SessionRequest::Stop(reason)) => {
                // Nothing captured yet; no decision to make.
                reset_to_idle(&mut session, reason.label());
            }
            (RecorderState::Recording, SessionRequest::Stop(reason)) => {
                session.resume = Some(RecorderState::Recording);
                session.stopped_at = session.zone.map(|zone| zones.now(zone));
                transition(&mut session, RecorderState::DialogPaused, reason.label());
                dialogs.send(DecisionDialogRequest { reason });
            }
            (RecorderState::DialogPaused, SessionRequest::DialogClosed(choice)) => {
                apply_dialog_choice(
                    choice,
                    &mut session,
                    &mut registry,
                    &mut commands,
                    &mut committed,
                    &mut refused,
                );
            }
            (state, SessionRequest::DialogOpened) if state != RecorderState::DialogPaused => {
                if state == RecorderState::Recording {
                    session.stopped_at = session.zone.map(|zone| zones.now(zone));
                }
                session.resume = Some(state);
                transition(&mut session, RecorderState::DialogPaused, "dialog-opened");
            }
            (_, request) => {
                warn!(
                    "session: dropping invalid request {:?} in state {:?}",
                    request, from
                );
            }
        }
    }
}

fn apply_dialog_choice(
    choice: DialogChoice,
    session: &mut RecordingSession,
    registry: &mut GhostRegistry,
    commands: &mut Commands,
    committed: &mut EventWriter<TimelineCommitted>,
    refused: &mut EventWriter<CommitRefused>,
) {
    match choice {
        DialogChoice::Cancel => {
            let back = session.resume.take().unwrap_or(RecorderState::Idle);
            session.stopped_at = None;
            transition(session, back, "dialog-closed");
        }
        DialogChoice::Discard => {
            reset_to_idle(session, "dialog-closed");
        }
        DialogChoice::Retry => {
            session.draft = None;
            session.resume = None;
            session.stopped_at = None;
            session.countdown_remaining = COUNTDOWN_DURATION;
            transition(session, RecorderState::Countdown, "dialog-closed");
        }
        DialogChoice::Commit => {
            let Some(mut draft) = session.draft.take() else {
                warn!("session: commit with no draft, discarding");
                reset_to_idle(session, "dialog-closed");
                return;
            };
            let Some(zone) = session.zone else {
                warn!("session: commit with no zone, discarding draft");
                reset_to_idle(session, "dialog-closed");
                return;
            };

            // Terminate whatever direction was still held at the stop
            // instant, so replay parks where the subject stood instead of
            // extrapolating the last movement across the rest of the cycle.
            if let Some(stop) = session.stopped_at.take() {
                draft.add_event(TimelineEvent::new(stop, EventKind::Movement(MoveDir::None)));
            }

            match registry.try_admit(zone) {
                Ok(()) => {
                    let mut published = PublishedTimeline::from_draft(draft);
                    if published.len() > COMPACT_THRESHOLD {
                        published = compress(&published).decompress();
                    }
                    let published = Arc::new(published);
                    let events = published.len();
                    let ghost = spawn_ghost(
                        commands,
                        published,
                        zone,
                        session.origin,
                        session.started_at,
                    );
                    registry.insert(ghost, zone);
                    info!(
                        "session: committed {} events as ghost {:?} in zone {:?}",
                        events, ghost, zone
                    );
                    committed.send(TimelineCommitted {
                        ghost,
                        zone,
                        events,
                    });
                }
                Err(error) => {
                    warn!("session: commit refused, {}", error);
                    refused.send(CommitRefused { error });
                }
            }
            reset_to_idle(session, "dialog-closed");
        }
    }
}

fn transition(session: &mut RecordingSession, to: RecorderState, reason: &str) {
    info!("session: {:?} -> {:?} ({})", session.state, to, reason);
    session.state = to;
}

fn reset_to_idle(session: &mut RecordingSession, reason: &str) {
    session.draft = None;
    session.resume = None;
    session.subject = None;
    session.zone = None;
    session.stopped_at = None;
    session.recorded_elapsed = 0.0;
    session.countdown_remaining = 0.0;
    transition(session, RecorderState::Idle, reason);
}

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SessionInbox>()
            .init_resource::<RecordingSession>()
            .add_event::<DecisionDialogRequest>()
            .add_event::<TimelineCommitted>()
            .add_event::<CommitRefused>()
            .add_systems(
                FixedUpdate,
                (detect_countdown, detect_time_limit)
                    .after(crate::zones::advance_zone_clocks)
                    .in_set(SimulationSet::Detect),
            )
            .add_systems(
                FixedUpdate,
                drive_session.in_set(SimulationSet::Orchestrate),
            );
    }
}
