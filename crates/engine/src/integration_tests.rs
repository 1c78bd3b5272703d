//! End-to-end tests driving the whole engine through `FixedUpdate` ticks on
//! a bare app: record, decide, commit, replay.

use bevy::prelude::*;

use timeline::MoveDir;

use crate::capture::InputSample;
use crate::config::{MAX_GHOSTS_PER_ZONE, MAX_GHOSTS_TOTAL, TICK_DT};
use crate::ghost::{Ghost, GhostPose};
use crate::registry::GhostRegistry;
use crate::session::{
    CommitRefused, DecisionDialogRequest, DialogChoice, RecorderState, RecordingSession,
    SessionInbox, SessionRequest, StopReason, SubjectId, TimelineCommitted,
};
use crate::zones::{ResetZoneClock, ZoneId, Zones};
use crate::{EnginePlugin, GlobalPause, TickCounter};

fn make_app() -> App {
    let mut app = App::new();
    app.add_plugins(EnginePlugin);
    app
}

fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn ticks(app: &mut App, n: usize) {
    for _ in 0..n {
        tick(app);
    }
}

fn push(app: &mut App, request: SessionRequest) {
    app.world_mut()
        .resource_mut::<SessionInbox>()
        .push(request);
}

fn state(app: &App) -> RecorderState {
    app.world().resource::<RecordingSession>().state
}

fn start_request() -> SessionRequest {
    SessionRequest::Start {
        subject: SubjectId(1),
        zone: ZoneId::CENTER,
        origin: Vec2::ZERO,
    }
}

/// Drive the session from idle into active recording.
fn record(app: &mut App) {
    push(app, start_request());
    tick(app);
    assert_eq!(state(app), RecorderState::Countdown);
    // Countdown is 3.0 time-units at TICK_DT per tick.
    ticks(app, (3.0 / TICK_DT) as usize + 5);
    assert_eq!(state(app), RecorderState::Recording);
}

#[test]
fn test_stop_while_idle_is_dropped_without_transition() {
    let mut app = make_app();
    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Idle);
    assert!(app.world().resource::<SessionInbox>().is_empty());
}

#[test]
fn test_record_stop_commit_spawns_ghost() {
    let mut app = make_app();
    record(&mut app);

    app.world_mut().resource_mut::<InputSample>().direction = MoveDir::North;
    ticks(&mut app, 20);
    let captured = app
        .world()
        .resource::<RecordingSession>()
        .draft
        .as_ref()
        .map(timeline::DraftTimeline::len);
    assert!(captured.unwrap_or(0) >= 1, "held direction must be captured");

    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::DialogPaused);
    assert!(
        !app.world()
            .resource::<Events<DecisionDialogRequest>>()
            .is_empty(),
        "stop must raise a decision dialog"
    );

    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Commit),
    );
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Idle);
    assert_eq!(app.world().resource::<GhostRegistry>().population(), 1);
    assert!(!app.world().resource::<Events<TimelineCommitted>>().is_empty());

    let ghost_count = {
        let mut query = app.world_mut().query::<&Ghost>();
        query.iter(app.world()).count()
    };
    assert_eq!(ghost_count, 1);
}

#[test]
fn test_dialog_cancel_resumes_recording() {
    let mut app = make_app();
    record(&mut app);
    push(&mut app, SessionRequest::Stop(StopReason::SubjectSwitch));
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::DialogPaused);

    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Cancel),
    );
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Recording);
    assert!(
        app.world().resource::<RecordingSession>().draft.is_some(),
        "cancel must keep the draft"
    );
}

#[test]
fn test_dialog_retry_restarts_countdown() {
    let mut app = make_app();
    record(&mut app);
    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    push(&mut app, SessionRequest::DialogClosed(DialogChoice::Retry));
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Countdown);
    assert!(app.world().resource::<RecordingSession>().draft.is_none());
}

#[test]
fn test_dialog_discard_returns_to_idle() {
    let mut app = make_app();
    record(&mut app);
    push(&mut app, SessionRequest::Stop(StopReason::ZoneTransition));
    tick(&mut app);
    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Discard),
    );
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Idle);
    assert_eq!(app.world().resource::<GhostRegistry>().population(), 0);
}

#[test]
fn test_time_limit_raises_dialog_by_itself() {
    let mut app = make_app();
    record(&mut app);
    // Recording window is 30 time-units; run well past it.
    ticks(&mut app, (35.0 / TICK_DT) as usize);
    assert_eq!(state(&app), RecorderState::DialogPaused);
}

#[test]
fn test_population_ceiling_refuses_321st_ghost() {
    let mut app = make_app();

    // Fill the registry to the global ceiling with externally owned ghosts.
    {
        let mut filled = 0;
        'fill: for zone in ZoneId::all() {
            for _ in 0..MAX_GHOSTS_PER_ZONE {
                if filled == MAX_GHOSTS_TOTAL {
                    break 'fill;
                }
                let entity = app.world_mut().spawn_empty().id();
                app.world_mut()
                    .resource_mut::<GhostRegistry>()
                    .insert(entity, zone);
                filled += 1;
            }
        }
    }
    assert_eq!(
        app.world().resource::<GhostRegistry>().population(),
        MAX_GHOSTS_TOTAL
    );

    record(&mut app);
    app.world_mut().resource_mut::<InputSample>().direction = MoveDir::East;
    ticks(&mut app, 10);
    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Commit),
    );
    tick(&mut app);

    assert!(
        !app.world().resource::<Events<CommitRefused>>().is_empty(),
        "321st admission must be reported as refused"
    );
    assert_eq!(
        app.world().resource::<GhostRegistry>().population(),
        MAX_GHOSTS_TOTAL,
        "nothing may be admitted or evicted"
    );
    assert_eq!(state(&app), RecorderState::Idle);
}

#[test]
fn test_committed_ghost_replays_movement() {
    let mut app = make_app();
    record(&mut app);
    app.world_mut().resource_mut::<InputSample>().direction = MoveDir::North;
    ticks(&mut app, 20);
    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Commit),
    );
    tick(&mut app);

    // The focused zone updates every tick, so the ghost's pose follows the
    // zone clock from here on.
    tick(&mut app);
    let pose = {
        let mut query = app.world_mut().query::<&GhostPose>();
        *query.single(app.world())
    };
    assert!(
        pose.pos.y > 0.0,
        "replay must retrace the recorded northward walk, got {:?}",
        pose.pos
    );
}

#[test]
fn test_commit_mid_hold_parks_ghost_at_stop_position() {
    let mut app = make_app();
    record(&mut app);
    // North is still held when the recording is stopped and committed.
    app.world_mut().resource_mut::<InputSample>().direction = MoveDir::North;
    ticks(&mut app, 20);
    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Commit),
    );
    tick(&mut app);

    ticks(&mut app, 5);
    let early = {
        let mut query = app.world_mut().query::<&GhostPose>();
        *query.single(app.world())
    };
    ticks(&mut app, 30);
    let later = {
        let mut query = app.world_mut().query::<&GhostPose>();
        *query.single(app.world())
    };
    assert!(early.pos.y > 0.0, "the recorded walk must still replay");
    assert_eq!(
        early.pos, later.pos,
        "ghost must park where the subject stood when recording stopped"
    );
    assert_eq!(later.dir, MoveDir::None);
}

#[test]
fn test_time_limit_window_excludes_dialog_time() {
    let mut app = make_app();
    record(&mut app);
    // 10 time-units of recording, then a dialog left open for most of a
    // cycle before the stop is cancelled.
    ticks(&mut app, 100);
    push(&mut app, SessionRequest::Stop(StopReason::UserInput));
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::DialogPaused);
    ticks(&mut app, 1150);
    push(
        &mut app,
        SessionRequest::DialogClosed(DialogChoice::Cancel),
    );
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Recording);

    // Roughly 20 time-units of the 30-unit window remain, regardless of how
    // long the dialog sat open.
    ticks(&mut app, 180);
    assert_eq!(
        state(&app),
        RecorderState::Recording,
        "window must not shrink while a dialog is open"
    );
    ticks(&mut app, 30);
    assert_eq!(
        state(&app),
        RecorderState::DialogPaused,
        "window must not grow while a dialog is open"
    );
}

#[test]
fn test_global_pause_freezes_clocks_and_ticks() {
    let mut app = make_app();
    ticks(&mut app, 5);
    app.world_mut().resource_mut::<GlobalPause>().paused = true;

    let clock_before = app.world().resource::<Zones>().now(ZoneId::CENTER);
    let tick_before = app.world().resource::<TickCounter>().0;
    ticks(&mut app, 10);

    assert_eq!(
        app.world().resource::<Zones>().now(ZoneId::CENTER),
        clock_before,
        "paused clocks must not advance"
    );
    assert_eq!(
        app.world().resource::<TickCounter>().0,
        tick_before,
        "paused ticks must not advance LOD timers"
    );

    app.world_mut().resource_mut::<GlobalPause>().paused = false;
    tick(&mut app);
    assert!(app.world().resource::<Zones>().now(ZoneId::CENTER) > clock_before);
}

#[test]
fn test_zone_clock_reset_goes_to_zero() {
    let mut app = make_app();
    ticks(&mut app, 50);
    let zone = ZoneId::new(0).unwrap();
    assert!(app.world().resource::<Zones>().now(zone).value() > 1.0);

    app.world_mut().send_event(ResetZoneClock(zone));
    tick(&mut app);
    let now = app.world().resource::<Zones>().now(zone).value();
    assert!(
        now <= TICK_DT + f32::EPSILON,
        "reset clock should be at most one tick past zero, got {now}"
    );
}

#[test]
fn test_countdown_does_not_advance_while_paused() {
    let mut app = make_app();
    push(&mut app, start_request());
    tick(&mut app);
    assert_eq!(state(&app), RecorderState::Countdown);

    app.world_mut().resource_mut::<GlobalPause>().paused = true;
    ticks(&mut app, 100);
    assert_eq!(
        state(&app),
        RecorderState::Countdown,
        "paused countdown must never complete"
    );

    app.world_mut().resource_mut::<GlobalPause>().paused = false;
    ticks(&mut app, (3.0 / TICK_DT) as usize + 5);
    assert_eq!(state(&app), RecorderState::Recording);
}
