//! One sequential poll loop per session.
//!
//! A loop owns its session's tick cadence: ticks are due on a fixed period
//! and each one runs to completion (provider queries, state update and
//! notification attempts) before the next is awaited. Every suspension point
//! races the session's cancellation token, so a stopped session never mutates
//! or notifies.

use crate::models::{
    Coords, LocationState, ModeKind, OwnerId, PlayerName, SessionId, SessionMode, TrackingSession,
    unix_now,
};
use crate::notify::{NotificationDispatcher, NotificationEvent};
use crate::provider::Collaborators;
use crate::state_machine::{StateSignal, observe, transition};
use crate::store::SessionStore;
use crate::threat::{detect_threats, diff_threats};
use crate::validation::TrackerSettings;
use crate::geo::directional_hint;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Shared by the controller and every poll loop.
pub(crate) struct Engine {
    pub(crate) store: SessionStore,
    pub(crate) collaborators: Collaborators,
    pub(crate) dispatcher: NotificationDispatcher,
    pub(crate) settings: TrackerSettings,
    pub(crate) tasks: TaskTracker,
}

/// Outcome of one tick's provider work, before it is committed.
#[derive(Debug, Default)]
struct TickReport {
    state: Option<LocationState>,
    last_coords: Option<Coords>,
    threats: Option<HashSet<PlayerName>>,
    events: Vec<NotificationEvent>,
    terminal: Option<NotificationEvent>,
}

enum Flow {
    Continue,
    Finished,
}

impl Engine {
    pub(crate) fn spawn_poller(
        self: &Arc<Self>,
        owner: OwnerId,
        id: SessionId,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let engine = self.clone();
        self.tasks.spawn(async move {
            engine.poll(owner, id, interval, cancel).await;
        });
    }

    async fn poll(&self, owner: OwnerId, id: SessionId, interval: Duration, cancel: CancellationToken) {
        // Due every `interval`; an overrunning tick pushes the next one back
        let mut ticker = interval_at(Instant::now() + self.settings.first_tick_delay, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Flow::Finished = self.tick(owner, id, &cancel).await {
                break;
            }
        }
        debug!(owner, session = id, "poll loop exited");
    }

    async fn tick(&self, owner: OwnerId, id: SessionId, cancel: &CancellationToken) -> Flow {
        let Some(session) = self.store.snapshot(owner, id).await else {
            return Flow::Finished;
        };
        if session.is_stopped() {
            return Flow::Finished;
        }

        let work = async {
            match &session.mode {
                SessionMode::Track { .. } => self.track_tick(&session).await,
                SessionMode::Defend { .. } => self.defend_tick(&session).await,
            }
        };
        let Some(report) = until_cancelled(cancel, work).await else {
            return Flow::Finished;
        };

        if let Some(event) = report.terminal {
            self.finish(&session, event).await;
            return Flow::Finished;
        }

        let committed = self
            .store
            .update_live(owner, id, |s| {
                if let Some(state) = report.state {
                    s.state = state;
                }
                if report.last_coords.is_some() {
                    s.last_coords = report.last_coords;
                }
                if let Some(threats) = report.threats {
                    s.last_known_threats = threats;
                }
            })
            .await;
        if committed.is_none() {
            return Flow::Finished;
        }

        let mode = session.mode.kind();
        let mut delivered = false;
        for event in &report.events {
            let send = self.dispatcher.dispatch(owner, &session.target, mode, event);
            match until_cancelled(cancel, send).await {
                Some(sent) => delivered |= sent,
                None => return Flow::Finished,
            }
        }

        if delivered {
            let now = unix_now();
            let counted = self
                .store
                .update_live(owner, id, |s| {
                    s.update_count += 1;
                    s.last_update_at = Some(now);
                })
                .await;
            if counted.is_none() {
                return Flow::Finished;
            }
        }
        Flow::Continue
    }

    async fn track_tick(&self, session: &TrackingSession) -> TickReport {
        let SessionMode::Track { route } = session.mode else {
            return TickReport::default();
        };
        let locations = self.collaborators.locations.as_ref();
        let observation = observe(locations, self.collaborators.status.as_ref(), &session.target).await;
        let transition = transition(session.state, &observation);
        let state = transition.resting_state(session.state);
        if state != session.state {
            info!(owner = session.owner, player = %session.target, ?state, "tracking state changed");
        }

        let mut report = TickReport {
            state: Some(state),
            ..TickReport::default()
        };
        match transition.signal {
            Some(StateSignal::Located(coords)) => {
                let points = locations.points_of_interest().await.unwrap_or_else(|err| {
                    warn!(%err, "points of interest unavailable, sending update without directions");
                    Vec::new()
                });
                report.last_coords = Some(coords);
                report.events.push(NotificationEvent::LocationUpdate {
                    coords,
                    hint: directional_hint(coords, &points, route),
                });
            }
            signal => self.apply_reachability(session, signal, &mut report),
        }
        report
    }

    async fn defend_tick(&self, session: &TrackingSession) -> TickReport {
        let SessionMode::Defend { radius, affiliation } = &session.mode else {
            return TickReport::default();
        };
        let locations = self.collaborators.locations.as_ref();
        let observation = observe(locations, self.collaborators.status.as_ref(), &session.target).await;
        let transition = transition(session.state, &observation);
        let state = transition.resting_state(session.state);

        let mut report = TickReport {
            state: Some(state),
            ..TickReport::default()
        };
        let origin = match transition.signal {
            Some(StateSignal::Located(coords)) => coords,
            Some(StateSignal::Surfaced(coords)) => {
                report.events.push(NotificationEvent::Surfaced { coords });
                coords
            }
            signal => {
                self.apply_reachability(session, signal, &mut report);
                return report;
            }
        };
        report.last_coords = Some(origin);

        let candidates = match locations.list_online_with_coordinates().await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(owner = session.owner, %err, "online player list unavailable, skipping threat check");
                return report;
            }
        };
        let threats = detect_threats(&session.target, origin, *radius, affiliation, &candidates);
        debug!(
            owner = session.owner,
            player = %session.target,
            candidates = candidates.len(),
            threats = threats.len(),
            "threat check complete"
        );

        let diff = diff_threats(&session.last_known_threats, &threats);
        if !diff.entered.is_empty() {
            info!(owner = session.owner, player = %session.target, entered = diff.entered.len(), "new threats detected");
            report.events.push(NotificationEvent::NewThreats {
                threats: diff.entered,
                total_nearby: threats.len(),
                radius: *radius,
            });
        }
        if !diff.left.is_empty() {
            info!(owner = session.owner, player = %session.target, left = diff.left.len(), "threats left");
            report.events.push(NotificationEvent::ThreatsLeft {
                left: diff.left,
                remaining: threats.len(),
            });
        }
        report.threats = Some(diff.current);
        report
    }

    /// Underground, surfaced and offline handling shared by both modes.
    fn apply_reachability(&self, session: &TrackingSession, signal: Option<StateSignal>, report: &mut TickReport) {
        match signal {
            Some(StateSignal::Surfaced(coords)) => {
                report.last_coords = Some(coords);
                report.events.push(NotificationEvent::Surfaced { coords });
            }
            Some(StateSignal::WentUnderground) => {
                report.events.push(NotificationEvent::Underground {
                    last_known: session.last_coords,
                });
            }
            Some(StateSignal::Offline(reason)) => {
                report.terminal = Some(NotificationEvent::Offline { reason });
            }
            Some(StateSignal::Located(_)) | None => {}
        }
    }

    /// Remove the session, then send its final notice. Only the party that wins
    /// the removal notifies, so a concurrent `stop` suppresses the notice.
    async fn finish(&self, session: &TrackingSession, event: NotificationEvent) {
        let Some(removed) = self.store.remove_current(session.owner, session.id).await else {
            return;
        };
        info!(
            owner = removed.owner,
            player = %removed.target,
            updates = removed.update_count,
            "session ended by terminal transition"
        );
        let mode: ModeKind = removed.mode.kind();
        self.dispatcher
            .dispatch(removed.owner, &removed.target, mode, &event)
            .await;
    }
}

/// Run `fut` unless `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}
