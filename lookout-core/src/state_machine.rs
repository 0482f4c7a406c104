//! Per-session location state, derived from provider responses.

use crate::error::TrackError;
use crate::models::{Coords, LocationState, StatePath};
use crate::provider::{LocationProvider, PlayerStatusService, Sighting, StatusError};
use tracing::debug;

/// What one tick learned about the target.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Located(Coords),
    /// The provider rejected the target as unlocatable.
    Untrackable,
    /// Locating failed, then the status endpoint confirmed the player is online.
    ConfirmedOnline,
    ConfirmedOffline,
    /// Locating failed and the status endpoint could not be reached.
    Unverifiable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    PlayerOffline,
    StatusUnverifiable,
}

/// Something worth telling the owner about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateSignal {
    Located(Coords),
    Surfaced(Coords),
    WentUnderground,
    Offline(OfflineReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// States entered, in order. Empty when the state did not change.
    pub path: StatePath,
    pub signal: Option<StateSignal>,
}

impl Transition {
    /// State the session rests in after the transition.
    pub fn resting_state(&self, current: LocationState) -> LocationState {
        self.path.last().copied().unwrap_or(current)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.signal, Some(StateSignal::Offline(_)))
    }

    fn to(states: &[LocationState], signal: Option<StateSignal>) -> Self {
        Self {
            path: states.iter().copied().collect(),
            signal,
        }
    }
}

/// Query the provider, falling back to the status endpoint when the query
/// fails for any reason other than an unlocatable target.
pub async fn observe(
    locations: &dyn LocationProvider,
    status: &dyn PlayerStatusService,
    target: &str,
) -> Observation {
    match locations.locate(target).await.map_err(|e| e.into_track_error(target)) {
        Ok(Sighting::Visible(coords)) => Observation::Located(coords),
        Ok(Sighting::Offline) => Observation::ConfirmedOffline,
        Err(TrackError::TargetUntrackable(_)) => Observation::Untrackable,
        Err(err) => {
            debug!(player = target, %err, "locate failed, confirming online status");
            confirm_status(status, target).await
        }
    }
}

async fn confirm_status(status: &dyn PlayerStatusService, target: &str) -> Observation {
    match status.is_online(target).await {
        Ok(true) => Observation::ConfirmedOnline,
        Ok(false) | Err(StatusError::NotFound) => Observation::ConfirmedOffline,
        Err(StatusError::Unavailable(reason)) => Observation::Unverifiable(reason),
    }
}

/// Next state and signal for an observation made while in `current`.
pub fn transition(current: LocationState, observation: &Observation) -> Transition {
    use LocationState::*;

    match (current, observation) {
        (Underground, Observation::Located(coords)) => Transition::to(
            &[Surfaced, Trackable],
            Some(StateSignal::Surfaced(*coords)),
        ),
        (_, Observation::Located(coords)) => {
            Transition::to(&[Trackable], Some(StateSignal::Located(*coords)))
        }
        (Underground, Observation::Untrackable | Observation::ConfirmedOnline) => {
            Transition::to(&[], None)
        }
        (_, Observation::Untrackable | Observation::ConfirmedOnline) => {
            Transition::to(&[Underground], Some(StateSignal::WentUnderground))
        }
        (_, Observation::ConfirmedOffline) => Transition::to(
            &[Offline],
            Some(StateSignal::Offline(OfflineReason::PlayerOffline)),
        ),
        (_, Observation::Unverifiable(_)) => Transition::to(
            &[Offline],
            Some(StateSignal::Offline(OfflineReason::StatusUnverifiable)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationState::*;

    fn here() -> Coords {
        Coords::new(12.0, -40.0)
    }

    #[test]
    fn test_first_location_becomes_trackable() {
        let t = transition(Unknown, &Observation::Located(here()));
        assert_eq!(t.path.as_slice(), &[Trackable]);
        assert_eq!(t.signal, Some(StateSignal::Located(here())));
        assert_eq!(t.resting_state(Unknown), Trackable);
        assert!(!t.is_terminal());
    }

    #[test]
    fn test_surfacing_passes_through_surfaced_once() {
        let t = transition(Underground, &Observation::Located(here()));
        assert_eq!(t.path.as_slice(), &[Surfaced, Trackable]);
        assert_eq!(t.signal, Some(StateSignal::Surfaced(here())));
        assert_eq!(t.resting_state(Underground), Trackable);

        // The following tick is an ordinary update
        let next = transition(Trackable, &Observation::Located(here()));
        assert_eq!(next.signal, Some(StateSignal::Located(here())));
    }

    #[test]
    fn test_going_underground_notifies_once() {
        for current in [Unknown, Trackable] {
            let t = transition(current, &Observation::Untrackable);
            assert_eq!(t.signal, Some(StateSignal::WentUnderground));
            assert_eq!(t.resting_state(current), Underground);
        }
        let t = transition(Trackable, &Observation::ConfirmedOnline);
        assert_eq!(t.resting_state(Trackable), Underground);

        let still = transition(Underground, &Observation::Untrackable);
        assert!(still.path.is_empty());
        assert_eq!(still.signal, None);
        assert_eq!(still.resting_state(Underground), Underground);
    }

    #[test]
    fn test_offline_is_terminal_from_any_state() {
        for current in [Unknown, Trackable, Underground] {
            let t = transition(current, &Observation::ConfirmedOffline);
            assert!(t.is_terminal());
            assert_eq!(t.resting_state(current), Offline);
            assert_eq!(
                t.signal,
                Some(StateSignal::Offline(OfflineReason::PlayerOffline))
            );
        }
    }

    #[test]
    fn test_unverifiable_status_stops_tracking() {
        let t = transition(Trackable, &Observation::Unverifiable("timeout".into()));
        assert!(t.is_terminal());
        assert_eq!(
            t.signal,
            Some(StateSignal::Offline(OfflineReason::StatusUnverifiable))
        );
    }
}
