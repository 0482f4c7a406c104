use arrayvec::{ArrayString, ArrayVec};
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Minecraft player name - max 16 characters, stored inline (no heap allocation).
pub type PlayerName = ArrayString<16>;

/// Discord user id of whoever requested the session.
pub type OwnerId = u64;

/// Distinguishes successive sessions of the same owner.
pub type SessionId = u64;

/// A position on the horizontal plane (EarthMC: -z is north, +x is east).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
  pub x: f64,
  pub z: f64,
}

impl Coords {
  pub fn new(x: f64, z: f64) -> Self {
    Self { x, z }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutePreference {
  #[default]
  Fastest,
  Safest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
  Track,
  Defend,
}

/// The subject's political grouping, used to exclude friendly players.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affiliation {
  pub nation: Option<String>,
  /// Lowercased names of every nation sharing an alliance with `nation`.
  pub allied_nations: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
  Track { route: RoutePreference },
  Defend { radius: u32, affiliation: Affiliation },
}

impl SessionMode {
  pub fn kind(&self) -> ModeKind {
    match self {
      SessionMode::Track { .. } => ModeKind::Track,
      SessionMode::Defend { .. } => ModeKind::Defend,
    }
  }
}

/// Where the target currently stands from the tracker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
  /// No successful query yet.
  Unknown,
  Trackable,
  /// Online, but the map does not expose coordinates.
  Underground,
  /// Passed through for a single tick when an underground target is located again.
  Surfaced,
  /// Terminal.
  Offline,
}

/// States visited by one transition; `Surfaced` is always followed by `Trackable`.
pub type StatePath = ArrayVec<LocationState, 2>;

/// A nearby player who is not part of the subject's nation or alliances.
#[derive(Debug, Clone, PartialEq)]
pub struct Threat {
  pub name: PlayerName,
  /// Rounded horizontal distance in blocks.
  pub distance: u32,
  pub nation: Option<String>,
  pub town: Option<String>,
  pub coords: Coords,
}

/// A live tracking or defense-monitoring session, owned by the `SessionStore`.
#[derive(Debug, Clone)]
pub struct TrackingSession {
  pub id: SessionId,
  pub owner: OwnerId,
  pub target: PlayerName,
  pub mode: SessionMode,
  pub interval: Duration,
  pub state: LocationState,
  /// Last coordinates the target was seen at.
  pub last_coords: Option<Coords>,
  pub last_known_threats: HashSet<PlayerName>,
  pub started_at: Instant,
  /// Unix timestamp of session start
  pub started_at_unix: i64,
  /// Unix timestamp of the last tick that produced a notification
  pub last_update_at: Option<i64>,
  pub update_count: u32,
  cancel: CancellationToken,
}

impl TrackingSession {
  pub fn new(
    id: SessionId,
    owner: OwnerId,
    target: PlayerName,
    mode: SessionMode,
    interval: Duration,
  ) -> Self {
    Self {
      id,
      owner,
      target,
      mode,
      interval,
      state: LocationState::Unknown,
      last_coords: None,
      last_known_threats: HashSet::new(),
      started_at: Instant::now(),
      started_at_unix: unix_now(),
      last_update_at: None,
      update_count: 0,
      cancel: CancellationToken::new(),
    }
  }

  /// Set once by `stop` or a terminal transition; never reset.
  pub fn is_stopped(&self) -> bool {
    self.cancel.is_cancelled()
  }

  pub(crate) fn stop(&self) {
    self.cancel.cancel();
  }

  pub(crate) fn cancellation(&self) -> CancellationToken {
    self.cancel.clone()
  }

  pub fn summary(&self) -> SessionSummary {
    SessionSummary {
      target: self.target,
      mode: self.mode.clone(),
      interval: self.interval,
      state: self.state,
      started_at_unix: self.started_at_unix,
      elapsed: self.started_at.elapsed(),
      last_update_at: self.last_update_at,
      update_count: self.update_count,
      threat_count: self.last_known_threats.len(),
    }
  }
}

/// Read-only view of a session, returned by start, stop and status.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
  pub target: PlayerName,
  pub mode: SessionMode,
  pub interval: Duration,
  pub state: LocationState,
  pub started_at_unix: i64,
  pub elapsed: Duration,
  pub last_update_at: Option<i64>,
  pub update_count: u32,
  pub threat_count: usize,
}

pub fn unix_now() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs() as i64)
    .unwrap_or_default()
}
