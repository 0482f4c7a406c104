//! Collaborator interfaces the tracking engine is built against.
//!
//! The engine never talks HTTP or Discord directly; implementations are
//! injected through [`Collaborators`] and replaced by fakes in tests.

use crate::error::TrackError;
use crate::models::{Coords, ModeKind, OwnerId, PlayerName};
use crate::notify::Notice;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result of a successful location query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sighting {
    Visible(Coords),
    Offline,
}

/// An online player whose coordinates are visible on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlinePlayer {
    pub name: PlayerName,
    pub coords: Coords,
    pub nation: Option<String>,
    pub town: Option<String>,
}

/// Authoritative player record from the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    /// Canonical spelling of the name
    pub name: PlayerName,
    pub online: bool,
    pub nation: Option<String>,
    pub town: Option<String>,
}

/// A place the tracking user can teleport to, used for directional hints.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub name: String,
    pub coords: Coords,
    /// Spawn is open to non-members
    pub public: bool,
    pub neutral: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alliance {
    pub name: String,
    pub member_nations: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("player not found")]
    NotFound,
    #[error("player cannot be located")]
    Invalid,
    #[error("location service unavailable: {0}")]
    Unavailable(String),
}

impl LocateError {
    pub fn into_track_error(self, target: &str) -> TrackError {
        match self {
            LocateError::NotFound => TrackError::TargetNotFound(target.to_string()),
            LocateError::Invalid => TrackError::TargetUntrackable(target.to_string()),
            LocateError::Unavailable(reason) => TrackError::ProviderUnavailable(reason),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("player not found")]
    NotFound,
    #[error("status service unavailable: {0}")]
    Unavailable(String),
}

impl StatusError {
    pub fn into_track_error(self, target: &str) -> TrackError {
        match self {
            StatusError::NotFound => TrackError::TargetNotFound(target.to_string()),
            StatusError::Unavailable(reason) => TrackError::ProviderUnavailable(reason),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("alliance directory unavailable: {0}")]
pub struct DirectoryError(pub String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("message undeliverable: {0}")]
    Undeliverable(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current position of `player`; `Invalid` when online but hidden from the map.
    async fn locate(&self, player: &str) -> Result<Sighting, LocateError>;

    /// Every online player with visible coordinates.
    async fn list_online_with_coordinates(&self) -> Result<Vec<OnlinePlayer>, LocateError>;

    /// Known teleport destinations.
    async fn points_of_interest(&self) -> Result<Vec<PointOfInterest>, LocateError> {
        Ok(Vec::new())
    }
}

#[async_trait]
pub trait PlayerStatusService: Send + Sync {
    async fn profile(&self, player: &str) -> Result<PlayerProfile, StatusError>;

    async fn is_online(&self, player: &str) -> Result<bool, StatusError> {
        Ok(self.profile(player).await?.online)
    }
}

#[async_trait]
pub trait AllianceDirectory: Send + Sync {
    /// Alliances that count `nation` among their members.
    async fn alliances_of(&self, nation: &str) -> Result<Vec<Alliance>, DirectoryError>;
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Check that `owner` can receive messages before a session starts.
    async fn probe(&self, owner: OwnerId, mode: ModeKind) -> Result<(), DeliveryError>;

    async fn send(&self, owner: OwnerId, notice: Notice) -> Result<(), DeliveryError>;
}

/// The external services one controller runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub locations: Arc<dyn LocationProvider>,
    pub status: Arc<dyn PlayerStatusService>,
    pub alliances: Arc<dyn AllianceDirectory>,
    pub notifications: Arc<dyn NotificationChannel>,
}
