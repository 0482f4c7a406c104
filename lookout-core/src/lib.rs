//! Player location tracking and defense monitoring.
//!
//! A [`SessionController`] runs at most one session per requesting user. Each
//! session polls a [`LocationProvider`] at its own interval, follows the
//! target through the [`LocationState`] machine (track mode) or watches for
//! nearby hostile players (defend mode), and reports changes through a
//! [`NotificationChannel`].

mod controller;
mod error;
pub mod geo;
mod models;
pub mod notify;
pub mod provider;
mod scheduler;
pub mod state_machine;
mod store;
pub mod threat;
mod validation;

pub use controller::{SessionController, StartRequest};
pub use error::{ParameterError, Result, TrackError};
pub use models::{
    Affiliation, Coords, LocationState, ModeKind, OwnerId, PlayerName, RoutePreference, SessionId,
    SessionMode, SessionSummary, StatePath, Threat, TrackingSession, unix_now,
};
pub use notify::{Notice, NoticeField, NotificationDispatcher, NotificationEvent};
pub use provider::{
    Alliance, AllianceDirectory, Collaborators, DeliveryError, DirectoryError, LocateError,
    LocationProvider, NotificationChannel, OnlinePlayer, PlayerProfile, PlayerStatusService,
    PointOfInterest, Sighting, StatusError,
};
pub use store::SessionStore;
pub use validation::{TrackerSettings, validate_player_name};
