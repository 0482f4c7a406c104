use crate::error::{Result, TrackError};
use crate::models::{Affiliation, ModeKind, OwnerId, RoutePreference, SessionMode, SessionSummary, TrackingSession};
use crate::notify::NotificationDispatcher;
use crate::provider::{Collaborators, PlayerProfile};
use crate::scheduler::Engine;
use crate::store::SessionStore;
use crate::validation::{TrackerSettings, validate_player_name};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Parameters of `/track start` and `/track defend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRequest {
    Track {
        player: String,
        /// Seconds between polls
        interval: Option<u64>,
        route: RoutePreference,
    },
    Defend {
        player: String,
        /// Alert radius in blocks
        radius: Option<u32>,
    },
}

impl StartRequest {
    fn player(&self) -> &str {
        match self {
            StartRequest::Track { player, .. } | StartRequest::Defend { player, .. } => player,
        }
    }

    fn kind(&self) -> ModeKind {
        match self {
            StartRequest::Track { .. } => ModeKind::Track,
            StartRequest::Defend { .. } => ModeKind::Defend,
        }
    }
}

/// Public surface of the tracking engine: start, stop and status per user.
#[derive(Clone)]
pub struct SessionController {
    engine: Arc<Engine>,
}

impl SessionController {
    pub fn new(collaborators: Collaborators, settings: TrackerSettings) -> Self {
        let dispatcher = NotificationDispatcher::new(collaborators.notifications.clone());
        Self {
            engine: Arc::new(Engine {
                store: SessionStore::new(),
                collaborators,
                dispatcher,
                settings,
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Validate the request, confirm the owner can be notified and the target is
    /// online, then register the session and start polling.
    pub async fn start(&self, owner: OwnerId, request: StartRequest) -> Result<SessionSummary> {
        let engine = &self.engine;
        let requested = validate_player_name(request.player())?;
        let (interval, radius) = match &request {
            StartRequest::Track { interval, .. } => (engine.settings.track_interval(*interval)?, 0),
            StartRequest::Defend { radius, .. } => {
                (engine.settings.defend_interval, engine.settings.radius(*radius)?)
            }
        };

        if engine.tasks.is_closed() {
            return Err(TrackError::ShuttingDown);
        }
        if engine.store.contains(owner).await {
            return Err(TrackError::AlreadyActive);
        }
        engine.dispatcher.probe(owner, request.kind()).await?;

        let profile = engine
            .collaborators
            .status
            .profile(&requested)
            .await
            .map_err(|err| err.into_track_error(&requested))?;
        if !profile.online {
            return Err(TrackError::TargetOffline(profile.name.to_string()));
        }

        let mode = match request {
            StartRequest::Track { route, .. } => SessionMode::Track { route },
            StartRequest::Defend { .. } => SessionMode::Defend {
                radius,
                affiliation: self.resolve_affiliation(&profile).await,
            },
        };
        let session = TrackingSession::new(
            engine.store.allocate_id(),
            owner,
            profile.name,
            mode,
            interval,
        );
        let (id, cancel) = (session.id, session.cancellation());
        let summary = session.summary();
        // Exclusive insert: of two concurrent starts only one gets here
        engine.store.create(session).await?;
        // Shutdown may have closed the tracker while this start was in flight
        if engine.tasks.is_closed() {
            engine.store.remove_current(owner, id).await;
            return Err(TrackError::ShuttingDown);
        }
        engine.spawn_poller(owner, id, interval, cancel);

        info!(owner, player = %summary.target, mode = ?summary.mode.kind(), interval = summary.interval.as_secs(), "session started");
        Ok(summary)
    }

    /// Stop the owner's session and return its final summary.
    pub async fn stop(&self, owner: OwnerId) -> Result<SessionSummary> {
        let session = self
            .engine
            .store
            .remove(owner)
            .await
            .ok_or(TrackError::NoActiveSession)?;
        info!(owner, player = %session.target, updates = session.update_count, "session stopped");
        Ok(session.summary())
    }

    pub async fn status(&self, owner: OwnerId) -> Result<SessionSummary> {
        self.engine
            .store
            .get(owner)
            .await
            .ok_or(TrackError::NoActiveSession)
    }

    pub fn active_sessions(&self) -> usize {
        self.engine.store.len()
    }

    /// Refuse new sessions, cancel every active one and wait for their poll
    /// loops to exit.
    pub async fn shutdown(&self) {
        self.engine.tasks.close();
        let cleared = self.engine.store.clear_all().await;
        self.engine.tasks.wait().await;
        info!(cleared, "all tracking sessions cleared");
    }

    /// Best effort: a failed directory lookup only loses alliance exclusions.
    async fn resolve_affiliation(&self, profile: &PlayerProfile) -> Affiliation {
        let Some(nation) = profile.nation.clone() else {
            return Affiliation::default();
        };
        let alliances = match self.engine.collaborators.alliances.alliances_of(&nation).await {
            Ok(alliances) => alliances,
            Err(err) => {
                warn!(%nation, %err, "alliance lookup failed, excluding own nation only");
                Vec::new()
            }
        };
        let affiliation = Affiliation::resolve(Some(nation), &alliances);
        info!(
            player = %profile.name,
            nation = affiliation.nation.as_deref().unwrap_or("None"),
            allied = affiliation.allied_nations.len(),
            "resolved defense affiliation"
        );
        affiliation
    }
}
