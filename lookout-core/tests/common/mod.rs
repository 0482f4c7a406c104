//! In-memory collaborators for driving the controller in tests.
#![allow(dead_code)]

use async_trait::async_trait;
use lookout_core::{
    Alliance, AllianceDirectory, Collaborators, Coords, DeliveryError, DirectoryError, LocateError,
    LocationProvider, ModeKind, Notice, NotificationChannel, OnlinePlayer, OwnerId, PlayerName,
    PlayerProfile, PlayerStatusService, PointOfInterest, SessionController, Sighting, StatusError,
    TrackerSettings,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct FakePlayer {
    pub online: bool,
    /// `None` while hidden from the map
    pub coords: Option<Coords>,
    pub nation: Option<String>,
    pub town: Option<String>,
}

/// The game world, answering both location and status queries.
#[derive(Default)]
pub struct FakeWorld {
    players: Mutex<HashMap<PlayerName, FakePlayer>>,
    points: Mutex<Vec<PointOfInterest>>,
    locate_unavailable: AtomicBool,
    status_unavailable: AtomicBool,
    hold_locate: Mutex<Option<Arc<Notify>>>,
    locate_delay: Mutex<Duration>,
    pub locate_calls: AtomicUsize,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, name: &str, online: bool, coords: Option<(f64, f64)>, nation: Option<&str>) {
        self.players.lock().unwrap().insert(
            PlayerName::from(name).unwrap(),
            FakePlayer {
                online,
                coords: coords.map(|(x, z)| Coords::new(x, z)),
                nation: nation.map(String::from),
                town: None,
            },
        );
    }

    pub fn move_to(&self, name: &str, coords: Option<(f64, f64)>) {
        let mut players = self.players.lock().unwrap();
        if let Some(player) = players.get_mut(name) {
            player.coords = coords.map(|(x, z)| Coords::new(x, z));
        }
    }

    pub fn set_online(&self, name: &str, online: bool) {
        let mut players = self.players.lock().unwrap();
        if let Some(player) = players.get_mut(name) {
            player.online = online;
        }
    }

    pub fn set_points(&self, points: Vec<PointOfInterest>) {
        *self.points.lock().unwrap() = points;
    }

    pub fn set_locate_unavailable(&self, value: bool) {
        self.locate_unavailable.store(value, Ordering::SeqCst);
    }

    pub fn set_status_unavailable(&self, value: bool) {
        self.status_unavailable.store(value, Ordering::SeqCst);
    }

    /// Make every locate call wait until the returned handle is notified.
    pub fn hold_locate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold_locate.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// Make every locate call take `delay` of (virtual) time.
    pub fn set_locate_delay(&self, delay: Duration) {
        *self.locate_delay.lock().unwrap() = delay;
    }

    fn find(&self, name: &str) -> Option<(PlayerName, FakePlayer)> {
        self.players
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(n, p)| (*n, p.clone()))
    }
}

#[async_trait]
impl LocationProvider for FakeWorld {
    async fn locate(&self, player: &str) -> Result<Sighting, LocateError> {
        self.locate_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold_locate.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        let delay = *self.locate_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.locate_unavailable.load(Ordering::SeqCst) {
            return Err(LocateError::Unavailable("map offline".into()));
        }
        let (_, found) = self.find(player).ok_or(LocateError::NotFound)?;
        match (found.online, found.coords) {
            (false, _) => Ok(Sighting::Offline),
            (true, None) => Err(LocateError::Invalid),
            (true, Some(coords)) => Ok(Sighting::Visible(coords)),
        }
    }

    async fn list_online_with_coordinates(&self) -> Result<Vec<OnlinePlayer>, LocateError> {
        let players = self.players.lock().unwrap();
        Ok(players
            .iter()
            .filter(|(_, p)| p.online)
            .filter_map(|(name, p)| {
                p.coords.map(|coords| OnlinePlayer {
                    name: *name,
                    coords,
                    nation: p.nation.clone(),
                    town: p.town.clone(),
                })
            })
            .collect())
    }

    async fn points_of_interest(&self) -> Result<Vec<PointOfInterest>, LocateError> {
        Ok(self.points.lock().unwrap().clone())
    }
}

#[async_trait]
impl PlayerStatusService for FakeWorld {
    async fn profile(&self, player: &str) -> Result<PlayerProfile, StatusError> {
        if self.status_unavailable.load(Ordering::SeqCst) {
            return Err(StatusError::Unavailable("status endpoint down".into()));
        }
        let (name, found) = self.find(player).ok_or(StatusError::NotFound)?;
        Ok(PlayerProfile {
            name,
            online: found.online,
            nation: found.nation,
            town: found.town,
        })
    }
}

#[derive(Default)]
pub struct FakeAlliances {
    pub alliances: Mutex<Vec<Alliance>>,
    pub unavailable: AtomicBool,
}

impl FakeAlliances {
    pub fn with(alliances: Vec<Alliance>) -> Arc<Self> {
        Arc::new(Self {
            alliances: Mutex::new(alliances),
            unavailable: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl AllianceDirectory for FakeAlliances {
    async fn alliances_of(&self, nation: &str) -> Result<Vec<Alliance>, DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError("toolkit down".into()));
        }
        Ok(self
            .alliances
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.member_nations.iter().any(|n| n.eq_ignore_ascii_case(nation)))
            .cloned()
            .collect())
    }
}

/// Records every notice; can be told to refuse probes or deliveries.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(OwnerId, Notice)>>,
    pub probes: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub refuse_probe: AtomicBool,
    pub refuse_send: AtomicBool,
    hold_send: Mutex<Option<Arc<Notify>>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, n)| n.title.clone())
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.sent.lock().unwrap().iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Make every send wait until the returned handle is notified.
    pub fn hold_send(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold_send.lock().unwrap() = Some(notify.clone());
        notify
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn probe(&self, _owner: OwnerId, _mode: ModeKind) -> Result<(), DeliveryError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.refuse_probe.load(Ordering::SeqCst) {
            return Err(DeliveryError::Undeliverable("DMs disabled".into()));
        }
        Ok(())
    }

    async fn send(&self, owner: OwnerId, notice: Notice) -> Result<(), DeliveryError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold_send.lock().unwrap().clone();
        if let Some(notify) = hold {
            notify.notified().await;
        }
        if self.refuse_send.load(Ordering::SeqCst) {
            return Err(DeliveryError::Undeliverable("DMs disabled".into()));
        }
        self.sent.lock().unwrap().push((owner, notice));
        Ok(())
    }
}

pub struct Harness {
    pub world: Arc<FakeWorld>,
    pub alliances: Arc<FakeAlliances>,
    pub channel: Arc<RecordingChannel>,
    pub controller: SessionController,
}

pub fn harness() -> Harness {
    harness_with(FakeAlliances::with(Vec::new()))
}

pub fn harness_with(alliances: Arc<FakeAlliances>) -> Harness {
    let world = FakeWorld::new();
    let channel = RecordingChannel::new();
    let controller = SessionController::new(
        Collaborators {
            locations: world.clone(),
            status: world.clone(),
            alliances: alliances.clone(),
            notifications: channel.clone(),
        },
        TrackerSettings::default(),
    );
    Harness {
        world,
        alliances,
        channel,
        controller,
    }
}
