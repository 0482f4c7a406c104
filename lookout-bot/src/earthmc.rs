//! EarthMC Aurora API client: live map positions, player records and nation spawns.

use crate::config::Config;
use crate::error::ApiError;
use async_trait::async_trait;
use lookout_core::{
    Coords, LocateError, LocationProvider, OnlinePlayer, PlayerName, PlayerProfile,
    PlayerStatusService, PointOfInterest, Sighting, StatusError,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Largest query the API accepts in one POST.
const QUERY_CHUNK: usize = 100;

#[derive(Serialize)]
struct Query<'a> {
    query: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    #[serde(default)]
    pub is_online: bool,
}

/// One entry of `POST /players`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    #[serde(default)]
    pub town: Option<NamedRef>,
    #[serde(default)]
    pub nation: Option<NamedRef>,
    #[serde(default)]
    pub status: PlayerStatus,
}

impl PlayerRecord {
    fn town_name(&self) -> Option<String> {
        self.town.as_ref().and_then(|t| t.name.clone())
    }

    fn nation_name(&self) -> Option<String> {
        self.nation.as_ref().and_then(|n| n.name.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MapPlayers {
    #[serde(default)]
    players: Vec<MapPlayer>,
}

/// A player drawn on the live map. Players below ground are not listed.
#[derive(Debug, Clone, Deserialize)]
pub struct MapPlayer {
    pub name: String,
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Deserialize)]
struct NationRef {
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct NationRecord {
    name: String,
    coordinates: NationCoordinates,
    #[serde(default)]
    status: NationStatus,
}

#[derive(Debug, Deserialize)]
struct NationCoordinates {
    spawn: Spawn,
}

#[derive(Debug, Deserialize)]
struct Spawn {
    x: f64,
    z: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NationStatus {
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    is_neutral: bool,
}

/// Spaces consecutive requests at least `min_interval` apart. A zero interval disables it.
fn request_limiter(min_interval: Duration) -> Option<DefaultDirectRateLimiter> {
    Quota::with_period(min_interval).map(RateLimiter::direct)
}

pub struct EarthMcClient {
    http: Client,
    api_url: String,
    map_url: String,
    limiter: Option<DefaultDirectRateLimiter>,
    poi_ttl: Duration,
    poi_cache: Mutex<Option<(Instant, Vec<PointOfInterest>)>>,
}

impl EarthMcClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("lookout-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_url: config.earthmc_api_url.trim_end_matches('/').to_string(),
            map_url: config.earthmc_map_url.trim_end_matches('/').to_string(),
            limiter: request_limiter(config.api_min_interval),
            poi_ttl: config.poi_cache_ttl,
            poi_cache: Mutex::new(None),
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        self.throttle().await;
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    async fn query_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[String],
    ) -> Result<T, ApiError> {
        self.throttle().await;
        let response = self.http.post(&url).json(&Query { query }).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    /// Player records for the given names or uuids; unknown entries are omitted.
    pub async fn players(&self, names: &[String]) -> Result<Vec<PlayerRecord>, ApiError> {
        let mut records = Vec::with_capacity(names.len());
        for chunk in names.chunks(QUERY_CHUNK) {
            let batch: Vec<PlayerRecord> = self
                .query_json(format!("{}/players", self.api_url), chunk)
                .await?;
            records.extend(batch);
        }
        Ok(records)
    }

    async fn player(&self, name: &str) -> Result<Option<PlayerRecord>, ApiError> {
        let records = self.players(&[name.to_string()]).await?;
        Ok(records
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name)))
    }

    pub async fn map_players(&self) -> Result<Vec<MapPlayer>, ApiError> {
        let map: MapPlayers = self
            .get_json(format!("{}/tiles/players.json", self.map_url))
            .await?;
        Ok(map.players)
    }

    /// Nation spawns, cached for the configured lifetime.
    pub async fn nation_spawns(&self) -> Result<Vec<PointOfInterest>, ApiError> {
        let mut cache = self.poi_cache.lock().await;
        if let Some((fetched_at, points)) = cache.as_ref() {
            if fetched_at.elapsed() < self.poi_ttl {
                return Ok(points.clone());
            }
        }

        let nations: Vec<NationRef> = self.get_json(format!("{}/nations", self.api_url)).await?;
        let uuids: Vec<String> = nations.into_iter().map(|n| n.uuid).collect();
        let mut points = Vec::with_capacity(uuids.len());
        for chunk in uuids.chunks(QUERY_CHUNK) {
            let records: Vec<NationRecord> = self
                .query_json(format!("{}/nations", self.api_url), chunk)
                .await?;
            points.extend(records.into_iter().map(|n| PointOfInterest {
                name: n.name,
                coords: Coords::new(n.coordinates.spawn.x, n.coordinates.spawn.z),
                public: n.status.is_public,
                neutral: n.status.is_neutral,
            }));
        }
        debug!(count = points.len(), "refreshed nation spawns");
        *cache = Some((Instant::now(), points.clone()));
        Ok(points)
    }
}

impl From<ApiError> for LocateError {
    fn from(err: ApiError) -> Self {
        LocateError::Unavailable(err.to_string())
    }
}

impl From<ApiError> for StatusError {
    fn from(err: ApiError) -> Self {
        StatusError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl LocationProvider for EarthMcClient {
    async fn locate(&self, player: &str) -> Result<Sighting, LocateError> {
        let map = self.map_players().await?;
        if let Some(found) = map.iter().find(|p| p.name.eq_ignore_ascii_case(player)) {
            return Ok(Sighting::Visible(Coords::new(found.x, found.z)));
        }
        // Off the map: either offline or hidden underground
        match self.player(player).await? {
            None => Err(LocateError::NotFound),
            Some(record) if record.status.is_online => Err(LocateError::Invalid),
            Some(_) => Ok(Sighting::Offline),
        }
    }

    async fn list_online_with_coordinates(&self) -> Result<Vec<OnlinePlayer>, LocateError> {
        let map = self.map_players().await?;
        let names: Vec<String> = map.iter().map(|p| p.name.clone()).collect();
        let affiliations: HashMap<String, PlayerRecord> = self
            .players(&names)
            .await?
            .into_iter()
            .map(|r| (r.name.to_lowercase(), r))
            .collect();

        Ok(map
            .into_iter()
            .filter_map(|p| {
                let name = PlayerName::from(&p.name).ok()?;
                let record = affiliations.get(&p.name.to_lowercase());
                Some(OnlinePlayer {
                    name,
                    coords: Coords::new(p.x, p.z),
                    nation: record.and_then(PlayerRecord::nation_name),
                    town: record.and_then(PlayerRecord::town_name),
                })
            })
            .collect())
    }

    async fn points_of_interest(&self) -> Result<Vec<PointOfInterest>, LocateError> {
        Ok(self.nation_spawns().await?)
    }
}

#[async_trait]
impl PlayerStatusService for EarthMcClient {
    async fn profile(&self, player: &str) -> Result<PlayerProfile, StatusError> {
        let record = self.player(player).await?.ok_or(StatusError::NotFound)?;
        let name = PlayerName::from(&record.name).map_err(|_| StatusError::NotFound)?;
        Ok(PlayerProfile {
            name,
            online: record.status.is_online,
            nation: record.nation_name(),
            town: record.town_name(),
        })
    }
}
