use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord API Token
    /// Env: DISCORD_TOKEN (required at startup)
    pub discord_token: Option<String>,

    /// EarthMC REST API base
    /// Env: EARTHMC_API_URL (default: "https://api.earthmc.net/v3/aurora")
    pub earthmc_api_url: String,

    /// EarthMC live map base, serves visible player positions
    /// Env: EARTHMC_MAP_URL (default: "https://map.earthmc.net")
    pub earthmc_map_url: String,

    /// Alliance listing endpoint
    /// Env: ALLIANCE_API_URL (default: "https://emctoolkit.vercel.app/api/aurora/alliances")
    pub alliance_api_url: String,

    /// Timeout for outbound HTTP requests
    /// Env: HTTP_TIMEOUT_SECS (default: 15)
    pub http_timeout: Duration,

    /// Minimum spacing between EarthMC requests
    /// Env: API_MIN_INTERVAL_MS (default: 1000)
    pub api_min_interval: Duration,

    /// How long the nation spawn list is reused
    /// Env: POI_CACHE_SECS (default: 600)
    pub poi_cache_ttl: Duration,

    /// Delay before a new session's first poll
    /// Env: FIRST_TICK_DELAY_SECS (default: 2)
    pub first_tick_delay: Duration,

    /// Discord user ids allowed to use /track, empty allows everyone
    /// Env: TRACK_ALLOWED_USERS (comma separated)
    pub allowed_users: Vec<u64>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();
        Self {
            discord_token: var("DISCORD_TOKEN").ok(),
            earthmc_api_url: env_or_default_string("EARTHMC_API_URL", &defaults.earthmc_api_url),
            earthmc_map_url: env_or_default_string("EARTHMC_MAP_URL", &defaults.earthmc_map_url),
            alliance_api_url: env_or_default_string("ALLIANCE_API_URL", &defaults.alliance_api_url),
            http_timeout: Duration::from_secs(env_or_default("HTTP_TIMEOUT_SECS", 15)),
            api_min_interval: Duration::from_millis(env_or_default("API_MIN_INTERVAL_MS", 1000)),
            poi_cache_ttl: Duration::from_secs(env_or_default("POI_CACHE_SECS", 600)),
            first_tick_delay: Duration::from_secs(env_or_default("FIRST_TICK_DELAY_SECS", 2)),
            allowed_users: parse_user_list(&var("TRACK_ALLOWED_USERS").unwrap_or_default()),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            discord_token: None,
            earthmc_api_url: "https://api.earthmc.net/v3/aurora".to_string(),
            earthmc_map_url: "https://map.earthmc.net".to_string(),
            alliance_api_url: "https://emctoolkit.vercel.app/api/aurora/alliances".to_string(),
            http_timeout: Duration::from_secs(15),
            api_min_interval: Duration::from_millis(1000),
            poi_cache_ttl: Duration::from_secs(600),
            first_tick_delay: Duration::from_secs(2),
            allowed_users: Vec::new(),
        }
    }

    pub fn is_allowed(&self, user: u64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user)
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_user_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}
