/// Input validation for session parameters
use crate::error::ParameterError;
use crate::models::PlayerName;
use std::time::Duration;

/// Bounds and defaults applied by `SessionController::start`.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Shortest allowed track-mode interval
    pub min_interval: Duration,
    /// Longest allowed track-mode interval
    pub max_interval: Duration,
    /// Track-mode interval when none is given
    pub default_interval: Duration,
    /// Defend mode always polls at this rate
    pub defend_interval: Duration,
    pub min_radius: u32,
    pub max_radius: u32,
    pub default_radius: u32,
    /// Delay before the first tick of a new session
    pub first_tick_delay: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            default_interval: Duration::from_secs(10),
            defend_interval: Duration::from_secs(10),
            min_radius: 50,
            max_radius: 200,
            default_radius: 100,
            first_tick_delay: Duration::from_secs(2),
        }
    }
}

impl TrackerSettings {
    /// Resolve a requested track-mode interval in whole seconds.
    pub fn track_interval(&self, requested: Option<u64>) -> Result<Duration, ParameterError> {
        let Some(secs) = requested else {
            return Ok(self.default_interval);
        };
        let (min, max) = (self.min_interval.as_secs(), self.max_interval.as_secs());
        if !(min..=max).contains(&secs) {
            return Err(ParameterError::IntervalOutOfRange {
                min,
                max,
                actual: secs,
            });
        }
        Ok(Duration::from_secs(secs))
    }

    /// Resolve a requested defend-mode radius in blocks.
    pub fn radius(&self, requested: Option<u32>) -> Result<u32, ParameterError> {
        let radius = requested.unwrap_or(self.default_radius);
        if !(self.min_radius..=self.max_radius).contains(&radius) {
            return Err(ParameterError::RadiusOutOfRange {
                min: self.min_radius,
                max: self.max_radius,
                actual: radius,
            });
        }
        Ok(radius)
    }
}

/// Validates a Minecraft player name
///
/// Rules:
/// - Cannot be empty
/// - Max 16 characters (Minecraft username limit)
/// - Only alphanumeric characters and underscores
pub fn validate_player_name(name: &str) -> Result<PlayerName, ParameterError> {
    if name.is_empty() {
        return Err(ParameterError::PlayerNameEmpty);
    }

    if name.len() > 16 {
        return Err(ParameterError::PlayerNameTooLong(name.len()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ParameterError::PlayerNameInvalidChars);
    }

    PlayerName::from(name).map_err(|_| ParameterError::PlayerNameTooLong(name.len()))
}
