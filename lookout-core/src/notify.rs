//! Rendering and delivery of per-session notifications.

use crate::error::{Result, TrackError};
use crate::geo::DirectionalHint;
use crate::models::{Coords, ModeKind, OwnerId, PlayerName, Threat};
use crate::provider::NotificationChannel;
use crate::state_machine::OfflineReason;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, warn};

/// Threats listed individually in one alert.
const MAX_LISTED_THREATS: usize = 5;

const COLOR_GREEN: u32 = 0x00FF00;
const COLOR_RED: u32 = 0xFF0000;
const COLOR_BROWN: u32 = 0x8B4513;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    LocationUpdate {
        coords: Coords,
        hint: Option<DirectionalHint>,
    },
    Surfaced {
        coords: Coords,
    },
    Underground {
        last_known: Option<Coords>,
    },
    Offline {
        reason: OfflineReason,
    },
    NewThreats {
        threats: Vec<Threat>,
        total_nearby: usize,
        radius: u32,
    },
    ThreatsLeft {
        left: Vec<PlayerName>,
        remaining: usize,
    },
}

/// A platform-neutral rich message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub fields: Vec<NoticeField>,
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Notice {
    fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            fields: Vec::new(),
            color,
        }
    }

    fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NoticeField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

fn position(coords: Coords) -> String {
    format!("X: {}, Z: {}", coords.x.round(), coords.z.round())
}

pub fn render(target: &str, mode: ModeKind, event: &NotificationEvent) -> Notice {
    let activity = match mode {
        ModeKind::Track => "Tracking",
        ModeKind::Defend => "Defense monitoring",
    };

    match event {
        NotificationEvent::LocationUpdate { coords, hint } => {
            let notice = Notice::new(
                "📍 Location Update",
                format!("**{target}** location updated"),
                COLOR_GREEN,
            )
            .field("Current Location", position(*coords), true);
            match hint {
                Some(hint) => notice
                    .field("Distance", format!("{} blocks", hint.distance), true)
                    .field("Direction", hint.direction.to_string(), true)
                    .field(
                        "Nearest Nation",
                        format!(
                            "Type **/n spawn {}** and head **{}**",
                            hint.via, hint.direction
                        ),
                        false,
                    ),
                None => notice,
            }
        }
        NotificationEvent::Surfaced { coords } => Notice::new(
            "🌅 Player Surfaced",
            format!("**{target}** has surfaced and can now be tracked normally!"),
            COLOR_GREEN,
        )
        .field("Current Location", position(*coords), true),
        NotificationEvent::Underground { last_known } => Notice::new(
            "🕳️ Player Underground",
            format!("**{target}** appears to be underground and cannot be tracked"),
            COLOR_BROWN,
        )
        .field(
            "Last Known Location",
            last_known.map_or_else(|| "Unknown".to_string(), position),
            true,
        )
        .field(
            "Status",
            "🟢 Player is online but not trackable - likely underground",
            false,
        ),
        NotificationEvent::Offline {
            reason: OfflineReason::PlayerOffline,
        } => Notice::new(
            "📴 Player Offline",
            format!("**{target}** went offline"),
            COLOR_RED,
        )
        .field(
            "Status",
            format!("🔴 {activity} stopped - player is no longer online"),
            false,
        ),
        NotificationEvent::Offline {
            reason: OfflineReason::StatusUnverifiable,
        } => Notice::new(
            "📴 Connection Lost",
            format!("Lost connection to **{target}**"),
            COLOR_RED,
        )
        .field(
            "Status",
            format!("🔴 {activity} stopped - unable to verify player status"),
            false,
        ),
        NotificationEvent::NewThreats {
            threats,
            total_nearby,
            radius,
        } => {
            let mut list = String::new();
            for threat in threats.iter().take(MAX_LISTED_THREATS) {
                let _ = write!(
                    list,
                    "**{}** ({})\n┗ Distance: {} blocks\n┗ Location: {}, {}\n\n",
                    threat.name,
                    threat.nation.as_deref().unwrap_or("None"),
                    threat.distance,
                    threat.coords.x.round(),
                    threat.coords.z.round(),
                );
            }
            if threats.len() > MAX_LISTED_THREATS {
                let _ = write!(list, "*...and {} more*", threats.len() - MAX_LISTED_THREATS);
            }
            Notice::new(
                "⚠️ Enemy Players Detected!",
                format!(
                    "**{}** enemy player(s) detected near **{target}**",
                    threats.len()
                ),
                COLOR_RED,
            )
            .field("Threats Detected", list.trim_end(), false)
            .field("Alert Radius", format!("{radius} blocks"), true)
            .field("Total Nearby", total_nearby.to_string(), true)
        }
        NotificationEvent::ThreatsLeft { left, remaining } => Notice::new(
            "✅ Threats Cleared",
            format!(
                "**{}** player(s) left the area around **{target}**",
                left.len()
            ),
            COLOR_GREEN,
        )
        .field(
            "Players Left",
            left.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "),
            false,
        )
        .field("Remaining Threats", remaining.to_string(), true),
    }
}

/// Delivers rendered events to session owners over a single channel.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self { channel }
    }

    /// Start-time deliverability check; the only delivery failure that is fatal.
    pub async fn probe(&self, owner: OwnerId, mode: ModeKind) -> Result<()> {
        self.channel.probe(owner, mode).await.map_err(|err| {
            debug!(owner, %err, "notification probe failed");
            TrackError::NotificationUndeliverable
        })
    }

    /// Render and send one event. Failures are logged and reported as `false`.
    pub async fn dispatch(
        &self,
        owner: OwnerId,
        target: &str,
        mode: ModeKind,
        event: &NotificationEvent,
    ) -> bool {
        let notice = render(target, mode, event);
        match self.channel.send(owner, notice).await {
            Ok(()) => {
                debug!(owner, player = target, "notification delivered");
                true
            }
            Err(err) => {
                warn!(owner, player = target, %err, "failed to deliver notification");
                false
            }
        }
    }
}
