use crate::Context;
use lookout_bot::helpers::{format_elapsed, relative_time};
use lookout_core::{
    LocationState, RoutePreference, SessionMode, SessionSummary, StartRequest, TrackError,
};
use poise::CreateReply;
use poise::command;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, Timestamp};

pub(crate) type Error = Box<dyn std::error::Error + Send + Sync>;

const COLOR_TRACK: u32 = 0x00FF00;
const COLOR_DEFEND: u32 = 0xFF6B35;
const COLOR_STATUS: u32 = 0x0099FF;
const COLOR_STOPPED: u32 = 0xFF0000;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RouteChoice {
    Fastest,
    Safest,
}

impl From<RouteChoice> for RoutePreference {
    fn from(choice: RouteChoice) -> Self {
        match choice {
            RouteChoice::Fastest => RoutePreference::Fastest,
            RouteChoice::Safest => RoutePreference::Safest,
        }
    }
}

async fn is_authorized(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.data().config.is_allowed(ctx.author().id.get()) {
        return Ok(true);
    }
    tracing::warn!("Unauthorized /track use by '{}'", ctx.author().name);
    ctx.send(
        CreateReply::default()
            .content("You are not authorized to use tracking commands.")
            .ephemeral(true),
    )
    .await?;
    Ok(false)
}

/// Track a player and receive DM updates on their location
#[command(
    slash_command,
    subcommands("start", "defend", "stop", "status"),
    subcommand_required
)]
pub async fn track(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start tracking a player
#[command(slash_command, check = "is_authorized")]
pub async fn start(
    ctx: Context<'_>,
    #[description = "Name of the player to track"] player: String,
    #[description = "Update interval in seconds (default: 10, min: 5, max: 60)"]
    interval: Option<u64>,
    #[description = "Route type for directions"] route: Option<RouteChoice>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let request = StartRequest::Track {
        player,
        interval,
        route: route.map(RoutePreference::from).unwrap_or_default(),
    };
    let result = ctx
        .data()
        .tracker
        .start(ctx.author().id.get(), request)
        .await;
    reply(ctx, result.map(|summary| started_embed(&summary))).await
}

/// Monitor for nearby players and get alerted (excludes nation/alliance)
#[command(slash_command, check = "is_authorized")]
pub async fn defend(
    ctx: Context<'_>,
    #[description = "Your player name to monitor around"] player: String,
    #[description = "Alert radius in blocks (default: 100, min: 50, max: 200)"] radius: Option<u32>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let request = StartRequest::Defend { player, radius };
    let result = ctx
        .data()
        .tracker
        .start(ctx.author().id.get(), request)
        .await;
    reply(ctx, result.map(|summary| started_embed(&summary))).await
}

/// Stop the current tracking session
#[command(slash_command, check = "is_authorized")]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let result = ctx.data().tracker.stop(ctx.author().id.get()).await;
    reply(ctx, result.map(|summary| stopped_embed(&summary))).await
}

/// Check your current tracking status
#[command(slash_command, check = "is_authorized")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let result = ctx.data().tracker.status(ctx.author().id.get()).await;
    reply(ctx, result.map(|summary| status_embed(&summary))).await
}

async fn reply(ctx: Context<'_>, result: Result<CreateEmbed, TrackError>) -> Result<(), Error> {
    let message = match result {
        Ok(embed) => CreateReply::default().embed(embed),
        Err(err) => CreateReply::default().content(describe_error(&err)),
    };
    ctx.send(message.ephemeral(true)).await?;
    Ok(())
}

fn describe_error(err: &TrackError) -> String {
    match err {
        TrackError::AlreadyActive => {
            "You already have an active tracking session. Use `/track stop` to stop it first.".to_string()
        }
        TrackError::NoActiveSession => "You do not have any active tracking sessions.".to_string(),
        TrackError::TargetNotFound(player) => format!(
            "Player \"{player}\" not found on the server. Please check the spelling and make sure they are registered."
        ),
        TrackError::TargetOffline(player) => format!(
            "Player \"{player}\" is currently offline. Tracking only works for online players."
        ),
        TrackError::NotificationUndeliverable => "I cannot send you DMs. Please enable DMs from server members in your Discord privacy settings to use tracking.".to_string(),
        TrackError::ShuttingDown => {
            "The bot is restarting. Please try again in a moment.".to_string()
        }
        TrackError::InvalidParameter(reason) => format!("Invalid option: {reason}."),
        TrackError::TargetUntrackable(_) | TrackError::ProviderUnavailable(_) => {
            format!("Error starting tracking: {err}")
        }
    }
}

fn route_name(route: RoutePreference) -> &'static str {
    match route {
        RoutePreference::Fastest => "Fastest",
        RoutePreference::Safest => "Safest",
    }
}

fn nation_fields(embed: CreateEmbed, summary: &SessionSummary) -> CreateEmbed {
    let SessionMode::Defend {
        radius,
        affiliation,
    } = &summary.mode
    else {
        return embed;
    };
    embed
        .field("Alert Radius", format!("{radius} blocks"), true)
        .field(
            "Your Nation",
            affiliation.nation.as_deref().unwrap_or("None"),
            true,
        )
        .field(
            "Alliance Nations",
            affiliation.allied_nations.len().to_string(),
            true,
        )
}

fn started_embed(summary: &SessionSummary) -> CreateEmbed {
    let embed = match &summary.mode {
        SessionMode::Track { route } => CreateEmbed::default()
            .title("🔍 Player Tracking Started")
            .description(format!(
                "Now tracking **{}** with {}s intervals",
                summary.target,
                summary.interval.as_secs()
            ))
            .field("Route Type", route_name(*route), true)
            .field(
                "Update Interval",
                format!("{} seconds", summary.interval.as_secs()),
                true,
            )
            .color(COLOR_TRACK),
        SessionMode::Defend { .. } => nation_fields(
            CreateEmbed::default()
                .title("🛡️ Defense Monitoring Started")
                .description(format!("Now monitoring for enemies near **{}**", summary.target))
                .field("Exclusions", "Nation & Alliance members", true)
                .color(COLOR_DEFEND),
            summary,
        ),
    };
    embed
        .field("Player Status", "🟢 Online", true)
        .field("DM Alerts", "Enabled ✅", true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new("Use /track stop to end tracking"))
}

fn stopped_embed(summary: &SessionSummary) -> CreateEmbed {
    let description = match summary.mode {
        SessionMode::Track { .. } => format!("Stopped tracking **{}**", summary.target),
        SessionMode::Defend { .. } => {
            format!("Stopped defense monitoring for **{}**", summary.target)
        }
    };
    CreateEmbed::default()
        .title("⏹️ Tracking Stopped")
        .description(description)
        .field("Duration", format_elapsed(summary.elapsed), true)
        .field("Updates Received", summary.update_count.to_string(), true)
        .color(COLOR_STOPPED)
        .timestamp(Timestamp::now())
}

fn status_embed(summary: &SessionSummary) -> CreateEmbed {
    let (description, color) = match summary.mode {
        SessionMode::Track { .. } => (
            format!("Currently tracking **{}**", summary.target),
            COLOR_STATUS,
        ),
        SessionMode::Defend { .. } => (
            format!("Defense monitoring **{}**", summary.target),
            COLOR_DEFEND,
        ),
    };
    let state = match summary.state {
        LocationState::Unknown => "⏳ Waiting for first update",
        LocationState::Trackable | LocationState::Surfaced => "🟢 Trackable",
        LocationState::Underground => "🕳️ Underground",
        LocationState::Offline => "🔴 Offline",
    };
    let embed = CreateEmbed::default()
        .title("📊 Tracking Status")
        .description(description)
        .field("Duration", format_elapsed(summary.elapsed), true)
        .field("Updates Received", summary.update_count.to_string(), true)
        .field(
            "Last Update",
            summary
                .last_update_at
                .map_or_else(|| "None yet".to_string(), relative_time),
            true,
        )
        .field("Target State", state, true)
        .color(color)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new("Use /track stop to end tracking"));
    if let SessionMode::Defend { .. } = summary.mode {
        nation_fields(embed, summary).field(
            "Current Threats",
            summary.threat_count.to_string(),
            true,
        )
    } else {
        embed
    }
}
