mod discord_commands;
mod dm;
use anyhow::Context as _;
use lookout_bot::alliances::AllianceClient;
use lookout_bot::config::Config;
use lookout_bot::earthmc::EarthMcClient;
use lookout_core::{Collaborators, SessionController, TrackerSettings};
use poise::{Framework, FrameworkOptions, serenity_prelude as serenity};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::EnvFilter;

type Context<'a> = poise::Context<'a, crate::Data, crate::discord_commands::Error>;

pub(crate) struct Data {
    pub(crate) tracker: SessionController,
    pub(crate) config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    let log_level = "debug";
    #[cfg(not(debug_assertions))]
    let log_level = "info";

    // RUST_LOG wins over the build default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Lookout bot...");
    let config = Config::from_env();
    tracing::info!(
        "Configuration: earthmc_api={}, map={}, alliances={}, http_timeout={}s, api_spacing={}ms, first_tick={}s, whitelist={}",
        config.earthmc_api_url,
        config.earthmc_map_url,
        config.alliance_api_url,
        config.http_timeout.as_secs(),
        config.api_min_interval.as_millis(),
        config.first_tick_delay.as_secs(),
        config.allowed_users.len()
    );
    let token = config
        .discord_token
        .clone()
        .context("DISCORD_TOKEN environment variable is required")?;

    let earthmc = Arc::new(EarthMcClient::new(&config).context("building EarthMC client")?);
    let alliances = Arc::new(AllianceClient::new(&config).context("building alliance client")?);
    let settings = TrackerSettings {
        first_tick_delay: config.first_tick_delay,
        ..TrackerSettings::default()
    };
    // set once the gateway is ready, read back on shutdown
    let tracker_slot: Arc<OnceLock<SessionController>> = Arc::new(OnceLock::new());

    // DMs only need the default intents
    let intents = serenity::GatewayIntents::default();

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![discord_commands::track()],
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "Executing command '{}' by user '{}'",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "Finished command '{}' by user '{}'",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            ..Default::default()
        })
        .setup({
            let tracker_slot = tracker_slot.clone();
            move |ctx, _ready, framework| {
                Box::pin(async move {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    let tracker = tracker_slot
                        .get_or_init(|| {
                            SessionController::new(
                                Collaborators {
                                    locations: earthmc.clone(),
                                    status: earthmc,
                                    alliances,
                                    notifications: Arc::new(dm::DirectMessages::new(
                                        ctx.http.clone(),
                                    )),
                                },
                                settings,
                            )
                        })
                        .clone();
                    tracing::info!("Connected to Discord, tracking commands registered");
                    Ok(Data { tracker, config })
                })
            }
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("creating Discord client")?;
    let shard_manager = client.shard_manager.clone();
    tokio::select! {
        result = client.start() => {
            if let Err(e) = result {
                tracing::error!("Discord client error: {:?}", e);
            }
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
        }
    }
    if let Some(tracker) = tracker_slot.get() {
        tracker.shutdown().await;
    }
    shard_manager.shutdown_all().await;
    tracing::info!("Lookout bot stopped");
    Ok(())
}
