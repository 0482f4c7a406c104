use async_trait::async_trait;
use lookout_core::{DeliveryError, ModeKind, Notice, NotificationChannel, OwnerId};
use poise::serenity_prelude::{
    self as serenity, CreateEmbed, CreateMessage, Message, Timestamp, UserId,
};
use std::sync::Arc;
use std::time::Duration;

/// How long the start check message stays in the user's DMs. The defend
/// banner is kept; the track-mode capability check is removed.
fn probe_lifetime(mode: ModeKind) -> Option<Duration> {
    match mode {
        ModeKind::Track => Some(Duration::from_secs(1)),
        ModeKind::Defend => None,
    }
}

/// Delivers notices as Discord direct messages.
pub(crate) struct DirectMessages {
    http: Arc<serenity::Http>,
}

impl DirectMessages {
    pub(crate) fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    async fn deliver(
        &self,
        owner: OwnerId,
        message: CreateMessage,
    ) -> Result<Message, DeliveryError> {
        UserId::new(owner)
            .direct_message(&self.http, message)
            .await
            .map_err(|err| DeliveryError::Undeliverable(err.to_string()))
    }
}

pub(crate) fn notice_embed(notice: &Notice) -> CreateEmbed {
    notice.fields.iter().fold(
        CreateEmbed::default()
            .title(&notice.title)
            .description(&notice.description)
            .color(notice.color)
            .timestamp(Timestamp::now()),
        |embed, field| embed.field(&field.name, &field.value, field.inline),
    )
}

#[async_trait]
impl NotificationChannel for DirectMessages {
    async fn probe(&self, owner: OwnerId, mode: ModeKind) -> Result<(), DeliveryError> {
        let text = match mode {
            ModeKind::Track => "🔍 Testing DM capability for player tracking...",
            ModeKind::Defend => "🛡️ Starting defense monitoring...",
        };
        let message = self.deliver(owner, CreateMessage::new().content(text)).await?;
        if let Some(lifetime) = probe_lifetime(mode) {
            let http = self.http.clone();
            tokio::spawn(async move {
                tokio::time::sleep(lifetime).await;
                if let Err(err) = message.delete(&http).await {
                    tracing::debug!(owner, %err, "could not remove DM check message");
                }
            });
        }
        Ok(())
    }

    async fn send(&self, owner: OwnerId, notice: Notice) -> Result<(), DeliveryError> {
        self.deliver(owner, CreateMessage::new().embed(notice_embed(&notice)))
            .await
            .map(|_| ())
    }
}
