//! Messaging platform client.
//!
//! The service consumes the platform through the narrow `ChatPlatform`
//! surface: channel lookup/creation, message send/edit, and a latest-message
//! fetch. The production implementation talks to the Discord REST API;
//! approval events arrive separately through the webhook route.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use challenge_core::{ChannelId, GuildId, MessageId};

/// Every platform call is bounded; a timeout is a transient failure and the
/// affected cycle or event is abandoned.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord guild text channel type.
const CHANNEL_TYPE_TEXT: u8 = 0;

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CreateChannelRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: MessageId,
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Find a channel in the guild by name.
    async fn find_channel(&self, guild_id: &GuildId, name: &str) -> Result<Option<Channel>>;

    /// Create a text channel with the given name.
    async fn create_channel(&self, guild_id: &GuildId, name: &str) -> Result<Channel>;

    /// Send a new message; returns its id.
    async fn send_message(&self, channel_id: &ChannelId, content: &str) -> Result<MessageId>;

    /// Fetch the most recent message in a channel, if any.
    async fn latest_message(&self, channel_id: &ChannelId) -> Result<Option<ChatMessage>>;

    /// Overwrite a message's content.
    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<()>;

    /// Find the named channel, creating it if absent.
    async fn ensure_channel(&self, guild_id: &GuildId, name: &str) -> Result<Channel> {
        if let Some(channel) = self.find_channel(guild_id, name).await? {
            return Ok(channel);
        }
        info!("Channel #{} not found, creating it", name);
        self.create_channel(guild_id, name).await
    }
}

/// Discord REST API client.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    token: String,
    api_base: String,
}

impl DiscordClient {
    pub fn new(token: String, api_base: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            token,
            api_base,
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed with status {}: {}", operation, status, body));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn find_channel(&self, guild_id: &GuildId, name: &str) -> Result<Option<Channel>> {
        let url = format!("{}/guilds/{}/channels", self.api_base, guild_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("Failed to list guild channels")?;

        let response = Self::check_status(response, "List channels").await?;
        let channels: Vec<Channel> = response
            .json()
            .await
            .context("Failed to parse channel list")?;

        Ok(channels
            .into_iter()
            .find(|c| c.name.as_deref() == Some(name)))
    }

    async fn create_channel(&self, guild_id: &GuildId, name: &str) -> Result<Channel> {
        let url = format!("{}/guilds/{}/channels", self.api_base, guild_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&CreateChannelRequest {
                name,
                kind: CHANNEL_TYPE_TEXT,
            })
            .send()
            .await
            .context("Failed to create channel")?;

        let response = Self::check_status(response, "Create channel").await?;
        response.json().await.context("Failed to parse created channel")
    }

    async fn send_message(&self, channel_id: &ChannelId, content: &str) -> Result<MessageId> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&CreateMessageRequest { content })
            .send()
            .await
            .context("Failed to send message")?;

        let response = Self::check_status(response, "Send message").await?;
        let message: MessageResponse = response
            .json()
            .await
            .context("Failed to parse sent message")?;

        Ok(message.id)
    }

    async fn latest_message(&self, channel_id: &ChannelId) -> Result<Option<ChatMessage>> {
        let url = format!("{}/channels/{}/messages?limit=1", self.api_base, channel_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("Failed to fetch channel messages")?;

        let response = Self::check_status(response, "Fetch messages").await?;
        let mut messages: Vec<ChatMessage> = response
            .json()
            .await
            .context("Failed to parse channel messages")?;

        // The API returns newest-first; limit=1 leaves at most one element.
        Ok(if messages.is_empty() {
            None
        } else {
            Some(messages.remove(0))
        })
    }

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.api_base, channel_id, message_id
        );

        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.auth_header())
            .json(&CreateMessageRequest { content })
            .send()
            .await
            .context("Failed to edit message")?;

        Self::check_status(response, "Edit message").await?;
        Ok(())
    }
}
