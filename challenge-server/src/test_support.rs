//! Test doubles shared by the component tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use challenge_core::{ChannelId, Clock, GuildId, MessageId, UserId};

use crate::chat::{Channel, ChatMessage, ChatPlatform};
use crate::repository::ChallengeRepository;
use crate::AppState;

/// In-memory chat platform: channels by name, messages per channel in send
/// order. Set `fail` to make every platform call return an error.
pub struct FakeChat {
    channels: AsyncMutex<Vec<(ChannelId, String)>>,
    messages: AsyncMutex<HashMap<ChannelId, Vec<(MessageId, String)>>>,
    next_id: AsyncMutex<u64>,
    pub fail: AtomicBool,
}

impl FakeChat {
    pub fn new() -> Self {
        Self {
            channels: AsyncMutex::new(Vec::new()),
            messages: AsyncMutex::new(HashMap::new()),
            next_id: AsyncMutex::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn check_failure(&self, operation: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(anyhow!("simulated platform failure during {}", operation))
        } else {
            Ok(())
        }
    }

    async fn fresh_id(&self, prefix: &str) -> String {
        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        format!("{}-{}", prefix, next_id)
    }

    /// All messages ever sent to the named channel, oldest first.
    pub async fn channel_messages(&self, name: &str) -> Vec<String> {
        let channels = self.channels.lock().await;
        let Some((id, _)) = channels.iter().find(|(_, n)| n == name) else {
            return Vec::new();
        };
        let messages = self.messages.lock().await;
        messages
            .get(id)
            .map(|m| m.iter().map(|(_, content)| content.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn channel_exists(&self, name: &str) -> bool {
        let channels = self.channels.lock().await;
        channels.iter().any(|(_, n)| n == name)
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn find_channel(&self, _guild_id: &GuildId, name: &str) -> Result<Option<Channel>> {
        self.check_failure("find_channel")?;
        let channels = self.channels.lock().await;
        Ok(channels.iter().find(|(_, n)| n == name).map(|(id, n)| Channel {
            id: id.clone(),
            name: Some(n.clone()),
        }))
    }

    async fn create_channel(&self, _guild_id: &GuildId, name: &str) -> Result<Channel> {
        self.check_failure("create_channel")?;
        let id = ChannelId::from(self.fresh_id("chan").await);
        let mut channels = self.channels.lock().await;
        channels.push((id.clone(), name.to_string()));
        Ok(Channel {
            id,
            name: Some(name.to_string()),
        })
    }

    async fn send_message(&self, channel_id: &ChannelId, content: &str) -> Result<MessageId> {
        self.check_failure("send_message")?;
        let id = MessageId::from(self.fresh_id("msg").await);
        let mut messages = self.messages.lock().await;
        messages
            .entry(channel_id.clone())
            .or_default()
            .push((id.clone(), content.to_string()));
        Ok(id)
    }

    async fn latest_message(&self, channel_id: &ChannelId) -> Result<Option<ChatMessage>> {
        self.check_failure("latest_message")?;
        let messages = self.messages.lock().await;
        Ok(messages.get(channel_id).and_then(|m| m.last()).map(
            |(id, content)| ChatMessage {
                id: id.clone(),
                content: content.clone(),
            },
        ))
    }

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<()> {
        self.check_failure("edit_message")?;
        let mut messages = self.messages.lock().await;
        let existing = messages
            .get_mut(channel_id)
            .and_then(|m| m.iter_mut().find(|(id, _)| id == message_id))
            .ok_or_else(|| anyhow!("no such message {}", message_id))?;
        existing.1 = content.to_string();
        Ok(())
    }
}

pub fn test_state(
    chat: Arc<dyn ChatPlatform>,
    repository: Arc<dyn ChallengeRepository>,
    clock: Arc<dyn Clock>,
) -> Arc<AppState> {
    Arc::new(AppState {
        chat,
        repository,
        clock,
        guild_id: GuildId::from("guild-1"),
        bot_user_id: UserId::from("bot-user"),
        relay_secret: "test-secret".to_string(),
        challenge_channel: "challenge".to_string(),
        leaderboard_channel: "leaderboard".to_string(),
        reconcile_guard: AsyncMutex::new(()),
    })
}
