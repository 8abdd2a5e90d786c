//! End-to-end scenario: open a competition, tally approvals, reconcile the
//! display, cross the expiry boundary.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Mutex as AsyncMutex;

use challenge_core::{
    ChannelId, CompetitionId, EntryRef, GuildId, ManualClock, MessageId, UserId,
};
use challenge_server::chat::{Channel, ChatMessage, ChatPlatform};
use challenge_server::lifecycle::open_competition;
use challenge_server::reconciler::{reconcile_once, ReconcileOutcome};
use challenge_server::repository::{ChallengeRepository, InMemoryRepository};
use challenge_server::tally::{record_approval, TallyOutcome};
use challenge_server::AppState;

/// Minimal in-memory chat platform for the scenario.
struct FakeChat {
    channels: AsyncMutex<Vec<(ChannelId, String)>>,
    messages: AsyncMutex<HashMap<ChannelId, Vec<(MessageId, String)>>>,
    next_id: AsyncMutex<u64>,
}

impl FakeChat {
    fn new() -> Self {
        Self {
            channels: AsyncMutex::new(Vec::new()),
            messages: AsyncMutex::new(HashMap::new()),
            next_id: AsyncMutex::new(0),
        }
    }

    async fn fresh_id(&self, prefix: &str) -> String {
        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        format!("{}-{}", prefix, next_id)
    }

    async fn channel_messages(&self, name: &str) -> Vec<String> {
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
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn find_channel(&self, _guild_id: &GuildId, name: &str) -> Result<Option<Channel>> {
        let channels = self.channels.lock().await;
        Ok(channels.iter().find(|(_, n)| n == name).map(|(id, n)| Channel {
            id: id.clone(),
            name: Some(n.clone()),
        }))
    }

    async fn create_channel(&self, _guild_id: &GuildId, name: &str) -> Result<Channel> {
        let id = ChannelId::from(self.fresh_id("chan").await);
        let mut channels = self.channels.lock().await;
        channels.push((id.clone(), name.to_string()));
        Ok(Channel {
            id,
            name: Some(name.to_string()),
        })
    }

    async fn send_message(&self, channel_id: &ChannelId, content: &str) -> Result<MessageId> {
        let id = MessageId::from(self.fresh_id("msg").await);
        let mut messages = self.messages.lock().await;
        messages
            .entry(channel_id.clone())
            .or_default()
            .push((id.clone(), content.to_string()));
        Ok(id)
    }

    async fn latest_message(&self, channel_id: &ChannelId) -> Result<Option<ChatMessage>> {
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
        let mut messages = self.messages.lock().await;
        let existing = messages
            .get_mut(channel_id)
            .and_then(|m| m.iter_mut().find(|(id, _)| id == message_id))
            .ok_or_else(|| anyhow!("no such message {}", message_id))?;
        existing.1 = content.to_string();
        Ok(())
    }
}

#[tokio::test]
async fn test_full_competition_cycle() {
    let t0 = Utc.with_ymd_and_hms(2026, 8, 23, 0, 0, 0).unwrap();
    let chat = Arc::new(FakeChat::new());
    let repo = Arc::new(InMemoryRepository::new());
    let clock = Arc::new(ManualClock::new(t0));

    let state = Arc::new(AppState {
        chat: chat.clone(),
        repository: repo.clone(),
        clock: clock.clone(),
        guild_id: GuildId::from("guild-1"),
        bot_user_id: UserId::from("bot-user"),
        relay_secret: "secret".to_string(),
        challenge_channel: "challenge".to_string(),
        leaderboard_channel: "leaderboard".to_string(),
        reconcile_guard: AsyncMutex::new(()),
    });

    // Open the competition at T0 with a 7-day window.
    let competition = open_competition(&state).await.unwrap();
    assert_eq!(competition.id, CompetitionId::from("2026-8"));
    assert_eq!(competition.expires_at, t0 + Duration::days(7));
    assert_eq!(chat.channel_messages("challenge").await.len(), 1);

    // Two distinct users approve the same item.
    let item1 = EntryRef::new("chan-submissions", "item-1");
    let author1 = UserId::from("author1");

    let outcome = record_approval(
        repo.as_ref(),
        clock.as_ref(),
        &state.bot_user_id,
        &UserId::from("u1"),
        &item1,
        &author1,
    )
    .await
    .unwrap();
    assert_eq!(outcome, TallyOutcome::Recorded { vote_count: 1 });

    let outcome = record_approval(
        repo.as_ref(),
        clock.as_ref(),
        &state.bot_user_id,
        &UserId::from("u2"),
        &item1,
        &author1,
    )
    .await
    .unwrap();
    assert_eq!(outcome, TallyOutcome::Recorded { vote_count: 2 });

    // Reconciliation renders item1 at rank 1 with 2 votes and its permalink.
    let outcome = reconcile_once(&state).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Created(_)));

    let display = chat.channel_messages("leaderboard").await;
    assert_eq!(display.len(), 1);
    assert!(display[0].contains("**1.** <@author1> — 👍 2 votes"));
    assert!(display[0].contains(&item1.permalink(&state.guild_id)));

    // Past the window, further approvals are dropped.
    clock.advance(Duration::days(7) + Duration::seconds(1));

    let outcome = record_approval(
        repo.as_ref(),
        clock.as_ref(),
        &state.bot_user_id,
        &UserId::from("u3"),
        &item1,
        &author1,
    )
    .await
    .unwrap();
    assert_eq!(outcome, TallyOutcome::NoActiveCompetition);

    let entries = repo.top_entries(&competition.id, 10).await.unwrap();
    assert_eq!(entries[0].vote_count, 2);
}
