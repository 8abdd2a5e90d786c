use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Discord REST API base; overridable so tests can point the client at a
/// local stub.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub guild_id: String,
    /// The service's own user id, used to drop self-originated reactions.
    pub bot_user_id: String,
    /// Shared secret for HMAC verification of relayed gateway events.
    pub relay_webhook_secret: String,
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    pub challenge_channel: String,
    pub leaderboard_channel: String,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("DISCORD_BOT_TOKEN").context("DISCORD_BOT_TOKEN environment variable is required")?;

        let guild_id =
            env::var("DISCORD_GUILD_ID").context("DISCORD_GUILD_ID environment variable is required")?;

        let bot_user_id =
            env::var("BOT_USER_ID").context("BOT_USER_ID environment variable is required")?;

        let relay_webhook_secret = env::var("RELAY_WEBHOOK_SECRET")
            .context("RELAY_WEBHOOK_SECRET environment variable is required")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let challenge_channel =
            env::var("CHALLENGE_CHANNEL").unwrap_or_else(|_| "challenge".to_string());

        let leaderboard_channel =
            env::var("LEADERBOARD_CHANNEL").unwrap_or_else(|_| "leaderboard".to_string());

        let api_base = env::var("DISCORD_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        Ok(Config {
            bot_token,
            guild_id,
            bot_user_id,
            relay_webhook_secret,
            port,
            state_dir,
            challenge_channel,
            leaderboard_channel,
            api_base,
        })
    }
}
