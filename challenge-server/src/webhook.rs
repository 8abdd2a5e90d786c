//! Event ingestion for relayed gateway events.
//!
//! The platform gateway is fronted by a relay that POSTs each reaction-added
//! event here, signed with a shared-secret HMAC over the raw body. The
//! handler filters to the approval emoji, drops self-originated events, and
//! hands the rest to the tally engine. Store failures drop the event; the
//! approval is simply lost.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use challenge_core::{EntryRef, UserId};

use crate::tally::{self, TallyOutcome, APPROVAL_EMOJI};
use crate::AppState;

/// A reaction-added gateway event as delivered by the relay.
#[derive(Debug, Deserialize)]
pub struct ReactionAddedEvent {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub message_author_id: Option<String>,
    pub emoji: ReactionEmoji,
}

#[derive(Debug, Deserialize)]
pub struct ReactionEmoji {
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: String,
}

type HmacSha256 = Hmac<Sha256>;

pub fn verify_relay_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if !signature.starts_with("sha256=") {
        return false;
    }

    let signature_hex = &signature[7..]; // Remove "sha256=" prefix

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(payload);

    // Constant-time verification
    mac.verify_slice(&signature_bytes).is_ok()
}

pub fn webhook_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_reaction_event))
        .with_state(state)
}

async fn handle_reaction_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, StatusCode> {
    let signature = headers
        .get("x-relay-signature-256")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !verify_relay_signature(&state.relay_secret, &body, signature) {
        error!("Invalid relay signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let event: ReactionAddedEvent =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    let correlation_id = Uuid::new_v4().to_string();

    if event.emoji.name.as_deref() != Some(APPROVAL_EMOJI) {
        return Ok(Json(WebhookResponse {
            message: "Ignored: not an approval reaction".to_string(),
        }));
    }

    let Some(author_id) = event.message_author_id else {
        warn!(
            "[{}] Reaction on {}/{} has no message author, skipping",
            correlation_id, event.channel_id, event.message_id
        );
        return Ok(Json(WebhookResponse {
            message: "Ignored: no message author".to_string(),
        }));
    };

    let entry_ref = EntryRef::new(event.channel_id, event.message_id);
    let actor_id = UserId::from(event.user_id);
    let author_id = UserId::from(author_id);

    let outcome = tally::record_approval(
        state.repository.as_ref(),
        state.clock.as_ref(),
        &state.bot_user_id,
        &actor_id,
        &entry_ref,
        &author_id,
    )
    .await;

    let message = match outcome {
        Ok(TallyOutcome::Recorded { vote_count }) => {
            info!(
                "[{}] Approval counted for {}: {} votes",
                correlation_id, entry_ref.message_id, vote_count
            );
            "Approval recorded".to_string()
        }
        Ok(TallyOutcome::SelfReaction) => "Ignored: self reaction".to_string(),
        Ok(TallyOutcome::NoActiveCompetition) => "Ignored: no active competition".to_string(),
        Err(e) => {
            // Event dropped; not retried or queued.
            error!("[{}] Failed to record approval: {}", correlation_id, e);
            "Approval dropped: store unavailable".to_string()
        }
    };

    Ok(Json(WebhookResponse { message }))
}
