//! WhatsApp webhook intake (spec §4.L)
//!
//! Dispatches on the engine's fixed event vocabulary, validates
//! identifiers before handoff, and maps ACK codes onto
//! `DeliveryStatus`. `message.edited`, `message.reaction`, and
//! `message.waiting` are accepted (the engine never redelivers an
//! event we 2xx) but are logged only — the bridge has no
//! WhatsApp-originated counterpart for them (spec §4.F only defines
//! Signal-originated reactions/deletions).

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, info, instrument, warn};

use application::error::BridgeError;
use application::privacy::{MaskingMode, mask_message_id, mask_phone};
use domain::value_objects::{DeliveryStatus, SessionName, WhatsAppChatId};
use integration_whatsapp::{WebhookEnvelope, WebhookEvent, WebhookPayload};

use crate::error::ApiError;
use crate::state::AppState;

#[instrument(skip(state, envelope), fields(session = %envelope.session, event = %envelope.event))]
pub async fn receive_whatsapp_webhook(
    State(state): State<AppState>,
    Json(envelope): Json<WebhookEnvelope>,
) -> Result<StatusCode, ApiError> {
    dispatch(&state, &envelope).await?;
    Ok(StatusCode::OK)
}

async fn dispatch(state: &AppState, envelope: &WebhookEnvelope) -> Result<(), BridgeError> {
    SessionName::new(&envelope.session)?;
    if !state.router.is_valid_session(&envelope.session) {
        return Err(BridgeError::Validation(format!(
            "unknown whatsapp session: {}",
            envelope.session
        )));
    }

    match envelope.event_kind() {
        WebhookEvent::Message => handle_message(state, &envelope.session, &envelope.payload).await,
        WebhookEvent::MessageAck => handle_ack(state, &envelope.payload).await,
        WebhookEvent::MessageEdited => {
            debug!(msg_id = %mask_message_id(&envelope.payload.id, MaskingMode::Masked), "message edited, no forward path");
            Ok(())
        },
        WebhookEvent::MessageReaction => {
            debug!(msg_id = %mask_message_id(&envelope.payload.id, MaskingMode::Masked), "whatsapp-originated reaction ignored");
            Ok(())
        },
        WebhookEvent::MessageWaiting => {
            debug!(session = %envelope.session, "engine reports a waiting message");
            Ok(())
        },
        WebhookEvent::Unknown => {
            warn!(event = %envelope.event, "ignoring unrecognized webhook event");
            Ok(())
        },
    }
}

async fn handle_message(state: &AppState, session: &str, payload: &WebhookPayload) -> Result<(), BridgeError> {
    if payload.from_me {
        return Ok(());
    }

    WhatsAppChatId::new(&payload.from)?;
    if payload.id.trim().is_empty() {
        return Err(BridgeError::Validation("message payload id must not be empty".to_string()));
    }

    let content = payload.body.clone().unwrap_or_default();
    let media = match &payload.media {
        Some(media) if payload.has_media => {
            let bytes = state.whatsapp_engine.download_media(&media.url).await?;
            let extension = media
                .filename
                .as_deref()
                .and_then(|name| name.rsplit('.').next())
                .unwrap_or("bin")
                .to_string();
            Some(application::services::MediaInput { bytes, extension })
        },
        _ => None,
    };

    info!(
        sender = %mask_phone(&payload.from, MaskingMode::Masked),
        msg_id = %mask_message_id(&payload.id, MaskingMode::Masked),
        "accepted inbound whatsapp message"
    );

    state
        .message_service
        .handle_whatsapp_message_with_session(
            session,
            &payload.from,
            &payload.id,
            &payload.from,
            &content,
            media,
        )
        .await
}

fn ack_status(payload: &WebhookPayload) -> Result<DeliveryStatus, BridgeError> {
    let Some(code) = payload.ack else {
        return Err(BridgeError::Validation("message.ack payload missing ack code".to_string()));
    };
    DeliveryStatus::from_ack_code(code)
        .ok_or_else(|| BridgeError::Validation(format!("unrecognized ack code: {code}")))
}

async fn handle_ack(state: &AppState, payload: &WebhookPayload) -> Result<(), BridgeError> {
    let status = ack_status(payload)?;

    match state.mappings.update_delivery_status(&payload.id, status).await {
        Ok(()) => Ok(()),
        Err(BridgeError::NotFound(_)) => {
            warn!(msg_id = %mask_message_id(&payload.id, MaskingMode::Masked), "ack for unknown mapping");
            Ok(())
        },
        Err(other) => Err(other),
    }
}
