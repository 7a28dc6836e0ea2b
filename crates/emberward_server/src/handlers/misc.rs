//! Bell rings and raw player-to-player message relays.

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    PushRequestNotifyRingBell, RequestNotifyRingBell, RequestNotifyRingBellResponse,
    RequestSendMessageToPlayers, RequestSendMessageToPlayersResponse,
};
use emberward_protocol::{validate_entry_list, MessageKind, PushMessage};
use emberward_store::Database;
use prost::Message;
use tracing::warn;

use crate::handlers::{respond_or_error, HandleResult};
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};
use crate::webhook::{Notice, NoticeOrigin, NoticeType};

const STAT_TOTAL_RINGS: &str = "Bell/TotalRings";

/// The relay fans out to at most this many recipients.
const MAX_RELAY_RECIPIENTS: usize = 6;

/// Common prefix of every push body; enough to recover the claimed opcode.
#[derive(Clone, PartialEq, ::prost::Message)]
struct PushEnvelope {
    #[prost(uint32, tag = "1")]
    push_message_id: u32,
}

pub struct MiscManager;

impl MiscManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_notify_ring_bell(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestNotifyRingBell,
    ) -> HandleResult {
        if let Err(e) = validate_entry_list(&request.data) {
            warn!(client = %session.label(), "bell data failed validation: {e}");
            return respond_or_error(session, ctx, index, &RequestNotifyRingBellResponse {});
        }

        // Everyone standing in a listening zone hears it.
        let bell_areas = ctx.variant.bell_areas();
        for (_, other) in sessions.iter_mut() {
            if !other.player.is_in_game()
                || !bell_areas.contains(&other.player.current_area_id)
            {
                continue;
            }

            let push = PushRequestNotifyRingBell {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestNotifyRingBell),
                player_id: session.player.player_id,
                area_id: request.area_id,
                data: request.data.clone(),
            };
            if let Err(e) = other.push(ctx, &push) {
                warn!(client = %other.label(), "failed to push bell ring: {e}");
            }
        }

        let _ = ctx.store.add_global_statistic(STAT_TOTAL_RINGS, 1);

        if ctx.config.webhook_notices.bell {
            ctx.webhook.send(Notice {
                origin: NoticeOrigin {
                    player_id: session.player.player_id,
                    steam_id: session.player.steam_id.clone(),
                    character_name: session.player.character_name.clone(),
                },
                kind: NoticeType::Bell,
                text: format!(
                    "Rang the bell in '{}'.",
                    ctx.variant.area_name(request.area_id)
                ),
                fields: Vec::new(),
                thumbnail_url: None,
            });
        }

        respond_or_error(session, ctx, index, &RequestNotifyRingBellResponse {})
    }

    pub fn handle_send_message_to_players(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestSendMessageToPlayers,
    ) -> HandleResult {
        if request.player_ids.len() > MAX_RELAY_RECIPIENTS {
            warn!(
                client = %session.label(),
                recipients = request.player_ids.len(),
                "relay rejected, too many recipients"
            );
            return respond_or_error(
                session,
                ctx,
                index,
                &RequestSendMessageToPlayersResponse {},
            );
        }

        // The payload must prove itself to be a documented push message
        // before anything gets forwarded; this is the channel the session
        // exploit traveled through.
        let Some((kind, opcode)) = self.identify_push(ctx, &request.message) else {
            warn!(client = %session.label(), "relay payload is not a documented push");
            return respond_or_error(
                session,
                ctx,
                index,
                &RequestSendMessageToPlayersResponse {},
            );
        };

        if let Err(e) = validate_relayed_blobs(kind, &request.message) {
            warn!(client = %session.label(), "relay payload failed validation: {e}");
            return respond_or_error(
                session,
                ctx,
                index,
                &RequestSendMessageToPlayersResponse {},
            );
        }

        for player_id in request.player_ids {
            if let Some(peer) = sessions.by_player_mut(player_id) {
                if let Err(e) = peer
                    .connection
                    .send_raw(ctx.now, opcode, &request.message)
                {
                    warn!(client = %peer.label(), "failed to relay message: {e}");
                }
            }
        }

        respond_or_error(session, ctx, index, &RequestSendMessageToPlayersResponse {})
    }

    /// Resolves the push kind a relayed payload claims to be, and proves it
    /// decodes as that kind.
    fn identify_push(
        &self,
        ctx: &ServiceContext,
        payload: &[u8],
    ) -> Option<(MessageKind, u32)> {
        let envelope = PushEnvelope::decode(payload).ok()?;
        let kind = ctx.variant.opcodes().kind_of(envelope.push_message_id)?;
        if !kind.is_push() {
            return None;
        }
        PushMessage::decode(kind, payload).ok()??;
        Some((kind, envelope.push_message_id))
    }
}

/// Validates the opaque session-join blobs embedded in relayable pushes.
fn validate_relayed_blobs(
    kind: MessageKind,
    payload: &[u8],
) -> Result<(), emberward_protocol::ValidationError> {
    let Ok(Some(decoded)) = PushMessage::decode(kind, payload) else {
        return Ok(());
    };

    match decoded {
        PushMessage::PushRequestSummonSign(m) => validate_entry_list(&m.player_struct),
        PushMessage::PushRequestBreakInTarget(m) => validate_entry_list(&m.player_struct),
        PushMessage::PushRequestVisit(m) => validate_entry_list(&m.player_struct),
        PushMessage::PushRequestAcceptQuickMatch(m) => validate_entry_list(&m.player_struct),
        _ => Ok(()),
    }
}
