//! Login and announcements.

use std::time::Duration;

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    AnnounceMessageData, PlayerInfoUploadConfigPushMessage, RequestGetAnnounceMessageList,
    RequestGetAnnounceMessageListResponse, RequestWaitForUserLogin,
    RequestWaitForUserLoginResponse,
};
use emberward_protocol::MessageKind;
use emberward_store::Database;
use tracing::{info, warn};

use crate::handlers::{respond_or_error, HandleResult};
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};

/// Delay between a ban announcement and the forced disconnect, giving the
/// client time to display it.
const BAN_DISCONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct BootManager;

impl BootManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_wait_for_user_login(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestWaitForUserLogin,
    ) -> HandleResult {
        let mut steam_id = request.steam_id;
        if steam_id.is_empty() || steam_id.len() > 32 {
            warn!(client = %session.label(), "rejecting login with malformed account id");
            return HandleResult::Error;
        }

        // Debug builds allow a second session on the same account by
        // suffixing it, which makes local multi-client testing possible. In
        // release the newer session wins and the older one is closed.
        let mut player_id = match ctx.store.find_or_create_player(&steam_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(client = %session.label(), "player lookup failed: {e:#}");
                return HandleResult::Error;
            }
        };

        if sessions.addr_of_player(player_id).is_some() {
            if cfg!(debug_assertions) {
                steam_id = format!("{steam_id}+");
                player_id = match ctx.store.find_or_create_player(&steam_id) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(client = %session.label(), "player lookup failed: {e:#}");
                        return HandleResult::Error;
                    }
                };
            } else if let Some(previous) =
                sessions.bind_player(player_id, session.connection.remote_addr())
            {
                if let Some(old) = sessions.get_mut(previous) {
                    info!(client = %old.label(), "closing superseded session");
                    old.connection.close();
                }
            }
        }

        session.player.steam_id = steam_id.clone();
        session.player.player_id = player_id;
        sessions.bind_player(player_id, session.connection.remote_addr());

        info!(client = %session.label(), player_id, "player logged in");

        let response = RequestWaitForUserLoginResponse {
            steam_id,
            player_id,
        };
        if respond_or_error(session, ctx, index, &response) == HandleResult::Error {
            return HandleResult::Error;
        }

        // Tell the client how to feed us its rolling status.
        let upload_config = PlayerInfoUploadConfigPushMessage {
            push_message_id: ctx
                .variant
                .push_id(MessageKind::PlayerInfoUploadConfigPushMessage),
            upload_interval: ctx.config.player_status_upload_interval,
            upload_delay: ctx.config.player_status_upload_delay,
            field_mask: ctx.variant.upload_field_mask().to_vec(),
        };
        if let Err(e) = session.push(ctx, &upload_config) {
            warn!(client = %session.label(), "failed to push upload config: {e}");
            return HandleResult::Error;
        }

        HandleResult::Handled
    }

    pub fn handle_get_announce_message_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetAnnounceMessageList,
    ) -> HandleResult {
        let steam_id = session.player.steam_id.clone();

        let banned = ctx.store.is_banned(&steam_id).unwrap_or(false);
        let penalty = ctx.store.get_anti_cheat_penalty(&steam_id).unwrap_or(0.0);

        let chosen: Vec<AnnounceMessageData> = if banned {
            session.banned = true;
            session.disconnect_at = Some(ctx.now + BAN_DISCONNECT_DELAY);
            info!(client = %session.label(), "banned player connected, scheduling disconnect");

            vec![AnnounceMessageData {
                index: 0,
                header: ctx.config.ban_announcement.header.clone(),
                message: ctx.config.ban_announcement.body.clone(),
            }]
        } else if penalty > ctx.config.anti_cheat_warning_threshold {
            vec![AnnounceMessageData {
                index: 0,
                header: ctx.config.warning_announcement.header.clone(),
                message: ctx.config.warning_announcement.body.clone(),
            }]
        } else {
            ctx.config
                .announcements
                .iter()
                .take(request.max_entries.max(1) as usize)
                .enumerate()
                .map(|(i, a)| AnnounceMessageData {
                    index: i as u32,
                    header: a.header.clone(),
                    message: a.body.clone(),
                })
                .collect()
        };

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetAnnounceMessageListResponse {
                announcements: chosen,
            },
        )
    }
}
