//! Invasions: uninvited joins into another player's world.

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    BreakInTargetData, PushRequestBreakInTarget, PushRequestRejectBreakInTarget,
    RequestBreakInTarget, RequestBreakInTargetResponse, RequestGetBreakInTargetList,
    RequestGetBreakInTargetListResponse, RequestRejectBreakInTarget,
    RequestRejectBreakInTargetResponse,
};
use emberward_protocol::{validate_entry_list, MessageKind};
use emberward_store::Database;
use tracing::{debug, warn};

use crate::handlers::{respond_or_error, HandleResult};
use crate::matching::{can_match, MatchingInput};
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};

const STAT_TOTAL_BREAK_INS: &str = "BreakIn/TotalAttempts";

pub struct BreakInManager;

impl BreakInManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_get_target_list(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetBreakInTargetList,
    ) -> HandleResult {
        let mut targets = Vec::new();

        if !ctx.config.disable_invasions {
            let params = request.matching_parameter.unwrap_or_default();
            let invader = MatchingInput::from_parameter(&params, &*ctx.variant);
            let password_present = !params.password.is_empty();
            let weapon_check = !ctx.config.disable_weapon_level_matching;
            let on_memory = ctx.variant.matches_on_soul_memory();
            let caller_id = session.player.player_id;

            for (_, other) in sessions.iter() {
                if targets.len() >= request.max_targets as usize {
                    break;
                }
                if other.player.player_id == caller_id
                    || !other.player.is_in_game()
                    || !other.player.is_invadable
                {
                    continue;
                }

                let candidate = MatchingInput::from_levels(
                    other.player.matching_level(on_memory),
                    other.player.max_weapon_level,
                );

                if can_match(
                    &ctx.config.invasion_matching,
                    invader,
                    candidate,
                    password_present,
                    weapon_check,
                ) {
                    targets.push(BreakInTargetData {
                        player_id: other.player.player_id,
                        steam_id: other.player.steam_id.clone(),
                    });
                }
            }
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetBreakInTargetListResponse {
                area_id: request.area_id,
                targets,
            },
        )
    }

    pub fn handle_break_in_target(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestBreakInTarget,
    ) -> HandleResult {
        let mut delivered = false;

        if validate_entry_list(&request.player_struct).is_err() {
            warn!(client = %session.label(), "break-in player struct failed validation");
        } else if ctx.config.disable_invasions {
            debug!(client = %session.label(), "break-in refused, invasions disabled");
        } else if let Some(target) = sessions.by_player_mut(request.player_id) {
            let push = PushRequestBreakInTarget {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestBreakInTarget),
                invader_player_id: session.player.player_id,
                invader_steam_id: session.player.steam_id.clone(),
                map_id: request.map_id,
                area_id: request.area_id,
                player_struct: request.player_struct.clone(),
            };
            match target.push(ctx, &push) {
                Ok(()) => delivered = true,
                Err(e) => warn!(client = %target.label(), "failed to push break-in: {e}"),
            }
        }

        if delivered {
            let _ = ctx.store.add_global_statistic(STAT_TOTAL_BREAK_INS, 1);
            let _ = ctx.store.add_player_statistic(
                STAT_TOTAL_BREAK_INS,
                session.player.player_id,
                1,
            );
        } else {
            let reject = PushRequestRejectBreakInTarget {
                push_message_id: ctx
                    .variant
                    .push_id(MessageKind::PushRequestRejectBreakInTarget),
                target_player_id: request.player_id,
            };
            if let Err(e) = session.push(ctx, &reject) {
                warn!(client = %session.label(), "failed to push break-in rejection: {e}");
                return HandleResult::Error;
            }
        }

        respond_or_error(session, ctx, index, &RequestBreakInTargetResponse {})
    }

    /// The invaded player turns the invader away; relay it.
    pub fn handle_reject_break_in_target(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestRejectBreakInTarget,
    ) -> HandleResult {
        if let Some(invader) = sessions.by_player_mut(request.player_id) {
            let push = PushRequestRejectBreakInTarget {
                push_message_id: ctx
                    .variant
                    .push_id(MessageKind::PushRequestRejectBreakInTarget),
                target_player_id: session.player.player_id,
            };
            if let Err(e) = invader.push(ctx, &push) {
                warn!(client = %invader.label(), "failed to relay break-in rejection: {e}");
            }
        }

        respond_or_error(session, ctx, index, &RequestRejectBreakInTargetResponse {})
    }
}
