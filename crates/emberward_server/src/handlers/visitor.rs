//! Covenant auto-summons. Same shape as break-in, keyed by visitor pool.

use emberward_game::{GameVariant, VisitorPool};
use emberward_protocol::messages::{
    PushRequestRejectVisit, PushRequestRemoveVisitor, PushRequestVisit, RequestGetVisitorList,
    RequestGetVisitorListResponse, RequestRejectVisit, RequestRejectVisitResponse, RequestVisit,
    RequestVisitResponse, VisitorData,
};
use emberward_protocol::{validate_entry_list, MessageKind};
use tracing::{debug, warn};

use crate::handlers::{respond_or_error, HandleResult};
use crate::matching::{can_match, MatchingInput};
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};

pub struct VisitorManager;

impl VisitorManager {
    pub fn new() -> Self {
        Self
    }

    /// Whether the pool's interactions are currently switched off.
    fn pool_disabled(ctx: &ServiceContext, pool: VisitorPool) -> bool {
        match pool {
            VisitorPool::Watchdog | VisitorPool::Aldrich => {
                ctx.config.disable_invasion_auto_summon
            }
            VisitorPool::Coop | VisitorPool::Blue | VisitorPool::Church => {
                ctx.config.disable_coop
            }
            VisitorPool::None => true,
        }
    }

    pub fn handle_get_visitor_list(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetVisitorList,
    ) -> HandleResult {
        let pool = VisitorPool::from_u32(request.visitor_pool);
        let mut visitors = Vec::new();

        if !Self::pool_disabled(ctx, pool) {
            let params = request.matching_parameter.unwrap_or_default();
            let host = MatchingInput::from_parameter(&params, &*ctx.variant);
            let password_present = !params.password.is_empty();
            let weapon_check = !ctx.config.disable_weapon_level_matching;
            let on_memory = ctx.variant.matches_on_soul_memory();
            let caller_id = session.player.player_id;

            for (_, other) in sessions.iter() {
                if visitors.len() >= request.max_visitors as usize {
                    break;
                }
                if other.player.player_id == caller_id
                    || !other.player.is_in_game()
                    || other.player.visitor_pool != Some(pool)
                {
                    continue;
                }

                let candidate = MatchingInput::from_levels(
                    other.player.matching_level(on_memory),
                    other.player.max_weapon_level,
                );

                if can_match(
                    &ctx.config.visitor_matching,
                    host,
                    candidate,
                    password_present,
                    weapon_check,
                ) {
                    visitors.push(VisitorData {
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
            &RequestGetVisitorListResponse {
                area_id: request.area_id,
                visitors,
            },
        )
    }

    pub fn handle_visit(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestVisit,
    ) -> HandleResult {
        let pool = VisitorPool::from_u32(request.visitor_pool);
        let mut delivered = false;

        if validate_entry_list(&request.player_struct).is_err() {
            warn!(client = %session.label(), "visit player struct failed validation");
        } else if Self::pool_disabled(ctx, pool) {
            debug!(client = %session.label(), "visit refused, pool disabled");
        } else if let Some(target) = sessions.by_player_mut(request.player_id) {
            let push = PushRequestVisit {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestVisit),
                visitor_player_id: session.player.player_id,
                visitor_steam_id: session.player.steam_id.clone(),
                visitor_pool: request.visitor_pool,
                map_id: request.map_id,
                area_id: request.area_id,
                player_struct: request.player_struct.clone(),
            };
            match target.push(ctx, &push) {
                Ok(()) => delivered = true,
                Err(e) => warn!(client = %target.label(), "failed to push visit: {e}"),
            }
        }

        if delivered {
            // The accept path ends with the caller dropping this visitor
            // from its candidate pool.
            let remove = PushRequestRemoveVisitor {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestRemoveVisitor),
                player_id: request.player_id,
                visitor_pool: request.visitor_pool,
            };
            if let Err(e) = session.push(ctx, &remove) {
                warn!(client = %session.label(), "failed to push visitor removal: {e}");
            }
        } else {
            let reject = PushRequestRejectVisit {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestRejectVisit),
                target_player_id: request.player_id,
                visitor_pool: request.visitor_pool,
            };
            if let Err(e) = session.push(ctx, &reject) {
                warn!(client = %session.label(), "failed to push visit rejection: {e}");
                return HandleResult::Error;
            }
        }

        respond_or_error(session, ctx, index, &RequestVisitResponse {})
    }

    pub fn handle_reject_visit(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestRejectVisit,
    ) -> HandleResult {
        if let Some(visitor) = sessions.by_player_mut(request.player_id) {
            let push = PushRequestRejectVisit {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestRejectVisit),
                target_player_id: session.player.player_id,
                visitor_pool: request.visitor_pool,
            };
            if let Err(e) = visitor.push(ctx, &push) {
                warn!(client = %visitor.label(), "failed to relay visit rejection: {e}");
            }
        }

        respond_or_error(session, ctx, index, &RequestRejectVisitResponse {})
    }
}
