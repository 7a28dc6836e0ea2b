//! Undead matches: a host-keyed registry of live arena matches, plus the
//! ranked ladder bookkeeping.

use std::time::{Duration, Instant};

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    MatchingParameter, PushRequestAcceptQuickMatch, PushRequestJoinQuickMatch,
    PushRequestRejectQuickMatch, QuickMatchData, RequestAcceptQuickMatch,
    RequestAcceptQuickMatchResponse, RequestJoinQuickMatch, RequestJoinQuickMatchResponse,
    RequestRegisterQuickMatch, RequestRegisterQuickMatchResponse, RequestRejectQuickMatch,
    RequestRejectQuickMatchResponse, RequestSearchQuickMatch, RequestSearchQuickMatchResponse,
    RequestSendQuickMatchResult, RequestSendQuickMatchResultResponse, RequestSendQuickMatchStart,
    RequestSendQuickMatchStartResponse, RequestUnregisterQuickMatch,
    RequestUnregisterQuickMatchResponse, RequestUpdateQuickMatch, RequestUpdateQuickMatchResponse,
};
use emberward_protocol::{validate_entry_list, MessageKind};
use emberward_store::{Database, QuickMatchLadder};
use tracing::{debug, warn};

use crate::handlers::{respond_or_error, HandleResult};
use crate::matching::can_match_params;
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};
use crate::webhook::{Notice, NoticeField, NoticeOrigin, NoticeType};

const STAT_TOTAL_HOSTED: &str = "QuickMatch/TotalHosted";
const STAT_TOTAL_JOINED: &str = "QuickMatch/TotalJoined";

/// Hosts must keep their registration warm or it expires.
const MATCH_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

pub mod mode {
    pub const DUEL: u32 = 1;
    pub const BRAWL: u32 = 2;
}

pub mod outcome {
    pub const WIN: u32 = 1;
    pub const DRAW: u32 = 2;
    pub const LOSE: u32 = 3;
}

pub struct UndeadMatch {
    pub host_player_id: u32,
    pub host_steam_id: String,
    pub mode: u32,
    pub map_id: u32,
    pub area_id: u32,
    pub matching: MatchingParameter,
    pub started: bool,
    pub last_update: Instant,
}

pub struct QuickMatchManager {
    matches: Vec<UndeadMatch>,
}

fn ladder_of(mode: u32) -> QuickMatchLadder {
    if mode == mode::BRAWL {
        QuickMatchLadder::Brawl
    } else {
        QuickMatchLadder::Duel
    }
}

/// Applies a result's XP and carries over rank thresholds one at a time.
/// Ranks never decrease and clamp at the top of the table.
fn apply_xp(table: &[u32], rank: u32, xp: u32, gained: u32) -> (u32, u32) {
    let mut rank = rank;
    let mut xp = xp.saturating_add(gained);

    while let Some(&threshold) = table.get(rank as usize + 1) {
        if xp < threshold {
            break;
        }
        xp -= threshold;
        rank += 1;
    }

    (rank, xp)
}

impl QuickMatchManager {
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
        }
    }

    fn remove_registration(&mut self, host_player_id: u32, mode: u32) {
        self.matches
            .retain(|m| !(m.host_player_id == host_player_id && m.mode == mode));
    }

    pub fn handle_register(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestRegisterQuickMatch,
    ) -> HandleResult {
        // Re-registration replaces the previous record.
        self.remove_registration(session.player.player_id, request.mode);

        self.matches.push(UndeadMatch {
            host_player_id: session.player.player_id,
            host_steam_id: session.player.steam_id.clone(),
            mode: request.mode,
            map_id: request.map_id,
            area_id: request.area_id,
            matching: request.matching_parameter.unwrap_or_default(),
            started: false,
            last_update: ctx.now,
        });

        let _ = ctx.store.add_global_statistic(STAT_TOTAL_HOSTED, 1);

        if ctx.config.webhook_notices.undead_match {
            ctx.webhook.send(Notice {
                origin: NoticeOrigin {
                    player_id: session.player.player_id,
                    steam_id: session.player.steam_id.clone(),
                    character_name: session.player.character_name.clone(),
                },
                kind: NoticeType::UndeadMatch,
                text: format!(
                    "Hosting an undead match in '{}'.",
                    ctx.variant.area_name(request.area_id)
                ),
                fields: vec![NoticeField {
                    name: "Mode".into(),
                    value: if request.mode == mode::BRAWL {
                        "Brawl".into()
                    } else {
                        "Duel".into()
                    },
                    inline: true,
                }],
                thumbnail_url: None,
            });
        }

        respond_or_error(session, ctx, index, &RequestRegisterQuickMatchResponse {})
    }

    pub fn handle_update(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestUpdateQuickMatch,
    ) -> HandleResult {
        let host = session.player.player_id;
        if let Some(registered) = self
            .matches
            .iter_mut()
            .find(|m| m.host_player_id == host && m.mode == request.mode)
        {
            registered.last_update = ctx.now;
        }

        respond_or_error(session, ctx, index, &RequestUpdateQuickMatchResponse {})
    }

    pub fn handle_unregister(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestUnregisterQuickMatch,
    ) -> HandleResult {
        self.remove_registration(session.player.player_id, request.mode);
        respond_or_error(session, ctx, index, &RequestUnregisterQuickMatchResponse {})
    }

    pub fn handle_search(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestSearchQuickMatch,
    ) -> HandleResult {
        let params = request.matching_parameter.unwrap_or_default();
        let caller = session.player.player_id;

        let mut matches: Vec<QuickMatchData> = self
            .matches
            .iter()
            .filter(|m| {
                !m.started
                    && m.host_player_id != caller
                    && m.mode == request.mode
                    && m.map_id == request.map_id
                    && m.area_id == request.area_id
                    && can_match_params(
                        &ctx.config.undead_match_matching,
                        &params,
                        &m.matching,
                        &*ctx.variant,
                        !ctx.config.disable_weapon_level_matching,
                    )
            })
            .take(request.max_results.max(1) as usize)
            .map(|m| QuickMatchData {
                host_player_id: m.host_player_id,
                host_steam_id: m.host_steam_id.clone(),
                mode: m.mode,
                map_id: m.map_id,
                area_id: m.area_id,
            })
            .collect();

        // The client chokes on an empty result set; give it a sentinel.
        if matches.is_empty() {
            matches.push(QuickMatchData {
                host_player_id: 0,
                host_steam_id: String::new(),
                mode: request.mode,
                map_id: request.map_id,
                area_id: request.area_id,
            });
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestSearchQuickMatchResponse { matches },
        )
    }

    pub fn handle_join(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestJoinQuickMatch,
    ) -> HandleResult {
        let registered = self
            .matches
            .iter()
            .any(|m| m.host_player_id == request.host_player_id && m.mode == request.mode);

        let mut delivered = false;
        if registered && validate_entry_list(&request.player_struct).is_ok() {
            if let Some(host) = sessions.by_player_mut(request.host_player_id) {
                let push = PushRequestJoinQuickMatch {
                    push_message_id: ctx.variant.push_id(MessageKind::PushRequestJoinQuickMatch),
                    join_player_id: session.player.player_id,
                    join_steam_id: session.player.steam_id.clone(),
                    character_id: request.character_id,
                    mode: request.mode,
                };
                match host.push(ctx, &push) {
                    Ok(()) => delivered = true,
                    Err(e) => warn!(client = %host.label(), "failed to push join: {e}"),
                }
            }
        }

        if delivered {
            let _ = ctx.store.add_global_statistic(STAT_TOTAL_JOINED, 1);
        } else {
            let reject = PushRequestRejectQuickMatch {
                push_message_id: ctx
                    .variant
                    .push_id(MessageKind::PushRequestRejectQuickMatch),
                target_player_id: request.host_player_id,
                mode: request.mode,
            };
            if let Err(e) = session.push(ctx, &reject) {
                warn!(client = %session.label(), "failed to push join rejection: {e}");
                return HandleResult::Error;
            }
        }

        respond_or_error(session, ctx, index, &RequestJoinQuickMatchResponse {})
    }

    pub fn handle_accept(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestAcceptQuickMatch,
    ) -> HandleResult {
        if validate_entry_list(&request.player_struct).is_err() {
            warn!(client = %session.label(), "accept player struct failed validation");
            return respond_or_error(session, ctx, index, &RequestAcceptQuickMatchResponse {});
        }

        if let Some(joiner) = sessions.by_player_mut(request.join_player_id) {
            let push = PushRequestAcceptQuickMatch {
                push_message_id: ctx
                    .variant
                    .push_id(MessageKind::PushRequestAcceptQuickMatch),
                host_player_id: session.player.player_id,
                player_struct: request.player_struct.clone(),
            };
            if let Err(e) = joiner.push(ctx, &push) {
                warn!(client = %joiner.label(), "failed to relay accept: {e}");
            }
        }

        respond_or_error(session, ctx, index, &RequestAcceptQuickMatchResponse {})
    }

    pub fn handle_reject(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestRejectQuickMatch,
    ) -> HandleResult {
        if let Some(joiner) = sessions.by_player_mut(request.join_player_id) {
            let push = PushRequestRejectQuickMatch {
                push_message_id: ctx
                    .variant
                    .push_id(MessageKind::PushRequestRejectQuickMatch),
                target_player_id: session.player.player_id,
                mode: request.mode,
            };
            if let Err(e) = joiner.push(ctx, &push) {
                warn!(client = %joiner.label(), "failed to relay reject: {e}");
            }
        }

        respond_or_error(session, ctx, index, &RequestRejectQuickMatchResponse {})
    }

    /// The match began; it is no longer discoverable.
    pub fn handle_send_start(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestSendQuickMatchStart,
    ) -> HandleResult {
        self.remove_registration(session.player.player_id, request.mode);
        respond_or_error(session, ctx, index, &RequestSendQuickMatchStartResponse {})
    }

    pub fn handle_send_result(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestSendQuickMatchResult,
    ) -> HandleResult {
        let ladder = ladder_of(request.mode);
        let player_id = session.player.player_id;
        let character_id = request.character_id;

        let (rank, xp) = match ctx
            .store
            .get_quick_match_rank(player_id, character_id, ladder)
        {
            Ok(current) => current,
            Err(e) => {
                warn!(client = %session.label(), "failed to read quick match rank: {e:#}");
                return HandleResult::Error;
            }
        };

        let gained = match request.result {
            outcome::WIN => ctx.config.quick_match_win_xp,
            outcome::DRAW => ctx.config.quick_match_draw_xp,
            outcome::LOSE => ctx.config.quick_match_lose_xp,
            _ => 0,
        };

        let (rank, xp) = apply_xp(&ctx.config.quick_match_rank_xp, rank, xp, gained);

        if let Err(e) = ctx
            .store
            .set_quick_match_rank(player_id, character_id, ladder, rank, xp)
        {
            warn!(client = %session.label(), "failed to persist quick match rank: {e:#}");
            return HandleResult::Error;
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestSendQuickMatchResultResponse { rank, xp },
        )
    }

    /// Expires registrations whose host stopped sending keepalives.
    pub fn poll(&mut self, ctx: &ServiceContext) {
        let before = self.matches.len();
        self.matches
            .retain(|m| ctx.now.duration_since(m.last_update) <= MATCH_KEEPALIVE_TIMEOUT);
        if self.matches.len() != before {
            debug!(
                expired = before - self.matches.len(),
                "expired stale quick matches"
            );
        }
    }

    pub fn on_lost_player(&mut self, session: &ClientSession) {
        let host = session.player.player_id;
        if host != 0 {
            self.matches.retain(|m| m.host_player_id != host);
        }
    }

    #[cfg(test)]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn xp_carries_into_next_rank() {
        let table = [0, 100, 250];
        assert_eq!(apply_xp(&table, 0, 0, 120), (1, 20));
    }

    #[test]
    fn xp_can_climb_multiple_ranks() {
        let table = [0, 100, 250, 500];
        assert_eq!(apply_xp(&table, 0, 0, 400), (2, 50));
    }

    #[test]
    fn xp_clamps_at_top_rank() {
        let table = [0, 100];
        assert_eq!(apply_xp(&table, 1, 10, 1000), (1, 1010));
    }

    #[test]
    fn losses_never_lower_a_rank() {
        let table = [0, 100, 250];
        assert_eq!(apply_xp(&table, 1, 5, 0), (1, 5));
    }
}
