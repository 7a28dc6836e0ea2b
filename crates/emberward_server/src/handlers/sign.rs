//! Summon signs: creation, discovery, summoning, rejection, and the
//! right-matching-area census.

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    AreaPopulationInfo, MatchingParameter, PushRequestRejectSign, PushRequestRemoveSign,
    PushRequestSummonSign, RequestCreateSign, RequestCreateSignResponse, RequestGetRightMatchingArea,
    RequestGetRightMatchingAreaResponse, RequestGetSignList, RequestGetSignListResponse,
    RequestRejectSign, RequestRejectSignResponse, RequestRemoveSign, RequestRemoveSignResponse,
    RequestSummonSign, RequestSummonSignResponse, RequestUpdateSign, RequestUpdateSignResponse,
    SignData, SignInfo,
};
use emberward_protocol::{validate_entry_list, MessageKind};
use emberward_store::Database;
use rand::rngs::StdRng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::config::ShardConfig;
use crate::handlers::{respond_or_error, HandleResult};
use crate::live_cache::{CacheKey, LiveCache};
use crate::matching::{can_match, can_match_params, MatchingInput};
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap, SignRef};
use crate::webhook::{Notice, NoticeField, NoticeOrigin, NoticeType};

const STAT_TOTAL_CREATED: &str = "Sign/TotalCreated";
const STAT_TOTAL_SUMMONED: &str = "Sign/TotalSummoned";

/// A pending summon that has not resolved within this window is cleared so
/// the sign becomes usable again.
const PENDING_SUMMON_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Sign type discriminators on the wire.
pub mod sign_type {
    /// Cooperative summon.
    pub const WHITE: u32 = 1;
    /// Adversarial summon.
    pub const RED: u32 = 2;
}

/// A live summon sign. Owned by the cache; the owning session holds a
/// [`SignRef`] and aware peers are tracked by id only, never by pointer.
pub struct SummonSign {
    pub sign_id: u32,
    pub key: CacheKey,
    pub player_id: u32,
    pub steam_id: String,
    pub sign_type: u32,
    pub player_struct: Vec<u8>,
    pub matching: MatchingParameter,
    /// At most one pending summoner at a time.
    pub being_summoned_by: Option<u32>,
    /// When the pending summon began, for timeout clearing.
    pub summon_started_at: Option<std::time::Instant>,
    pub aware_player_ids: FxHashSet<u32>,
}

pub struct SignManager {
    cache: LiveCache<SummonSign>,
    next_sign_id: u32,
}

impl SignManager {
    pub fn new(config: &ShardConfig) -> Self {
        Self {
            cache: LiveCache::new(config.summon_sign_max_entries_per_area),
            // Ids are never reused within a shard's lifetime.
            next_sign_id: 1000,
        }
    }

    /// Whether `candidate`'s sign is visible to a searcher with `host`
    /// parameters, honoring the per-type feature toggles.
    fn can_match_sign(
        &self,
        ctx: &ServiceContext,
        host: &MatchingParameter,
        sign: &SummonSign,
    ) -> bool {
        let disabled = if sign.sign_type == sign_type::RED {
            ctx.config.disable_invasions
        } else {
            ctx.config.disable_coop
        };
        if disabled {
            return false;
        }

        can_match_params(
            &ctx.config.summon_sign_matching,
            host,
            &sign.matching,
            &*ctx.variant,
            !ctx.config.disable_weapon_level_matching,
        )
    }

    pub fn handle_create_sign(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestCreateSign,
    ) -> HandleResult {
        // No session record is embedded in sign metadata, but the entry-list
        // framing must still hold up.
        if let Err(e) = validate_entry_list(&request.player_struct) {
            warn!(client = %session.label(), "sign player struct failed validation: {e}");
            // Accept silently with no sign id and cache nothing.
            return respond_or_error(session, ctx, index, &RequestCreateSignResponse::default());
        }

        let key = CacheKey::new(request.area_id, request.cell_id);
        let sign_id = self.next_sign_id;
        self.next_sign_id += 1;

        let matching = request.matching_parameter.unwrap_or_default();
        let public = matching.password.is_empty();

        let sign = SummonSign {
            sign_id,
            key,
            player_id: session.player.player_id,
            steam_id: session.player.steam_id.clone(),
            sign_type: request.sign_type,
            player_struct: request.player_struct,
            matching,
            being_summoned_by: None,
            summon_started_at: None,
            aware_player_ids: FxHashSet::default(),
        };

        self.cache.add(key, sign_id, sign);
        session.active_signs.push(SignRef { key, sign_id });

        let _ = ctx.store.add_global_statistic(STAT_TOTAL_CREATED, 1);
        let _ = ctx
            .store
            .add_player_statistic(STAT_TOTAL_CREATED, session.player.player_id, 1);

        if ctx.config.webhook_notices.summon_sign && public {
            let pvp = request.sign_type == sign_type::RED;
            ctx.webhook.send(Notice {
                origin: NoticeOrigin {
                    player_id: session.player.player_id,
                    steam_id: session.player.steam_id.clone(),
                    character_name: session.player.character_name.clone(),
                },
                kind: if pvp {
                    NoticeType::SummonSignPvp
                } else {
                    NoticeType::SummonSign
                },
                text: format!(
                    "Placed a public {} sign in '{}'.",
                    if pvp { "red summon" } else { "summon" },
                    ctx.variant.area_name(request.area_id)
                ),
                fields: vec![
                    NoticeField {
                        name: "Soul Level".into(),
                        value: session.player.soul_level.to_string(),
                        inline: true,
                    },
                    NoticeField {
                        name: "Weapon Level".into(),
                        value: session.player.max_weapon_level.to_string(),
                        inline: true,
                    },
                ],
                thumbnail_url: None,
            });
        }

        respond_or_error(session, ctx, index, &RequestCreateSignResponse { sign_id })
    }

    pub fn handle_get_sign_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        rng: &mut StdRng,
        index: u32,
        request: RequestGetSignList,
    ) -> HandleResult {
        let caller_id = session.player.player_id;
        let host_params = request.matching_parameter.unwrap_or_default();

        let mut response = RequestGetSignListResponse::default();
        let mut remaining = request.max_signs as usize;

        for area in &request.search_areas {
            if remaining == 0 {
                break;
            }

            let already_have: FxHashSet<u32> = area
                .already_have_signs
                .iter()
                .map(|info| info.sign_id)
                .collect();

            let key = CacheKey::new(area.area_id, area.cell_id);
            let wanted = remaining.min(area.max_signs as usize);

            let picked: Vec<u32> = self
                .cache
                .recent_sample(key, wanted, rng, |sign| {
                    sign.player_id != caller_id && self.can_match_sign(ctx, &host_params, sign)
                })
                .into_iter()
                .map(|sign| sign.sign_id)
                .collect();

            for sign_id in picked {
                let Some(sign) = self.cache.find_mut(key, sign_id) else {
                    continue;
                };

                if already_have.contains(&sign.sign_id) {
                    // The client already holds the payload; id alone is
                    // enough to keep it alive.
                    response.sign_info_without_data.push(SignInfo {
                        player_id: sign.player_id,
                        sign_id: sign.sign_id,
                    });
                } else {
                    response.sign_data.push(SignData {
                        sign_info: Some(SignInfo {
                            player_id: sign.player_id,
                            sign_id: sign.sign_id,
                        }),
                        area_id: sign.key.area_id,
                        cell_id: sign.key.cell_id,
                        matching_parameter: Some(sign.matching.clone()),
                        player_struct: sign.player_struct.clone(),
                        steam_id: sign.steam_id.clone(),
                        sign_type: sign.sign_type,
                    });
                }

                // Track awareness so removal can be fanned out later.
                sign.aware_player_ids.insert(caller_id);
                remaining -= 1;
            }
        }

        respond_or_error(session, ctx, index, &response)
    }

    pub fn handle_summon_sign(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestSummonSign,
    ) -> HandleResult {
        let caller_id = session.player.player_id;
        let sign_info = request.sign_info.unwrap_or_default();
        let key = CacheKey::new(request.area_id, request.cell_id);

        // The player struct here carries the session-join record the sign
        // owner will use to connect; it must be pristine.
        let mut success = validate_entry_list(&request.player_struct).is_ok();
        if !success {
            warn!(client = %session.label(), "summon player struct failed validation");
        }

        if success {
            match self.cache.find(key, sign_info.sign_id) {
                None => {
                    debug!(
                        client = %session.label(),
                        sign_id = sign_info.sign_id,
                        "summon of missing sign rejected"
                    );
                    success = false;
                }
                Some(sign) if sign.being_summoned_by.is_some() => {
                    debug!(
                        client = %session.label(),
                        sign_id = sign_info.sign_id,
                        "sign already being summoned, rejecting"
                    );
                    success = false;
                }
                Some(_) => {}
            }
        }

        if success {
            let sign = self
                .cache
                .find_mut(key, sign_info.sign_id)
                .expect("sign existence checked above");

            match sessions.by_player_mut(sign.player_id) {
                Some(owner) => {
                    sign.being_summoned_by = Some(caller_id);
                    sign.summon_started_at = Some(ctx.now);
                    let push = PushRequestSummonSign {
                        push_message_id: ctx.variant.push_id(MessageKind::PushRequestSummonSign),
                        summoner_player_id: caller_id,
                        summoner_steam_id: session.player.steam_id.clone(),
                        sign_id: sign.sign_id,
                        player_struct: request.player_struct.clone(),
                    };
                    if let Err(e) = owner.push(ctx, &push) {
                        warn!(client = %owner.label(), "failed to push summon: {e}");
                        sign.being_summoned_by = None;
                        sign.summon_started_at = None;
                        success = false;
                    }
                }
                None => {
                    // Owner session raced away; the sign is garbage now.
                    success = false;
                }
            }
        }

        if success {
            let _ = ctx.store.add_global_statistic(STAT_TOTAL_SUMMONED, 1);
        } else {
            let reject = PushRequestRejectSign {
                push_message_id: ctx.variant.push_id(MessageKind::PushRequestRejectSign),
                sign_id: sign_info.sign_id,
            };
            if let Err(e) = session.push(ctx, &reject) {
                warn!(client = %session.label(), "failed to push sign rejection: {e}");
                return HandleResult::Error;
            }
        }

        respond_or_error(session, ctx, index, &RequestSummonSignResponse {})
    }

    /// The sign owner turns a pending summoner away.
    pub fn handle_reject_sign(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestRejectSign,
    ) -> HandleResult {
        let owned = session
            .active_signs
            .iter()
            .find(|sign| sign.sign_id == request.sign_id)
            .copied();

        if let Some(reference) = owned {
            if let Some(sign) = self.cache.find_mut(reference.key, reference.sign_id) {
                sign.summon_started_at = None;
                if let Some(summoner_id) = sign.being_summoned_by.take() {
                    if let Some(summoner) = sessions.by_player_mut(summoner_id) {
                        let push = PushRequestRejectSign {
                            push_message_id: ctx
                                .variant
                                .push_id(MessageKind::PushRequestRejectSign),
                            sign_id: request.sign_id,
                        };
                        if let Err(e) = summoner.push(ctx, &push) {
                            warn!(client = %summoner.label(), "failed to relay sign rejection: {e}");
                        }
                    }
                }
            }
        } else {
            warn!(
                client = %session.label(),
                sign_id = request.sign_id,
                "player rejected a sign they do not own"
            );
        }

        respond_or_error(session, ctx, index, &RequestRejectSignResponse {})
    }

    pub fn handle_remove_sign(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestRemoveSign,
    ) -> HandleResult {
        let key = CacheKey::area(request.area_id);
        let position = session
            .active_signs
            .iter()
            .position(|sign| sign.sign_id == request.sign_id);

        match position {
            Some(at) => {
                let reference = session.active_signs.remove(at);
                // The request's area key wins over the stored one only if it
                // actually finds the sign; owners can race area transitions.
                let removed = self
                    .cache
                    .remove(key, request.sign_id)
                    .or_else(|| self.cache.remove(reference.key, reference.sign_id));
                if let Some(sign) = removed {
                    self.notify_aware_of_removal(ctx, sessions, &sign);
                }
            }
            None => {
                warn!(
                    client = %session.label(),
                    sign_id = request.sign_id,
                    "player attempted to remove a sign they do not own"
                );
            }
        }

        respond_or_error(session, ctx, index, &RequestRemoveSignResponse {})
    }

    /// Keepalive. Signs live until removed or their owner disconnects, so
    /// nothing changes here.
    pub fn handle_update_sign(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        _request: RequestUpdateSign,
    ) -> HandleResult {
        respond_or_error(session, ctx, index, &RequestUpdateSignResponse {})
    }

    /// Census of where matchable players currently are, normalized into the
    /// 0..=5 population scale the client renders.
    pub fn handle_get_right_matching_area(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetRightMatchingArea,
    ) -> HandleResult {
        let params = request.matching_parameter.unwrap_or_default();
        let caller = MatchingInput::from_parameter(&params, &*ctx.variant);
        let password_present = !params.password.is_empty();
        let weapon_check = !ctx.config.disable_weapon_level_matching;
        let on_memory = ctx.variant.matches_on_soul_memory();

        let mut population: FxHashMap<u32, u32> = FxHashMap::default();
        for (_, other) in sessions.iter() {
            if !other.player.is_in_game() {
                continue;
            }

            let candidate = MatchingInput::from_levels(
                other.player.matching_level(on_memory),
                other.player.max_weapon_level,
            );

            let eligible = can_match(
                &ctx.config.summon_sign_matching,
                caller,
                candidate,
                password_present,
                weapon_check,
            ) || can_match(
                &ctx.config.invasion_matching,
                caller,
                candidate,
                password_present,
                weapon_check,
            );

            if eligible {
                *population.entry(other.player.current_area_id).or_default() += 1;
            }
        }

        let max_count = population.values().copied().max().unwrap_or(0);
        let areas = population
            .into_iter()
            .map(|(area_id, count)| AreaPopulationInfo {
                area_id,
                // Busiest area reports five; everything else scales with a
                // ceiling so one player never rounds to zero.
                population: if max_count == 0 {
                    0
                } else {
                    (count * 5).div_ceil(max_count)
                },
            })
            .collect();

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetRightMatchingAreaResponse { areas },
        )
    }

    /// Fans a removal notice out to everyone who ever saw the sign.
    fn notify_aware_of_removal(
        &self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        sign: &SummonSign,
    ) {
        for &aware_id in &sign.aware_player_ids {
            if aware_id == sign.player_id {
                continue;
            }
            if let Some(peer) = sessions.by_player_mut(aware_id) {
                let push = PushRequestRemoveSign {
                    push_message_id: ctx.variant.push_id(MessageKind::PushRequestRemoveSign),
                    owner_player_id: sign.player_id,
                    sign_id: sign.sign_id,
                };
                if let Err(e) = peer.push(ctx, &push) {
                    warn!(client = %peer.label(), "failed to push sign removal: {e}");
                }
            }
        }
    }

    /// Session teardown: drop the player's own signs (notifying aware
    /// peers) and clear any pending summons they were holding on other
    /// players' signs.
    pub fn on_lost_player(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &ClientSession,
    ) {
        for reference in &session.active_signs {
            if let Some(sign) = self.cache.remove(reference.key, reference.sign_id) {
                self.notify_aware_of_removal(ctx, sessions, &sign);
            }
        }

        let lost_id = session.player.player_id;
        if lost_id != 0 {
            self.cache.for_each_mut(|_, sign| {
                if sign.being_summoned_by == Some(lost_id) {
                    sign.being_summoned_by = None;
                    sign.summon_started_at = None;
                }
            });
        }
    }

    /// A summoner that went quiet releases the sign for others.
    pub fn poll(&mut self, ctx: &ServiceContext) {
        self.cache.for_each_mut(|_, sign| {
            let stale = sign
                .summon_started_at
                .is_some_and(|at| ctx.now.duration_since(at) > PENDING_SUMMON_TIMEOUT);
            if stale {
                debug!(sign_id = sign.sign_id, "pending summon timed out");
                sign.being_summoned_by = None;
                sign.summon_started_at = None;
            }
        });
    }

    #[cfg(test)]
    pub fn sign_count(&self) -> usize {
        self.cache.total_entries()
    }
}
