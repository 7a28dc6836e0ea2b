//! Player-authored ground messages: bounded per-area cache over the durable
//! store.

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    BloodMessageEvaluationData, BloodMessageInfo, PushRequestEvaluateBloodMessage,
    RequestEvaluateBloodMessage, RequestEvaluateBloodMessageResponse,
    RequestGetBloodMessageEvaluation, RequestGetBloodMessageEvaluationResponse,
    RequestGetBloodMessageList, RequestGetBloodMessageListResponse, RequestReCreateBloodMessageList,
    RequestReCreateBloodMessageListResponse, RequestReentryBloodMessage,
    RequestReentryBloodMessageResponse, RequestRemoveBloodMessage,
    RequestRemoveBloodMessageResponse,
};
use emberward_protocol::{validate_entry_list, MessageKind};
use emberward_store::{BloodMessageRecord, Database};
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::ShardConfig;
use crate::handlers::{respond_or_error, HandleResult};
use crate::live_cache::{CacheKey, LiveCache};
use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};

const STAT_TOTAL_CREATED: &str = "BloodMessage/TotalCreated";
const STAT_TOTAL_EVALUATED: &str = "BloodMessage/TotalEvaluated";

#[derive(Clone)]
pub struct CachedBloodMessage {
    pub id: u32,
    pub key: CacheKey,
    pub player_id: u32,
    pub steam_id: String,
    pub character_id: Option<u32>,
    pub data: Vec<u8>,
    pub rating_good: u32,
    pub rating_poor: u32,
}

impl From<BloodMessageRecord> for CachedBloodMessage {
    fn from(record: BloodMessageRecord) -> Self {
        Self {
            id: record.id,
            key: CacheKey::new(record.area_id, record.cell_id),
            player_id: record.player_id,
            steam_id: record.steam_id,
            character_id: record.character_id,
            data: record.data,
            rating_good: record.rating_good,
            rating_poor: record.rating_poor,
        }
    }
}

impl CachedBloodMessage {
    fn to_info(&self) -> BloodMessageInfo {
        BloodMessageInfo {
            message_id: self.id,
            player_id: self.player_id,
            steam_id: self.steam_id.clone(),
            character_id: self.character_id,
            area_id: self.key.area_id,
            cell_id: self.key.cell_id,
            data: self.data.clone(),
            rating_good: self.rating_good,
            rating_poor: self.rating_poor,
        }
    }
}

pub struct BloodMessageManager {
    cache: LiveCache<CachedBloodMessage>,
    /// Fallback ids when the store cannot allocate one; counts downward
    /// through the live-only range.
    next_fallback_id: u32,
}

impl BloodMessageManager {
    pub fn new(config: &ShardConfig) -> Self {
        Self {
            cache: LiveCache::new(config.blood_message_max_entries_per_area),
            next_fallback_id: u32::MAX / 2 + u32::MAX / 4,
        }
    }

    pub fn prime(&mut self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let per_area = ctx.config.blood_message_prime_count_per_area;
        for area_id in ctx.store.blood_message_areas()? {
            for record in ctx.store.recent_blood_messages(area_id, per_area)? {
                let cached = CachedBloodMessage::from(record);
                self.cache.add(cached.key, cached.id, cached);
            }
        }
        debug!(entries = self.cache.total_entries(), "primed blood message cache");
        Ok(())
    }

    fn find_cached_or_stored(&mut self, ctx: &ServiceContext, key: CacheKey, id: u32) -> Option<CachedBloodMessage> {
        if let Some(found) = self.cache.find(key, id) {
            return Some(found.clone());
        }
        let record = ctx.store.find_blood_message(id).ok().flatten()?;
        let cached = CachedBloodMessage::from(record);
        self.cache.add(cached.key, cached.id, cached.clone());
        Some(cached)
    }

    pub fn handle_reentry(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestReentryBloodMessage,
    ) -> HandleResult {
        let mut recreate_message_ids = Vec::new();

        for located in request.messages {
            let key = CacheKey::new(located.area_id, located.cell_id);
            if self.cache.contains(key, located.message_id) {
                continue;
            }

            match ctx.store.find_blood_message(located.message_id) {
                Ok(Some(record)) => {
                    let cached = CachedBloodMessage::from(record);
                    self.cache.add(cached.key, cached.id, cached);
                }
                Ok(None) => recreate_message_ids.push(located.message_id),
                Err(e) => {
                    warn!(client = %session.label(), "blood message lookup failed: {e:#}");
                    recreate_message_ids.push(located.message_id);
                }
            }
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestReentryBloodMessageResponse {
                recreate_message_ids,
            },
        )
    }

    pub fn handle_recreate_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestReCreateBloodMessageList,
    ) -> HandleResult {
        // Validate everything before touching state; one bad blob voids the
        // whole request.
        for entry in &request.entries {
            if let Err(e) = validate_entry_list(&entry.data) {
                warn!(client = %session.label(), "recreate entry failed validation: {e}");
                return respond_or_error(
                    session,
                    ctx,
                    index,
                    &RequestReCreateBloodMessageListResponse::default(),
                );
            }
        }

        let mut message_ids = Vec::with_capacity(request.entries.len());
        for entry in request.entries {
            let cached = match ctx.store.create_blood_message(
                entry.area_id,
                entry.cell_id,
                session.player.player_id,
                &session.player.steam_id,
                entry.character_id,
                &entry.data,
            ) {
                Ok(record) => CachedBloodMessage::from(record),
                Err(e) => {
                    // Creation is acknowledged even when the store is down;
                    // the message lives out this shard's lifetime only.
                    warn!(client = %session.label(), "store rejected blood message: {e:#}");
                    let id = self.next_fallback_id;
                    self.next_fallback_id -= 1;
                    CachedBloodMessage {
                        id,
                        key: CacheKey::new(entry.area_id, entry.cell_id),
                        player_id: session.player.player_id,
                        steam_id: session.player.steam_id.clone(),
                        character_id: entry.character_id,
                        data: entry.data,
                        rating_good: 0,
                        rating_poor: 0,
                    }
                }
            };

            message_ids.push(cached.id);
            self.cache.add(cached.key, cached.id, cached);
        }

        let _ = ctx
            .store
            .add_global_statistic(STAT_TOTAL_CREATED, message_ids.len() as i64);
        let _ = ctx.store.add_player_statistic(
            STAT_TOTAL_CREATED,
            session.player.player_id,
            message_ids.len() as i64,
        );

        respond_or_error(
            session,
            ctx,
            index,
            &RequestReCreateBloodMessageListResponse { message_ids },
        )
    }

    pub fn handle_get_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        rng: &mut StdRng,
        index: u32,
        request: RequestGetBloodMessageList,
    ) -> HandleResult {
        let mut messages = Vec::new();

        if !ctx.config.disable_blood_messages {
            let caller = session.player.player_id;
            let mut remaining = request.max_messages as usize;

            for area in &request.search_areas {
                if remaining == 0 {
                    break;
                }
                let key = CacheKey::new(area.area_id, area.cell_id);
                let wanted = remaining.min(area.max_entries as usize);

                let sampled =
                    self.cache
                        .random_set(key, wanted, rng, |m| m.player_id != caller);
                remaining -= sampled.len();
                messages.extend(sampled.into_iter().map(CachedBloodMessage::to_info));
            }
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetBloodMessageListResponse { messages },
        )
    }

    pub fn handle_get_evaluation(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetBloodMessageEvaluation,
    ) -> HandleResult {
        let mut evaluations = Vec::new();

        for id in request.message_ids {
            // Ratings can outlive the cache; fall back to the store.
            let found = self
                .cache_lookup_anywhere(ctx, id)
                .map(|(good, poor)| BloodMessageEvaluationData {
                    message_id: id,
                    rating_good: good,
                    rating_poor: poor,
                });
            if let Some(evaluation) = found {
                evaluations.push(evaluation);
            }
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetBloodMessageEvaluationResponse { evaluations },
        )
    }

    fn cache_lookup_anywhere(&self, ctx: &ServiceContext, id: u32) -> Option<(u32, u32)> {
        for_any_area_find(&self.cache, id)
            .map(|m| (m.rating_good, m.rating_poor))
            .or_else(|| {
                ctx.store
                    .find_blood_message(id)
                    .ok()
                    .flatten()
                    .map(|r| (r.rating_good, r.rating_poor))
            })
    }

    pub fn handle_evaluate(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &mut ClientSession,
        index: u32,
        request: RequestEvaluateBloodMessage,
    ) -> HandleResult {
        let key = CacheKey::area(request.area_id);
        let found = self
            .find_cached_or_stored(ctx, key, request.message_id)
            .or_else(|| {
                // Cell-gridded variants evaluate by id alone.
                for_any_area_find(&self.cache, request.message_id).cloned()
            });

        let Some(message) = found else {
            warn!(
                client = %session.label(),
                message_id = request.message_id,
                "evaluation of unknown blood message ignored"
            );
            return respond_or_error(
                session,
                ctx,
                index,
                &RequestEvaluateBloodMessageResponse {},
            );
        };

        // Authors never rate their own work.
        if message.player_id == session.player.player_id {
            warn!(
                client = %session.label(),
                message_id = message.id,
                "player attempted to evaluate own blood message"
            );
            return HandleResult::Error;
        }

        let (good, poor) = if request.was_poor {
            (message.rating_good, message.rating_poor + 1)
        } else {
            (message.rating_good + 1, message.rating_poor)
        };

        if let Some(cached) = self.cache.find_mut(message.key, message.id) {
            cached.rating_good = good;
            cached.rating_poor = poor;
        }
        if let Err(e) = ctx
            .store
            .set_blood_message_evaluation(message.id, good, poor)
        {
            warn!("failed to persist evaluation: {e:#}");
        }

        let _ = ctx.store.add_global_statistic(STAT_TOTAL_EVALUATED, 1);

        // Tell the author, if they are online.
        if let Some(author) = sessions.by_player_mut(message.player_id) {
            let push = PushRequestEvaluateBloodMessage {
                push_message_id: ctx
                    .variant
                    .push_id(MessageKind::PushRequestEvaluateBloodMessage),
                message_id: message.id,
                was_poor: request.was_poor,
                rater_player_id: session.player.player_id,
                rater_steam_id: session.player.steam_id.clone(),
            };
            if let Err(e) = author.push(ctx, &push) {
                warn!(client = %author.label(), "failed to push evaluation notice: {e}");
            }
        }

        respond_or_error(session, ctx, index, &RequestEvaluateBloodMessageResponse {})
    }

    pub fn handle_remove(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestRemoveBloodMessage,
    ) -> HandleResult {
        let key = CacheKey::area(request.area_id);
        let owner = self
            .cache
            .find(key, request.message_id)
            .map(|m| m.player_id)
            .or_else(|| {
                ctx.store
                    .find_blood_message(request.message_id)
                    .ok()
                    .flatten()
                    .map(|r| r.player_id)
            });

        match owner {
            Some(owner) if owner == session.player.player_id => {
                if self.cache.remove(key, request.message_id).is_none() {
                    // Cell-gridded variants key by more than the area.
                    self.cache.remove_by(|m| m.id == request.message_id);
                }
                if let Err(e) = ctx.store.remove_blood_message(request.message_id) {
                    warn!("failed to remove blood message from store: {e:#}");
                }
            }
            Some(_) => {
                warn!(
                    client = %session.label(),
                    message_id = request.message_id,
                    "player attempted to remove a blood message they do not own"
                );
            }
            None => {}
        }

        respond_or_error(session, ctx, index, &RequestRemoveBloodMessageResponse {})
    }
}

/// Id-only lookup across every bucket; used where the request does not carry
/// a usable area key.
fn for_any_area_find(
    cache: &LiveCache<CachedBloodMessage>,
    id: u32,
) -> Option<&CachedBloodMessage> {
    cache.find_by(|m| m.id == id)
}
