//! Death markers and their ghost replays.

use emberward_protocol::messages::{
    BloodstainInfo, RequestCreateBloodstain, RequestGetAreaBloodstainList,
    RequestGetAreaBloodstainListResponse, RequestGetBloodstainList,
    RequestGetBloodstainListResponse, RequestGetDeadingGhost, RequestGetDeadingGhostResponse,
};
use emberward_protocol::validate_entry_list;
use emberward_store::{BloodstainRecord, Database};
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::ShardConfig;
use crate::handlers::{respond_or_error, HandleResult};
use crate::live_cache::{CacheKey, LiveCache};
use crate::service::ServiceContext;
use crate::session::ClientSession;

const STAT_TOTAL_CREATED: &str = "Bloodstain/TotalCreated";

#[derive(Clone)]
pub struct CachedBloodstain {
    pub id: u32,
    pub key: CacheKey,
    pub player_id: u32,
    pub data: Vec<u8>,
    pub ghost_data: Vec<u8>,
}

impl From<BloodstainRecord> for CachedBloodstain {
    fn from(record: BloodstainRecord) -> Self {
        Self {
            id: record.id,
            key: CacheKey::new(record.area_id, record.cell_id),
            player_id: record.player_id,
            data: record.data,
            ghost_data: record.ghost_data,
        }
    }
}

impl CachedBloodstain {
    fn to_info(&self) -> BloodstainInfo {
        BloodstainInfo {
            bloodstain_id: self.id,
            area_id: self.key.area_id,
            cell_id: self.key.cell_id,
            data: self.data.clone(),
        }
    }
}

pub struct BloodstainManager {
    cache: LiveCache<CachedBloodstain>,
    next_fallback_id: u32,
}

impl BloodstainManager {
    pub fn new(config: &ShardConfig) -> Self {
        Self {
            cache: LiveCache::new(config.bloodstain_max_entries_per_area),
            next_fallback_id: u32::MAX / 2 + u32::MAX / 8,
        }
    }

    pub fn prime(&mut self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let per_area = ctx.config.bloodstain_prime_count_per_area;
        for area_id in ctx.store.bloodstain_areas()? {
            for record in ctx.store.recent_bloodstains(area_id, per_area)? {
                let cached = CachedBloodstain::from(record);
                self.cache.add(cached.key, cached.id, cached);
            }
        }
        debug!(entries = self.cache.total_entries(), "primed bloodstain cache");
        Ok(())
    }

    /// Fire-and-forget creation; there is no response to send.
    pub fn handle_create(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        request: RequestCreateBloodstain,
    ) -> HandleResult {
        if let Err(e) = validate_entry_list(&request.data) {
            warn!(client = %session.label(), "bloodstain data failed validation: {e}");
            return HandleResult::Handled;
        }
        if let Err(e) = validate_entry_list(&request.ghost_data) {
            warn!(client = %session.label(), "bloodstain ghost data failed validation: {e}");
            return HandleResult::Handled;
        }

        let cached = match ctx.store.create_bloodstain(
            request.area_id,
            request.cell_id,
            session.player.player_id,
            &session.player.steam_id,
            &request.data,
            &request.ghost_data,
        ) {
            Ok(record) => CachedBloodstain::from(record),
            Err(e) => {
                warn!(client = %session.label(), "store rejected bloodstain: {e:#}");
                let id = self.next_fallback_id;
                self.next_fallback_id -= 1;
                CachedBloodstain {
                    id,
                    key: CacheKey::new(request.area_id, request.cell_id),
                    player_id: session.player.player_id,
                    data: request.data,
                    ghost_data: request.ghost_data,
                }
            }
        };

        if !ctx.config.disable_bloodstains {
            self.cache.add(cached.key, cached.id, cached);
        }

        let _ = ctx.store.add_global_statistic(STAT_TOTAL_CREATED, 1);
        let _ = ctx
            .store
            .add_player_statistic(STAT_TOTAL_CREATED, session.player.player_id, 1);

        HandleResult::Handled
    }

    pub fn handle_get_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        rng: &mut StdRng,
        index: u32,
        request: RequestGetBloodstainList,
    ) -> HandleResult {
        let mut bloodstains = Vec::new();

        if !ctx.config.disable_bloodstains {
            let caller = session.player.player_id;
            let mut remaining = request.max_stains as usize;

            for area in &request.search_areas {
                if remaining == 0 {
                    break;
                }
                let key = CacheKey::new(area.area_id, area.cell_id);
                let wanted = remaining.min(area.max_entries as usize);

                let sampled =
                    self.cache
                        .random_set(key, wanted, rng, |b| b.player_id != caller);
                remaining -= sampled.len();
                bloodstains.extend(sampled.into_iter().map(CachedBloodstain::to_info));
            }
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetBloodstainListResponse { bloodstains },
        )
    }

    pub fn handle_get_area_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        rng: &mut StdRng,
        index: u32,
        request: RequestGetAreaBloodstainList,
    ) -> HandleResult {
        let mut bloodstains = Vec::new();

        if !ctx.config.disable_bloodstains {
            let caller = session.player.player_id;
            let key = CacheKey::new(request.area_id, request.cell_id);
            bloodstains = self
                .cache
                .random_set(key, request.max_stains as usize, rng, |b| {
                    b.player_id != caller
                })
                .into_iter()
                .map(CachedBloodstain::to_info)
                .collect();
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetAreaBloodstainListResponse { bloodstains },
        )
    }

    pub fn handle_get_deading_ghost(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetDeadingGhost,
    ) -> HandleResult {
        let key = CacheKey::area(request.area_id);
        let replay_data = self
            .cache
            .find(key, request.bloodstain_id)
            .map(|b| b.ghost_data.clone())
            .or_else(|| {
                // Not cached; pull it from the store and keep it warm.
                let record = ctx
                    .store
                    .find_bloodstain(request.bloodstain_id)
                    .ok()
                    .flatten()?;
                let cached = CachedBloodstain::from(record);
                let ghost_data = cached.ghost_data.clone();
                self.cache.add(cached.key, cached.id, cached);
                Some(ghost_data)
            });

        let replay_data = match replay_data {
            Some(data) => data,
            None => {
                warn!(
                    client = %session.label(),
                    bloodstain_id = request.bloodstain_id,
                    "replay requested for unknown bloodstain"
                );
                Vec::new()
            }
        };

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetDeadingGhostResponse {
                bloodstain_id: request.bloodstain_id,
                replay_data,
            },
        )
    }
}
