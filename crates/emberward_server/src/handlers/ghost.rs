//! Wandering ghost replays. Same cache-over-store pattern as bloodstains,
//! single data blob.

use emberward_protocol::messages::{
    GhostInfo, RequestCreateGhostData, RequestCreateGhostDataResponse, RequestGetGhostDataList,
    RequestGetGhostDataListResponse,
};
use emberward_protocol::validate_entry_list;
use emberward_store::{Database, GhostRecord};
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::ShardConfig;
use crate::handlers::{respond_or_error, HandleResult};
use crate::live_cache::{CacheKey, LiveCache};
use crate::service::ServiceContext;
use crate::session::ClientSession;

const STAT_TOTAL_CREATED: &str = "Ghost/TotalCreated";

#[derive(Clone)]
pub struct CachedGhost {
    pub id: u32,
    pub key: CacheKey,
    pub player_id: u32,
    pub data: Vec<u8>,
}

impl From<GhostRecord> for CachedGhost {
    fn from(record: GhostRecord) -> Self {
        Self {
            id: record.id,
            key: CacheKey::new(record.area_id, record.cell_id),
            player_id: record.player_id,
            data: record.data,
        }
    }
}

pub struct GhostManager {
    cache: LiveCache<CachedGhost>,
    next_fallback_id: u32,
}

impl GhostManager {
    pub fn new(config: &ShardConfig) -> Self {
        Self {
            cache: LiveCache::new(config.ghost_max_entries_per_area),
            next_fallback_id: u32::MAX / 2 + u32::MAX / 16,
        }
    }

    pub fn prime(&mut self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let per_area = ctx.config.ghost_prime_count_per_area;
        for area_id in ctx.store.ghost_areas()? {
            for record in ctx.store.recent_ghosts(area_id, per_area)? {
                let cached = CachedGhost::from(record);
                self.cache.add(cached.key, cached.id, cached);
            }
        }
        debug!(entries = self.cache.total_entries(), "primed ghost cache");
        Ok(())
    }

    pub fn handle_create(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestCreateGhostData,
    ) -> HandleResult {
        if let Err(e) = validate_entry_list(&request.replay_data) {
            warn!(client = %session.label(), "ghost replay failed validation: {e}");
            return respond_or_error(session, ctx, index, &RequestCreateGhostDataResponse {});
        }

        let cached = match ctx.store.create_ghost(
            request.area_id,
            request.cell_id,
            session.player.player_id,
            &session.player.steam_id,
            &request.replay_data,
        ) {
            Ok(record) => CachedGhost::from(record),
            Err(e) => {
                warn!(client = %session.label(), "store rejected ghost: {e:#}");
                let id = self.next_fallback_id;
                self.next_fallback_id -= 1;
                CachedGhost {
                    id,
                    key: CacheKey::new(request.area_id, request.cell_id),
                    player_id: session.player.player_id,
                    data: request.replay_data,
                }
            }
        };

        if !ctx.config.disable_ghosts {
            self.cache.add(cached.key, cached.id, cached);
        }

        let _ = ctx.store.add_global_statistic(STAT_TOTAL_CREATED, 1);
        let _ = ctx
            .store
            .add_player_statistic(STAT_TOTAL_CREATED, session.player.player_id, 1);

        respond_or_error(session, ctx, index, &RequestCreateGhostDataResponse {})
    }

    pub fn handle_get_list(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        rng: &mut StdRng,
        index: u32,
        request: RequestGetGhostDataList,
    ) -> HandleResult {
        let mut ghosts = Vec::new();

        if !ctx.config.disable_ghosts {
            let caller = session.player.player_id;
            let mut remaining = request.max_ghosts as usize;

            for area in &request.search_areas {
                if remaining == 0 {
                    break;
                }
                let key = CacheKey::new(area.area_id, area.cell_id);
                let wanted = remaining.min(area.max_entries as usize);

                let sampled = self
                    .cache
                    .random_set(key, wanted, rng, |g| g.player_id != caller);
                remaining -= sampled.len();
                ghosts.extend(sampled.into_iter().map(|g| GhostInfo {
                    ghost_id: g.id,
                    area_id: g.key.area_id,
                    cell_id: g.key.cell_id,
                    replay_data: g.data.clone(),
                }));
            }
        }

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetGhostDataListResponse { ghosts },
        )
    }
}
