//! Leaderboards over the durable store.

use emberward_game::GameVariant;
use emberward_protocol::messages::{
    RankingData, RequestCountRankingData, RequestCountRankingDataResponse,
    RequestGetCharacterRankingData, RequestGetCharacterRankingDataResponse, RequestGetRankingData,
    RequestGetRankingDataResponse, RequestRegisterRankingData, RequestRegisterRankingDataResponse,
};
use emberward_store::{Database, RankingRecord, ScorePolicy};
use tracing::warn;

use crate::handlers::{respond_or_error, HandleResult};
use crate::service::ServiceContext;
use crate::session::ClientSession;

pub struct RankingManager;

fn to_wire(record: RankingRecord) -> RankingData {
    RankingData {
        board_id: record.board_id,
        player_id: record.player_id,
        character_id: record.character_id,
        serial_rank: record.serial_rank,
        rank: record.rank,
        score: record.score,
        data: record.data,
    }
}

impl RankingManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_register(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestRegisterRankingData,
    ) -> HandleResult {
        let policy = if ctx.variant.rankings_accumulate() {
            ScorePolicy::Accumulate
        } else {
            ScorePolicy::KeepBest
        };

        if let Err(e) = ctx.store.register_score(
            request.board_id,
            session.player.player_id,
            request.character_id,
            request.score,
            &request.data,
            policy,
        ) {
            warn!(client = %session.label(), "failed to register score: {e:#}");
            return HandleResult::Error;
        }

        respond_or_error(session, ctx, index, &RequestRegisterRankingDataResponse {})
    }

    pub fn handle_get_rankings(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetRankingData,
    ) -> HandleResult {
        let entries = match ctx
            .store
            .get_rankings(request.board_id, request.offset, request.count)
        {
            Ok(records) => records.into_iter().map(to_wire).collect(),
            Err(e) => {
                warn!("ranking window read failed: {e:#}");
                Vec::new()
            }
        };

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetRankingDataResponse { entries },
        )
    }

    pub fn handle_get_character_ranking(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestGetCharacterRankingData,
    ) -> HandleResult {
        let entry = ctx
            .store
            .get_character_ranking(
                request.board_id,
                session.player.player_id,
                request.character_id,
            )
            .unwrap_or_default()
            .map(to_wire)
            // Zero-valued rather than absent for characters with no entry.
            .unwrap_or(RankingData {
                board_id: request.board_id,
                player_id: session.player.player_id,
                character_id: request.character_id,
                ..Default::default()
            });

        respond_or_error(
            session,
            ctx,
            index,
            &RequestGetCharacterRankingDataResponse { entry: Some(entry) },
        )
    }

    pub fn handle_count(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestCountRankingData,
    ) -> HandleResult {
        let count = ctx.store.get_ranking_count(request.board_id).unwrap_or(0);
        respond_or_error(
            session,
            ctx,
            index,
            &RequestCountRankingDataResponse { count },
        )
    }
}
