//! Telemetry ingestion. These are fire-and-forget notifications that feed
//! the statistics tables; some also surface webhook notices.

use emberward_protocol::messages::{
    RequestNotifyDie, RequestNotifyKillBoss, RequestNotifyKillEnemy, RequestNotifyUseItem,
};
use emberward_store::Database;
use tracing::debug;

use crate::handlers::HandleResult;
use crate::service::ServiceContext;
use crate::session::ClientSession;
use crate::webhook::{Notice, NoticeOrigin, NoticeType};

pub struct LoggingManager;

impl LoggingManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_kill_enemy(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        request: RequestNotifyKillEnemy,
    ) -> HandleResult {
        let mut total = 0i64;
        for enemy in &request.enemies {
            let key = format!("Enemy/TotalKilled/{}", enemy.enemy_type_id);
            let _ = ctx.store.add_global_statistic(&key, i64::from(enemy.count));
            total += i64::from(enemy.count);
        }
        let _ = ctx.store.add_global_statistic("Enemy/TotalKilled", total);
        let _ = ctx
            .store
            .add_player_statistic("Enemy/TotalKilled", session.player.player_id, total);

        HandleResult::Handled
    }

    pub fn handle_die(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        request: RequestNotifyDie,
    ) -> HandleResult {
        debug!(client = %session.label(), area = request.area_id, "player died");
        let _ = ctx.store.add_global_statistic("Player/TotalDeaths", 1);
        let _ = ctx
            .store
            .add_player_statistic("Player/TotalDeaths", session.player.player_id, 1);

        HandleResult::Handled
    }

    pub fn handle_kill_boss(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        request: RequestNotifyKillBoss,
    ) -> HandleResult {
        let key = format!("Boss/TotalKills/{}", request.boss_id);
        let _ = ctx.store.add_global_statistic(&key, 1);
        let _ = ctx
            .store
            .add_player_statistic(&key, session.player.player_id, 1);

        if ctx.config.webhook_notices.boss_kill {
            ctx.webhook.send(Notice {
                origin: NoticeOrigin {
                    player_id: session.player.player_id,
                    steam_id: session.player.steam_id.clone(),
                    character_name: session.player.character_name.clone(),
                },
                kind: NoticeType::BossKill,
                text: format!("Felled boss {}.", request.boss_id),
                fields: Vec::new(),
                thumbnail_url: None,
            });
        }

        HandleResult::Handled
    }

    pub fn handle_use_item(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        request: RequestNotifyUseItem,
    ) -> HandleResult {
        let key = format!("Item/TotalUsed/{}", request.item_id);
        let _ = ctx
            .store
            .add_global_statistic(&key, i64::from(request.count.max(1)));
        let _ = ctx.store.add_player_statistic(
            &key,
            session.player.player_id,
            i64::from(request.count.max(1)),
        );

        HandleResult::Handled
    }
}
