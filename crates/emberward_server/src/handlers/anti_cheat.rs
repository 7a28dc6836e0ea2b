//! Periodic anti-cheat scanning with penalty accumulation.
//!
//! Triggers are pure predicates over a session's harvested status. Each
//! fires at most once per session; its weight is added to the player's
//! stored penalty. Crossing the warn threshold pushes a management message
//! (rate limited); crossing the ban threshold with auto-ban enabled bans
//! the account and schedules a disconnect after the announcement.

use std::time::Duration;

use emberward_game::GameVariant;
use emberward_protocol::messages::ManagementTextMessage;
use emberward_protocol::MessageKind;
use emberward_store::Database;
use tracing::{info, warn};

use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};
use crate::webhook::{Notice, NoticeField, NoticeOrigin, NoticeType};

const SCAN_INTERVAL: Duration = Duration::from_secs(5);
const WARNING_COOLDOWN: Duration = Duration::from_secs(60);
const BAN_DISCONNECT_DELAY: Duration = Duration::from_secs(2);

/// The in-client detection flag observed in uploaded status blobs. Treated
/// as one cheat signal among several; nothing else is inferred from it.
const CLIENT_FLAG_SENTINEL: u32 = 0x1770;

const MAX_SOUL_LEVEL: u32 = 802;
const MAX_STAT_LEVEL: u32 = 99;
const MIN_STAT_LEVEL: u32 = 1;
/// Attribute points a fresh character starts with.
const LEVEL_1_STAT_TOTAL: u32 = 30;

pub struct AntiCheatManager {
    next_scan_at: std::time::Instant,
}

struct TriggerDef {
    name: &'static str,
    weight: fn(&ServiceContext) -> f32,
    scan: fn(&ClientSession) -> Option<String>,
}

const TRIGGERS: &[TriggerDef] = &[
    TriggerDef {
        name: "impossible_stats",
        weight: |ctx| ctx.config.anti_cheat_score_impossible_stats,
        scan: scan_impossible_stats,
    },
    TriggerDef {
        name: "invalid_name",
        weight: |ctx| ctx.config.anti_cheat_score_invalid_name,
        scan: scan_invalid_name,
    },
    TriggerDef {
        name: "client_flagged",
        weight: |ctx| ctx.config.anti_cheat_score_client_flagged,
        scan: scan_client_flagged,
    },
];

/// Minimum soul memory needed to have paid for every level up to `level`.
/// Levels below 13 are free of charge here; starting classes bias the total
/// downward anyway, so this is a floor rather than an exact figure.
fn minimum_level_cost(level: u32) -> u64 {
    let mut total = 0u64;
    for l in 13..=u64::from(level) {
        let l = l as f64;
        let cost = 0.02 * l * l * l + 3.06 * l * l + 105.6 * l - 895.0;
        total += cost.max(0.0) as u64;
    }
    total
}

fn scan_impossible_stats(session: &ClientSession) -> Option<String> {
    let status = &session.player.status;
    let basic = status.basic.as_ref()?;
    let soul_level = basic.soul_level?;

    if soul_level == 0 || soul_level > MAX_SOUL_LEVEL {
        return Some(format!(
            "soul level {soul_level} outside sane bounds (max {MAX_SOUL_LEVEL})"
        ));
    }

    if let Some(attributes) = &status.attributes {
        let stats = [
            attributes.vigor,
            attributes.attunement,
            attributes.endurance,
            attributes.vitality,
            attributes.strength,
            attributes.dexterity,
            attributes.intelligence,
            attributes.faith,
            attributes.luck,
        ];

        let mut total = 0u32;
        for stat in stats.into_iter().flatten() {
            if stat > MAX_STAT_LEVEL {
                return Some(format!("stat {stat} above maximum {MAX_STAT_LEVEL}"));
            }
            if stat < MIN_STAT_LEVEL {
                return Some(format!("stat {stat} below minimum {MIN_STAT_LEVEL}"));
            }
            total += stat;
        }

        let budget = LEVEL_1_STAT_TOTAL + (soul_level - 1);
        if total > budget {
            return Some(format!(
                "{total} total stats at soul level {soul_level}, maximum possible is {budget}"
            ));
        }
    }

    if let Some(memory) = basic.soul_memory {
        let floor = minimum_level_cost(soul_level);
        if memory < floor {
            return Some(format!(
                "soul level {soul_level} costs at least {floor} souls but memory is {memory}"
            ));
        }
        if let Some(souls) = basic.souls {
            if souls > memory {
                return Some(format!("holding {souls} souls but only ever earned {memory}"));
            }
        }
    }

    None
}

fn scan_invalid_name(session: &ClientSession) -> Option<String> {
    let name = &session.player.character_name;
    if name.is_empty() {
        return Some("empty character name".into());
    }
    if name.chars().count() > 16 {
        return Some(format!("character name of {} characters", name.chars().count()));
    }
    None
}

fn scan_client_flagged(session: &ClientSession) -> Option<String> {
    session
        .player
        .status
        .anticheat_data
        .contains(&CLIENT_FLAG_SENTINEL)
        .then(|| "client-side detection flag present".into())
}

impl AntiCheatManager {
    pub fn new(now: std::time::Instant) -> Self {
        Self {
            next_scan_at: now + SCAN_INTERVAL,
        }
    }

    pub fn poll(&mut self, ctx: &ServiceContext, sessions: &mut SessionMap) {
        if ctx.now < self.next_scan_at {
            return;
        }
        self.next_scan_at = ctx.now + SCAN_INTERVAL;

        if !ctx.config.anti_cheat_enabled {
            return;
        }

        for addr in sessions.addrs() {
            let Some(mut session) = sessions.take(addr) else {
                continue;
            };
            if session.player.is_in_game() && !session.banned {
                self.scan_session(ctx, &mut session);
            }
            sessions.restore(addr, session);
        }
    }

    /// One full trigger pass over one session. Public so request-path tests
    /// can drive it without waiting out the scan interval.
    pub fn scan_session(&mut self, ctx: &ServiceContext, session: &mut ClientSession) {
        // Fold the stored penalty in on first contact so thresholds apply
        // to lifetime behavior, not just this session.
        if !session.player.anti_cheat.loaded_from_store {
            session.player.anti_cheat.loaded_from_store = true;
            session.player.anti_cheat.penalty += ctx
                .store
                .get_anti_cheat_penalty(&session.player.steam_id)
                .unwrap_or(0.0);
        }

        for trigger in TRIGGERS {
            if session
                .player
                .anti_cheat
                .triggered_this_session
                .contains(trigger.name)
            {
                continue;
            }

            let Some(explanation) = (trigger.scan)(session) else {
                continue;
            };

            let weight = (trigger.weight)(ctx);
            session
                .player
                .anti_cheat
                .triggered_this_session
                .insert(trigger.name);
            session.player.anti_cheat.penalty += weight;

            if let Err(e) = ctx
                .store
                .add_anti_cheat_penalty(&session.player.steam_id, weight)
            {
                warn!("failed to persist anti-cheat penalty: {e:#}");
            }

            warn!(
                client = %session.label(),
                trigger = trigger.name,
                penalty = session.player.anti_cheat.penalty,
                "anti-cheat trigger fired: {explanation}"
            );

            if ctx.config.webhook_notices.anti_cheat {
                ctx.webhook.send(Notice {
                    origin: NoticeOrigin {
                        player_id: session.player.player_id,
                        steam_id: session.player.steam_id.clone(),
                        character_name: session.player.character_name.clone(),
                    },
                    kind: NoticeType::AntiCheat,
                    text: explanation,
                    fields: vec![NoticeField {
                        name: "Penalty".into(),
                        value: format!("{:.1}", session.player.anti_cheat.penalty),
                        inline: true,
                    }],
                    thumbnail_url: None,
                });
            }
        }

        self.apply_thresholds(ctx, session);
    }

    fn apply_thresholds(&mut self, ctx: &ServiceContext, session: &mut ClientSession) {
        let penalty = session.player.anti_cheat.penalty;

        if penalty >= ctx.config.anti_cheat_ban_threshold && ctx.config.anti_cheat_auto_ban {
            info!(client = %session.label(), penalty, "penalty crossed ban threshold, banning");
            if let Err(e) = ctx.store.ban_player(&session.player.steam_id) {
                warn!("failed to store ban: {e:#}");
            }
            session.banned = true;
            session.disconnect_at = Some(ctx.now + BAN_DISCONNECT_DELAY);

            let announcement = ManagementTextMessage {
                push_message_id: ctx.variant.push_id(MessageKind::ManagementTextMessage),
                message: ctx.config.ban_announcement.body.clone(),
            };
            if let Err(e) = session.push(ctx, &announcement) {
                warn!(client = %session.label(), "failed to push ban announcement: {e}");
            }
            return;
        }

        if penalty > ctx.config.anti_cheat_warning_threshold {
            let due = session
                .player
                .anti_cheat
                .next_warning_at
                .map_or(true, |at| ctx.now >= at);
            if due {
                session.player.anti_cheat.next_warning_at = Some(ctx.now + WARNING_COOLDOWN);
                let message = ManagementTextMessage {
                    push_message_id: ctx.variant.push_id(MessageKind::ManagementTextMessage),
                    message: ctx.config.warning_announcement.body.clone(),
                };
                if let Err(e) = session.push(ctx, &message) {
                    warn!(client = %session.label(), "failed to push warning: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use emberward_protocol::messages::{AttributeStatus, BasicStatus, PlayerStatusData};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::session::PlayerState;

    fn session_with(status: PlayerStatusData, name: &str) -> ClientSession {
        let now = std::time::Instant::now();
        let connection = crate::session::Connection::new(
            "127.0.0.1:40000".parse().unwrap(),
            &[0u8; 16],
            now,
        );
        let mut session = ClientSession::new(connection, now);
        session.player = PlayerState {
            steam_id: "0110000100000001".into(),
            player_id: 1,
            character_name: name.into(),
            status,
            has_initial_status: true,
            ..PlayerState::default()
        };
        session
    }

    #[test]
    fn stat_total_beyond_budget_fires() {
        // Soul level two with forty points spent; the budget is thirty one.
        let status = PlayerStatusData {
            basic: Some(BasicStatus {
                soul_level: Some(2),
                soul_memory: Some(1_000_000),
                ..Default::default()
            }),
            attributes: Some(AttributeStatus {
                vigor: Some(10),
                attunement: Some(10),
                endurance: Some(10),
                vitality: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };

        let session = session_with(status, "Hollow");
        assert!(scan_impossible_stats(&session).is_some());
    }

    #[test]
    fn plausible_stats_pass() {
        let status = PlayerStatusData {
            basic: Some(BasicStatus {
                soul_level: Some(50),
                soul_memory: Some(10_000_000),
                souls: Some(5_000),
                ..Default::default()
            }),
            attributes: Some(AttributeStatus {
                vigor: Some(20),
                strength: Some(20),
                dexterity: Some(18),
                ..Default::default()
            }),
            ..Default::default()
        };

        let session = session_with(status, "Hollow");
        assert_eq!(scan_impossible_stats(&session), None);
    }

    #[test]
    fn souls_beyond_memory_fire() {
        let status = PlayerStatusData {
            basic: Some(BasicStatus {
                soul_level: Some(10),
                soul_memory: Some(1_000),
                souls: Some(2_000),
                ..Default::default()
            }),
            ..Default::default()
        };

        let session = session_with(status, "Hollow");
        assert!(scan_impossible_stats(&session).is_some());
    }

    #[test]
    fn empty_name_fires() {
        let session = session_with(PlayerStatusData::default(), "");
        assert!(scan_invalid_name(&session).is_some());
        assert_eq!(scan_invalid_name(&session_with(PlayerStatusData::default(), "Ok")), None);
    }

    #[test]
    fn client_flag_sentinel_fires() {
        let status = PlayerStatusData {
            anticheat_data: vec![1, CLIENT_FLAG_SENTINEL],
            ..Default::default()
        };
        let session = session_with(status, "Hollow");
        assert!(scan_client_flagged(&session).is_some());
    }

    #[test]
    fn level_cost_floor_is_monotonic() {
        assert_eq!(minimum_level_cost(12), 0);
        let mut previous = 0;
        for level in 13..100 {
            let cost = minimum_level_cost(level);
            assert!(cost >= previous);
            previous = cost;
        }
    }
}
