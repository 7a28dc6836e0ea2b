//! Rolling player status harvesting and character persistence.

use emberward_game::{GameVariant, VisitorPool};
use emberward_protocol::messages::{
    PlayerStatusData, RequestUpdatePlayerCharacter, RequestUpdatePlayerCharacterResponse,
    RequestUpdatePlayerStatus, RequestUpdatePlayerStatusResponse,
};
use emberward_store::Database;
use prost::Message;
use tracing::{debug, info, warn};

use crate::handlers::{respond_or_error, HandleResult};
use crate::service::ServiceContext;
use crate::session::ClientSession;
use crate::webhook::{Notice, NoticeField, NoticeOrigin, NoticeType};

pub struct PlayerDataManager;

impl PlayerDataManager {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_update_player_status(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestUpdatePlayerStatus,
    ) -> HandleResult {
        match PlayerStatusData::decode(&request.status[..]) {
            Ok(incoming) => {
                merge_status(&mut session.player.status, incoming);
                harvest_status(ctx, session);
            }
            Err(e) => {
                // Undecodable uploads are ignored; the protocol still wants
                // its empty reply.
                warn!(client = %session.label(), "discarding undecodable status upload: {e}");
            }
        }

        respond_or_error(session, ctx, index, &RequestUpdatePlayerStatusResponse {})
    }

    pub fn handle_update_player_character(
        &mut self,
        ctx: &ServiceContext,
        session: &mut ClientSession,
        index: u32,
        request: RequestUpdatePlayerCharacter,
    ) -> HandleResult {
        if let Err(e) = ctx.store.create_or_update_character(
            session.player.player_id,
            request.character_id,
            &request.character_data,
        ) {
            warn!(client = %session.label(), "failed to persist character: {e:#}");
            return HandleResult::Error;
        }

        session.player.character_id = Some(request.character_id);
        respond_or_error(session, ctx, index, &RequestUpdatePlayerCharacterResponse {})
    }
}

/// Merges a partial upload into the stored status. Scalars replace by
/// presence; repeated fields with non-empty new contents replace rather
/// than append.
fn merge_status(stored: &mut PlayerStatusData, incoming: PlayerStatusData) {
    if let Some(new_basic) = incoming.basic {
        let basic = stored.basic.get_or_insert_with(Default::default);
        macro_rules! take {
            ($field:ident) => {
                if new_basic.$field.is_some() {
                    basic.$field = new_basic.$field;
                }
            };
        }
        take!(character_name);
        take!(character_id);
        take!(soul_level);
        take!(max_weapon_level);
        take!(area_id);
        take!(is_invadable);
        take!(visitor_pool);
        take!(souls);
        take!(soul_memory);
        take!(death_count);
        take!(play_time_seconds);
    }

    if let Some(new_attributes) = incoming.attributes {
        let attributes = stored.attributes.get_or_insert_with(Default::default);
        macro_rules! take {
            ($field:ident) => {
                if new_attributes.$field.is_some() {
                    attributes.$field = new_attributes.$field;
                }
            };
        }
        take!(vigor);
        take!(attunement);
        take!(endurance);
        take!(vitality);
        take!(strength);
        take!(dexterity);
        take!(intelligence);
        take!(faith);
        take!(luck);
    }

    if !incoming.anticheat_data.is_empty() {
        stored.anticheat_data = incoming.anticheat_data;
    }
    if !incoming.lit_bonfires.is_empty() {
        stored.lit_bonfires = incoming.lit_bonfires;
    }
}

/// Pulls the typed observations the engine cares about out of the merged
/// status.
fn harvest_status(ctx: &ServiceContext, session: &mut ClientSession) {
    let Some(basic) = session.player.status.basic.clone() else {
        return;
    };

    if let Some(name) = &basic.character_name {
        if *name != session.player.character_name {
            info!(
                old = %session.player.character_name,
                new = %name,
                "player renamed connection"
            );
            session.player.character_name = name.clone();
        }
    }

    if let Some(level) = basic.soul_level {
        session.player.soul_level = level;
    }
    if let Some(level) = basic.max_weapon_level {
        session.player.max_weapon_level = level;
    }
    if let Some(memory) = basic.soul_memory {
        session.player.soul_memory = memory;
    }
    if let Some(area) = basic.area_id {
        session.player.current_area_id = area;
    }
    if let Some(invadable) = basic.is_invadable {
        session.player.is_invadable = invadable;
    }
    if let Some(character_id) = basic.character_id {
        session.player.character_id = Some(character_id);
    }
    session.player.visitor_pool = basic.visitor_pool.map(VisitorPool::from_u32);

    // Bonfire deltas. Notifications are suppressed until the first complete
    // status has been seen, otherwise login replays the whole list.
    let announce = session.player.has_initial_status;
    let newly_lit: Vec<u32> = session
        .player
        .status
        .lit_bonfires
        .iter()
        .copied()
        .filter(|id| !session.player.lit_bonfires.contains(id))
        .collect();

    for bonfire in newly_lit {
        session.player.lit_bonfires.insert(bonfire);
        if announce {
            debug!(client = %session.label(), bonfire, "bonfire lit");
            if ctx.config.webhook_notices.bonfire_lit {
                ctx.webhook.send(Notice {
                    origin: NoticeOrigin {
                        player_id: session.player.player_id,
                        steam_id: session.player.steam_id.clone(),
                        character_name: session.player.character_name.clone(),
                    },
                    kind: NoticeType::BonfireLit,
                    text: format!(
                        "Lit a bonfire in '{}'.",
                        ctx.variant.area_name(session.player.current_area_id)
                    ),
                    fields: vec![NoticeField {
                        name: "Bonfire".into(),
                        value: bonfire.to_string(),
                        inline: true,
                    }],
                    thumbnail_url: None,
                });
            }
        }
    }

    if !session.player.has_initial_status && basic.soul_level.is_some() {
        session.player.has_initial_status = true;
    }
}

#[cfg(test)]
mod tests {
    use emberward_protocol::messages::BasicStatus;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scalars_merge_by_presence() {
        let mut stored = PlayerStatusData {
            basic: Some(BasicStatus {
                character_name: Some("Hollow".into()),
                soul_level: Some(50),
                ..Default::default()
            }),
            ..Default::default()
        };

        merge_status(
            &mut stored,
            PlayerStatusData {
                basic: Some(BasicStatus {
                    soul_level: Some(51),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );

        let basic = stored.basic.unwrap();
        assert_eq!(basic.soul_level, Some(51));
        // Untouched fields survive the partial upload.
        assert_eq!(basic.character_name.as_deref(), Some("Hollow"));
    }

    #[test]
    fn repeated_fields_replace_not_append() {
        let mut stored = PlayerStatusData {
            lit_bonfires: vec![1, 2, 3],
            ..Default::default()
        };

        merge_status(
            &mut stored,
            PlayerStatusData {
                lit_bonfires: vec![4],
                ..Default::default()
            },
        );
        assert_eq!(stored.lit_bonfires, vec![4]);

        // Empty repeated contents leave the stored list alone.
        merge_status(&mut stored, PlayerStatusData::default());
        assert_eq!(stored.lit_bonfires, vec![4]);
    }
}
