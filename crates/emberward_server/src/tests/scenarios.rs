//! Full-stack scenarios: login, summoning, sampling, ranked matches,
//! anti-cheat escalation, and hostile-blob rejection.

use std::time::Duration;

use emberward_protocol::messages::*;
use emberward_store::Database;
use pretty_assertions::assert_eq;

use super::harness::Harness;
use crate::config::ShardConfig;
use crate::handlers::sign::sign_type;

fn login(harness: &mut Harness, token: u64, steam_id: &str) -> (std::net::SocketAddr, u32) {
    let addr = harness.connect(token);
    let response = harness.request(
        addr,
        &RequestWaitForUserLogin {
            steam_id: steam_id.into(),
        },
    );
    assert_eq!(response.steam_id, steam_id);
    (addr, response.player_id)
}

fn upload_status(
    harness: &mut Harness,
    addr: std::net::SocketAddr,
    name: &str,
    soul_level: u32,
    weapon_level: u32,
) {
    use prost::Message;

    let status = PlayerStatusData {
        basic: Some(BasicStatus {
            character_name: Some(name.into()),
            soul_level: Some(soul_level),
            max_weapon_level: Some(weapon_level),
            area_id: Some(1010),
            is_invadable: Some(true),
            soul_memory: Some(10_000_000),
            souls: Some(1_000),
            ..Default::default()
        }),
        ..Default::default()
    };

    let _: RequestUpdatePlayerStatusResponse = harness.request(
        addr,
        &RequestUpdatePlayerStatus {
            status: status.encode_to_vec(),
        },
    );
}

#[test]
fn login_hands_out_player_id_and_upload_config() {
    let mut harness = Harness::new();

    let (addr, player_id) = login(&mut harness, 0x0000_0000_DEAD_BEEF, "0110000100000001");
    assert_eq!(
        player_id,
        harness.store.find_or_create_player("0110000100000001").unwrap()
    );

    let configs: Vec<PlayerInfoUploadConfigPushMessage> = harness.pushes_of(addr);
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].upload_interval, 300);
    assert!(!configs[0].field_mask.is_empty());
}

#[test]
fn tokens_are_single_use_and_unknown_tokens_are_ignored() {
    let mut harness = Harness::new();
    let (_, _) = login(&mut harness, 0xAA, "0110000100000001");

    // A second connection replaying the same token never completes its
    // handshake and never becomes a session.
    assert_eq!(harness.service.session_count(), 1);
    assert_eq!(harness.tickets.consume(0xAA, harness.now), None);
}

#[test]
fn sign_create_summon_and_owner_disconnect() {
    let mut harness = Harness::new();

    let (host_addr, host_id) = login(&mut harness, 1, "0110000100000001");
    upload_status(&mut harness, host_addr, "Host", 50, 5);

    let (seeker_addr, seeker_id) = login(&mut harness, 2, "0110000100000002");
    upload_status(&mut harness, seeker_addr, "Seeker", 55, 6);

    // Host places a white sign in area 1010.
    let created = harness.request(
        host_addr,
        &RequestCreateSign {
            sign_type: sign_type::WHITE,
            area_id: 1010,
            cell_id: None,
            matching_parameter: Some(MatchingParameter {
                soul_level: 50,
                max_weapon_level: 5,
                ..Default::default()
            }),
            player_struct: Vec::new(),
        },
    );
    assert!(created.sign_id >= 1000);

    // Seeker finds it with compatible parameters.
    let list = harness.request(
        seeker_addr,
        &RequestGetSignList {
            max_signs: 5,
            matching_parameter: Some(MatchingParameter {
                soul_level: 55,
                max_weapon_level: 6,
                ..Default::default()
            }),
            search_areas: vec![SignDomainGetInfo {
                area_id: 1010,
                cell_id: None,
                max_signs: 5,
                already_have_signs: Vec::new(),
            }],
        },
    );
    assert_eq!(list.sign_data.len(), 1);
    let sign = &list.sign_data[0];
    assert_eq!(sign.sign_info.as_ref().unwrap().sign_id, created.sign_id);
    assert_eq!(sign.sign_info.as_ref().unwrap().player_id, host_id);

    // Re-requesting with the sign marked already-held returns id only.
    let relist = harness.request(
        seeker_addr,
        &RequestGetSignList {
            max_signs: 5,
            matching_parameter: Some(MatchingParameter {
                soul_level: 55,
                max_weapon_level: 6,
                ..Default::default()
            }),
            search_areas: vec![SignDomainGetInfo {
                area_id: 1010,
                cell_id: None,
                max_signs: 5,
                already_have_signs: vec![SignInfo {
                    player_id: host_id,
                    sign_id: created.sign_id,
                }],
            }],
        },
    );
    assert!(relist.sign_data.is_empty());
    assert_eq!(relist.sign_info_without_data.len(), 1);

    // Seeker summons; the host gets the push.
    let _: RequestSummonSignResponse = harness.request(
        seeker_addr,
        &RequestSummonSign {
            area_id: 1010,
            cell_id: None,
            sign_info: Some(SignInfo {
                player_id: host_id,
                sign_id: created.sign_id,
            }),
            player_struct: Vec::new(),
        },
    );

    let summons: Vec<PushRequestSummonSign> = harness.pushes_of(host_addr);
    assert_eq!(summons.len(), 1);
    assert_eq!(summons[0].summoner_player_id, seeker_id);
    assert_eq!(summons[0].sign_id, created.sign_id);

    // A second summoner is turned away while the first is pending.
    let (third_addr, _) = login(&mut harness, 3, "0110000100000003");
    upload_status(&mut harness, third_addr, "Third", 52, 5);
    let _: RequestSummonSignResponse = harness.request(
        third_addr,
        &RequestSummonSign {
            area_id: 1010,
            cell_id: None,
            sign_info: Some(SignInfo {
                player_id: host_id,
                sign_id: created.sign_id,
            }),
            player_struct: Vec::new(),
        },
    );
    let rejections: Vec<PushRequestRejectSign> = harness.pushes_of(third_addr);
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].sign_id, created.sign_id);

    // Host disconnects; the aware seeker is told the sign is gone.
    harness.disconnect(host_addr);

    let removals: Vec<PushRequestRemoveSign> = harness.pushes_of(seeker_addr);
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].sign_id, created.sign_id);
    assert_eq!(removals[0].owner_player_id, host_id);
}

#[test]
fn bloodstain_sampling_excludes_caller_and_caps_results() {
    let store = std::sync::Arc::new(emberward_store::MemoryDatabase::new());
    let author = store.find_or_create_player("0110000100000009").unwrap();
    for i in 0..5u8 {
        store
            .create_bloodstain(2000, None, author, "0110000100000009", &[i], &[i, i])
            .unwrap();
    }

    // The cache primes from the store at service construction.
    let mut harness = Harness::with_config_and_store(ShardConfig::default(), store);
    let (addr, caller_id) = login(&mut harness, 7, "0110000100000001");
    assert_ne!(caller_id, author);

    let response = harness.request(
        addr,
        &RequestGetBloodstainList {
            max_stains: 3,
            search_areas: vec![DomainLimit {
                area_id: 2000,
                cell_id: None,
                max_entries: 3,
            }],
        },
    );

    assert_eq!(response.bloodstains.len(), 3);
    let mut ids: Vec<u32> = response.bloodstains.iter().map(|b| b.bloodstain_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3, "sampled ids must be distinct");
    assert!(response.bloodstains.iter().all(|b| b.area_id == 2000));
}

#[test]
fn quick_match_result_carries_rank_over_threshold() {
    let config = ShardConfig {
        quick_match_rank_xp: vec![0, 100, 250],
        quick_match_win_xp: 120,
        quick_match_draw_xp: 40,
        quick_match_lose_xp: 10,
        ..ShardConfig::default()
    };
    let mut harness = Harness::with_config(config);

    let (addr, player_id) = login(&mut harness, 11, "0110000100000001");

    let response = harness.request(
        addr,
        &RequestSendQuickMatchResult {
            mode: crate::handlers::quick_match::mode::DUEL,
            result: crate::handlers::quick_match::outcome::WIN,
            character_id: 1,
        },
    );
    assert_eq!((response.rank, response.xp), (1, 20));

    assert_eq!(
        harness
            .store
            .get_quick_match_rank(player_id, 1, emberward_store::QuickMatchLadder::Duel)
            .unwrap(),
        (1, 20)
    );
}

#[test]
fn sign_ids_are_never_reused_across_sessions() {
    let mut harness = Harness::new();

    let (addr, _) = login(&mut harness, 13, "0110000100000001");
    let first = harness.request(
        addr,
        &RequestCreateSign {
            sign_type: sign_type::WHITE,
            area_id: 1010,
            cell_id: None,
            matching_parameter: Some(MatchingParameter::default()),
            player_struct: Vec::new(),
        },
    );
    harness.disconnect(addr);

    let (addr, _) = login(&mut harness, 14, "0110000100000001");
    let second = harness.request(
        addr,
        &RequestCreateSign {
            sign_type: sign_type::WHITE,
            area_id: 1010,
            cell_id: None,
            matching_parameter: Some(MatchingParameter::default()),
            player_struct: Vec::new(),
        },
    );

    assert!(second.sign_id > first.sign_id);
}

#[test]
fn created_bloodstain_becomes_visible_to_others() {
    let mut harness = Harness::new();
    let (victim_addr, _) = login(&mut harness, 15, "0110000100000001");
    let (viewer_addr, _) = login(&mut harness, 16, "0110000100000002");

    // Death reports are fire and forget.
    harness.notify(
        victim_addr,
        &RequestCreateBloodstain {
            area_id: 3000,
            cell_id: None,
            data: Vec::new(),
            ghost_data: Vec::new(),
        },
    );

    let response = harness.request(
        viewer_addr,
        &RequestGetAreaBloodstainList {
            area_id: 3000,
            cell_id: None,
            max_stains: 8,
        },
    );
    assert_eq!(response.bloodstains.len(), 1);

    let replay = harness.request(
        viewer_addr,
        &RequestGetDeadingGhost {
            area_id: 3000,
            bloodstain_id: response.bloodstains[0].bloodstain_id,
        },
    );
    assert_eq!(replay.bloodstain_id, response.bloodstains[0].bloodstain_id);
}

#[test]
fn quick_match_registry_lifecycle() {
    let mut harness = Harness::new();
    let (host_addr, host_id) = login(&mut harness, 17, "0110000100000001");
    let (seeker_addr, _) = login(&mut harness, 18, "0110000100000002");

    let _: RequestRegisterQuickMatchResponse = harness.request(
        host_addr,
        &RequestRegisterQuickMatch {
            mode: crate::handlers::quick_match::mode::DUEL,
            map_id: 9,
            area_id: 900,
            matching_parameter: Some(MatchingParameter::default()),
        },
    );
    assert_eq!(harness.service.managers().quick_match.match_count(), 1);

    let found = harness.request(
        seeker_addr,
        &RequestSearchQuickMatch {
            mode: crate::handlers::quick_match::mode::DUEL,
            map_id: 9,
            area_id: 900,
            matching_parameter: Some(MatchingParameter::default()),
            max_results: 8,
        },
    );
    assert_eq!(found.matches.len(), 1);
    assert_eq!(found.matches[0].host_player_id, host_id);

    // Starting the match takes it out of the registry.
    let _: RequestSendQuickMatchStartResponse = harness.request(
        host_addr,
        &RequestSendQuickMatchStart {
            mode: crate::handlers::quick_match::mode::DUEL,
        },
    );
    assert_eq!(harness.service.managers().quick_match.match_count(), 0);
}

#[test]
fn quick_match_search_returns_sentinel_when_empty() {
    let mut harness = Harness::new();
    let (addr, _) = login(&mut harness, 21, "0110000100000001");

    let response = harness.request(
        addr,
        &RequestSearchQuickMatch {
            mode: crate::handlers::quick_match::mode::DUEL,
            map_id: 9,
            area_id: 900,
            matching_parameter: Some(MatchingParameter::default()),
            max_results: 8,
        },
    );

    assert_eq!(response.matches.len(), 1);
    assert_eq!(response.matches[0].host_player_id, 0);
}

#[test]
fn anti_cheat_warns_then_bans_across_sessions() {
    let config = ShardConfig {
        anti_cheat_enabled: true,
        anti_cheat_auto_ban: true,
        anti_cheat_warning_threshold: 1.0,
        anti_cheat_ban_threshold: 5.0,
        anti_cheat_score_impossible_stats: 3.0,
        ..ShardConfig::default()
    };
    let store = std::sync::Arc::new(emberward_store::MemoryDatabase::new());
    let mut harness = Harness::with_config_and_store(config.clone(), store.clone());

    let impossible = PlayerStatusData {
        basic: Some(BasicStatus {
            character_name: Some("Cheater".into()),
            soul_level: Some(2),
            soul_memory: Some(1_000_000),
            area_id: Some(1010),
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

    // First session: the trigger fires once and the warning goes out.
    let (addr, _) = login(&mut harness, 31, "0110000100000bad");
    {
        use prost::Message;
        let _: RequestUpdatePlayerStatusResponse = harness.request(
            addr,
            &RequestUpdatePlayerStatus {
                status: impossible.encode_to_vec(),
            },
        );
    }

    harness.advance(Duration::from_secs(6));
    harness.step();
    harness.step();

    assert_eq!(store.get_anti_cheat_penalty("0110000100000bad").unwrap(), 3.0);
    let warnings: Vec<ManagementTextMessage> = harness.pushes_of(addr);
    assert_eq!(warnings.len(), 1);
    assert!(!store.is_banned("0110000100000bad").unwrap());

    harness.disconnect(addr);

    // Second session: stored penalty plus a fresh trigger crosses the ban
    // threshold.
    let (addr, _) = login(&mut harness, 32, "0110000100000bad");
    {
        use prost::Message;
        let _: RequestUpdatePlayerStatusResponse = harness.request(
            addr,
            &RequestUpdatePlayerStatus {
                status: impossible.encode_to_vec(),
            },
        );
    }

    harness.advance(Duration::from_secs(6));
    harness.step();
    harness.step();

    assert_eq!(store.get_anti_cheat_penalty("0110000100000bad").unwrap(), 6.0);
    assert!(store.is_banned("0110000100000bad").unwrap());

    // The scheduled disconnect lands roughly two seconds later.
    harness.advance(Duration::from_secs(3));
    harness.step();
    harness.step();
    assert_eq!(harness.service.session_count(), 0);
}

#[test]
fn hostile_sign_blob_is_accepted_silently_without_caching() {
    let mut harness = Harness::new();
    let (addr, _) = login(&mut harness, 41, "0110000100000001");

    // Declares a 10000-byte entry with only 100 bytes behind it.
    let mut hostile = Vec::new();
    hostile.extend_from_slice(&1u32.to_le_bytes());
    hostile.extend_from_slice(&10_000u32.to_le_bytes());
    hostile.extend_from_slice(&[0u8; 100]);

    let response = harness.request(
        addr,
        &RequestCreateSign {
            sign_type: sign_type::WHITE,
            area_id: 1010,
            cell_id: None,
            matching_parameter: Some(MatchingParameter::default()),
            player_struct: hostile,
        },
    );

    assert_eq!(response.sign_id, 0);
    assert_eq!(harness.service.managers().signs.sign_count(), 0);
    // The session survives.
    assert_eq!(harness.service.session_count(), 1);
}

#[test]
fn oversized_relay_recipient_list_is_ignored() {
    use prost::Message;

    let mut harness = Harness::new();
    let (addr, _) = login(&mut harness, 51, "0110000100000001");
    let (peer_addr, peer_id) = login(&mut harness, 52, "0110000100000002");

    // Seven recipients is over the cap; the request is ignored but still
    // answered, and nothing is relayed.
    let _: RequestSendMessageToPlayersResponse = harness.request(
        addr,
        &RequestSendMessageToPlayers {
            player_ids: vec![peer_id, 2, 3, 4, 5, 6, 7],
            message: PushRequestRejectSign {
                push_message_id: 0x0324,
                sign_id: 1,
            }
            .encode_to_vec(),
        },
    );

    assert_eq!(harness.service.session_count(), 2);
    assert!(harness.is_connected(addr));
    let relayed: Vec<PushRequestRejectSign> = harness.pushes_of(peer_addr);
    assert!(relayed.is_empty());
}

#[test]
fn evaluating_your_own_message_closes_the_session() {
    let mut harness = Harness::new();
    let (addr, _) = login(&mut harness, 61, "0110000100000001");

    let created = harness.request(
        addr,
        &RequestReCreateBloodMessageList {
            entries: vec![ReCreateBloodMessageData {
                area_id: 1010,
                cell_id: None,
                character_id: Some(1),
                data: Vec::new(),
            }],
        },
    );
    assert_eq!(created.message_ids.len(), 1);

    let opcode = harness
        .variant
        .opcodes()
        .opcode(emberward_protocol::MessageKind::RequestEvaluateBloodMessage)
        .unwrap();
    {
        let now = harness.now;
        let client = harness.clients_mut(addr);
        client
            .stream
            .send_message(
                now,
                opcode,
                &RequestEvaluateBloodMessage {
                    area_id: 1010,
                    message_id: created.message_ids[0],
                    was_poor: false,
                },
            )
            .unwrap();
    }

    for _ in 0..6 {
        harness.step();
    }
    assert_eq!(harness.service.session_count(), 0);
}

#[test]
fn blood_message_reentry_reports_unknown_ids_for_recreation() {
    let mut harness = Harness::new();
    let (addr, _) = login(&mut harness, 71, "0110000100000001");

    let created = harness.request(
        addr,
        &RequestReCreateBloodMessageList {
            entries: vec![ReCreateBloodMessageData {
                area_id: 1010,
                cell_id: None,
                character_id: None,
                data: Vec::new(),
            }],
        },
    );
    let known_id = created.message_ids[0];

    let response = harness.request(
        addr,
        &RequestReentryBloodMessage {
            messages: vec![
                LocatedMessageId {
                    area_id: 1010,
                    cell_id: None,
                    message_id: known_id,
                },
                LocatedMessageId {
                    area_id: 1010,
                    cell_id: None,
                    message_id: 123_456,
                },
            ],
        },
    );

    assert_eq!(response.recreate_message_ids, vec![123_456]);
}

#[test]
fn evaluation_notifies_the_online_author() {
    let mut harness = Harness::new();
    let (author_addr, author_id) = login(&mut harness, 81, "0110000100000001");
    let (rater_addr, rater_id) = login(&mut harness, 82, "0110000100000002");

    let created = harness.request(
        author_addr,
        &RequestReCreateBloodMessageList {
            entries: vec![ReCreateBloodMessageData {
                area_id: 1010,
                cell_id: None,
                character_id: None,
                data: Vec::new(),
            }],
        },
    );
    let message_id = created.message_ids[0];

    let _: RequestEvaluateBloodMessageResponse = harness.request(
        rater_addr,
        &RequestEvaluateBloodMessage {
            area_id: 1010,
            message_id,
            was_poor: false,
        },
    );

    let notices: Vec<PushRequestEvaluateBloodMessage> = harness.pushes_of(author_addr);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message_id, message_id);
    assert_eq!(notices[0].rater_player_id, rater_id);
    assert_ne!(notices[0].rater_player_id, author_id);

    let evaluations = harness.request(
        rater_addr,
        &RequestGetBloodMessageEvaluation {
            message_ids: vec![message_id],
        },
    );
    assert_eq!(evaluations.evaluations[0].rating_good, 1);
    assert_eq!(evaluations.evaluations[0].rating_poor, 0);
}

#[test]
fn break_in_pushes_target_or_rejects() {
    let mut harness = Harness::new();
    let (invader_addr, invader_id) = login(&mut harness, 91, "0110000100000001");
    upload_status(&mut harness, invader_addr, "Invader", 50, 5);
    let (target_addr, target_id) = login(&mut harness, 92, "0110000100000002");
    upload_status(&mut harness, target_addr, "Target", 52, 5);

    let list = harness.request(
        invader_addr,
        &RequestGetBreakInTargetList {
            area_id: 1010,
            matching_parameter: Some(MatchingParameter {
                soul_level: 50,
                max_weapon_level: 5,
                ..Default::default()
            }),
            max_targets: 8,
        },
    );
    assert!(list.targets.iter().any(|t| t.player_id == target_id));

    let _: RequestBreakInTargetResponse = harness.request(
        invader_addr,
        &RequestBreakInTarget {
            player_id: target_id,
            map_id: 40,
            area_id: 1010,
            player_struct: Vec::new(),
        },
    );
    let invasions: Vec<PushRequestBreakInTarget> = harness.pushes_of(target_addr);
    assert_eq!(invasions.len(), 1);
    assert_eq!(invasions[0].invader_player_id, invader_id);

    // An absent target bounces a rejection back to the invader.
    let _: RequestBreakInTargetResponse = harness.request(
        invader_addr,
        &RequestBreakInTarget {
            player_id: 99_999,
            map_id: 40,
            area_id: 1010,
            player_struct: Vec::new(),
        },
    );
    let rejections: Vec<PushRequestRejectBreakInTarget> = harness.pushes_of(invader_addr);
    assert_eq!(rejections.len(), 1);
}
