//! Shard configuration.
//!
//! Loaded once from a TOML file in the shard directory and treated as
//! read-only at runtime; an edit through the admin surface produces a fresh
//! value for the next shard start, never a mid-request mutation.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One tolerance table for a pairing kind. See
/// [`crate::matching::can_match`] for how the fields combine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingTable {
    /// How far above the host's level a candidate may be.
    pub soul_range_up: u64,
    /// How far below.
    pub soul_range_down: u64,
    /// Final cap on the window as a percentage of the host's level. Zero
    /// disables the cap.
    pub soul_pct: f32,
    /// Highest matchable weapon level, indexed by own max weapon level.
    /// The last entry covers everything beyond the table.
    pub weapon_level_upper: Vec<u32>,
    /// Skip the level checks entirely when both sides share a password.
    pub ignore_when_password: bool,
}

impl Default for MatchingTable {
    fn default() -> Self {
        Self {
            soul_range_up: 10,
            soul_range_down: 10,
            soul_pct: 10.0,
            weapon_level_upper: vec![1, 2, 3, 4, 6, 7, 8, 9, 10, 10, 10],
            ignore_when_password: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Announcement {
    pub header: String,
    pub body: String,
}

/// Which events produce outbound webhook notices.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookNotices {
    pub summon_sign: bool,
    pub bell: bool,
    pub anti_cheat: bool,
    pub undead_match: bool,
    pub bonfire_lit: bool,
    pub boss_kill: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    /// Shown in logs and the handshake advertisement.
    pub shard_name: String,
    /// Hostname advertised to clients through the credential service.
    pub advertised_hostname: String,
    pub game_port: u16,
    /// Optional shard password; clients carry it in matching parameters.
    pub password: String,
    /// Which concrete game this shard serves ("ashen" or "sunken").
    pub game_variant: String,

    // Live-cache pool sizing.
    pub summon_sign_max_entries_per_area: usize,
    pub blood_message_max_entries_per_area: usize,
    pub bloodstain_max_entries_per_area: usize,
    pub ghost_max_entries_per_area: usize,
    /// Rows per area pulled from the store to prime each cache at startup.
    pub blood_message_prime_count_per_area: usize,
    pub bloodstain_prime_count_per_area: usize,
    pub ghost_prime_count_per_area: usize,

    // Feature toggles.
    pub disable_blood_messages: bool,
    pub disable_bloodstains: bool,
    pub disable_ghosts: bool,
    pub disable_coop: bool,
    pub disable_invasions: bool,
    pub disable_invasion_auto_summon: bool,
    pub disable_weapon_level_matching: bool,

    // Tolerance tables per pairing kind.
    pub summon_sign_matching: MatchingTable,
    pub invasion_matching: MatchingTable,
    pub visitor_matching: MatchingTable,
    pub undead_match_matching: MatchingTable,

    // Anti-cheat.
    pub anti_cheat_enabled: bool,
    pub anti_cheat_auto_ban: bool,
    pub anti_cheat_warning_threshold: f32,
    pub anti_cheat_ban_threshold: f32,
    pub anti_cheat_score_impossible_stats: f32,
    pub anti_cheat_score_invalid_name: f32,
    pub anti_cheat_score_client_flagged: f32,

    // Undead-match ranking. Cumulative XP needed to step from each rank to
    // the next; index 0 is unused padding for rank zero.
    pub quick_match_rank_xp: Vec<u32>,
    pub quick_match_win_xp: u32,
    pub quick_match_draw_xp: u32,
    pub quick_match_lose_xp: u32,

    // Client status uploads.
    pub player_status_upload_interval: u32,
    pub player_status_upload_delay: u32,

    pub announcements: Vec<Announcement>,
    pub warning_announcement: Announcement,
    pub ban_announcement: Announcement,

    /// Empty disables the notifier.
    pub webhook_url: String,
    pub webhook_notices: WebhookNotices,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            shard_name: "default".into(),
            advertised_hostname: "127.0.0.1".into(),
            game_port: 50050,
            password: String::new(),
            game_variant: "ashen".into(),

            summon_sign_max_entries_per_area: 50,
            blood_message_max_entries_per_area: 50,
            bloodstain_max_entries_per_area: 50,
            ghost_max_entries_per_area: 50,
            blood_message_prime_count_per_area: 50,
            bloodstain_prime_count_per_area: 50,
            ghost_prime_count_per_area: 50,

            disable_blood_messages: false,
            disable_bloodstains: false,
            disable_ghosts: false,
            disable_coop: false,
            disable_invasions: false,
            disable_invasion_auto_summon: false,
            disable_weapon_level_matching: false,

            summon_sign_matching: MatchingTable::default(),
            invasion_matching: MatchingTable {
                soul_range_up: 10,
                soul_range_down: 20,
                ignore_when_password: false,
                ..MatchingTable::default()
            },
            visitor_matching: MatchingTable {
                soul_range_up: 15,
                soul_range_down: 15,
                ..MatchingTable::default()
            },
            undead_match_matching: MatchingTable {
                soul_range_up: u64::MAX / 2,
                soul_range_down: u64::MAX / 2,
                soul_pct: 0.0,
                ..MatchingTable::default()
            },

            anti_cheat_enabled: true,
            anti_cheat_auto_ban: false,
            anti_cheat_warning_threshold: 1.0,
            anti_cheat_ban_threshold: 10.0,
            anti_cheat_score_impossible_stats: 3.0,
            anti_cheat_score_invalid_name: 1.0,
            anti_cheat_score_client_flagged: 10.0,

            quick_match_rank_xp: vec![0, 100, 250, 500, 1000],
            quick_match_win_xp: 120,
            quick_match_draw_xp: 40,
            quick_match_lose_xp: 10,

            player_status_upload_interval: 300,
            player_status_upload_delay: 10,

            announcements: vec![Announcement {
                header: "Welcome".into(),
                body: "This is an unofficial community server.".into(),
            }],
            warning_announcement: Announcement {
                header: "Warning".into(),
                body: "Irregularities were detected on your account. Continued \
                       violations may result in a ban."
                    .into(),
            },
            ban_announcement: Announcement {
                header: "Banned".into(),
                body: "Your account has been banned from this server.".into(),
            },

            webhook_url: String::new(),
            webhook_notices: WebhookNotices::default(),
        }
    }
}

impl ShardConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = ShardConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ShardConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.game_port, config.game_port);
        assert_eq!(parsed.quick_match_rank_xp, config.quick_match_rank_xp);
    }

    #[test]
    fn partial_files_fill_defaults() {
        let parsed: ShardConfig = toml::from_str("game_port = 51000").unwrap();
        assert_eq!(parsed.game_port, 51000);
        assert_eq!(parsed.game_variant, "ashen");
        assert!(!parsed.summon_sign_matching.weapon_level_upper.is_empty());
    }
}
