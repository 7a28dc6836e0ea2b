//! The durable-store interface the server core consumes.
//!
//! The store itself is an external collaborator (a SQLite-backed
//! implementation in production); the core only depends on the [`Database`]
//! trait here. [`MemoryDatabase`] implements it entirely in memory and backs
//! memory-cache mode and the test suites.
//!
//! All operations are synchronous from the core's viewpoint; an
//! implementation is free to batch internally. Queries that scan artifacts
//! accept `(area_id, limit)` and return newest-first.

mod memory;

pub use memory::MemoryDatabase;

/// Artifact ids handed out by a durable store are strictly positive when
/// read as `i32`. [`MemoryDatabase`] allocates downward from `u32::MAX`
/// (negative as `i32`) so live-only ids can never collide with persisted
/// ones.
pub fn is_live_only_id(id: u32) -> bool {
    (id as i32) < 0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloodMessageRecord {
    pub id: u32,
    pub area_id: u32,
    pub cell_id: Option<u64>,
    pub player_id: u32,
    pub steam_id: String,
    pub character_id: Option<u32>,
    pub data: Vec<u8>,
    pub rating_good: u32,
    pub rating_poor: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloodstainRecord {
    pub id: u32,
    pub area_id: u32,
    pub cell_id: Option<u64>,
    pub player_id: u32,
    pub steam_id: String,
    pub data: Vec<u8>,
    pub ghost_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GhostRecord {
    pub id: u32,
    pub area_id: u32,
    pub cell_id: Option<u64>,
    pub player_id: u32,
    pub steam_id: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CharacterRecord {
    pub player_id: u32,
    pub character_id: u32,
    pub data: Vec<u8>,
    pub quickmatch_duel_rank: u32,
    pub quickmatch_duel_xp: u32,
    pub quickmatch_brawl_rank: u32,
    pub quickmatch_brawl_xp: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankingRecord {
    pub board_id: u32,
    pub player_id: u32,
    pub character_id: u32,
    pub score: u64,
    /// Position counting ties distinctly.
    pub serial_rank: u32,
    /// Position with ties sharing a rank.
    pub rank: u32,
    pub data: Vec<u8>,
}

/// Which of the two ranked quick-match ladders a result applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QuickMatchLadder {
    Duel,
    Brawl,
}

/// How `register_score` combines a new score with an existing entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScorePolicy {
    /// Keep the maximum of old and new.
    KeepBest,
    /// Add the new score onto the old (boards that count accumulations).
    Accumulate,
}

/// The durable key/value store shared by every shard a manager hosts.
pub trait Database: Send + Sync {
    // Players and moderation.
    fn find_or_create_player(&self, steam_id: &str) -> anyhow::Result<u32>;
    fn ban_player(&self, steam_id: &str) -> anyhow::Result<()>;
    fn is_banned(&self, steam_id: &str) -> anyhow::Result<bool>;
    fn get_anti_cheat_penalty(&self, steam_id: &str) -> anyhow::Result<f32>;
    /// Adds `delta` to the stored penalty and returns the new total.
    fn add_anti_cheat_penalty(&self, steam_id: &str, delta: f32) -> anyhow::Result<f32>;

    // Statistics.
    fn add_global_statistic(&self, key: &str, delta: i64) -> anyhow::Result<()>;
    fn add_player_statistic(&self, key: &str, player_id: u32, delta: i64) -> anyhow::Result<()>;
    fn get_global_statistic(&self, key: &str) -> anyhow::Result<i64>;

    // Characters.
    fn find_character(
        &self,
        player_id: u32,
        character_id: u32,
    ) -> anyhow::Result<Option<CharacterRecord>>;
    fn create_or_update_character(
        &self,
        player_id: u32,
        character_id: u32,
        data: &[u8],
    ) -> anyhow::Result<()>;
    fn get_quick_match_rank(
        &self,
        player_id: u32,
        character_id: u32,
        ladder: QuickMatchLadder,
    ) -> anyhow::Result<(u32, u32)>;
    fn set_quick_match_rank(
        &self,
        player_id: u32,
        character_id: u32,
        ladder: QuickMatchLadder,
        rank: u32,
        xp: u32,
    ) -> anyhow::Result<()>;

    // Blood messages.
    fn create_blood_message(
        &self,
        area_id: u32,
        cell_id: Option<u64>,
        player_id: u32,
        steam_id: &str,
        character_id: Option<u32>,
        data: &[u8],
    ) -> anyhow::Result<BloodMessageRecord>;
    fn find_blood_message(&self, id: u32) -> anyhow::Result<Option<BloodMessageRecord>>;
    fn remove_blood_message(&self, id: u32) -> anyhow::Result<()>;
    fn set_blood_message_evaluation(&self, id: u32, good: u32, poor: u32) -> anyhow::Result<()>;
    fn recent_blood_messages(
        &self,
        area_id: u32,
        limit: usize,
    ) -> anyhow::Result<Vec<BloodMessageRecord>>;
    /// Areas that currently hold at least one row; drives cache priming.
    fn blood_message_areas(&self) -> anyhow::Result<Vec<u32>>;
    /// Prunes the oldest rows beyond `max_per_area` in every area.
    fn trim_blood_messages(&self, max_per_area: usize) -> anyhow::Result<()>;

    // Bloodstains.
    fn create_bloodstain(
        &self,
        area_id: u32,
        cell_id: Option<u64>,
        player_id: u32,
        steam_id: &str,
        data: &[u8],
        ghost_data: &[u8],
    ) -> anyhow::Result<BloodstainRecord>;
    fn find_bloodstain(&self, id: u32) -> anyhow::Result<Option<BloodstainRecord>>;
    fn recent_bloodstains(
        &self,
        area_id: u32,
        limit: usize,
    ) -> anyhow::Result<Vec<BloodstainRecord>>;
    fn bloodstain_areas(&self) -> anyhow::Result<Vec<u32>>;
    fn trim_bloodstains(&self, max_per_area: usize) -> anyhow::Result<()>;

    // Ghosts.
    fn create_ghost(
        &self,
        area_id: u32,
        cell_id: Option<u64>,
        player_id: u32,
        steam_id: &str,
        data: &[u8],
    ) -> anyhow::Result<GhostRecord>;
    fn find_ghost(&self, id: u32) -> anyhow::Result<Option<GhostRecord>>;
    fn recent_ghosts(&self, area_id: u32, limit: usize) -> anyhow::Result<Vec<GhostRecord>>;
    fn ghost_areas(&self) -> anyhow::Result<Vec<u32>>;
    fn trim_ghosts(&self, max_per_area: usize) -> anyhow::Result<()>;

    // Rankings.
    fn register_score(
        &self,
        board_id: u32,
        player_id: u32,
        character_id: u32,
        score: u64,
        data: &[u8],
        policy: ScorePolicy,
    ) -> anyhow::Result<()>;
    /// Returns the window `[offset, offset + count)` of the board sorted by
    /// score descending; `offset` is 1-based.
    fn get_rankings(
        &self,
        board_id: u32,
        offset: u32,
        count: u32,
    ) -> anyhow::Result<Vec<RankingRecord>>;
    fn get_character_ranking(
        &self,
        board_id: u32,
        player_id: u32,
        character_id: u32,
    ) -> anyhow::Result<Option<RankingRecord>>;
    fn get_ranking_count(&self, board_id: u32) -> anyhow::Result<u32>;
}
