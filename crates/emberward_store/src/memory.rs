//! In-memory [`Database`] implementation.
//!
//! Backs memory-cache mode (no files on disk, nothing survives a restart)
//! and the test suites. Artifact ids are allocated downward from `u32::MAX`
//! so they read as negative `i32`s and can never collide with ids a durable
//! store has handed out.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{
    BloodMessageRecord, BloodstainRecord, CharacterRecord, Database, GhostRecord,
    QuickMatchLadder, RankingRecord, ScorePolicy,
};

#[derive(Default)]
struct Inner {
    next_player_id: u32,
    players: FxHashMap<String, u32>,
    bans: FxHashMap<String, ()>,
    penalties: FxHashMap<String, f32>,
    global_statistics: FxHashMap<String, i64>,
    player_statistics: FxHashMap<(String, u32), i64>,
    characters: FxHashMap<(u32, u32), CharacterRecord>,

    next_artifact_id: u32,
    blood_messages: Vec<BloodMessageRecord>,
    bloodstains: Vec<BloodstainRecord>,
    ghosts: Vec<GhostRecord>,

    boards: FxHashMap<u32, Vec<BoardEntry>>,
}

struct BoardEntry {
    player_id: u32,
    character_id: u32,
    score: u64,
    data: Vec<u8>,
}

pub struct MemoryDatabase {
    inner: Mutex<Inner>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_player_id: 1,
                next_artifact_id: u32::MAX,
                ..Inner::default()
            }),
        }
    }
}

impl Inner {
    fn allocate_artifact_id(&mut self) -> u32 {
        let id = self.next_artifact_id;
        self.next_artifact_id -= 1;
        id
    }
}

fn distinct_areas(areas: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut out: Vec<u32> = areas.collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Keeps only the newest `max_per_area` entries per area, preserving
/// insertion order.
fn trim_by_area<T>(rows: &mut Vec<T>, max_per_area: usize, area_of: impl Fn(&T) -> u32) {
    let mut keep_counts: FxHashMap<u32, usize> = FxHashMap::default();
    for row in rows.iter() {
        *keep_counts.entry(area_of(row)).or_default() += 1;
    }

    let mut excess: FxHashMap<u32, usize> = keep_counts
        .into_iter()
        .filter_map(|(area, count)| (count > max_per_area).then_some((area, count - max_per_area)))
        .collect();

    // Rows are in insertion order, so the first `excess` per area are the
    // oldest.
    rows.retain(|row| {
        let area = area_of(row);
        match excess.get_mut(&area) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        }
    });
}

impl Database for MemoryDatabase {
    fn find_or_create_player(&self, steam_id: &str) -> anyhow::Result<u32> {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.players.get(steam_id) {
            return Ok(id);
        }
        let id = inner.next_player_id;
        inner.next_player_id += 1;
        inner.players.insert(steam_id.to_owned(), id);
        Ok(id)
    }

    fn ban_player(&self, steam_id: &str) -> anyhow::Result<()> {
        self.inner.lock().bans.insert(steam_id.to_owned(), ());
        Ok(())
    }

    fn is_banned(&self, steam_id: &str) -> anyhow::Result<bool> {
        Ok(self.inner.lock().bans.contains_key(steam_id))
    }

    fn get_anti_cheat_penalty(&self, steam_id: &str) -> anyhow::Result<f32> {
        Ok(self
            .inner
            .lock()
            .penalties
            .get(steam_id)
            .copied()
            .unwrap_or(0.0))
    }

    fn add_anti_cheat_penalty(&self, steam_id: &str, delta: f32) -> anyhow::Result<f32> {
        let mut inner = self.inner.lock();
        let penalty = inner.penalties.entry(steam_id.to_owned()).or_insert(0.0);
        *penalty += delta;
        Ok(*penalty)
    }

    fn add_global_statistic(&self, key: &str, delta: i64) -> anyhow::Result<()> {
        *self
            .inner
            .lock()
            .global_statistics
            .entry(key.to_owned())
            .or_default() += delta;
        Ok(())
    }

    fn add_player_statistic(&self, key: &str, player_id: u32, delta: i64) -> anyhow::Result<()> {
        *self
            .inner
            .lock()
            .player_statistics
            .entry((key.to_owned(), player_id))
            .or_default() += delta;
        Ok(())
    }

    fn get_global_statistic(&self, key: &str) -> anyhow::Result<i64> {
        Ok(self
            .inner
            .lock()
            .global_statistics
            .get(key)
            .copied()
            .unwrap_or(0))
    }

    fn find_character(
        &self,
        player_id: u32,
        character_id: u32,
    ) -> anyhow::Result<Option<CharacterRecord>> {
        Ok(self
            .inner
            .lock()
            .characters
            .get(&(player_id, character_id))
            .cloned())
    }

    fn create_or_update_character(
        &self,
        player_id: u32,
        character_id: u32,
        data: &[u8],
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        let character = inner
            .characters
            .entry((player_id, character_id))
            .or_insert_with(|| CharacterRecord {
                player_id,
                character_id,
                ..CharacterRecord::default()
            });
        character.data = data.to_vec();
        Ok(())
    }

    fn get_quick_match_rank(
        &self,
        player_id: u32,
        character_id: u32,
        ladder: QuickMatchLadder,
    ) -> anyhow::Result<(u32, u32)> {
        let inner = self.inner.lock();
        let Some(character) = inner.characters.get(&(player_id, character_id)) else {
            return Ok((0, 0));
        };
        Ok(match ladder {
            QuickMatchLadder::Duel => {
                (character.quickmatch_duel_rank, character.quickmatch_duel_xp)
            }
            QuickMatchLadder::Brawl => (
                character.quickmatch_brawl_rank,
                character.quickmatch_brawl_xp,
            ),
        })
    }

    fn set_quick_match_rank(
        &self,
        player_id: u32,
        character_id: u32,
        ladder: QuickMatchLadder,
        rank: u32,
        xp: u32,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        let character = inner
            .characters
            .entry((player_id, character_id))
            .or_insert_with(|| CharacterRecord {
                player_id,
                character_id,
                ..CharacterRecord::default()
            });
        match ladder {
            QuickMatchLadder::Duel => {
                character.quickmatch_duel_rank = rank;
                character.quickmatch_duel_xp = xp;
            }
            QuickMatchLadder::Brawl => {
                character.quickmatch_brawl_rank = rank;
                character.quickmatch_brawl_xp = xp;
            }
        }
        Ok(())
    }

    fn create_blood_message(
        &self,
        area_id: u32,
        cell_id: Option<u64>,
        player_id: u32,
        steam_id: &str,
        character_id: Option<u32>,
        data: &[u8],
    ) -> anyhow::Result<BloodMessageRecord> {
        let mut inner = self.inner.lock();
        let record = BloodMessageRecord {
            id: inner.allocate_artifact_id(),
            area_id,
            cell_id,
            player_id,
            steam_id: steam_id.to_owned(),
            character_id,
            data: data.to_vec(),
            rating_good: 0,
            rating_poor: 0,
        };
        inner.blood_messages.push(record.clone());
        Ok(record)
    }

    fn find_blood_message(&self, id: u32) -> anyhow::Result<Option<BloodMessageRecord>> {
        Ok(self
            .inner
            .lock()
            .blood_messages
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    fn remove_blood_message(&self, id: u32) -> anyhow::Result<()> {
        self.inner.lock().blood_messages.retain(|m| m.id != id);
        Ok(())
    }

    fn set_blood_message_evaluation(&self, id: u32, good: u32, poor: u32) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.blood_messages.iter_mut().find(|m| m.id == id) {
            message.rating_good = good;
            message.rating_poor = poor;
        }
        Ok(())
    }

    fn recent_blood_messages(
        &self,
        area_id: u32,
        limit: usize,
    ) -> anyhow::Result<Vec<BloodMessageRecord>> {
        Ok(self
            .inner
            .lock()
            .blood_messages
            .iter()
            .rev()
            .filter(|m| m.area_id == area_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn blood_message_areas(&self) -> anyhow::Result<Vec<u32>> {
        Ok(distinct_areas(self.inner.lock().blood_messages.iter().map(|m| m.area_id)))
    }

    fn trim_blood_messages(&self, max_per_area: usize) -> anyhow::Result<()> {
        trim_by_area(&mut self.inner.lock().blood_messages, max_per_area, |m| {
            m.area_id
        });
        Ok(())
    }

    fn create_bloodstain(
        &self,
        area_id: u32,
        cell_id: Option<u64>,
        player_id: u32,
        steam_id: &str,
        data: &[u8],
        ghost_data: &[u8],
    ) -> anyhow::Result<BloodstainRecord> {
        let mut inner = self.inner.lock();
        let record = BloodstainRecord {
            id: inner.allocate_artifact_id(),
            area_id,
            cell_id,
            player_id,
            steam_id: steam_id.to_owned(),
            data: data.to_vec(),
            ghost_data: ghost_data.to_vec(),
        };
        inner.bloodstains.push(record.clone());
        Ok(record)
    }

    fn find_bloodstain(&self, id: u32) -> anyhow::Result<Option<BloodstainRecord>> {
        Ok(self
            .inner
            .lock()
            .bloodstains
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    fn recent_bloodstains(
        &self,
        area_id: u32,
        limit: usize,
    ) -> anyhow::Result<Vec<BloodstainRecord>> {
        Ok(self
            .inner
            .lock()
            .bloodstains
            .iter()
            .rev()
            .filter(|b| b.area_id == area_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn bloodstain_areas(&self) -> anyhow::Result<Vec<u32>> {
        Ok(distinct_areas(self.inner.lock().bloodstains.iter().map(|b| b.area_id)))
    }

    fn trim_bloodstains(&self, max_per_area: usize) -> anyhow::Result<()> {
        trim_by_area(&mut self.inner.lock().bloodstains, max_per_area, |b| {
            b.area_id
        });
        Ok(())
    }

    fn create_ghost(
        &self,
        area_id: u32,
        cell_id: Option<u64>,
        player_id: u32,
        steam_id: &str,
        data: &[u8],
    ) -> anyhow::Result<GhostRecord> {
        let mut inner = self.inner.lock();
        let record = GhostRecord {
            id: inner.allocate_artifact_id(),
            area_id,
            cell_id,
            player_id,
            steam_id: steam_id.to_owned(),
            data: data.to_vec(),
        };
        inner.ghosts.push(record.clone());
        Ok(record)
    }

    fn find_ghost(&self, id: u32) -> anyhow::Result<Option<GhostRecord>> {
        Ok(self.inner.lock().ghosts.iter().find(|g| g.id == id).cloned())
    }

    fn recent_ghosts(&self, area_id: u32, limit: usize) -> anyhow::Result<Vec<GhostRecord>> {
        Ok(self
            .inner
            .lock()
            .ghosts
            .iter()
            .rev()
            .filter(|g| g.area_id == area_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn ghost_areas(&self) -> anyhow::Result<Vec<u32>> {
        Ok(distinct_areas(self.inner.lock().ghosts.iter().map(|g| g.area_id)))
    }

    fn trim_ghosts(&self, max_per_area: usize) -> anyhow::Result<()> {
        trim_by_area(&mut self.inner.lock().ghosts, max_per_area, |g| g.area_id);
        Ok(())
    }

    fn register_score(
        &self,
        board_id: u32,
        player_id: u32,
        character_id: u32,
        score: u64,
        data: &[u8],
        policy: ScorePolicy,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        let board = inner.boards.entry(board_id).or_default();

        match board
            .iter_mut()
            .find(|e| e.player_id == player_id && e.character_id == character_id)
        {
            Some(entry) => {
                entry.score = match policy {
                    ScorePolicy::KeepBest => entry.score.max(score),
                    ScorePolicy::Accumulate => entry.score + score,
                };
                entry.data = data.to_vec();
            }
            None => board.push(BoardEntry {
                player_id,
                character_id,
                score,
                data: data.to_vec(),
            }),
        }
        Ok(())
    }

    fn get_rankings(
        &self,
        board_id: u32,
        offset: u32,
        count: u32,
    ) -> anyhow::Result<Vec<RankingRecord>> {
        let ranked = self.ranked_board(board_id);
        let start = (offset.max(1) - 1) as usize;
        Ok(ranked
            .into_iter()
            .skip(start)
            .take(count as usize)
            .collect())
    }

    fn get_character_ranking(
        &self,
        board_id: u32,
        player_id: u32,
        character_id: u32,
    ) -> anyhow::Result<Option<RankingRecord>> {
        Ok(self
            .ranked_board(board_id)
            .into_iter()
            .find(|r| r.player_id == player_id && r.character_id == character_id))
    }

    fn get_ranking_count(&self, board_id: u32) -> anyhow::Result<u32> {
        Ok(self
            .inner
            .lock()
            .boards
            .get(&board_id)
            .map_or(0, |b| b.len() as u32))
    }
}

impl MemoryDatabase {
    /// The whole board sorted by score descending, with both rank flavors
    /// computed: `serial_rank` counts every entry, `rank` lets ties share.
    fn ranked_board(&self, board_id: u32) -> Vec<RankingRecord> {
        let inner = self.inner.lock();
        let Some(board) = inner.boards.get(&board_id) else {
            return Vec::new();
        };

        let mut sorted: Vec<&BoardEntry> = board.iter().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));

        let mut out = Vec::with_capacity(sorted.len());
        let mut rank = 0;
        let mut previous_score = None;
        for (index, entry) in sorted.iter().enumerate() {
            if previous_score != Some(entry.score) {
                rank = index as u32 + 1;
                previous_score = Some(entry.score);
            }
            out.push(RankingRecord {
                board_id,
                player_id: entry.player_id,
                character_id: entry.character_id,
                score: entry.score,
                serial_rank: index as u32 + 1,
                rank,
                data: entry.data.clone(),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::is_live_only_id;

    #[test]
    fn player_ids_are_stable_per_account() {
        let db = MemoryDatabase::new();
        let a = db.find_or_create_player("0110000100000001").unwrap();
        let b = db.find_or_create_player("0110000100000002").unwrap();
        assert_ne!(a, b);
        assert_eq!(db.find_or_create_player("0110000100000001").unwrap(), a);
    }

    #[test]
    fn artifact_ids_are_live_only() {
        let db = MemoryDatabase::new();
        let record = db
            .create_blood_message(1010, None, 1, "s", None, b"msg")
            .unwrap();
        assert!(is_live_only_id(record.id));
    }

    #[test]
    fn recent_messages_are_newest_first() {
        let db = MemoryDatabase::new();
        let a = db.create_blood_message(1, None, 1, "s", None, b"a").unwrap();
        let b = db.create_blood_message(1, None, 1, "s", None, b"b").unwrap();
        db.create_blood_message(2, None, 1, "s", None, b"other").unwrap();

        let recent = db.recent_blood_messages(1, 10).unwrap();
        assert_eq!(
            recent.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![b.id, a.id]
        );
    }

    #[test]
    fn trim_drops_oldest_per_area() {
        let db = MemoryDatabase::new();
        for i in 0..5u8 {
            db.create_blood_message(1, None, 1, "s", None, &[i]).unwrap();
        }
        db.create_blood_message(2, None, 1, "s", None, b"kept").unwrap();

        db.trim_blood_messages(2).unwrap();

        let area1 = db.recent_blood_messages(1, 10).unwrap();
        assert_eq!(area1.len(), 2);
        assert_eq!(area1[0].data, vec![4]);
        assert_eq!(area1[1].data, vec![3]);
        assert_eq!(db.recent_blood_messages(2, 10).unwrap().len(), 1);
    }

    #[test]
    fn penalties_accumulate() {
        let db = MemoryDatabase::new();
        assert_eq!(db.add_anti_cheat_penalty("s", 3.0).unwrap(), 3.0);
        assert_eq!(db.add_anti_cheat_penalty("s", 3.0).unwrap(), 6.0);
        assert_eq!(db.get_anti_cheat_penalty("s").unwrap(), 6.0);
    }

    #[test]
    fn rankings_keep_best_and_share_tied_ranks() {
        let db = MemoryDatabase::new();
        db.register_score(7, 1, 1, 100, b"", ScorePolicy::KeepBest).unwrap();
        db.register_score(7, 2, 1, 300, b"", ScorePolicy::KeepBest).unwrap();
        db.register_score(7, 3, 1, 300, b"", ScorePolicy::KeepBest).unwrap();
        // A worse resubmission does not lower the stored score.
        db.register_score(7, 2, 1, 50, b"", ScorePolicy::KeepBest).unwrap();

        let window = db.get_rankings(7, 1, 10).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].rank, 1);
        assert_eq!(window[1].rank, 1);
        assert_eq!(window[0].serial_rank, 1);
        assert_eq!(window[1].serial_rank, 2);
        assert_eq!(window[2].rank, 3);
        assert_eq!(window[2].score, 100);

        assert_eq!(db.get_ranking_count(7).unwrap(), 3);
    }

    #[test]
    fn accumulating_boards_sum_scores() {
        let db = MemoryDatabase::new();
        db.register_score(9, 1, 1, 10, b"", ScorePolicy::Accumulate).unwrap();
        db.register_score(9, 1, 1, 15, b"", ScorePolicy::Accumulate).unwrap();

        let entry = db.get_character_ranking(9, 1, 1).unwrap().unwrap();
        assert_eq!(entry.score, 25);
    }

    #[test]
    fn quick_match_rank_round_trip() {
        let db = MemoryDatabase::new();
        assert_eq!(
            db.get_quick_match_rank(1, 1, QuickMatchLadder::Duel).unwrap(),
            (0, 0)
        );
        db.set_quick_match_rank(1, 1, QuickMatchLadder::Duel, 2, 40).unwrap();
        assert_eq!(
            db.get_quick_match_rank(1, 1, QuickMatchLadder::Duel).unwrap(),
            (2, 40)
        );
        // The other ladder is untouched.
        assert_eq!(
            db.get_quick_match_rank(1, 1, QuickMatchLadder::Brawl).unwrap(),
            (0, 0)
        );
    }
}
