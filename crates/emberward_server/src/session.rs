//! Per-client session state.

use std::net::SocketAddr;
use std::time::Instant;

use emberward_game::{GameVariant, VisitorPool};
use emberward_protocol::messages::PlayerStatusData;
use emberward_protocol::{GameMessage, StreamError};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::live_cache::CacheKey;
use crate::service::ServiceContext;

pub use emberward_network::Connection;

/// Anti-cheat bookkeeping carried per session.
#[derive(Default)]
pub struct AntiCheatState {
    pub penalty: f32,
    /// Whether the stored penalty has been folded in yet.
    pub loaded_from_store: bool,
    /// Trigger names that already fired; each fires at most once per
    /// session.
    pub triggered_this_session: FxHashSet<&'static str>,
    /// Warning messages are rate limited.
    pub next_warning_at: Option<Instant>,
}

/// The in-game state of one player, harvested from rolling status uploads.
#[derive(Default)]
pub struct PlayerState {
    /// Platform account id as a hex string.
    pub steam_id: String,
    /// Stable account id; zero until login completes.
    pub player_id: u32,
    pub character_id: Option<u32>,
    pub character_name: String,
    pub soul_level: u32,
    pub max_weapon_level: u32,
    pub soul_memory: u64,
    pub is_invadable: bool,
    pub visitor_pool: Option<VisitorPool>,
    pub current_area_id: u32,
    /// The merged typed view of the status blob.
    pub status: PlayerStatusData,
    /// Set after the first complete status upload; bonfire notifications
    /// are suppressed until then.
    pub has_initial_status: bool,
    pub lit_bonfires: FxHashSet<u32>,
    pub anti_cheat: AntiCheatState,
}

impl PlayerState {
    pub fn is_in_game(&self) -> bool {
        self.player_id != 0 && self.has_initial_status
    }

    /// The value the matching predicate compares for this player.
    pub fn matching_level(&self, matches_on_soul_memory: bool) -> u64 {
        if matches_on_soul_memory {
            self.soul_memory
        } else {
            u64::from(self.soul_level)
        }
    }
}

/// Points from a session to a sign it owns in the live cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignRef {
    pub key: CacheKey,
    pub sign_id: u32,
}

pub struct ClientSession {
    pub connection: Connection,
    pub player: PlayerState,
    pub connection_start: Instant,
    pub last_message_at: Instant,
    pub banned: bool,
    /// A scheduled hard disconnect (ban choreography).
    pub disconnect_at: Option<Instant>,
    /// Signs this session owns. Every cached sign is reachable from exactly
    /// one session through here.
    pub active_signs: Vec<SignRef>,
}

impl ClientSession {
    pub fn new(connection: Connection, now: Instant) -> Self {
        Self {
            connection,
            player: PlayerState::default(),
            connection_start: now,
            last_message_at: now,
            banned: false,
            disconnect_at: None,
            active_signs: Vec::new(),
        }
    }

    /// A short label for log lines: the character name once known, the
    /// account until then, the address before login.
    pub fn label(&self) -> String {
        if !self.player.character_name.is_empty() {
            self.player.character_name.clone()
        } else if !self.player.steam_id.is_empty() {
            self.player.steam_id.clone()
        } else {
            self.connection.remote_addr().to_string()
        }
    }

    /// Sends a server-initiated push to this session.
    pub fn push<M: GameMessage>(
        &mut self,
        ctx: &ServiceContext,
        message: &M,
    ) -> Result<(), StreamError> {
        let opcode = ctx
            .variant
            .opcodes()
            .opcode(M::KIND)
            .ok_or(StreamError::StreamClosed)?;
        self.connection.send_message(ctx.now, opcode, message)?;
        Ok(())
    }

    /// Sends the reply to a client request.
    pub fn respond<M: prost::Message>(
        &mut self,
        ctx: &ServiceContext,
        request_index: u32,
        message: &M,
    ) -> Result<(), StreamError> {
        self.connection.send_response(ctx.now, request_index, message)
    }
}

/// All live sessions of one shard, with a secondary index by player id.
#[derive(Default)]
pub struct SessionMap {
    by_addr: FxHashMap<SocketAddr, ClientSession>,
    addr_of_player: FxHashMap<u32, SocketAddr>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }

    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.by_addr.contains_key(&addr)
    }

    pub fn insert(&mut self, addr: SocketAddr, session: ClientSession) {
        self.by_addr.insert(addr, session);
    }

    pub fn get_mut(&mut self, addr: SocketAddr) -> Option<&mut ClientSession> {
        self.by_addr.get_mut(&addr)
    }

    /// Temporarily removes a session so a handler can hold it mutably while
    /// pushing to its peers. Pair with [`Self::restore`].
    pub fn take(&mut self, addr: SocketAddr) -> Option<ClientSession> {
        self.by_addr.remove(&addr)
    }

    pub fn restore(&mut self, addr: SocketAddr, session: ClientSession) {
        self.by_addr.insert(addr, session);
    }

    /// Permanently removes a session and its player index entry.
    pub fn remove(&mut self, addr: SocketAddr) -> Option<ClientSession> {
        let session = self.by_addr.remove(&addr)?;
        if session.player.player_id != 0 {
            if let Some(&indexed) = self.addr_of_player.get(&session.player.player_id) {
                if indexed == addr {
                    self.addr_of_player.remove(&session.player.player_id);
                }
            }
        }
        Some(session)
    }

    /// Registers a player id for a logged-in session, returning the address
    /// of any other live session already holding that id.
    pub fn bind_player(&mut self, player_id: u32, addr: SocketAddr) -> Option<SocketAddr> {
        match self.addr_of_player.insert(player_id, addr) {
            Some(previous) if previous != addr => Some(previous),
            _ => None,
        }
    }

    pub fn by_player_mut(&mut self, player_id: u32) -> Option<&mut ClientSession> {
        let addr = *self.addr_of_player.get(&player_id)?;
        self.by_addr.get_mut(&addr)
    }

    pub fn addr_of_player(&self, player_id: u32) -> Option<SocketAddr> {
        self.addr_of_player.get(&player_id).copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SocketAddr, &mut ClientSession)> {
        self.by_addr.iter_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SocketAddr, &ClientSession)> {
        self.by_addr.iter()
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.by_addr.keys().copied().collect()
    }
}
