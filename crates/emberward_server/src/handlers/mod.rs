//! The manager set: one module per handler domain.
//!
//! Managers own their domain state (live caches, match registries) and are
//! registered once at shard init; per-opcode dispatch in the service is a
//! table lookup that lands in exactly one manager method.

use std::time::Instant;

use tracing::warn;

use crate::service::ServiceContext;
use crate::session::{ClientSession, SessionMap};

pub mod anti_cheat;
pub mod blood_message;
pub mod bloodstain;
pub mod boot;
pub mod break_in;
pub mod ghost;
pub mod logging;
pub mod misc;
pub mod player_data;
pub mod quick_match;
pub mod ranking;
pub mod sign;
pub mod visitor;

pub use anti_cheat::AntiCheatManager;
pub use blood_message::BloodMessageManager;
pub use bloodstain::BloodstainManager;
pub use boot::BootManager;
pub use break_in::BreakInManager;
pub use ghost::GhostManager;
pub use logging::LoggingManager;
pub use misc::MiscManager;
pub use player_data::PlayerDataManager;
pub use quick_match::QuickMatchManager;
pub use ranking::RankingManager;
pub use sign::SignManager;
pub use visitor::VisitorManager;

/// What a handler made of a message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleResult {
    /// Processed; session stays up.
    Handled,
    /// No handler claims this opcode; logged, session stays up.
    Unhandled,
    /// Invariant violated or a response could not be sent; the session is
    /// closed.
    Error,
}

/// Sends a response, downgrading a send failure to
/// [`HandleResult::Error`].
pub fn respond_or_error<M: prost::Message>(
    session: &mut ClientSession,
    ctx: &ServiceContext,
    request_index: u32,
    message: &M,
) -> HandleResult {
    match session.respond(ctx, request_index, message) {
        Ok(()) => HandleResult::Handled,
        Err(e) => {
            warn!(
                client = %session.label(),
                "disconnecting client as failed to send response: {e}"
            );
            HandleResult::Error
        }
    }
}

/// The full manager set for one shard.
pub struct Managers {
    pub boot: BootManager,
    pub player_data: PlayerDataManager,
    pub blood_messages: BloodMessageManager,
    pub bloodstains: BloodstainManager,
    pub ghosts: GhostManager,
    pub signs: SignManager,
    pub break_in: BreakInManager,
    pub visitors: VisitorManager,
    pub quick_match: QuickMatchManager,
    pub ranking: RankingManager,
    pub misc: MiscManager,
    pub logging: LoggingManager,
    pub anti_cheat: AntiCheatManager,
}

impl Managers {
    pub fn new(ctx: &ServiceContext, now: Instant) -> Self {
        Self {
            boot: BootManager::new(),
            player_data: PlayerDataManager::new(),
            blood_messages: BloodMessageManager::new(&ctx.config),
            bloodstains: BloodstainManager::new(&ctx.config),
            ghosts: GhostManager::new(&ctx.config),
            signs: SignManager::new(&ctx.config),
            break_in: BreakInManager::new(),
            visitors: VisitorManager::new(),
            quick_match: QuickMatchManager::new(),
            ranking: RankingManager::new(),
            misc: MiscManager::new(),
            logging: LoggingManager::new(),
            anti_cheat: AntiCheatManager::new(now),
        }
    }

    /// Primes the artifact caches from the durable store.
    pub fn prime(&mut self, ctx: &ServiceContext) -> anyhow::Result<()> {
        self.blood_messages.prime(ctx)?;
        self.bloodstains.prime(ctx)?;
        self.ghosts.prime(ctx)?;
        Ok(())
    }

    /// Periodic work: anti-cheat scans, match registry expiry.
    pub fn poll(&mut self, ctx: &ServiceContext, sessions: &mut SessionMap) {
        self.anti_cheat.poll(ctx, sessions);
        self.quick_match.poll(ctx);
        self.signs.poll(ctx);
    }

    /// Called once a disconnecting session's stream has fully closed, so
    /// owned artifacts can be cleaned up.
    pub fn on_lost_player(
        &mut self,
        ctx: &ServiceContext,
        sessions: &mut SessionMap,
        session: &ClientSession,
    ) {
        self.signs.on_lost_player(ctx, sessions, session);
        self.quick_match.on_lost_player(session);
    }
}
