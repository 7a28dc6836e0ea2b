//! The game service: routes datagrams into sessions, dispatches decoded
//! messages to the manager registered for their opcode, and runs the
//! per-tick lifecycle work.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use emberward_game::GameVariant;
use emberward_network::{split_handshake, Connection, TicketTable};
use emberward_protocol::message::RawMessage;
use emberward_protocol::reliable::CLIENT_TIMEOUT;
use emberward_protocol::ClientMessage;
use emberward_store::Database;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::config::ShardConfig;
use crate::handlers::{HandleResult, Managers};
use crate::session::{ClientSession, SessionMap};
use crate::webhook::NoticeSender;

/// Read-only state every handler receives, plus the tick timestamp.
pub struct ServiceContext {
    pub config: Arc<ShardConfig>,
    pub variant: Arc<dyn GameVariant>,
    pub store: Arc<dyn Database>,
    pub webhook: NoticeSender,
    /// Refreshed at the top of every tick and before every dispatch.
    pub now: Instant,
}

/// One shard's game service. Owns all per-client state; driven by a single
/// cooperative loop, so nothing in here blocks or locks.
pub struct GameService {
    pub(crate) ctx: ServiceContext,
    sessions: SessionMap,
    managers: Managers,
    rng: StdRng,
    /// Messages handled since the last drain; feeds the keepalive file.
    handled_messages: u64,
}

impl GameService {
    pub fn new(
        config: Arc<ShardConfig>,
        variant: Arc<dyn GameVariant>,
        store: Arc<dyn Database>,
        webhook: NoticeSender,
        now: Instant,
    ) -> anyhow::Result<Self> {
        let ctx = ServiceContext {
            config,
            variant,
            store,
            webhook,
            now,
        };

        let mut managers = Managers::new(&ctx, now);
        managers.prime(&ctx)?;

        Ok(Self {
            ctx,
            sessions: SessionMap::new(),
            managers,
            rng: StdRng::from_entropy(),
            handled_messages: 0,
        })
    }

    /// Test constructor with a deterministic sampler.
    #[cfg(test)]
    pub(crate) fn with_seeded_rng(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions_mut(&mut self) -> &mut SessionMap {
        &mut self.sessions
    }

    /// Messages handled since the last call; drives idle-eviction
    /// bookkeeping.
    pub fn take_handled_messages(&mut self) -> u64 {
        std::mem::take(&mut self.handled_messages)
    }

    /// Routes one datagram. Known peers feed their connection; unknown
    /// peers must lead with a valid ticket token or are ignored.
    pub fn on_datagram(
        &mut self,
        now: Instant,
        peer: SocketAddr,
        datagram: &[u8],
        tickets: &TicketTable,
    ) {
        self.ctx.now = now;

        if let Some(session) = self.sessions.get_mut(peer) {
            if let Err(e) = session.connection.handle_datagram(now, datagram) {
                // Undecryptable or malformed datagrams are dropped with no
                // response on the wire.
                trace!(%peer, "dropping datagram: {e}");
            }
            return;
        }

        let Some((token, first_packet)) = split_handshake(datagram) else {
            trace!(%peer, "ignoring short datagram from unknown peer");
            return;
        };

        let Some(key) = tickets.consume(token, now) else {
            debug!(
                %peer,
                token = format_args!("{token:#018x}"),
                "unknown or spent auth token, ignoring connection"
            );
            return;
        };

        info!(%peer, "client connected");
        let mut connection = Connection::new(peer, &key, now);
        if let Err(e) = connection.handle_datagram(now, first_packet) {
            debug!(%peer, "first packet after token was invalid: {e}");
        }

        self.sessions.insert(peer, ClientSession::new(connection, now));
    }

    /// One cooperative tick: pump streams and timers, drain and dispatch
    /// decoded messages, evict the timed out, run manager polls, and reap
    /// fully closed sessions.
    pub fn poll(&mut self, now: Instant) {
        self.ctx.now = now;

        for addr in self.sessions.addrs() {
            let Some(mut session) = self.sessions.take(addr) else {
                continue;
            };

            session.connection.pump(now);

            while let Some(message) = session.connection.recv() {
                session.last_message_at = now;
                self.handled_messages += 1;

                if self.dispatch(&mut session, message) == HandleResult::Error {
                    session.connection.close();
                    break;
                }
            }

            if now.duration_since(session.last_message_at) > CLIENT_TIMEOUT {
                debug!(client = %session.label(), "session idle beyond timeout, closing");
                session.connection.close();
            }
            if session.disconnect_at.is_some_and(|at| now >= at) {
                info!(client = %session.label(), "scheduled disconnect due, closing");
                session.connection.close();
            }

            session.connection.pump(now);
            self.sessions.restore(addr, session);
        }

        self.managers.poll(&self.ctx, &mut self.sessions);

        // Disconnect choreography: a closing session stays resident until
        // its stream reports fully closed, and only then do managers get to
        // clean up what it owned.
        for addr in self.sessions.addrs() {
            let closed = self
                .sessions
                .get_mut(addr)
                .is_some_and(|s| s.connection.is_closed());
            if closed {
                let Some(session) = self.sessions.remove(addr) else {
                    continue;
                };
                info!(client = %session.label(), "client disconnected");
                self.managers
                    .on_lost_player(&self.ctx, &mut self.sessions, &session);
            }
        }
    }

    /// Drains every session's queued datagrams for the wire.
    pub fn collect_outgoing(&mut self) -> Vec<(SocketAddr, Bytes)> {
        let mut out = Vec::new();
        for (&addr, session) in self.sessions.iter_mut() {
            for datagram in session.connection.take_outgoing() {
                out.push((addr, datagram));
            }
        }
        out
    }

    fn dispatch(&mut self, session: &mut ClientSession, message: RawMessage) -> HandleResult {
        let Some(kind) = self.ctx.variant.opcodes().kind_of(message.opcode) else {
            warn!(
                client = %session.label(),
                opcode = format_args!("{:#06x}", message.opcode),
                "message with unknown opcode ignored"
            );
            return HandleResult::Unhandled;
        };

        let decoded = match ClientMessage::decode(kind, &message.body) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                warn!(
                    client = %session.label(),
                    kind = kind.name(),
                    "client sent a server-only message"
                );
                return HandleResult::Unhandled;
            }
            Err(e) => {
                warn!(
                    client = %session.label(),
                    kind = kind.name(),
                    "failed to decode message body: {e:#}"
                );
                return HandleResult::Error;
            }
        };

        trace!(client = %session.label(), kind = kind.name(), "dispatching");

        let ctx = &self.ctx;
        let sessions = &mut self.sessions;
        let index = message.index;

        use ClientMessage as M;
        match decoded {
            M::RequestWaitForUserLogin(request) => self
                .managers
                .boot
                .handle_wait_for_user_login(ctx, sessions, session, index, request),
            M::RequestGetAnnounceMessageList(request) => self
                .managers
                .boot
                .handle_get_announce_message_list(ctx, session, index, request),
            M::RequestUpdatePlayerStatus(request) => self
                .managers
                .player_data
                .handle_update_player_status(ctx, session, index, request),
            M::RequestUpdatePlayerCharacter(request) => self
                .managers
                .player_data
                .handle_update_player_character(ctx, session, index, request),
            M::RequestReentryBloodMessage(request) => self
                .managers
                .blood_messages
                .handle_reentry(ctx, session, index, request),
            M::RequestReCreateBloodMessageList(request) => self
                .managers
                .blood_messages
                .handle_recreate_list(ctx, session, index, request),
            M::RequestGetBloodMessageList(request) => self
                .managers
                .blood_messages
                .handle_get_list(ctx, session, &mut self.rng, index, request),
            M::RequestGetBloodMessageEvaluation(request) => self
                .managers
                .blood_messages
                .handle_get_evaluation(ctx, session, index, request),
            M::RequestEvaluateBloodMessage(request) => self
                .managers
                .blood_messages
                .handle_evaluate(ctx, sessions, session, index, request),
            M::RequestRemoveBloodMessage(request) => self
                .managers
                .blood_messages
                .handle_remove(ctx, session, index, request),
            M::RequestCreateBloodstain(request) => self
                .managers
                .bloodstains
                .handle_create(ctx, session, request),
            M::RequestGetBloodstainList(request) => self
                .managers
                .bloodstains
                .handle_get_list(ctx, session, &mut self.rng, index, request),
            M::RequestGetAreaBloodstainList(request) => self
                .managers
                .bloodstains
                .handle_get_area_list(ctx, session, &mut self.rng, index, request),
            M::RequestGetDeadingGhost(request) => self
                .managers
                .bloodstains
                .handle_get_deading_ghost(ctx, session, index, request),
            M::RequestCreateGhostData(request) => self
                .managers
                .ghosts
                .handle_create(ctx, session, index, request),
            M::RequestGetGhostDataList(request) => self
                .managers
                .ghosts
                .handle_get_list(ctx, session, &mut self.rng, index, request),
            M::RequestCreateSign(request) => self
                .managers
                .signs
                .handle_create_sign(ctx, session, index, request),
            M::RequestGetSignList(request) => self
                .managers
                .signs
                .handle_get_sign_list(ctx, session, &mut self.rng, index, request),
            M::RequestSummonSign(request) => self
                .managers
                .signs
                .handle_summon_sign(ctx, sessions, session, index, request),
            M::RequestRejectSign(request) => self
                .managers
                .signs
                .handle_reject_sign(ctx, sessions, session, index, request),
            M::RequestRemoveSign(request) => self
                .managers
                .signs
                .handle_remove_sign(ctx, sessions, session, index, request),
            M::RequestUpdateSign(request) => self
                .managers
                .signs
                .handle_update_sign(ctx, session, index, request),
            M::RequestGetRightMatchingArea(request) => self
                .managers
                .signs
                .handle_get_right_matching_area(ctx, sessions, session, index, request),
            M::RequestGetBreakInTargetList(request) => self
                .managers
                .break_in
                .handle_get_target_list(ctx, sessions, session, index, request),
            M::RequestBreakInTarget(request) => self
                .managers
                .break_in
                .handle_break_in_target(ctx, sessions, session, index, request),
            M::RequestRejectBreakInTarget(request) => self
                .managers
                .break_in
                .handle_reject_break_in_target(ctx, sessions, session, index, request),
            M::RequestGetVisitorList(request) => self
                .managers
                .visitors
                .handle_get_visitor_list(ctx, sessions, session, index, request),
            M::RequestVisit(request) => self
                .managers
                .visitors
                .handle_visit(ctx, sessions, session, index, request),
            M::RequestRejectVisit(request) => self
                .managers
                .visitors
                .handle_reject_visit(ctx, sessions, session, index, request),
            M::RequestRegisterQuickMatch(request) => self
                .managers
                .quick_match
                .handle_register(ctx, session, index, request),
            M::RequestUpdateQuickMatch(request) => self
                .managers
                .quick_match
                .handle_update(ctx, session, index, request),
            M::RequestUnregisterQuickMatch(request) => self
                .managers
                .quick_match
                .handle_unregister(ctx, session, index, request),
            M::RequestSearchQuickMatch(request) => self
                .managers
                .quick_match
                .handle_search(ctx, session, index, request),
            M::RequestJoinQuickMatch(request) => self
                .managers
                .quick_match
                .handle_join(ctx, sessions, session, index, request),
            M::RequestAcceptQuickMatch(request) => self
                .managers
                .quick_match
                .handle_accept(ctx, sessions, session, index, request),
            M::RequestRejectQuickMatch(request) => self
                .managers
                .quick_match
                .handle_reject(ctx, sessions, session, index, request),
            M::RequestSendQuickMatchStart(request) => self
                .managers
                .quick_match
                .handle_send_start(ctx, session, index, request),
            M::RequestSendQuickMatchResult(request) => self
                .managers
                .quick_match
                .handle_send_result(ctx, session, index, request),
            M::RequestRegisterRankingData(request) => self
                .managers
                .ranking
                .handle_register(ctx, session, index, request),
            M::RequestGetRankingData(request) => self
                .managers
                .ranking
                .handle_get_rankings(ctx, session, index, request),
            M::RequestGetCharacterRankingData(request) => self
                .managers
                .ranking
                .handle_get_character_ranking(ctx, session, index, request),
            M::RequestCountRankingData(request) => self
                .managers
                .ranking
                .handle_count(ctx, session, index, request),
            M::RequestNotifyRingBell(request) => self
                .managers
                .misc
                .handle_notify_ring_bell(ctx, sessions, session, index, request),
            M::RequestSendMessageToPlayers(request) => self
                .managers
                .misc
                .handle_send_message_to_players(ctx, sessions, session, index, request),
            M::RequestNotifyKillEnemy(request) => {
                self.managers.logging.handle_kill_enemy(ctx, session, request)
            }
            M::RequestNotifyDie(request) => {
                self.managers.logging.handle_die(ctx, session, request)
            }
            M::RequestNotifyKillBoss(request) => {
                self.managers.logging.handle_kill_boss(ctx, session, request)
            }
            M::RequestNotifyUseItem(request) => {
                self.managers.logging.handle_use_item(ctx, session, request)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn managers(&mut self) -> &mut Managers {
        &mut self.managers
    }
}
