//! Auth-ticket handoff between the login front-end and the game service.
//!
//! The login service hands a `(token, key)` pair to both the client and this
//! table out of band. The client proves possession by prefixing its first
//! game-service datagram with the token; consuming the ticket yields the
//! session key. Tickets are single-use: after consumption the entry stays
//! only so liveness refreshes keep working, and the expiry sweep garbage
//! collects it.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use emberward_protocol::KEY_LEN;

/// Unused or idle tickets expire after this long.
pub const AUTH_TICKET_TIMEOUT: Duration = Duration::from_secs(30);

struct TicketState {
    key: [u8; KEY_LEN],
    last_refresh: Instant,
    consumed: bool,
}

/// Shared between the shard loop and the login front-end's handoff thread.
#[derive(Default)]
pub struct TicketTable {
    inner: Mutex<FxHashMap<u64, TicketState>>,
}

impl TicketTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ticket the login service just issued.
    pub fn create(&self, token: u64, key: [u8; KEY_LEN], now: Instant) {
        self.inner.lock().insert(
            token,
            TicketState {
                key,
                last_refresh: now,
                consumed: false,
            },
        );
    }

    /// Refreshes liveness when the login service re-announces a token.
    pub fn refresh(&self, token: u64, now: Instant) {
        if let Some(state) = self.inner.lock().get_mut(&token) {
            state.last_refresh = now;
        }
    }

    /// Consumes a ticket, yielding its session key. Returns `None` for
    /// unknown tokens and for tickets already consumed.
    pub fn consume(&self, token: u64, now: Instant) -> Option<[u8; KEY_LEN]> {
        let mut inner = self.inner.lock();
        let state = inner.get_mut(&token)?;
        if state.consumed {
            return None;
        }
        state.consumed = true;
        state.last_refresh = now;
        Some(state.key)
    }

    /// Drops tickets idle past [`AUTH_TICKET_TIMEOUT`]; returns how many.
    pub fn expire(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.len();
        inner.retain(|token, state| {
            let keep = now.duration_since(state.last_refresh) <= AUTH_TICKET_TIMEOUT;
            if !keep {
                debug!(token = format_args!("{token:#018x}"), "auth ticket expired");
            }
            keep
        });
        before - inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [7; KEY_LEN];

    #[test]
    fn tickets_are_single_use() {
        let table = TicketTable::new();
        let now = Instant::now();

        table.create(0xDEAD_BEEF, KEY, now);
        assert_eq!(table.consume(0xDEAD_BEEF, now), Some(KEY));
        assert_eq!(table.consume(0xDEAD_BEEF, now), None);
    }

    #[test]
    fn unknown_tokens_do_not_consume() {
        let table = TicketTable::new();
        assert_eq!(table.consume(1, Instant::now()), None);
    }

    #[test]
    fn idle_tickets_expire() {
        let table = TicketTable::new();
        let now = Instant::now();

        table.create(1, KEY, now);
        table.create(2, KEY, now);
        table.refresh(2, now + Duration::from_secs(25));

        let removed = table.expire(now + Duration::from_secs(35));
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.consume(1, now + Duration::from_secs(35)), None);
    }

    #[test]
    fn consumed_tickets_are_kept_until_timeout() {
        let table = TicketTable::new();
        let now = Instant::now();

        table.create(1, KEY, now);
        table.consume(1, now);
        assert_eq!(table.expire(now + Duration::from_secs(5)), 0);
        assert_eq!(table.expire(now + Duration::from_secs(60)), 1);
    }
}
