//! The in-process test rig: a [`GameService`] plus any number of
//! client-side message streams, with time under test control.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use emberward_game::{AshenVariant, GameVariant};
use emberward_network::TicketTable;
use emberward_protocol::message::{MessageStream, RawMessage};
use emberward_protocol::{GameMessage, GameRequest, KEY_LEN};
use emberward_store::{Database, MemoryDatabase};

use crate::config::ShardConfig;
use crate::service::GameService;
use crate::webhook::NoticeSender;

pub const TEST_KEY: [u8; KEY_LEN] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
    0x0F,
];

pub struct TestClient {
    pub addr: SocketAddr,
    pub stream: MessageStream,
    /// The token prefix goes out with the very first datagram only.
    token_to_send: Option<u64>,
    /// Pushes received while waiting for replies.
    pub pushes: Vec<RawMessage>,
}

pub struct Harness {
    pub service: GameService,
    pub tickets: Arc<TicketTable>,
    pub store: Arc<MemoryDatabase>,
    pub variant: Arc<dyn GameVariant>,
    pub now: Instant,
    clients: HashMap<SocketAddr, TestClient>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ShardConfig::default())
    }

    pub fn with_config(config: ShardConfig) -> Self {
        let store = Arc::new(MemoryDatabase::new());
        Self::with_config_and_store(config, store)
    }

    pub fn with_config_and_store(config: ShardConfig, store: Arc<MemoryDatabase>) -> Self {
        let now = Instant::now();
        let variant: Arc<dyn GameVariant> = Arc::new(AshenVariant::new());

        let service = GameService::new(
            Arc::new(config),
            variant.clone(),
            store.clone() as Arc<dyn Database>,
            NoticeSender::disabled(),
            now,
        )
        .expect("service construction")
        .with_seeded_rng(0x5EED);

        Self {
            service,
            tickets: Arc::new(TicketTable::new()),
            store,
            variant,
            now,
            clients: HashMap::new(),
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Issues a ticket, connects a client through the full handshake, and
    /// returns its address.
    pub fn connect(&mut self, token: u64) -> SocketAddr {
        self.tickets.create(token, TEST_KEY, self.now);

        let addr: SocketAddr = format!("127.0.0.1:{}", self.next_port()).parse().unwrap();
        let client = TestClient {
            addr,
            stream: MessageStream::new_client(&TEST_KEY, self.now),
            token_to_send: Some(token),
            pushes: Vec::new(),
        };
        self.clients.insert(addr, client);

        for _ in 0..4 {
            self.step();
        }
        assert!(
            self.clients[&addr].stream.is_established(),
            "handshake did not complete"
        );
        addr
    }

    fn next_port(&mut self) -> u16 {
        40_000 + self.clients.len() as u16
    }

    /// One full exchange round: clients → service, service tick, service →
    /// clients.
    pub fn step(&mut self) {
        let now = self.now;

        for client in self.clients.values_mut() {
            client.stream.pump(now);
            for datagram in client.stream.take_outgoing() {
                let bytes = match client.token_to_send.take() {
                    Some(token) => {
                        let mut with_token = token.to_le_bytes().to_vec();
                        with_token.extend_from_slice(&datagram);
                        with_token
                    }
                    None => datagram.to_vec(),
                };
                self.service
                    .on_datagram(now, client.addr, &bytes, &self.tickets);
            }
        }

        self.service.poll(now);

        for (addr, datagram) in self.service.collect_outgoing() {
            if let Some(client) = self.clients.get_mut(&addr) {
                let _ = client.stream.handle_datagram(now, &datagram);
            }
        }
    }

    /// Sends a request and runs exchange rounds until its reply arrives.
    /// Pushes that arrive in the meantime are stashed on the client.
    pub fn request<R: GameRequest>(&mut self, addr: SocketAddr, request: &R) -> R::Response {
        let opcode = self
            .variant
            .opcodes()
            .opcode(R::KIND)
            .expect("request kind has an opcode");

        let index = {
            let client = self.clients.get_mut(&addr).expect("client connected");
            client
                .stream
                .send_message(self.now, opcode, request)
                .expect("send request")
        };

        for _ in 0..10 {
            self.step();

            let client = self.clients.get_mut(&addr).expect("client connected");
            while let Some(message) = client.stream.recv() {
                if message.is_reply() && message.index == index {
                    return message.decode_as::<R::Response>().expect("decode reply");
                }
                client.pushes.push(message);
            }
        }

        panic!("no reply to {} within ten rounds", R::KIND.name());
    }

    /// Sends a notification (no reply expected) and runs one round.
    pub fn notify<M: GameMessage>(&mut self, addr: SocketAddr, message: &M) {
        let opcode = self
            .variant
            .opcodes()
            .opcode(M::KIND)
            .expect("kind has an opcode");

        let client = self.clients.get_mut(&addr).expect("client connected");
        client
            .stream
            .send_message(self.now, opcode, message)
            .expect("send notification");

        self.step();
    }

    /// Drains pushes the client received, decoding each to its kind.
    pub fn take_pushes(&mut self, addr: SocketAddr) -> Vec<RawMessage> {
        self.step();

        let client = self.clients.get_mut(&addr).expect("client connected");
        while let Some(message) = client.stream.recv() {
            client.pushes.push(message);
        }
        std::mem::take(&mut client.pushes)
    }

    /// Pushes of one specific kind, decoded.
    pub fn pushes_of<M: GameMessage>(&mut self, addr: SocketAddr) -> Vec<M> {
        let opcode = self
            .variant
            .opcodes()
            .opcode(M::KIND)
            .expect("kind has an opcode");

        let (matching, rest): (Vec<RawMessage>, Vec<RawMessage>) = self
            .take_pushes(addr)
            .into_iter()
            .partition(|m| m.opcode == opcode);

        self.clients
            .get_mut(&addr)
            .expect("client connected")
            .pushes = rest;

        matching
            .iter()
            .map(|m| m.decode_as::<M>().expect("decode push"))
            .collect()
    }

    /// Closes the client side and runs rounds until the service reaps the
    /// session.
    pub fn disconnect(&mut self, addr: SocketAddr) {
        if let Some(client) = self.clients.get_mut(&addr) {
            client.stream.close();
            client.stream.pump(self.now);
        }
        for _ in 0..4 {
            self.step();
        }
        self.clients.remove(&addr);
    }

    pub fn clients_mut(&mut self, addr: SocketAddr) -> &mut TestClient {
        self.clients.get_mut(&addr).expect("client connected")
    }

    pub fn is_connected(&self, addr: SocketAddr) -> bool {
        self.clients
            .get(&addr)
            .map(|c| !c.stream.is_closed())
            .unwrap_or(false)
    }
}
