//! One shard: an independent server instance with its own directory,
//! configuration, ticket table, and game service loop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use emberward_game::{variant_by_name, GameVariant};
use emberward_network::{ShardSocket, SocketEvent, TicketTable};
use emberward_protocol::KEY_LEN;
use emberward_store::Database;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::ShardConfig;
use crate::service::GameService;
use crate::webhook::spawn_notifier;

/// Cooperative tick cadence; also bounds shutdown latency.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// How often the durable store's artifact tables are trimmed back to their
/// configured caps.
const STORE_TRIM_INTERVAL: Duration = Duration::from_secs(600);

const CONFIG_FILE: &str = "config.toml";
const KEEPALIVE_FILE: &str = ".keepalive";
const ADVERTISEMENT_FILE: &str = "advertisement.json";

pub struct Shard {
    id: String,
    dir: PathBuf,
    config: Arc<ShardConfig>,
    variant: Arc<dyn GameVariant>,
    tickets: Arc<TicketTable>,
    store: Arc<dyn Database>,
    last_activity: Mutex<Instant>,
}

impl Shard {
    /// Creates or reopens the shard directory, loading its config or
    /// writing the defaults on first start.
    pub fn provision(
        base_dir: &Path,
        id: &str,
        store: Arc<dyn Database>,
    ) -> anyhow::Result<Arc<Self>> {
        let dir = base_dir.join(id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create shard directory {}", dir.display()))?;

        let config_path = dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            ShardConfig::load(&config_path)?
        } else {
            let config = ShardConfig {
                shard_name: id.to_owned(),
                ..ShardConfig::default()
            };
            config.save(&config_path)?;
            config
        };

        let variant = variant_by_name(&config.game_variant)
            .with_context(|| format!("unknown game variant '{}'", config.game_variant))?;

        let shard = Arc::new(Self {
            id: id.to_owned(),
            dir,
            config: Arc::new(config),
            variant,
            tickets: Arc::new(TicketTable::new()),
            store,
            last_activity: Mutex::new(Instant::now()),
        });

        shard.write_advertisement()?;
        shard.touch_keepalive();
        Ok(shard)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Arc<ShardConfig> {
        &self.config
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// The login front-end hands tickets over through this.
    pub fn create_auth_ticket(&self, token: u64, key: [u8; KEY_LEN]) {
        self.tickets.create(token, key, Instant::now());
    }

    pub fn refresh_auth_ticket(&self, token: u64) {
        self.tickets.refresh(token, Instant::now());
    }

    /// The small JSON file the credential service reads to advertise this
    /// shard to clients.
    fn write_advertisement(&self) -> anyhow::Result<()> {
        let advertisement = json!({
            "shard_name": self.config.shard_name,
            "hostname": self.config.advertised_hostname,
            "game_port": self.config.game_port,
            "game_variant": self.config.game_variant,
        });
        std::fs::write(
            self.dir.join(ADVERTISEMENT_FILE),
            serde_json::to_vec_pretty(&advertisement)?,
        )
        .context("failed to write advertisement")?;
        Ok(())
    }

    /// Touched whenever a message is handled; mtime drives idle eviction.
    fn touch_keepalive(&self) {
        if let Err(e) = std::fs::write(self.dir.join(KEEPALIVE_FILE), b"") {
            warn!(shard = %self.id, "failed to touch keepalive file: {e}");
        }
    }

    /// Runs the shard's single cooperative loop until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: flume::Receiver<()>) -> anyhow::Result<()> {
        let webhook = spawn_notifier(self.config.webhook_url.clone());

        let mut service = GameService::new(
            self.config.clone(),
            self.variant.clone(),
            self.store.clone(),
            webhook,
            Instant::now(),
        )?;

        let bind_addr = SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            self.config.game_port,
        );
        let mut socket = ShardSocket::bind(bind_addr, self.tickets.clone()).await?;

        info!(shard = %self.id, port = self.config.game_port, "shard is running");

        let mut next_trim = Instant::now() + STORE_TRIM_INTERVAL;

        loop {
            if shutdown.try_recv().is_ok() {
                break;
            }

            match socket.recv_datagram(TICK_INTERVAL).await {
                Ok(SocketEvent::Datagram { peer, len }) => {
                    let now = Instant::now();
                    let datagram = socket.datagram(len).to_vec();
                    service.on_datagram(now, peer, &datagram, &self.tickets);
                }
                Ok(SocketEvent::Idle) => {}
                Err(e) => {
                    warn!(shard = %self.id, "socket receive failed: {e:#}");
                }
            }

            let now = Instant::now();
            service.poll(now);

            for (addr, datagram) in service.collect_outgoing() {
                if let Err(e) = socket.socket().send_to(&datagram, addr).await {
                    debug!(shard = %self.id, peer = %addr, "send failed: {e}");
                }
            }

            self.tickets.expire(now);

            if service.take_handled_messages() > 0 {
                self.touch_keepalive();
                *self.last_activity.lock() = now;
            }

            if now >= next_trim {
                next_trim = now + STORE_TRIM_INTERVAL;
                self.trim_store();
            }
        }

        info!(shard = %self.id, "shard shutting down");

        // Best-effort goodbye: reset every stream and flush the RSTs.
        let now = Instant::now();
        for addr in service.sessions_mut().addrs() {
            if let Some(session) = service.sessions_mut().get_mut(addr) {
                session.connection.close();
            }
        }
        service.poll(now);
        for (addr, datagram) in service.collect_outgoing() {
            let _ = socket.socket().send_to(&datagram, addr).await;
        }

        Ok(())
    }

    fn trim_store(&self) {
        let results = [
            self.store
                .trim_blood_messages(self.config.blood_message_max_entries_per_area * 4),
            self.store
                .trim_bloodstains(self.config.bloodstain_max_entries_per_area * 4),
            self.store
                .trim_ghosts(self.config.ghost_max_entries_per_area * 4),
        ];
        for result in results {
            if let Err(e) = result {
                warn!(shard = %self.id, "store trim failed: {e:#}");
            }
        }
    }
}
