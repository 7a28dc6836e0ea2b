//! The shard manager: hosts the default shard plus dynamically created
//! ones, prunes the idle, and re-advertises the shard set.

use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use emberward_store::Database;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ShardConfig;
use crate::shard::Shard;

/// Dynamic shards with no player activity for this long are stopped and
/// their directories deleted. The default shard is never evicted.
pub const SERVER_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

const DEFAULT_SHARD_ID: &str = "default";
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);
const ADVERTISE_INTERVAL: Duration = Duration::from_secs(30);
const MANAGER_TICK: Duration = Duration::from_millis(250);

/// Commands the admin surface enqueues; the manager drains them on its own
/// schedule so admin threads never touch shard state directly.
pub enum AdminCommand {
    CreateShard {
        name: String,
        password: String,
        game_variant: String,
        reply: flume::Sender<anyhow::Result<String>>,
    },
    StopShard {
        id: String,
    },
}

struct ShardHandle {
    shard: Arc<Shard>,
    shutdown: flume::Sender<()>,
    task: JoinHandle<()>,
}

pub struct ServerManager {
    base_dir: PathBuf,
    store: Arc<dyn Database>,
    shards: HashMap<String, ShardHandle>,
    port_range: Range<u16>,
    admin_tx: flume::Sender<AdminCommand>,
    admin_rx: flume::Receiver<AdminCommand>,
}

impl ServerManager {
    pub fn new(base_dir: PathBuf, store: Arc<dyn Database>, port_range: Range<u16>) -> Self {
        let (admin_tx, admin_rx) = flume::bounded(64);
        Self {
            base_dir,
            store,
            shards: HashMap::new(),
            port_range,
            admin_tx,
            admin_rx,
        }
    }

    /// Handle for the admin surface; commands land on the manager's queue.
    pub fn admin_sender(&self) -> flume::Sender<AdminCommand> {
        self.admin_tx.clone()
    }

    pub fn shard(&self, id: &str) -> Option<&Arc<Shard>> {
        self.shards.get(id).map(|handle| &handle.shard)
    }

    /// Brings up the default shard and every shard directory left over from
    /// a previous run.
    pub fn init(&mut self) -> anyhow::Result<()> {
        info!("initializing server manager");
        std::fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("failed to create {}", self.base_dir.display()))?;

        self.start_shard(DEFAULT_SHARD_ID)?;

        let entries = std::fs::read_dir(&self.base_dir)
            .with_context(|| format!("failed to scan {}", self.base_dir.display()))?;
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            if id != DEFAULT_SHARD_ID {
                info!(shard = %id, "bringing existing shard online");
                if let Err(e) = self.start_shard(&id) {
                    error!(shard = %id, "failed to start shard: {e:#}");
                }
            }
        }

        Ok(())
    }

    fn start_shard(&mut self, id: &str) -> anyhow::Result<()> {
        if self.shards.contains_key(id) {
            bail!("shard '{id}' is already running");
        }

        let shard = Shard::provision(&self.base_dir, id, self.store.clone())?;
        let (shutdown_tx, shutdown_rx) = flume::bounded(1);

        let task_shard = shard.clone();
        let shard_id = id.to_owned();
        let task = tokio::spawn(async move {
            if let Err(e) = task_shard.run(shutdown_rx).await {
                error!(shard = %shard_id, "shard exited with error: {e:#}");
            }
        });

        self.shards.insert(
            id.to_owned(),
            ShardHandle {
                shard,
                shutdown: shutdown_tx,
                task,
            },
        );
        Ok(())
    }

    /// Allocates a free port from the configured range, skipping ports any
    /// running shard already advertises.
    fn allocate_port(&self) -> anyhow::Result<u16> {
        let used: Vec<u16> = self
            .shards
            .values()
            .map(|handle| handle.shard.config().game_port)
            .collect();

        self.port_range
            .clone()
            .find(|port| !used.contains(port))
            .context("no free ports left in the configured range")
    }

    fn create_dynamic_shard(
        &mut self,
        name: &str,
        password: &str,
        game_variant: &str,
    ) -> anyhow::Result<String> {
        let id = format!("shard-{}", Uuid::new_v4().simple());
        let game_port = self.allocate_port()?;

        // Provision the directory with its config before the shard task
        // loads it.
        let dir = self.base_dir.join(&id);
        std::fs::create_dir_all(&dir)?;
        let config = ShardConfig {
            shard_name: name.to_owned(),
            password: password.to_owned(),
            game_variant: game_variant.to_owned(),
            game_port,
            ..ShardConfig::default()
        };
        config.save(&dir.join("config.toml"))?;

        self.start_shard(&id)?;
        info!(shard = %id, port = game_port, "dynamic shard created");
        Ok(id)
    }

    fn stop_shard(&mut self, id: &str, delete_dir: bool) {
        let Some(handle) = self.shards.remove(id) else {
            return;
        };

        // In-flight streams get their RSTs from the shard's own shutdown
        // path; the task winds down within a tick of the signal.
        let _ = handle.shutdown.try_send(());
        drop(handle.task);

        if delete_dir {
            let dir = handle.shard.dir().to_path_buf();
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!(shard = %id, "failed to delete shard directory: {e}");
            }
        }

        info!(shard = %id, "shard stopped");
    }

    fn drain_admin_commands(&mut self) {
        while let Ok(command) = self.admin_rx.try_recv() {
            match command {
                AdminCommand::CreateShard {
                    name,
                    password,
                    game_variant,
                    reply,
                } => {
                    let result = self.create_dynamic_shard(&name, &password, &game_variant);
                    let _ = reply.try_send(result);
                }
                AdminCommand::StopShard { id } => {
                    if id != DEFAULT_SHARD_ID {
                        self.stop_shard(&id, true);
                    }
                }
            }
        }
    }

    /// Stops and deletes dynamic shards idle beyond [`SERVER_TIMEOUT`].
    fn prune_idle_shards(&mut self) {
        let idle: Vec<String> = self
            .shards
            .iter()
            .filter(|(id, handle)| {
                *id != DEFAULT_SHARD_ID
                    && handle.shard.last_activity().elapsed() >= SERVER_TIMEOUT
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in idle {
            info!(shard = %id, "pruning idle shard");
            self.stop_shard(&id, true);
        }
    }

    /// Re-advertises the current shard set for the out-of-band discovery
    /// endpoint.
    fn advertise(&self) {
        let listing: Vec<_> = self
            .shards
            .values()
            .map(|handle| {
                let config = handle.shard.config();
                json!({
                    "id": handle.shard.id(),
                    "shard_name": config.shard_name,
                    "hostname": config.advertised_hostname,
                    "game_port": config.game_port,
                    "game_variant": config.game_variant,
                    "has_password": config.has_password(),
                })
            })
            .collect();

        let path = self.base_dir.join("shards.json");
        match serde_json::to_vec_pretty(&listing) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&path, bytes) {
                    warn!("failed to write shard advertisement: {e}");
                }
            }
            Err(e) => warn!("failed to serialize shard advertisement: {e}"),
        }
    }

    /// Runs until `shutdown` fires, then stops every shard.
    pub async fn run(&mut self, shutdown: flume::Receiver<()>) {
        info!("server manager is now running");

        let mut next_prune = Instant::now() + PRUNE_INTERVAL;
        let mut next_advertise = Instant::now();

        loop {
            if shutdown.try_recv().is_ok() {
                break;
            }

            self.drain_admin_commands();

            let now = Instant::now();
            if now >= next_prune {
                next_prune = now + PRUNE_INTERVAL;
                self.prune_idle_shards();
            }
            if now >= next_advertise {
                next_advertise = now + ADVERTISE_INTERVAL;
                self.advertise();
            }

            tokio::time::sleep(MANAGER_TICK).await;
        }

        info!("terminating server manager");
        let ids: Vec<String> = self.shards.keys().cloned().collect();
        for id in ids {
            self.stop_shard(&id, false);
        }
    }
}
