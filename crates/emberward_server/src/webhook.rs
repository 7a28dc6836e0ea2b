//! Fire-and-forget outbound webhook notifier.
//!
//! Handlers enqueue notices through a cloneable [`NoticeSender`]; a
//! background task serializes them to JSON and POSTs them. Notices from the
//! same origin player are coalesced under a ten second cooldown: during the
//! cooldown only the latest notice is kept, and it goes out when the window
//! reopens.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::{debug, warn};

const ORIGIN_COOLDOWN: Duration = Duration::from_secs(10);
const FLUSH_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeType {
    SummonSign,
    SummonSignPvp,
    Bell,
    AntiCheat,
    UndeadMatch,
    BonfireLit,
    BossKill,
}

impl NoticeType {
    fn as_str(self) -> &'static str {
        match self {
            Self::SummonSign => "summon_sign",
            Self::SummonSignPvp => "summon_sign_pvp",
            Self::Bell => "bell",
            Self::AntiCheat => "anti_cheat",
            Self::UndeadMatch => "undead_match",
            Self::BonfireLit => "bonfire_lit",
            Self::BossKill => "boss_kill",
        }
    }
}

#[derive(Clone, Debug)]
pub struct NoticeOrigin {
    pub player_id: u32,
    pub steam_id: String,
    pub character_name: String,
}

#[derive(Clone, Debug)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub origin: NoticeOrigin,
    pub kind: NoticeType,
    pub text: String,
    pub fields: Vec<NoticeField>,
    pub thumbnail_url: Option<String>,
}

/// Handle the handlers hold. A disabled notifier (no webhook URL
/// configured) swallows everything.
#[derive(Clone, Default)]
pub struct NoticeSender {
    tx: Option<flume::Sender<Notice>>,
}

impl NoticeSender {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn send(&self, notice: Notice) {
        if let Some(tx) = &self.tx {
            // A full queue means the notifier is wedged; notices are
            // best-effort and dropped.
            let _ = tx.try_send(notice);
        }
    }
}

/// Spawns the notifier task for `url` and returns the handle to feed it.
pub fn spawn_notifier(url: String) -> NoticeSender {
    if url.is_empty() {
        return NoticeSender::disabled();
    }

    let (tx, rx) = flume::bounded::<Notice>(256);
    tokio::spawn(run_notifier(url, rx));
    NoticeSender { tx: Some(tx) }
}

async fn run_notifier(url: String, rx: flume::Receiver<Notice>) {
    let client = reqwest::Client::new();
    let mut last_sent: FxHashMap<u32, Instant> = FxHashMap::default();
    let mut held_back: FxHashMap<u32, Notice> = FxHashMap::default();
    let mut flush = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            incoming = rx.recv_async() => {
                let Ok(notice) = incoming else { break };
                let origin = notice.origin.player_id;
                let now = Instant::now();

                match last_sent.get(&origin) {
                    Some(&at) if now.duration_since(at) < ORIGIN_COOLDOWN => {
                        // Within cooldown: remember only the latest.
                        held_back.insert(origin, notice);
                    }
                    _ => {
                        last_sent.insert(origin, now);
                        post_notice(&client, &url, &notice).await;
                    }
                }
            }
            _ = flush.tick() => {
                let now = Instant::now();
                let ready: Vec<u32> = held_back
                    .keys()
                    .filter(|origin| {
                        last_sent.get(origin).map_or(true, |&at| {
                            now.duration_since(at) >= ORIGIN_COOLDOWN
                        })
                    })
                    .copied()
                    .collect();

                for origin in ready {
                    if let Some(notice) = held_back.remove(&origin) {
                        last_sent.insert(origin, now);
                        post_notice(&client, &url, &notice).await;
                    }
                }
            }
        }
    }

    debug!("webhook notifier shutting down");
}

async fn post_notice(client: &reqwest::Client, url: &str, notice: &Notice) {
    let fields: Vec<_> = notice
        .fields
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "value": f.value,
                "inline": f.inline,
            })
        })
        .collect();

    let mut payload = json!({
        "origin": {
            "player_id": notice.origin.player_id,
            "steam_id": notice.origin.steam_id,
            "character_name": notice.origin.character_name,
        },
        "type": notice.kind.as_str(),
        "text": notice.text,
        "fields": fields,
    });
    if let Some(thumbnail) = &notice.thumbnail_url {
        payload["thumbnail_url"] = json!(thumbnail);
    }

    if let Err(e) = client.post(url).json(&payload).send().await {
        warn!("webhook notice failed: {e}");
    }
}
