//! Session ownership and the authoritative tick loop
//!
//! One tokio task owns one `World`. Client intents arrive over an mpsc
//! channel, scoped server messages leave over a broadcast channel, and the
//! per-connection writer tasks filter on the scope. The session never blocks
//! on a slow client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{tick_delta, REPLICATION_TPS, SIMULATION_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{ClientMsg, PlayerInfo, ServerMsg};

use super::effects::{LogEffects, NoAnimations};
use super::replication::{ReplicationSync, Scope};
use super::world::{OwnerNotification, World, WorldConfig};
use super::PlayerId;

/// A session nobody joins within this many ticks shuts itself down
/// (a connection can open the socket and never send `Join`)
const IDLE_SESSION_TIMEOUT_TICKS: u64 = 30 * SIMULATION_TPS as u64;

/// One client intent tagged with its sender
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: PlayerId,
    pub msg: ClientMsg,
}

/// A server message with its delivery scope
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub scope: Scope,
    pub msg: ServerMsg,
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub intent_tx: mpsc::Sender<PlayerInput>,
    pub outgoing_tx: broadcast::Sender<Outgoing>,
    pub player_count: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn total_players(&self) -> usize {
        self.sessions.iter().map(|s| s.value().player_count()).sum()
    }

    /// Find a session with a free slot
    pub fn find_available_session(&self, max_players: usize) -> Option<SessionHandle> {
        for entry in self.sessions.iter() {
            if entry.value().player_count() < max_players {
                return Some(entry.value().clone());
            }
        }
        None
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game session
pub struct GameSession {
    id: Uuid,
    world: World,
    sync: ReplicationSync,
    intent_rx: mpsc::Receiver<PlayerInput>,
    outgoing_tx: broadcast::Sender<Outgoing>,
    player_count: Arc<AtomicUsize>,
    max_players: usize,
    had_players: bool,
}

impl GameSession {
    pub fn new(id: Uuid, config: WorldConfig, max_players: usize) -> (Self, SessionHandle) {
        let (intent_tx, intent_rx) = mpsc::channel(256);
        let (outgoing_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            id,
            intent_tx,
            outgoing_tx: outgoing_tx.clone(),
            player_count: player_count.clone(),
        };

        let session = Self {
            id,
            world: World::new(config, Box::new(LogEffects), Box::new(NoAnimations)),
            sync: ReplicationSync::new(),
            intent_rx,
            outgoing_tx,
            player_count,
            max_players,
            had_players: false,
        };

        (session, handle)
    }

    /// Run the authoritative tick loop until the last player leaves
    pub async fn run(mut self) {
        info!(session_id = %self.id, "Session started");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let replication_interval = (SIMULATION_TPS / REPLICATION_TPS).max(1) as u64;
        let mut tick: u64 = 0;

        loop {
            tick_interval.tick().await;
            tick += 1;

            self.process_intents();
            self.world.advance(tick_delta());
            self.push_notifications();

            if tick % replication_interval == 0 {
                self.replicate();
            }

            if self.had_players && self.world.characters.is_empty() {
                info!(session_id = %self.id, "All players left, ending session");
                break;
            }
            if !self.had_players && tick >= IDLE_SESSION_TIMEOUT_TICKS {
                info!(session_id = %self.id, "Nobody joined, ending idle session");
                break;
            }
        }
    }

    fn send(&self, scope: Scope, msg: ServerMsg) {
        let _ = self.outgoing_tx.send(Outgoing { scope, msg });
    }

    /// Drain the intent queue
    fn process_intents(&mut self) {
        while let Ok(input) = self.intent_rx.try_recv() {
            match input.msg {
                ClientMsg::Join { ref display_name } => {
                    self.handle_join(input.player_id, display_name.clone());
                }
                ClientMsg::Leave => {
                    self.handle_leave(input.player_id);
                }
                ClientMsg::Ping { t } => {
                    self.send(Scope::OwnerOnly(input.player_id), ServerMsg::Pong { t });
                }
                ref intent => {
                    if !self.world.characters.contains_key(&input.player_id) {
                        debug!(player_id = %input.player_id, "intent from unknown player");
                        continue;
                    }
                    if self.world.validate_intent(input.player_id, intent) {
                        self.world.handle_intent(input.player_id, intent);
                    }
                }
            }
        }
    }

    fn handle_join(&mut self, player: PlayerId, display_name: Option<String>) {
        if self.world.characters.contains_key(&player) {
            warn!(player_id = %player, "Player already in session");
            return;
        }
        if self.world.characters.len() >= self.max_players {
            self.send(
                Scope::OwnerOnly(player),
                ServerMsg::Error {
                    code: "session_full".to_string(),
                    message: "Session is full".to_string(),
                },
            );
            return;
        }

        let name =
            display_name.unwrap_or_else(|| format!("Player_{}", &player.to_string()[..8]));

        // Remote client: autonomous reloads are pushed, never started here
        self.world.spawn_character(player, name.clone(), false);
        self.had_players = true;
        self.player_count
            .store(self.world.characters.len(), Ordering::Relaxed);

        self.send(
            Scope::All,
            ServerMsg::PlayerJoined {
                player: PlayerInfo {
                    player_id: player,
                    display_name: name,
                },
            },
        );

        // Tell the joiner who was already here
        for character in self.world.characters.values() {
            if character.id == player {
                continue;
            }
            self.send(
                Scope::OwnerOnly(player),
                ServerMsg::PlayerJoined {
                    player: PlayerInfo {
                        player_id: character.id,
                        display_name: character.display_name.clone(),
                    },
                },
            );
        }

        // Flush the diff so the shadow is current, then hand the joiner the
        // full visible state; their version gates drop any overlap
        self.replicate();
        for update in self.sync.snapshot_for(&self.world, player) {
            self.send(Scope::OwnerOnly(player), ServerMsg::Update { update });
        }

        info!(
            session_id = %self.id,
            player_id = %player,
            player_count = self.world.characters.len(),
            "Player joined session"
        );
    }

    fn handle_leave(&mut self, player: PlayerId) {
        if !self.world.characters.contains_key(&player) {
            return;
        }
        self.world.remove_character(player);
        self.player_count
            .store(self.world.characters.len(), Ordering::Relaxed);

        self.send(
            Scope::All,
            ServerMsg::PlayerLeft {
                player_id: player,
                reason: "left".to_string(),
            },
        );

        info!(
            session_id = %self.id,
            player_id = %player,
            "Player left session"
        );
    }

    /// Forward authority pushes aimed at single owners
    fn push_notifications(&mut self) {
        for notification in self.world.drain_notifications() {
            match notification {
                OwnerNotification::StartReload { player, weapon } => {
                    self.send(
                        Scope::OwnerOnly(player),
                        ServerMsg::NotifyStartReload { weapon },
                    );
                }
            }
        }
    }

    /// Diff the world and broadcast scoped field updates
    fn replicate(&mut self) {
        for (scope, update) in self.sync.collect(&self.world) {
            self.send(scope, ServerMsg::Update { update });
        }
    }
}
