//! Observer-side replica of the authoritative world
//!
//! A replica never simulates. It applies versioned field updates, replays
//! their cosmetic side effects through the effects sink, and queues intents
//! for the authority. Updates are facts: an update older than the last one
//! seen for the same field is dropped, and a missed update is subsumed by
//! the next one.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ws::protocol::{ClientMsg, FieldUpdate, ServerMsg};

use super::arena::WeaponId;
use super::effects::EffectsSink;
use super::hitscan::HitRecord;
use super::weapon::{StorageSlot, WeaponKind};
use super::PlayerId;

/// Accept `version` only if it is newer than the stored one
fn fresh(last_seen: &mut u32, version: u32) -> bool {
    if version > *last_seen {
        *last_seen = version;
        true
    } else {
        false
    }
}

/// Mirrored weapon state
pub struct WeaponMirror {
    pub kind: WeaponKind,
    pub slot: StorageSlot,
    pub owner: Option<PlayerId>,
    pub total: u32,
    pub clip: u32,
    pub pending_reload: bool,
    pub burst_counter: u32,
    pub last_hit: Option<HitRecord>,

    owner_seen: u32,
    ammo_seen: u32,
    pending_seen: u32,
    burst_seen: u32,
    hit_seen: u32,
}

impl WeaponMirror {
    fn new(kind: WeaponKind, slot: StorageSlot) -> Self {
        Self {
            kind,
            slot,
            owner: None,
            total: 0,
            clip: 0,
            pending_reload: false,
            burst_counter: 0,
            last_hit: None,
            owner_seen: 0,
            ammo_seen: 0,
            pending_seen: 0,
            burst_seen: 0,
            hit_seen: 0,
        }
    }
}

/// Mirrored character state
#[derive(Default)]
pub struct CharacterMirror {
    pub current_weapon: Option<WeaponId>,
    pub previous_weapon: Option<WeaponId>,
    pub inventory: Vec<WeaponId>,
    pub died: bool,
    pub sprinting: bool,
    pub targeting: bool,
    pub jumping: bool,

    current_seen: u32,
    inventory_seen: u32,
    died_seen: u32,
    sprinting_seen: u32,
    targeting_seen: u32,
    jumping_seen: u32,
}

/// One connected client's view of the session
pub struct ClientWorld {
    pub local_player: PlayerId,
    pub weapons: HashMap<WeaponId, WeaponMirror>,
    pub characters: HashMap<PlayerId, CharacterMirror>,
    effects: Box<dyn EffectsSink>,
    outgoing: Vec<ClientMsg>,
}

impl ClientWorld {
    pub fn new(local_player: PlayerId, effects: Box<dyn EffectsSink>) -> Self {
        Self {
            local_player,
            weapons: HashMap::new(),
            characters: HashMap::new(),
            effects,
            outgoing: Vec::new(),
        }
    }

    /// Intents queued for the authority since the last drain
    pub fn take_outgoing(&mut self) -> Vec<ClientMsg> {
        std::mem::take(&mut self.outgoing)
    }

    /// Queue an intent, optimistically applying what the owner may predict.
    /// The authority remains free to reject it.
    pub fn submit(&mut self, intent: ClientMsg) {
        match intent {
            ClientMsg::SetSprinting { active } => {
                self.own_character().sprinting = active;
            }
            ClientMsg::SetTargeting { active } => {
                self.own_character().targeting = active;
            }
            ClientMsg::SetJumping { active } => {
                self.own_character().jumping = active;
            }
            // Predicted fire visuals; the burst counter confirms or corrects
            ClientMsg::StartFire => {
                if let Some(weapon) = self.own_character().current_weapon {
                    self.effects.fire_simulation(weapon, true);
                }
            }
            ClientMsg::StopFire => {
                if let Some(weapon) = self.own_character().current_weapon {
                    self.effects.fire_simulation(weapon, false);
                }
            }
            _ => {}
        }
        self.outgoing.push(intent);
    }

    fn own_character(&mut self) -> &mut CharacterMirror {
        self.characters.entry(self.local_player).or_default()
    }

    /// Apply one server message
    pub fn apply(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Update { update } => self.apply_update(update),
            ServerMsg::NotifyStartReload { weapon } => {
                // Authority push: forward the reload intent. No local visuals
                // here - the pending-reload mirror skips the owner and nothing
                // on this side would ever stop them.
                debug!(?weapon, "reload push from authority");
                self.outgoing.push(ClientMsg::StartReload);
            }
            ServerMsg::PlayerJoined { player } => {
                self.characters
                    .entry(player.player_id)
                    .or_default();
            }
            ServerMsg::PlayerLeft { player_id, .. } => {
                self.characters.remove(player_id);
            }
            ServerMsg::Error { code, message } => {
                warn!(code = %code, message = %message, "server error");
            }
            ServerMsg::Welcome { .. } | ServerMsg::Pong { .. } => {}
        }
    }

    fn apply_update(&mut self, update: &FieldUpdate) {
        match *update {
            FieldUpdate::WeaponOwner {
                weapon,
                version,
                owner,
                kind,
                slot,
            } => {
                let mirror = self
                    .weapons
                    .entry(weapon)
                    .or_insert_with(|| WeaponMirror::new(kind, slot));
                if fresh(&mut mirror.owner_seen, version) {
                    mirror.owner = owner;
                }
            }
            FieldUpdate::AmmoCounts {
                weapon,
                version,
                total,
                clip,
            } => {
                let Some(mirror) = self.weapons.get_mut(&weapon) else {
                    debug!(?weapon, "ammo update for unknown weapon");
                    return;
                };
                if fresh(&mut mirror.ammo_seen, version) {
                    mirror.total = total;
                    mirror.clip = clip;
                }
            }
            FieldUpdate::PendingReload {
                weapon,
                version,
                pending,
            } => {
                let Some(mirror) = self.weapons.get_mut(&weapon) else {
                    return;
                };
                if fresh(&mut mirror.pending_seen, version) {
                    mirror.pending_reload = pending;
                    self.effects.reload_simulation(weapon, pending);
                }
            }
            FieldUpdate::BurstCounter {
                weapon,
                version,
                counter,
            } => {
                let Some(mirror) = self.weapons.get_mut(&weapon) else {
                    return;
                };
                if fresh(&mut mirror.burst_seen, version) {
                    mirror.burst_counter = counter;
                    // Any positive value keeps the visuals going; a missed
                    // intermediate bump costs nothing
                    self.effects.fire_simulation(weapon, counter > 0);
                }
            }
            FieldUpdate::HitRecord {
                weapon,
                version,
                record,
            } => {
                let Some(mirror) = self.weapons.get_mut(&weapon) else {
                    return;
                };
                if fresh(&mut mirror.hit_seen, version) {
                    mirror.last_hit = Some(record);
                    let point = record.impact.to_vec3();
                    self.effects.weapon_fired(weapon, point);
                    self.effects.impact(weapon, record.surface, point);
                }
            }
            FieldUpdate::WeaponRemoved { weapon, version } => {
                let Some(mirror) = self.weapons.get_mut(&weapon) else {
                    return;
                };
                if fresh(&mut mirror.owner_seen, version) {
                    self.weapons.remove(&weapon);
                    self.effects.detach_weapon(weapon);
                }
            }
            FieldUpdate::CurrentWeapon {
                character,
                version,
                current,
                previous,
            } => {
                let mirror = self.characters.entry(character).or_default();
                if !fresh(&mut mirror.current_seen, version) {
                    return;
                }
                mirror.current_weapon = current;
                mirror.previous_weapon = previous;
                // Replay the visual swap
                if let Some(old) = previous {
                    self.effects.detach_weapon(old);
                }
                if let Some(new) = current {
                    self.effects
                        .attach_weapon(new, character, StorageSlot::Hands);
                }
            }
            FieldUpdate::Inventory {
                character,
                version,
                ref weapons,
            } => {
                let mirror = self.characters.entry(character).or_default();
                if fresh(&mut mirror.inventory_seen, version) {
                    mirror.inventory = weapons.clone();
                }
            }
            FieldUpdate::Died {
                character,
                version,
                died,
            } => {
                let mirror = self.characters.entry(character).or_default();
                if fresh(&mut mirror.died_seen, version) {
                    mirror.died = died;
                    if died {
                        self.effects.ragdoll(character);
                    }
                }
            }
            FieldUpdate::Sprinting {
                character,
                version,
                active,
            } => {
                let mirror = self.characters.entry(character).or_default();
                if fresh(&mut mirror.sprinting_seen, version) {
                    mirror.sprinting = active;
                }
            }
            FieldUpdate::Targeting {
                character,
                version,
                active,
            } => {
                let mirror = self.characters.entry(character).or_default();
                if fresh(&mut mirror.targeting_seen, version) {
                    mirror.targeting = active;
                }
            }
            FieldUpdate::Jumping {
                character,
                version,
                active,
            } => {
                let mirror = self.characters.entry(character).or_default();
                if fresh(&mut mirror.jumping_seen, version) {
                    mirror.jumping = active;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::WeaponArena;
    use crate::game::effects::{EffectEvent, RecordingEffects};
    use crate::game::hitscan::{QuantizedVec, SurfaceKind};
    use crate::game::weapon::{WeaponInstance, WeaponSpec};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    type Events = Arc<Mutex<Vec<EffectEvent>>>;

    fn replica() -> (ClientWorld, Events, WeaponId) {
        let (sink, events) = RecordingEffects::new();
        let mut client = ClientWorld::new(Uuid::new_v4(), Box::new(sink));

        let mut arena = WeaponArena::new();
        let weapon = arena.insert(WeaponInstance::new(WeaponSpec::for_kind(WeaponKind::Rifle)));
        client.apply(&ServerMsg::Update {
            update: FieldUpdate::WeaponOwner {
                weapon,
                version: 1,
                owner: Some(Uuid::new_v4()),
                kind: WeaponKind::Rifle,
                slot: StorageSlot::Primary,
            },
        });
        (client, events, weapon)
    }

    fn ammo_update(weapon: WeaponId, version: u32, clip: u32) -> ServerMsg {
        ServerMsg::Update {
            update: FieldUpdate::AmmoCounts {
                weapon,
                version,
                total: 100,
                clip,
            },
        }
    }

    #[test]
    fn stale_versions_are_dropped() {
        let (mut client, _events, weapon) = replica();

        client.apply(&ammo_update(weapon, 2, 28));
        assert_eq!(client.weapons[&weapon].clip, 28);

        // An older delivery must not roll the value back
        client.apply(&ammo_update(weapon, 1, 30));
        assert_eq!(client.weapons[&weapon].clip, 28);

        // Skipped versions are fine, only newer matters
        client.apply(&ammo_update(weapon, 7, 25));
        assert_eq!(client.weapons[&weapon].clip, 25);
    }

    #[test]
    fn burst_counter_drives_fire_visuals() {
        let (mut client, events, weapon) = replica();

        client.apply(&ServerMsg::Update {
            update: FieldUpdate::BurstCounter {
                weapon,
                version: 1,
                counter: 2,
            },
        });
        client.apply(&ServerMsg::Update {
            update: FieldUpdate::BurstCounter {
                weapon,
                version: 2,
                counter: 0,
            },
        });

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                EffectEvent::FireSim(weapon, true),
                EffectEvent::FireSim(weapon, false),
            ]
        );
    }

    #[test]
    fn pending_reload_toggles_reload_visuals() {
        let (mut client, events, weapon) = replica();

        client.apply(&ServerMsg::Update {
            update: FieldUpdate::PendingReload {
                weapon,
                version: 1,
                pending: true,
            },
        });
        // Duplicate delivery of the same version: no second replay
        client.apply(&ServerMsg::Update {
            update: FieldUpdate::PendingReload {
                weapon,
                version: 1,
                pending: true,
            },
        });
        client.apply(&ServerMsg::Update {
            update: FieldUpdate::PendingReload {
                weapon,
                version: 2,
                pending: false,
            },
        });

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                EffectEvent::ReloadSim(weapon, true),
                EffectEvent::ReloadSim(weapon, false),
            ]
        );
    }

    #[test]
    fn hit_record_replays_the_impact() {
        let (mut client, events, weapon) = replica();

        client.apply(&ServerMsg::Update {
            update: FieldUpdate::HitRecord {
                weapon,
                version: 1,
                record: HitRecord {
                    impact: QuantizedVec { x: 10, y: -4, z: 90 },
                    surface: SurfaceKind::Flesh,
                },
            },
        });

        let events = events.lock().unwrap();
        assert!(events.contains(&EffectEvent::Fired(weapon)));
        assert!(events.contains(&EffectEvent::Impact(weapon, SurfaceKind::Flesh)));
    }

    #[test]
    fn removed_weapon_is_forgotten() {
        let (mut client, events, weapon) = replica();

        client.apply(&ServerMsg::Update {
            update: FieldUpdate::WeaponRemoved { weapon, version: 2 },
        });
        assert!(!client.weapons.contains_key(&weapon));
        assert!(events.lock().unwrap().contains(&EffectEvent::Detach(weapon)));

        // Late updates for the dead weapon fall on the floor
        client.apply(&ammo_update(weapon, 9, 1));
        assert!(!client.weapons.contains_key(&weapon));
    }

    #[test]
    fn updates_for_unknown_weapons_are_ignored() {
        let (sink, _events) = RecordingEffects::new();
        let mut client = ClientWorld::new(Uuid::new_v4(), Box::new(sink));
        let mut arena = WeaponArena::new();
        let weapon = arena.insert(WeaponInstance::new(WeaponSpec::for_kind(WeaponKind::Pistol)));

        client.apply(&ammo_update(weapon, 1, 12));
        assert!(client.weapons.is_empty());
    }

    #[test]
    fn current_weapon_change_replays_the_swap() {
        let (mut client, events, rifle) = replica();
        let character = Uuid::new_v4();

        client.apply(&ServerMsg::Update {
            update: FieldUpdate::CurrentWeapon {
                character,
                version: 1,
                current: Some(rifle),
                previous: None,
            },
        });
        assert_eq!(client.characters[&character].current_weapon, Some(rifle));
        assert!(events
            .lock()
            .unwrap()
            .contains(&EffectEvent::Attach(rifle, StorageSlot::Hands)));
    }

    #[test]
    fn death_flag_triggers_the_ragdoll_once() {
        let (mut client, events, _weapon) = replica();
        let character = Uuid::new_v4();
        let update = ServerMsg::Update {
            update: FieldUpdate::Died {
                character,
                version: 3,
                died: true,
            },
        };

        client.apply(&update);
        client.apply(&update);

        let count = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == EffectEvent::Ragdoll(character))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn reload_push_queues_the_intent() {
        let (mut client, _events, weapon) = replica();

        client.apply(&ServerMsg::NotifyStartReload { weapon });
        assert!(matches!(
            client.take_outgoing().as_slice(),
            [ClientMsg::StartReload]
        ));
        assert!(client.take_outgoing().is_empty());
    }

    #[test]
    fn reload_push_never_leaves_dangling_visuals() {
        let (mut client, events, weapon) = replica();

        client.apply(&ServerMsg::NotifyStartReload { weapon });
        // The authority answers the forwarded intent with the refilled counts
        client.apply(&ammo_update(weapon, 1, 30));

        // No reload visuals may start on this path: the stop would never come
        assert!(!events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, EffectEvent::ReloadSim(..))));
    }

    #[test]
    fn submitted_movement_intents_are_predicted() {
        let (mut client, _events, _weapon) = replica();

        client.submit(ClientMsg::SetSprinting { active: true });
        let local = client.local_player;
        assert!(client.characters[&local].sprinting);
        assert_eq!(client.take_outgoing().len(), 1);
    }
}
