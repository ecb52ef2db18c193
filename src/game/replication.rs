//! Authority-side replication: shadow-state diffing
//!
//! After each simulation burst the synchronizer compares the world against
//! its shadow copy and emits one versioned `FieldUpdate` per changed field,
//! paired with the delivery scope derived from the field's replication
//! condition. Updates are facts about state, so only the latest value per
//! field matters; versions let observers discard stale deliveries.

use std::collections::HashMap;

use crate::ws::protocol::{Condition, FieldUpdate};

use super::arena::WeaponId;
use super::hitscan::HitRecord;
use super::world::World;
use super::PlayerId;

/// Concrete delivery scope for one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every connected client
    All,
    /// Everyone but the named owner (they predicted it locally)
    SkipOwner(PlayerId),
    /// The named owner only
    OwnerOnly(PlayerId),
}

impl Scope {
    /// Should a client with this player id receive the update?
    pub fn includes(&self, player: PlayerId) -> bool {
        match *self {
            Scope::All => true,
            Scope::SkipOwner(owner) => player != owner,
            Scope::OwnerOnly(owner) => player == owner,
        }
    }
}

/// Resolve a field's declared condition against the concrete owner.
/// `None` means the update has no recipient and is dropped at the source.
fn scope_for(update: &FieldUpdate, owner: Option<PlayerId>) -> Option<Scope> {
    match (update.condition(), owner) {
        (Condition::Always, _) => Some(Scope::All),
        (Condition::SkipOwner, Some(o)) => Some(Scope::SkipOwner(o)),
        // Ownerless weapon: nobody to skip
        (Condition::SkipOwner, None) => Some(Scope::All),
        (Condition::OwnerOnly, Some(o)) => Some(Scope::OwnerOnly(o)),
        (Condition::OwnerOnly, None) => None,
    }
}

/// Monotonic per-field version counter
#[derive(Debug, Default, Clone, Copy)]
struct Versioned<T: PartialEq + Copy> {
    value: T,
    version: u32,
}

impl<T: PartialEq + Copy> Versioned<T> {
    /// Store `new` if it differs, returning the bumped version
    fn update(&mut self, new: T) -> Option<u32> {
        if self.version > 0 && self.value == new {
            return None;
        }
        self.value = new;
        self.version += 1;
        Some(self.version)
    }
}

#[derive(Default)]
struct WeaponShadow {
    owner: Versioned<Option<PlayerId>>,
    ammo: Versioned<(u32, u32)>,
    pending_reload: Versioned<bool>,
    burst_counter: Versioned<u32>,
    last_hit: Versioned<Option<HitRecord>>,
}

#[derive(Default)]
struct CharacterShadow {
    current_weapon: Versioned<(Option<WeaponId>, Option<WeaponId>)>,
    inventory_version: u32,
    inventory: Vec<WeaponId>,
    died: Versioned<bool>,
    sprinting: Versioned<bool>,
    targeting: Versioned<bool>,
    jumping: Versioned<bool>,
}

/// Shadow-state differ for one world
#[derive(Default)]
pub struct ReplicationSync {
    weapons: HashMap<WeaponId, WeaponShadow>,
    characters: HashMap<PlayerId, CharacterShadow>,
}

impl ReplicationSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff the world against the shadow and emit scoped updates for every
    /// changed field. Newly seen weapons and characters emit their full set.
    pub fn collect(&mut self, world: &World) -> Vec<(Scope, FieldUpdate)> {
        let mut out = Vec::new();

        // Weapons that disappeared since the last pass
        let removed: Vec<WeaponId> = self
            .weapons
            .keys()
            .filter(|id| !world.weapons.contains(**id))
            .copied()
            .collect();
        for weapon in removed {
            let shadow = self.weapons.remove(&weapon);
            let version = shadow.map(|s| s.owner.version + 1).unwrap_or(1);
            out.push((Scope::All, FieldUpdate::WeaponRemoved { weapon, version }));
        }
        self.characters.retain(|id, _| world.characters.contains_key(id));

        for (weapon, instance) in world.weapons.iter() {
            let shadow = self.weapons.entry(weapon).or_default();
            let owner = instance.owner;

            if let Some(version) = shadow.owner.update(owner) {
                push(&mut out, owner, FieldUpdate::WeaponOwner {
                    weapon,
                    version,
                    owner,
                    kind: instance.spec.kind,
                    slot: instance.spec.slot,
                });
            }
            if let Some(version) = shadow
                .ammo
                .update((instance.ammo.total(), instance.ammo.clip()))
            {
                push(&mut out, owner, FieldUpdate::AmmoCounts {
                    weapon,
                    version,
                    total: instance.ammo.total(),
                    clip: instance.ammo.clip(),
                });
            }
            if let Some(version) = shadow.pending_reload.update(instance.pending_reload) {
                push(&mut out, owner, FieldUpdate::PendingReload {
                    weapon,
                    version,
                    pending: instance.pending_reload,
                });
            }
            if let Some(version) = shadow.burst_counter.update(instance.burst_counter) {
                push(&mut out, owner, FieldUpdate::BurstCounter {
                    weapon,
                    version,
                    counter: instance.burst_counter,
                });
            }
            if let Some(hit) = instance.last_hit {
                if let Some(version) = shadow.last_hit.update(Some(hit)) {
                    push(&mut out, owner, FieldUpdate::HitRecord {
                        weapon,
                        version,
                        record: hit,
                    });
                }
            }
        }

        for (player, character) in &world.characters {
            let shadow = self.characters.entry(*player).or_default();
            let owner = Some(*player);

            if let Some(version) = shadow
                .current_weapon
                .update((character.current_weapon, character.previous_weapon))
            {
                push(&mut out, owner, FieldUpdate::CurrentWeapon {
                    character: *player,
                    version,
                    current: character.current_weapon,
                    previous: character.previous_weapon,
                });
            }
            if shadow.inventory_version == 0 || shadow.inventory != character.inventory {
                shadow.inventory = character.inventory.clone();
                shadow.inventory_version += 1;
                push(&mut out, owner, FieldUpdate::Inventory {
                    character: *player,
                    version: shadow.inventory_version,
                    weapons: character.inventory.clone(),
                });
            }
            if let Some(version) = shadow.died.update(character.died) {
                push(&mut out, owner, FieldUpdate::Died {
                    character: *player,
                    version,
                    died: character.died,
                });
            }
            if let Some(version) = shadow.sprinting.update(character.wants_to_sprint) {
                push(&mut out, owner, FieldUpdate::Sprinting {
                    character: *player,
                    version,
                    active: character.wants_to_sprint,
                });
            }
            if let Some(version) = shadow.targeting.update(character.is_targeting) {
                push(&mut out, owner, FieldUpdate::Targeting {
                    character: *player,
                    version,
                    active: character.is_targeting,
                });
            }
            if let Some(version) = shadow.jumping.update(character.is_jumping) {
                push(&mut out, owner, FieldUpdate::Jumping {
                    character: *player,
                    version,
                    active: character.is_jumping,
                });
            }
        }

        out
    }
}

impl ReplicationSync {
    /// Full current state for a late joiner, filtered to what that viewer is
    /// allowed to see, at the versions already issued. Call after `collect`
    /// so the shadow is current.
    pub fn snapshot_for(&self, world: &World, viewer: PlayerId) -> Vec<FieldUpdate> {
        let mut out = Vec::new();

        for (weapon, instance) in world.weapons.iter() {
            let Some(shadow) = self.weapons.get(&weapon) else {
                continue;
            };
            let owner = instance.owner;
            emit_for(&mut out, owner, viewer, FieldUpdate::WeaponOwner {
                weapon,
                version: shadow.owner.version.max(1),
                owner,
                kind: instance.spec.kind,
                slot: instance.spec.slot,
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::AmmoCounts {
                weapon,
                version: shadow.ammo.version.max(1),
                total: instance.ammo.total(),
                clip: instance.ammo.clip(),
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::PendingReload {
                weapon,
                version: shadow.pending_reload.version.max(1),
                pending: instance.pending_reload,
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::BurstCounter {
                weapon,
                version: shadow.burst_counter.version.max(1),
                counter: instance.burst_counter,
            });
        }

        for (player, character) in &world.characters {
            let Some(shadow) = self.characters.get(player) else {
                continue;
            };
            let owner = Some(*player);
            emit_for(&mut out, owner, viewer, FieldUpdate::CurrentWeapon {
                character: *player,
                version: shadow.current_weapon.version.max(1),
                current: character.current_weapon,
                previous: character.previous_weapon,
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::Inventory {
                character: *player,
                version: shadow.inventory_version.max(1),
                weapons: character.inventory.clone(),
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::Died {
                character: *player,
                version: shadow.died.version.max(1),
                died: character.died,
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::Sprinting {
                character: *player,
                version: shadow.sprinting.version.max(1),
                active: character.wants_to_sprint,
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::Targeting {
                character: *player,
                version: shadow.targeting.version.max(1),
                active: character.is_targeting,
            });
            emit_for(&mut out, owner, viewer, FieldUpdate::Jumping {
                character: *player,
                version: shadow.jumping.version.max(1),
                active: character.is_jumping,
            });
        }

        out
    }
}

fn push(out: &mut Vec<(Scope, FieldUpdate)>, owner: Option<PlayerId>, update: FieldUpdate) {
    if let Some(scope) = scope_for(&update, owner) {
        out.push((scope, update));
    }
}

fn emit_for(
    out: &mut Vec<FieldUpdate>,
    owner: Option<PlayerId>,
    viewer: PlayerId,
    update: FieldUpdate,
) {
    if let Some(scope) = scope_for(&update, owner) {
        if scope.includes(viewer) {
            out.push(update);
        }
    }
}
