//! Authoritative simulation world
//!
//! Single-threaded: one world per session task. Every client intent and every
//! timer callback lands here; the world mediates between the inventory on the
//! characters and the weapon state machines in the arena. Invalid intents are
//! silently rejected by the predicate gates - the state machine simply does
//! not transition.

use std::collections::HashMap;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::ClientMsg;

use super::arena::{WeaponArena, WeaponId};
use super::character::{
    Character, CHARACTER_BODY_RADIUS, CHARACTER_HEAD_RADIUS,
};
use super::effects::{AnimationDriver, EffectsSink, Montage, WeaponSound};
use super::hitscan::{
    CharacterTarget, HitRecord, HitResolver, HitscanConfig, QuantizedVec, SceneTrace, SurfaceKind,
    TraceService,
};
use super::scheduler::{Scheduler, TimerTask};
use super::weapon::{StorageSlot, WeaponInstance, WeaponKind, WeaponSpec, WeaponState};
use super::PlayerId;

/// Maximum distance for the use-object view query
pub const MAX_USE_DISTANCE: f32 = 500.0;
/// Maximum distance a dropped weapon lands from the character
pub const DROP_WEAPON_MAX_DISTANCE: f32 = 100.0;
/// How far inside the view cone a pickup must be to count as "in view"
const USE_VIEW_CONE_COS: f32 = 0.9;
/// The clip is credited this long before the reload visuals end
const RELOAD_REFILL_LEAD_SECS: f32 = 0.1;
/// Height of the body sphere center above the character origin
const BODY_CENTER_HEIGHT: f32 = 90.0;
/// Head sphere center height (also the eye height)
const HEAD_CENTER_HEIGHT: f32 = 160.0;
/// Dropped pickups are nudged off the impacted surface by this much
const DROP_SURFACE_OFFSET: f32 = 20.0;

/// World construction parameters
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub seed: u64,
    pub hitscan: HitscanConfig,
    /// Weapons granted to joining characters
    pub starter_weapons: Vec<WeaponKind>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            hitscan: HitscanConfig::default(),
            starter_weapons: vec![WeaponKind::Rifle, WeaponKind::Pistol],
        }
    }
}

/// Push notification targeted at a single owning client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerNotification {
    /// Tell the owning client to begin reloading this weapon
    StartReload { player: PlayerId, weapon: WeaponId },
}

/// A droppable weapon lying in the world
#[derive(Debug, Clone, Copy)]
pub struct WeaponPickup {
    pub id: Uuid,
    pub kind: WeaponKind,
    /// Total ammo carried over from the dropped weapon
    pub ammo: u32,
    pub position: Vec3,
}

/// The authoritative game world for one session
pub struct World {
    time: f64,
    pub scheduler: Scheduler,
    pub weapons: WeaponArena,
    pub characters: HashMap<PlayerId, Character>,
    pub pickups: Vec<WeaponPickup>,
    rng: ChaCha8Rng,
    resolver: HitResolver,
    effects: Box<dyn EffectsSink>,
    animations: Box<dyn AnimationDriver>,
    notifications: Vec<OwnerNotification>,
    starter_weapons: Vec<WeaponKind>,
}

impl World {
    pub fn new(
        config: WorldConfig,
        effects: Box<dyn EffectsSink>,
        animations: Box<dyn AnimationDriver>,
    ) -> Self {
        Self {
            time: 0.0,
            scheduler: Scheduler::new(),
            weapons: WeaponArena::new(),
            characters: HashMap::new(),
            pickups: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            resolver: HitResolver::new(config.hitscan),
            effects,
            animations,
            notifications: Vec::new(),
            starter_weapons: config.starter_weapons,
        }
    }

    pub fn now(&self) -> f64 {
        self.time
    }

    /// Advance the clock and run every timer that came due
    pub fn advance(&mut self, dt: f32) {
        self.time += dt as f64;
        while let Some(task) = self.scheduler.pop_due(self.time) {
            self.dispatch(task);
        }
    }

    fn dispatch(&mut self, task: TimerTask) {
        match task {
            TimerTask::FireShot(w) => self.fire_shot(w),
            TimerTask::RefillClip(w) => self.refill_clip(w),
            TimerTask::StopReloadVisuals(w) => self.stop_simulate_reload(w),
            TimerTask::EquipFinished(w) => self.on_equip_finished(w),
            TimerTask::UnequipFinished(w) => self.on_unequip_finished(w),
        }
    }

    /// Drain pending single-client pushes (consumed by the session each tick)
    pub fn drain_notifications(&mut self) -> Vec<OwnerNotification> {
        std::mem::take(&mut self.notifications)
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Validation gate for client intents. Accept-all for now; the hook
    /// exists so abuse-prevention policy has a single place to land.
    pub fn validate_intent(&self, _player: PlayerId, _intent: &ClientMsg) -> bool {
        true
    }

    /// Apply one validated client intent
    pub fn handle_intent(&mut self, player: PlayerId, intent: &ClientMsg) {
        match *intent {
            ClientMsg::Aim { yaw, pitch } => {
                if let Some(c) = self.characters.get_mut(&player) {
                    c.aim_yaw = yaw;
                    c.aim_pitch = pitch;
                }
            }
            ClientMsg::SetSprinting { active } => self.set_sprinting(player, active),
            ClientMsg::SetTargeting { active } => {
                if let Some(c) = self.characters.get_mut(&player) {
                    c.is_targeting = active;
                }
            }
            ClientMsg::SetJumping { active } => {
                if let Some(c) = self.characters.get_mut(&player) {
                    c.is_jumping = active;
                }
            }
            ClientMsg::StartFire => self.start_fire(player),
            ClientMsg::StopFire => self.stop_fire(player),
            ClientMsg::StartReload => self.start_reload(player),
            ClientMsg::StopReload => {
                if let Some(weapon) = self.current_weapon_of(player) {
                    self.stop_simulate_reload(weapon);
                }
            }
            ClientMsg::EquipWeapon { weapon } => self.equip_weapon(player, weapon),
            ClientMsg::EquipSlot { slot } => self.equip_slot(player, slot),
            ClientMsg::NextWeapon => self.next_weapon(player),
            ClientMsg::PrevWeapon => self.prev_weapon(player),
            ClientMsg::DropWeapon => self.drop_weapon(player),
            ClientMsg::UseObject => self.use_object(player),
            // Session-level messages, not world intents
            ClientMsg::Join { .. } | ClientMsg::Leave | ClientMsg::Ping { .. } => {}
        }
    }

    // ========================================================================
    // Characters
    // ========================================================================

    /// Spawn a character and grant the starter loadout
    pub fn spawn_character(
        &mut self,
        player: PlayerId,
        display_name: String,
        locally_controlled: bool,
    ) {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.rng.gen_range(200.0..800.0);
        let position = Vec3::new(angle.cos() * distance, angle.sin() * distance, 0.0);

        let mut character = Character::new(player, display_name, position);
        character.locally_controlled = locally_controlled;
        self.characters.insert(player, character);

        for kind in self.starter_weapons.clone() {
            let spec = WeaponSpec::for_kind(kind);
            if !self.weapon_slot_available(player, spec.slot) {
                continue;
            }
            let weapon = self.weapons.insert(WeaponInstance::new(spec));
            self.add_weapon(player, weapon);
        }

        info!(player_id = %player, "Character spawned");
    }

    /// Tear down a character: destroy the inventory, then drop the entry
    pub fn remove_character(&mut self, player: PlayerId) {
        self.destroy_inventory(player);
        self.characters.remove(&player);
        info!(player_id = %player, "Character removed");
    }

    fn destroy_inventory(&mut self, player: PlayerId) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        for weapon in character.inventory.clone().into_iter().rev() {
            self.remove_weapon(player, weapon, true);
        }
    }

    /// External damage-application entry point (fire-and-forget)
    pub fn apply_point_damage(&mut self, target: PlayerId, amount: f32) {
        let newly_dead = self
            .characters
            .get_mut(&target)
            .map(|c| c.take_damage(amount))
            .unwrap_or(false);
        if newly_dead {
            self.on_character_died(target);
        }
    }

    fn on_character_died(&mut self, player: PlayerId) {
        info!(player_id = %player, "Character died");

        // No timer belonging to a dead character's weapons may fire
        let inventory = self
            .characters
            .get(&player)
            .map(|c| c.inventory.clone())
            .unwrap_or_default();
        for weapon_id in inventory {
            self.scheduler.cancel_owner(weapon_id);
            if let Some(w) = self.weapons.get_mut(weapon_id) {
                w.wants_to_fire = false;
                w.pending_reload = false;
                w.pending_equip = false;
                w.cadence_timer = None;
                w.refill_timer = None;
                w.stop_reload_timer = None;
                w.equip_timer = None;
            }
            self.re_derive(weapon_id);
        }

        self.effects.ragdoll(player);
    }

    fn set_sprinting(&mut self, player: PlayerId, active: bool) {
        if active {
            // Sprinting and firing are mutually exclusive
            self.stop_fire(player);
        }
        if let Some(c) = self.characters.get_mut(&player) {
            c.wants_to_sprint = active;
        }
    }

    fn current_weapon_of(&self, player: PlayerId) -> Option<WeaponId> {
        self.characters.get(&player)?.current_weapon
    }

    fn weapon_owner_alive(&self, weapon_id: WeaponId) -> bool {
        self.weapons
            .get(weapon_id)
            .and_then(|w| w.owner)
            .and_then(|o| self.characters.get(&o))
            .map(|c| c.is_alive())
            .unwrap_or(false)
    }

    fn weapon_owner_local(&self, weapon_id: WeaponId) -> bool {
        self.weapons
            .get(weapon_id)
            .and_then(|w| w.owner)
            .and_then(|o| self.characters.get(&o))
            .map(|c| c.locally_controlled)
            .unwrap_or(false)
    }

    // ========================================================================
    // Firing
    // ========================================================================

    pub fn start_fire(&mut self, player: PlayerId) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        if !character.can_fire() {
            debug!(player_id = %player, "fire intent rejected");
            return;
        }
        if character.wants_to_sprint {
            self.set_sprinting(player, false);
        }
        let Some(weapon_id) = self.current_weapon_of(player) else {
            return;
        };
        if let Some(w) = self.weapons.get_mut(weapon_id) {
            w.wants_to_fire = true;
        }
        self.re_derive(weapon_id);
    }

    pub fn stop_fire(&mut self, player: PlayerId) {
        let Some(weapon_id) = self.current_weapon_of(player) else {
            return;
        };
        if let Some(w) = self.weapons.get_mut(weapon_id) {
            w.wants_to_fire = false;
        }
        self.re_derive(weapon_id);
    }

    /// Re-derive a weapon's state after a flag mutation and react to the
    /// Firing transition edges (cadence timer start/stop, burst reset).
    fn re_derive(&mut self, weapon_id: WeaponId) {
        let owner_alive = self.weapon_owner_alive(weapon_id);
        let now = self.time;
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        let (prev, new) = w.determine_state(owner_alive);

        if prev != WeaponState::Firing && new == WeaponState::Firing {
            // Cadence floor: a trigger pulled mid-cooldown waits out the
            // remainder instead of resetting the cycle
            let period = w.spec.time_between_shots();
            let first_delay = (w.last_fire_time + period as f64 - now).max(0.0) as f32;
            let handle = self.scheduler.schedule_repeating(
                now,
                first_delay,
                period,
                TimerTask::FireShot(weapon_id),
            );
            w.cadence_timer = Some(handle);
        } else if prev == WeaponState::Firing && new != WeaponState::Firing {
            if let Some(handle) = w.cadence_timer.take() {
                self.scheduler.cancel(handle);
            }
            w.burst_counter = 0;
            self.effects.fire_simulation(weapon_id, false);
        }
    }

    /// Fire cadence timer body: resolve one shot
    fn fire_shot(&mut self, weapon_id: WeaponId) {
        let Some(w) = self.weapons.get(weapon_id) else {
            return;
        };
        if w.state() != WeaponState::Firing {
            return;
        }
        let spec = w.spec;
        let Some(owner_id) = w.owner else {
            return;
        };
        let Some(owner) = self.characters.get(&owner_id) else {
            return;
        };
        if !owner.is_alive() {
            self.re_derive(weapon_id);
            return;
        }
        let eye = owner.eye_position();
        let aim = owner.aim_direction();

        let targets: Vec<CharacterTarget> = self
            .characters
            .values()
            .filter(|c| c.id != owner_id && c.is_alive())
            .map(|c| CharacterTarget {
                id: c.id,
                position: c.position + Vec3::new(0.0, 0.0, BODY_CENTER_HEIGHT),
                body_radius: CHARACTER_BODY_RADIUS,
                head_center: c.position + Vec3::new(0.0, 0.0, HEAD_CENTER_HEIGHT),
                head_radius: CHARACTER_HEAD_RADIUS,
            })
            .collect();
        let scene = SceneTrace::new(&targets);

        let shot = self
            .resolver
            .resolve(&mut self.rng, eye, aim, &spec, owner_id, &scene);

        if let Some(hit) = shot.hit {
            if let Some(target) = hit.target {
                debug!(
                    shooter = %owner_id,
                    target = %target,
                    damage = hit.damage,
                    "point damage applied"
                );
                self.apply_point_damage(target, hit.damage);
            }
            self.effects.impact(weapon_id, hit.surface, hit.point);
        }

        // Local fire effects play regardless of hit
        self.effects.weapon_fired(weapon_id, shot.trace_end);
        self.effects.weapon_sound(weapon_id, WeaponSound::Fire);

        let now = self.time;
        let mut clip_emptied = false;
        if let Some(w) = self.weapons.get_mut(weapon_id) {
            w.ammo.use_round();
            w.burst_counter = w.burst_counter.wrapping_add(1).max(1);
            w.last_hit = Some(HitRecord {
                impact: QuantizedVec::from_vec3(shot.trace_end),
                surface: shot
                    .hit
                    .map(|h| h.surface)
                    .unwrap_or(SurfaceKind::Default),
            });
            // Keeps the next burst's first-delay computation honest
            w.last_fire_time = now;
            clip_emptied = w.ammo.clip_empty();
        }

        if clip_emptied {
            // Auto-stop on empty clip; the latched trigger survives so a
            // completed reload resumes the burst
            self.re_derive(weapon_id);
        }
    }

    // ========================================================================
    // Reloading
    // ========================================================================

    pub fn start_reload(&mut self, player: PlayerId) {
        let Some(weapon_id) = self.current_weapon_of(player) else {
            return;
        };
        self.weapon_start_reload(weapon_id);
    }

    fn weapon_start_reload(&mut self, weapon_id: WeaponId) {
        let owner_alive = self.weapon_owner_alive(weapon_id);
        let Some(w) = self.weapons.get(weapon_id) else {
            return;
        };
        if !w.can_reload(owner_alive) {
            debug!(?weapon_id, "reload intent rejected");
            return;
        }
        let spec = w.spec;
        let owner = w.owner;

        if let Some(w) = self.weapons.get_mut(weapon_id) {
            w.pending_reload = true;
        }
        self.re_derive(weapon_id);

        let anim = owner
            .map(|o| self.animations.play(o, Montage::Reload))
            .unwrap_or(0.0);
        let duration = if anim <= 0.0 {
            spec.no_anim_reload_secs
        } else {
            anim
        };

        // The clip is credited strictly before the visuals finish
        let now = self.time;
        let refill = self.scheduler.schedule(
            now,
            (duration - RELOAD_REFILL_LEAD_SECS).max(RELOAD_REFILL_LEAD_SECS),
            TimerTask::RefillClip(weapon_id),
        );
        let stop = self
            .scheduler
            .schedule(now, duration, TimerTask::StopReloadVisuals(weapon_id));
        if let Some(w) = self.weapons.get_mut(weapon_id) {
            w.refill_timer = Some(refill);
            w.stop_reload_timer = Some(stop);
        }

        if self.weapon_owner_local(weapon_id) {
            self.effects.weapon_sound(weapon_id, WeaponSound::Reload);
        }
    }

    /// Reload-completion timer body: move reserve rounds into the clip
    fn refill_clip(&mut self, weapon_id: WeaponId) {
        if let Some(w) = self.weapons.get_mut(weapon_id) {
            let moved = w.ammo.refill_clip();
            w.refill_timer = None;
            debug!(?weapon_id, moved, "clip refilled");
        }
    }

    /// End of the reload visuals: clear the flag and re-derive
    fn stop_simulate_reload(&mut self, weapon_id: WeaponId) {
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        if w.state() != WeaponState::Reloading {
            return;
        }
        w.pending_reload = false;
        w.stop_reload_timer = None;
        let owner = w.owner;
        self.re_derive(weapon_id);
        if let Some(o) = owner {
            self.animations.stop(o, Montage::Reload);
        }
    }

    // ========================================================================
    // Inventory / equipping
    // ========================================================================

    /// Equip a carried weapon. No-op when already current or not carried.
    pub fn equip_weapon(&mut self, player: PlayerId, weapon_id: WeaponId) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        if character.current_weapon == Some(weapon_id) {
            return;
        }
        if !character.inventory.contains(&weapon_id) {
            debug!(player_id = %player, ?weapon_id, "equip rejected: not carried");
            return;
        }
        let old = character.current_weapon;
        self.set_current_weapon(player, Some(weapon_id), old);
    }

    /// Swap the current weapon. `explicit_old` carries the previous value
    /// when known (the equip path passes it; inventory-removal repair does
    /// not).
    fn set_current_weapon(
        &mut self,
        player: PlayerId,
        new: Option<WeaponId>,
        explicit_old: Option<WeaponId>,
    ) {
        let Some(character) = self.characters.get_mut(&player) else {
            return;
        };
        let current = character.current_weapon;
        let local_last = explicit_old.or(if new != current { current } else { None });

        // Reference for visual weapon swapping, cleared when the equip lands
        character.previous_weapon = explicit_old;
        character.current_weapon = new;
        let had_previous = local_last.is_some();

        if let Some(old) = local_last {
            self.weapon_on_unequip(old);
        }

        if let Some(new_id) = new {
            if let Some(w) = self.weapons.get_mut(new_id) {
                w.owner = Some(player);
            }
            // Only animate when the character already held something;
            // the first-ever equip snaps into place
            self.weapon_on_equip(new_id, had_previous);
        }
    }

    fn weapon_on_equip(&mut self, weapon_id: WeaponId, play_animation: bool) {
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        w.pending_equip = true;
        let spec = w.spec;
        let owner = w.owner;
        self.re_derive(weapon_id);

        if play_animation {
            let anim = owner
                .map(|o| self.animations.play(o, Montage::Equip))
                .unwrap_or(0.0);
            let duration = if anim <= 0.0 {
                spec.no_anim_equip_secs
            } else {
                anim
            };
            let now = self.time;
            let handle = self
                .scheduler
                .schedule(now, duration, TimerTask::EquipFinished(weapon_id));
            if let Some(w) = self.weapons.get_mut(weapon_id) {
                w.equip_timer = Some(handle);
            }
            if self.weapon_owner_local(weapon_id) {
                self.effects.weapon_sound(weapon_id, WeaponSound::Equip);
            }
        } else {
            // Immediately finish equipping
            self.on_equip_finished(weapon_id);
        }
    }

    fn on_equip_finished(&mut self, weapon_id: WeaponId) {
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        w.is_equipped = true;
        w.pending_equip = false;
        w.equip_timer = None;
        let owner = w.owner;
        let clip_empty = w.ammo.clip_empty();

        if let Some(o) = owner {
            self.effects.attach_weapon(weapon_id, o, StorageSlot::Hands);
            if let Some(c) = self.characters.get_mut(&o) {
                // Swap transition is over
                c.previous_weapon = None;
            }
        }

        self.re_derive(weapon_id);

        // Top up an empty clip without waiting for the player
        let owner_alive = self.weapon_owner_alive(weapon_id);
        let can_reload = self
            .weapons
            .get(weapon_id)
            .map(|w| w.can_reload(owner_alive))
            .unwrap_or(false);
        if clip_empty && can_reload {
            if self.weapon_owner_local(weapon_id) {
                self.weapon_start_reload(weapon_id);
            } else if let Some(o) = owner {
                self.notifications.push(OwnerNotification::StartReload {
                    player: o,
                    weapon: weapon_id,
                });
            }
        }
    }

    fn weapon_on_unequip(&mut self, weapon_id: WeaponId) {
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        w.is_equipped = false;
        w.wants_to_fire = false;
        let owner = w.owner;
        let spec = w.spec;

        if w.pending_equip {
            w.pending_equip = false;
            if let Some(handle) = w.equip_timer.take() {
                self.scheduler.cancel(handle);
            }
            if let Some(o) = owner {
                self.animations.stop(o, Montage::Equip);
            }
        }
        let w = match self.weapons.get_mut(weapon_id) {
            Some(w) => w,
            None => return,
        };
        if w.pending_reload {
            w.pending_reload = false;
            if let Some(handle) = w.stop_reload_timer.take() {
                self.scheduler.cancel(handle);
            }
            if let Some(handle) = w.refill_timer.take() {
                self.scheduler.cancel(handle);
            }
            if let Some(o) = owner {
                self.animations.stop(o, Montage::Reload);
            }
        }

        self.re_derive(weapon_id);

        // Visual swap: detach now, re-attach to the storage slot when the
        // swap animation would have finished
        self.effects.detach_weapon(weapon_id);
        let now = self.time;
        self.scheduler.schedule(
            now,
            spec.no_anim_equip_secs,
            TimerTask::UnequipFinished(weapon_id),
        );
    }

    fn on_unequip_finished(&mut self, weapon_id: WeaponId) {
        let Some(w) = self.weapons.get(weapon_id) else {
            return;
        };
        if let Some(o) = w.owner {
            self.effects.attach_weapon(weapon_id, o, w.spec.slot);
        }
    }

    /// Authority-only: put a weapon into a character's inventory.
    /// The first carried weapon is auto-equipped.
    pub fn add_weapon(&mut self, player: PlayerId, weapon_id: WeaponId) {
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        w.owner = Some(player);
        let slot = w.spec.slot;
        self.effects.attach_weapon(weapon_id, player, slot);

        let Some(character) = self.characters.get_mut(&player) else {
            return;
        };
        if !character.inventory.contains(&weapon_id) {
            character.inventory.push(weapon_id);
        }
        if character.current_weapon.is_none() {
            self.equip_weapon(player, weapon_id);
        }
    }

    /// Authority-only: take a weapon out of the inventory. With `destroy`
    /// the instance is released and every timer keyed to it is cancelled.
    pub fn remove_weapon(&mut self, player: PlayerId, weapon_id: WeaponId, destroy: bool) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        let carried = character.inventory.contains(&weapon_id);
        let was_current = character.current_weapon == Some(weapon_id);
        if !carried {
            return;
        }

        self.on_leave_inventory(weapon_id);

        let Some(character) = self.characters.get_mut(&player) else {
            return;
        };
        character.inventory.retain(|w| *w != weapon_id);
        if was_current {
            character.current_weapon = None;
        }
        let replacement = character.inventory.first().copied();

        if was_current {
            if let Some(next) = replacement {
                self.set_current_weapon(player, Some(next), None);
            }
        }

        if destroy {
            self.scheduler.cancel_owner(weapon_id);
            self.weapons.remove(weapon_id);
        }
    }

    fn on_leave_inventory(&mut self, weapon_id: WeaponId) {
        let attached = self
            .weapons
            .get(weapon_id)
            .map(|w| w.is_attached_to_character())
            .unwrap_or(false);
        if attached {
            self.weapon_on_unequip(weapon_id);
        }
        if let Some(w) = self.weapons.get_mut(weapon_id) {
            w.owner = None;
        }
        self.effects.detach_weapon(weapon_id);
    }

    /// Hotkey equip: the carried weapon stored in `slot`, if any
    pub fn equip_slot(&mut self, player: PlayerId, slot: StorageSlot) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        let target = character.inventory.iter().copied().find(|wid| {
            self.weapons
                .get(*wid)
                .map(|w| w.spec.slot == slot)
                .unwrap_or(false)
        });
        if let Some(weapon) = target {
            self.equip_weapon(player, weapon);
        }
    }

    /// Cycle forward through the carried sequence (needs >= 2 weapons)
    pub fn next_weapon(&mut self, player: PlayerId) {
        self.cycle_weapon(player, 1);
    }

    /// Cycle backward through the carried sequence (needs >= 2 weapons)
    pub fn prev_weapon(&mut self, player: PlayerId) {
        self.cycle_weapon(player, -1);
    }

    fn cycle_weapon(&mut self, player: PlayerId, step: i32) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        let n = character.inventory.len();
        if n < 2 {
            return;
        }
        let current_index = character
            .current_weapon
            .and_then(|c| character.inventory.iter().position(|w| *w == c))
            .unwrap_or(0);
        let next_index = (current_index as i32 + step).rem_euclid(n as i32) as usize;
        let target = character.inventory[next_index];
        self.equip_weapon(player, target);
    }

    /// True iff no carried weapon occupies the given storage slot
    pub fn weapon_slot_available(&self, player: PlayerId, slot: StorageSlot) -> bool {
        let Some(character) = self.characters.get(&player) else {
            return false;
        };
        !character.inventory.iter().any(|wid| {
            self.weapons
                .get(*wid)
                .map(|w| w.spec.slot == slot)
                .unwrap_or(false)
        })
    }

    // ========================================================================
    // Pickups
    // ========================================================================

    /// Drop the current weapon as a pickup slightly in front of the character
    pub fn drop_weapon(&mut self, player: PlayerId) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        let Some(weapon_id) = character.current_weapon else {
            return;
        };

        // Find the farthest unobstructed landing spot
        let start = character.position + Vec3::new(0.0, 0.0, BODY_CENTER_HEIGHT);
        let direction = character.aim_direction();
        let end = start + direction * DROP_WEAPON_MAX_DISTANCE;
        let targets = self.trace_targets(Some(player));
        let scene = SceneTrace::new(&targets);
        let spot = match scene.trace(start, end, Some(player)) {
            Some(hit) => hit.point + hit.normal * DROP_SURFACE_OFFSET,
            None => end,
        };

        let Some(w) = self.weapons.get(weapon_id) else {
            return;
        };
        let pickup = WeaponPickup {
            id: Uuid::new_v4(),
            kind: w.spec.kind,
            ammo: w.ammo.total(),
            position: spot,
        };
        info!(player_id = %player, kind = ?pickup.kind, "Weapon dropped");
        self.pickups.push(pickup);

        self.remove_weapon(player, weapon_id, true);
    }

    /// Pick up the nearest pickup in view, if its slot is free
    pub fn use_object(&mut self, player: PlayerId) {
        let Some(character) = self.characters.get(&player) else {
            return;
        };
        if !character.is_alive() {
            return;
        }
        let eye = character.eye_position();
        let aim = character.aim_direction();

        let mut best: Option<(f32, usize)> = None;
        for (index, pickup) in self.pickups.iter().enumerate() {
            let to = pickup.position - eye;
            let distance = to.length();
            if distance > MAX_USE_DISTANCE {
                continue;
            }
            if to.normalize_or_zero().dot(aim) < USE_VIEW_CONE_COS {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, index));
            }
        }
        let Some((_, index)) = best else {
            return;
        };

        let spec = WeaponSpec::for_kind(self.pickups[index].kind);
        // At most one weapon per storage slot, enforced before insertion
        if !self.weapon_slot_available(player, spec.slot) {
            debug!(player_id = %player, slot = ?spec.slot, "pickup rejected: slot occupied");
            return;
        }

        let pickup = self.pickups.remove(index);
        let mut weapon = WeaponInstance::new(spec);
        weapon.ammo.set_total(pickup.ammo);
        let weapon_id = self.weapons.insert(weapon);
        info!(player_id = %player, kind = ?pickup.kind, "Weapon picked up");
        self.add_weapon(player, weapon_id);
    }

    /// Grant ammo to a weapon, returning the surplus that did not fit.
    /// An empty-clip current weapon triggers the reload push.
    pub fn give_ammo(&mut self, weapon_id: WeaponId, amount: u32) -> u32 {
        let Some(w) = self.weapons.get_mut(weapon_id) else {
            return amount;
        };
        let surplus = w.ammo.give(amount);
        let clip_empty = w.ammo.clip_empty();
        let owner = w.owner;

        let is_current = owner
            .and_then(|o| self.characters.get(&o))
            .map(|c| c.current_weapon == Some(weapon_id))
            .unwrap_or(false);
        let owner_alive = self.weapon_owner_alive(weapon_id);
        let can_reload = self
            .weapons
            .get(weapon_id)
            .map(|w| w.can_reload(owner_alive))
            .unwrap_or(false);

        if clip_empty && is_current && can_reload {
            if self.weapon_owner_local(weapon_id) {
                self.weapon_start_reload(weapon_id);
            } else if let Some(o) = owner {
                self.notifications.push(OwnerNotification::StartReload {
                    player: o,
                    weapon: weapon_id,
                });
            }
        }

        surplus
    }

    fn trace_targets(&self, ignore: Option<PlayerId>) -> Vec<CharacterTarget> {
        self.characters
            .values()
            .filter(|c| Some(c.id) != ignore && c.is_alive())
            .map(|c| CharacterTarget {
                id: c.id,
                position: c.position + Vec3::new(0.0, 0.0, BODY_CENTER_HEIGHT),
                body_radius: CHARACTER_BODY_RADIUS,
                head_center: c.position + Vec3::new(0.0, 0.0, HEAD_CENTER_HEIGHT),
                head_radius: CHARACTER_HEAD_RADIUS,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::character::CHARACTER_MAX_HEALTH;
    use crate::game::effects::{EffectEvent, FixedAnimations, RecordingEffects};
    use std::sync::{Arc, Mutex};

    type Events = Arc<Mutex<Vec<EffectEvent>>>;

    fn test_world() -> (World, Events) {
        let (sink, events) = RecordingEffects::new();
        let config = WorldConfig {
            seed: 42,
            hitscan: HitscanConfig::default(),
            starter_weapons: vec![],
        };
        let world = World::new(
            config,
            Box::new(sink),
            Box::new(FixedAnimations {
                reload_secs: 1.0,
                equip_secs: 0.5,
            }),
        );
        (world, events)
    }

    fn spawn_player(world: &mut World, locally_controlled: bool) -> PlayerId {
        let player = Uuid::new_v4();
        world.spawn_character(player, "tester".into(), locally_controlled);
        player
    }

    fn grant(world: &mut World, player: PlayerId, spec: WeaponSpec) -> WeaponId {
        let weapon = world.weapons.insert(WeaponInstance::new(spec));
        world.add_weapon(player, weapon);
        weapon
    }

    /// 600 rpm, zero spread: one shot exactly every 0.1 s
    fn test_rifle() -> WeaponSpec {
        WeaponSpec {
            rounds_per_minute: 600,
            spread_degrees: 0.0,
            ..WeaponSpec::for_kind(WeaponKind::Rifle)
        }
    }

    fn fired_count(events: &Events, weapon: WeaponId) -> usize {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == EffectEvent::Fired(weapon))
            .count()
    }

    fn count(events: &Events, wanted: EffectEvent) -> usize {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == wanted)
            .count()
    }

    #[test]
    fn first_weapon_is_auto_equipped_without_animation() {
        let (mut world, events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());

        let character = &world.characters[&player];
        assert_eq!(character.current_weapon, Some(rifle));
        assert!(world.weapons.get(rifle).unwrap().is_equipped());
        assert_eq!(count(&events, EffectEvent::Attach(rifle, StorageSlot::Hands)), 1);
    }

    #[test]
    fn fire_cadence_waits_out_the_cooldown_remainder() {
        let (mut world, events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        world.advance(1.0);

        // First shot of a cold weapon is immediate
        world.start_fire(player);
        world.advance(0.0);
        assert_eq!(fired_count(&events, rifle), 1);

        // Release, then pull the trigger again mid-cooldown: the next shot
        // lands a full period after the previous one, not after the re-pull
        world.advance(0.03);
        world.stop_fire(player);
        world.start_fire(player);
        world.advance(0.05); // t = 1.08
        assert_eq!(fired_count(&events, rifle), 1);
        world.advance(0.04); // t = 1.12 > 1.1
        assert_eq!(fired_count(&events, rifle), 2);
    }

    #[test]
    fn reload_credits_clip_before_visuals_end() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        for _ in 0..5 {
            world.weapons.get_mut(rifle).unwrap().ammo.use_round();
        }

        world.start_reload(player);
        assert_eq!(world.weapons.get(rifle).unwrap().state(), WeaponState::Reloading);

        // Before the refill point: old counts, still reloading
        world.advance(0.85);
        assert_eq!(world.weapons.get(rifle).unwrap().ammo.clip(), 25);

        // Refill lands before the visuals finish
        world.advance(0.1);
        let w = world.weapons.get(rifle).unwrap();
        assert_eq!(w.ammo.clip(), 30);
        assert_eq!(w.state(), WeaponState::Reloading);

        world.advance(0.1);
        let w = world.weapons.get(rifle).unwrap();
        assert_eq!(w.state(), WeaponState::Idle);
        assert!(!w.pending_reload);
    }

    #[test]
    fn equipping_is_exclusive_and_sequenced() {
        let (mut world, events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        let pistol = grant(&mut world, player, WeaponSpec::for_kind(WeaponKind::Pistol));
        events.lock().unwrap().clear();

        world.equip_weapon(player, pistol);
        // Outgoing weapon lets go immediately; the incoming one animates
        assert!(!world.weapons.get(rifle).unwrap().is_equipped());
        assert_eq!(world.weapons.get(pistol).unwrap().state(), WeaponState::Equipping);
        assert_eq!(world.characters[&player].previous_weapon, Some(rifle));

        world.advance(0.6);
        assert!(world.weapons.get(pistol).unwrap().is_equipped());
        assert!(!world.weapons.get(rifle).unwrap().is_equipped());
        assert_eq!(world.characters[&player].previous_weapon, None);
        assert_eq!(count(&events, EffectEvent::Attach(pistol, StorageSlot::Hands)), 1);
        // The outgoing rifle went back to its storage slot
        assert_eq!(count(&events, EffectEvent::Attach(rifle, StorageSlot::Primary)), 1);
    }

    #[test]
    fn equip_of_uncarried_weapon_is_rejected() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        let other = spawn_player(&mut world, true);
        let other_pistol = grant(&mut world, other, WeaponSpec::for_kind(WeaponKind::Pistol));

        world.equip_weapon(player, other_pistol);
        assert_eq!(world.characters[&player].current_weapon, Some(rifle));
    }

    #[test]
    fn pickup_is_rejected_when_slot_is_occupied() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        grant(&mut world, player, test_rifle());

        let eye = world.characters[&player].eye_position();
        world.pickups.push(WeaponPickup {
            id: Uuid::new_v4(),
            kind: WeaponKind::Rifle,
            ammo: 90,
            position: eye + Vec3::X * 200.0,
        });

        world.use_object(player);
        assert_eq!(world.pickups.len(), 1);
        assert_eq!(world.characters[&player].inventory.len(), 1);
    }

    #[test]
    fn pickup_carries_its_ammo_into_the_inventory() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        grant(&mut world, player, test_rifle());

        let eye = world.characters[&player].eye_position();
        world.pickups.push(WeaponPickup {
            id: Uuid::new_v4(),
            kind: WeaponKind::Pistol,
            ammo: 90,
            position: eye + Vec3::X * 200.0,
        });

        world.use_object(player);
        assert!(world.pickups.is_empty());
        let inventory = &world.characters[&player].inventory;
        assert_eq!(inventory.len(), 2);
        let picked = inventory[1];
        assert_eq!(world.weapons.get(picked).unwrap().ammo.total(), 90);
    }

    #[test]
    fn pickup_out_of_view_is_ignored() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        grant(&mut world, player, test_rifle());

        // Behind the character
        let eye = world.characters[&player].eye_position();
        world.pickups.push(WeaponPickup {
            id: Uuid::new_v4(),
            kind: WeaponKind::Pistol,
            ammo: 12,
            position: eye - Vec3::X * 200.0,
        });

        world.use_object(player);
        assert_eq!(world.pickups.len(), 1);
    }

    #[test]
    fn equip_with_empty_clip_starts_one_reload() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        let pistol = grant(&mut world, player, WeaponSpec::for_kind(WeaponKind::Pistol));

        world.equip_weapon(player, pistol);
        world.advance(0.6);

        // Drain the rifle's clip while it sits in storage
        while world.weapons.get_mut(rifle).unwrap().ammo.use_round() {}
        let _ = pistol;

        world.equip_weapon(player, rifle);
        world.advance(0.6);

        let w = world.weapons.get(rifle).unwrap();
        assert_eq!(w.state(), WeaponState::Reloading);
        assert_eq!(world.scheduler.pending_for(rifle), 2);

        world.advance(2.0);
        let w = world.weapons.get(rifle).unwrap();
        assert_eq!(w.ammo.clip(), 30);
        assert_eq!(w.state(), WeaponState::Idle);
        assert_eq!(world.scheduler.pending_for(rifle), 0);
    }

    #[test]
    fn destroying_a_weapon_cancels_its_timers() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        for _ in 0..5 {
            world.weapons.get_mut(rifle).unwrap().ammo.use_round();
        }

        world.start_reload(player);
        assert!(world.scheduler.pending_for(rifle) > 0);

        world.remove_weapon(player, rifle, true);
        assert_eq!(world.scheduler.pending_for(rifle), 0);
        assert!(!world.weapons.contains(rifle));
        assert_eq!(world.characters[&player].current_weapon, None);

        // Nothing left to go off
        world.advance(2.0);
    }

    #[test]
    fn empty_clip_stops_the_burst_and_reload_resumes_it() {
        let (mut world, events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(
            &mut world,
            player,
            WeaponSpec {
                start_ammo: 4,
                max_ammo: 10,
                clip_size: 2,
                ..test_rifle()
            },
        );
        world.advance(1.0);

        world.start_fire(player);
        world.advance(0.0);
        world.advance(0.1);
        assert_eq!(fired_count(&events, rifle), 2);

        // Clip empty: the weapon falls out of Firing on its own, trigger
        // latch intact, cadence timer gone
        let w = world.weapons.get(rifle).unwrap();
        assert_eq!(w.state(), WeaponState::Idle);
        assert!(w.wants_to_fire);
        assert_eq!(w.burst_counter, 0);
        assert_eq!(count(&events, EffectEvent::FireSim(rifle, false)), 1);
        world.advance(1.0);
        assert_eq!(fired_count(&events, rifle), 2);

        // A completed reload puts the held trigger back to work
        world.start_reload(player);
        world.advance(1.05);
        assert_eq!(world.weapons.get(rifle).unwrap().state(), WeaponState::Firing);
        world.advance(0.5);
        assert_eq!(fired_count(&events, rifle), 4);
    }

    #[test]
    fn sprinting_and_firing_exclude_each_other() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        world.advance(1.0);

        world.handle_intent(player, &ClientMsg::SetSprinting { active: true });
        assert!(world.characters[&player].wants_to_sprint);

        // Pulling the trigger cancels the sprint
        world.start_fire(player);
        assert!(!world.characters[&player].wants_to_sprint);
        assert_eq!(world.weapons.get(rifle).unwrap().state(), WeaponState::Firing);

        // Sprinting again releases the trigger
        world.handle_intent(player, &ClientMsg::SetSprinting { active: true });
        let w = world.weapons.get(rifle).unwrap();
        assert_eq!(w.state(), WeaponState::Idle);
        assert!(!w.wants_to_fire);
        assert!(world.characters[&player].wants_to_sprint);
    }

    #[test]
    fn dead_characters_cannot_fire() {
        let (mut world, events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        world.advance(1.0);

        world.apply_point_damage(player, 200.0);
        assert!(world.characters[&player].died);

        world.start_fire(player);
        world.advance(1.0);
        assert_eq!(fired_count(&events, rifle), 0);
        assert_eq!(world.weapons.get(rifle).unwrap().state(), WeaponState::Idle);
    }

    #[test]
    fn death_mid_burst_silences_the_weapon() {
        let (mut world, events) = test_world();
        let shooter = spawn_player(&mut world, true);
        let rifle = grant(&mut world, shooter, test_rifle());
        world.advance(1.0);

        world.start_fire(shooter);
        world.advance(0.0);
        assert_eq!(fired_count(&events, rifle), 1);

        world.apply_point_damage(shooter, 200.0);
        assert_eq!(world.scheduler.pending_for(rifle), 0);
        world.advance(1.0);
        assert_eq!(fired_count(&events, rifle), 1);
        assert_eq!(count(&events, EffectEvent::Ragdoll(shooter)), 1);
    }

    #[test]
    fn shots_damage_a_character_downrange() {
        let (mut world, events) = test_world();
        let shooter = spawn_player(&mut world, true);
        let rifle = grant(&mut world, shooter, test_rifle());

        // Plant a victim straight down the shooter's aim at body height
        let victim = spawn_player(&mut world, true);
        let eye = world.characters[&shooter].eye_position();
        world.characters.get_mut(&victim).unwrap().position =
            eye + Vec3::X * 500.0 - Vec3::new(0.0, 0.0, BODY_CENTER_HEIGHT);

        world.advance(1.0);
        world.start_fire(shooter);
        world.advance(0.0);

        assert_eq!(fired_count(&events, rifle), 1);
        assert!(world.characters[&victim].health < CHARACTER_MAX_HEALTH);
        assert_eq!(count(&events, EffectEvent::Impact(rifle, SurfaceKind::Flesh)), 1);

        // The replay record points at the impact
        let record = world.weapons.get(rifle).unwrap().last_hit.expect("hit record");
        assert_eq!(record.surface, SurfaceKind::Flesh);
    }

    #[test]
    fn give_ammo_reports_surplus_and_pushes_the_reload() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, false);
        let rifle = grant(
            &mut world,
            player,
            WeaponSpec {
                start_ammo: 2,
                max_ammo: 10,
                clip_size: 2,
                ..test_rifle()
            },
        );
        while world.weapons.get_mut(rifle).unwrap().ammo.use_round() {}

        let surplus = world.give_ammo(rifle, 50);
        assert_eq!(surplus, 40);

        // Remote owner: the reload is pushed, not started here
        assert_eq!(world.weapons.get(rifle).unwrap().state(), WeaponState::Idle);
        assert_eq!(
            world.drain_notifications(),
            vec![OwnerNotification::StartReload {
                player,
                weapon: rifle
            }]
        );
        assert!(world.drain_notifications().is_empty());
    }

    #[test]
    fn give_ammo_to_local_owner_reloads_directly() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(
            &mut world,
            player,
            WeaponSpec {
                start_ammo: 2,
                max_ammo: 10,
                clip_size: 2,
                ..test_rifle()
            },
        );
        while world.weapons.get_mut(rifle).unwrap().ammo.use_round() {}

        world.give_ammo(rifle, 4);
        assert_eq!(world.weapons.get(rifle).unwrap().state(), WeaponState::Reloading);
        assert!(world.drain_notifications().is_empty());
    }

    #[test]
    fn dropping_spawns_a_pickup_and_equips_the_next_weapon() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        let pistol = grant(&mut world, player, WeaponSpec::for_kind(WeaponKind::Pistol));

        let total_before = world.weapons.get(rifle).unwrap().ammo.total();
        world.drop_weapon(player);
        world.advance(1.0);

        assert_eq!(world.pickups.len(), 1);
        let pickup = world.pickups[0];
        assert_eq!(pickup.kind, WeaponKind::Rifle);
        assert_eq!(pickup.ammo, total_before);

        assert!(!world.weapons.contains(rifle));
        let character = &world.characters[&player];
        assert_eq!(character.inventory, vec![pistol]);
        assert_eq!(character.current_weapon, Some(pistol));
        assert!(world.weapons.get(pistol).unwrap().is_equipped());
    }

    #[test]
    fn weapon_cycling_wraps_in_both_directions() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        let pistol = grant(&mut world, player, WeaponSpec::for_kind(WeaponKind::Pistol));

        world.next_weapon(player);
        world.advance(0.6);
        assert_eq!(world.characters[&player].current_weapon, Some(pistol));

        world.next_weapon(player);
        world.advance(0.6);
        assert_eq!(world.characters[&player].current_weapon, Some(rifle));

        world.prev_weapon(player);
        world.advance(0.6);
        assert_eq!(world.characters[&player].current_weapon, Some(pistol));
    }

    #[test]
    fn slot_hotkeys_equip_the_stored_weapon() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());
        let pistol = grant(&mut world, player, WeaponSpec::for_kind(WeaponKind::Pistol));

        world.handle_intent(
            player,
            &ClientMsg::EquipSlot {
                slot: StorageSlot::Secondary,
            },
        );
        world.advance(0.6);
        assert_eq!(world.characters[&player].current_weapon, Some(pistol));

        world.handle_intent(
            player,
            &ClientMsg::EquipSlot {
                slot: StorageSlot::Primary,
            },
        );
        world.advance(0.6);
        assert_eq!(world.characters[&player].current_weapon, Some(rifle));

        // Nothing is stored in hands; the intent falls through
        world.handle_intent(
            player,
            &ClientMsg::EquipSlot {
                slot: StorageSlot::Hands,
            },
        );
        assert_eq!(world.characters[&player].current_weapon, Some(rifle));
    }

    #[test]
    fn cycling_with_a_single_weapon_is_a_no_op() {
        let (mut world, _events) = test_world();
        let player = spawn_player(&mut world, true);
        let rifle = grant(&mut world, player, test_rifle());

        world.next_weapon(player);
        assert_eq!(world.characters[&player].current_weapon, Some(rifle));
        assert!(world.weapons.get(rifle).unwrap().is_equipped());
    }

    #[test]
    fn removing_a_character_destroys_its_inventory() {
        let (sink, _events) = RecordingEffects::new();
        let mut world = World::new(
            WorldConfig::default(),
            Box::new(sink),
            Box::new(FixedAnimations {
                reload_secs: 1.0,
                equip_secs: 0.5,
            }),
        );
        let player = spawn_player(&mut world, false);
        assert_eq!(world.weapons.len(), 2);

        world.remove_character(player);
        assert!(world.weapons.is_empty());
        assert!(world.characters.is_empty());
        assert_eq!(world.scheduler.pending(), 0);
    }
}
