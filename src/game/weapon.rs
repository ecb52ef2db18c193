//! Weapon specs and the weapon state machine's data
//!
//! State is never assigned ad hoc: every flag mutation is followed by
//! `determine_state`, the single derivation function, so the state is always
//! a pure function of the flags plus the ammo/ability predicates. The world
//! reacts to the returned transition (starting or stopping the fire cadence
//! timer); this module holds no timers itself.

use serde::{Deserialize, Serialize};

use super::ammo::AmmoLedger;
use super::hitscan::HitRecord;
use super::scheduler::TimerHandle;
use super::PlayerId;

/// Weapon archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    Rifle,
    Pistol,
}

/// Storage slot categories; a character carries at most one weapon per slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageSlot {
    /// Currently wielded
    Hands,
    Primary,
    Secondary,
}

/// Weapon phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    Idle,
    Firing,
    Equipping,
    Reloading,
}

/// Static configuration per weapon archetype
#[derive(Debug, Clone, Copy)]
pub struct WeaponSpec {
    pub kind: WeaponKind,
    pub slot: StorageSlot,
    pub base_damage: f32,
    /// Spread cone half-angle in degrees
    pub spread_degrees: f32,
    pub rounds_per_minute: u32,
    pub start_ammo: u32,
    pub max_ammo: u32,
    pub clip_size: u32,
    /// Reload duration when no reload montage is available
    pub no_anim_reload_secs: f32,
    /// Equip duration when no equip montage is available
    pub no_anim_equip_secs: f32,
    pub max_range: f32,
}

impl WeaponSpec {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Rifle => Self {
                kind,
                slot: StorageSlot::Primary,
                base_damage: 20.0,
                spread_degrees: 2.0,
                rounds_per_minute: 700,
                start_ammo: 999,
                max_ammo: 999,
                clip_size: 30,
                no_anim_reload_secs: 1.5,
                no_anim_equip_secs: 0.5,
                max_range: 10_000.0,
            },
            WeaponKind::Pistol => Self {
                kind,
                slot: StorageSlot::Secondary,
                base_damage: 16.0,
                spread_degrees: 1.2,
                rounds_per_minute: 180,
                start_ammo: 120,
                max_ammo: 120,
                clip_size: 12,
                no_anim_reload_secs: 1.2,
                no_anim_equip_secs: 0.5,
                max_range: 8_000.0,
            },
        }
    }

    /// Fire cadence period in seconds
    pub fn time_between_shots(&self) -> f32 {
        60.0 / self.rounds_per_minute as f32
    }
}

/// One weapon instance: spec, ammo ledger, state machine flags and the
/// replicated change-detector fields.
pub struct WeaponInstance {
    pub spec: WeaponSpec,
    pub ammo: AmmoLedger,
    state: WeaponState,

    /// Latched fire intent, meaningful on the authority
    pub wants_to_fire: bool,
    pub pending_equip: bool,
    pub pending_reload: bool,
    pub is_equipped: bool,

    /// Authority-side time of the last shot, keeps cadence across suspensions
    pub last_fire_time: f64,

    /// Strictly increasing while firing, zero otherwise; replication change
    /// detector for observer fire visuals, not a shot count
    pub burst_counter: u32,
    /// Most recent shot's replay record, overwritten per shot
    pub last_hit: Option<HitRecord>,

    /// Owning character, an index into the character table (never a strong ref)
    pub owner: Option<PlayerId>,

    // Outstanding timer handles, cancelled on teardown
    pub cadence_timer: Option<TimerHandle>,
    pub refill_timer: Option<TimerHandle>,
    pub stop_reload_timer: Option<TimerHandle>,
    pub equip_timer: Option<TimerHandle>,
}

impl WeaponInstance {
    pub fn new(spec: WeaponSpec) -> Self {
        Self {
            spec,
            ammo: AmmoLedger::new(spec.start_ammo, spec.max_ammo, spec.clip_size),
            state: WeaponState::Idle,
            wants_to_fire: false,
            pending_equip: false,
            pending_reload: false,
            is_equipped: false,
            last_fire_time: 0.0,
            burst_counter: 0,
            last_hit: None,
            owner: None,
            cadence_timer: None,
            refill_timer: None,
            stop_reload_timer: None,
            equip_timer: None,
        }
    }

    pub fn state(&self) -> WeaponState {
        self.state
    }

    pub fn is_equipped(&self) -> bool {
        self.is_equipped
    }

    /// Equipped or mid-equip
    pub fn is_attached_to_character(&self) -> bool {
        self.is_equipped || self.pending_equip
    }

    /// Firing is possible: live owner and rounds in the clip
    pub fn can_fire(&self, owner_alive: bool) -> bool {
        owner_alive && !self.ammo.clip_empty()
    }

    /// Reloading is possible: live owner, ammo headroom, and a state that
    /// permits interruption (Idle or Firing)
    pub fn can_reload(&self, owner_alive: bool) -> bool {
        let state_ok = matches!(self.state, WeaponState::Idle | WeaponState::Firing);
        owner_alive && self.ammo.needs_reload() && state_ok
    }

    /// Re-derive the state from the flag set. Returns (previous, new) so the
    /// caller can react to entering or leaving Firing.
    pub fn determine_state(&mut self, owner_alive: bool) -> (WeaponState, WeaponState) {
        let prev = self.state;

        let new = if self.is_equipped {
            if self.pending_reload {
                if self.can_reload(owner_alive) {
                    WeaponState::Reloading
                } else {
                    // Reload pending but not currently permitted: hold state
                    prev
                }
            } else if self.wants_to_fire && self.can_fire(owner_alive) {
                WeaponState::Firing
            } else {
                WeaponState::Idle
            }
        } else if self.pending_equip {
            WeaponState::Equipping
        } else {
            WeaponState::Idle
        };

        self.state = new;
        (prev, new)
    }
}
