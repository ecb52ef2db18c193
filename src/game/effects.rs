//! Collaborator interfaces for cosmetic side effects
//!
//! Everything behind these traits is fire-and-forget: nothing here feeds back
//! into the state machines. The default implementations log through tracing;
//! a real client would drive particles, sounds and mesh attachment.

use glam::Vec3;
use tracing::debug;

use super::arena::WeaponId;
use super::hitscan::SurfaceKind;
use super::weapon::StorageSlot;
use super::PlayerId;

/// Weapon sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponSound {
    Fire,
    Reload,
    Equip,
}

/// Animation montages the state machines can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Montage {
    Fire,
    Reload,
    Equip,
}

/// Visual/audio side-effect sink
pub trait EffectsSink: Send {
    /// Muzzle flash + tracer toward `trace_end`
    fn weapon_fired(&mut self, weapon: WeaponId, trace_end: Vec3);
    /// Impact particles at the struck point
    fn impact(&mut self, weapon: WeaponId, surface: SurfaceKind, point: Vec3);
    fn weapon_sound(&mut self, weapon: WeaponId, sound: WeaponSound);
    /// Looping fire visuals on observers (true = start, false = stop)
    fn fire_simulation(&mut self, weapon: WeaponId, active: bool);
    /// Reload visuals on observers (true = start, false = stop)
    fn reload_simulation(&mut self, weapon: WeaponId, active: bool);
    fn attach_weapon(&mut self, weapon: WeaponId, character: PlayerId, slot: StorageSlot);
    fn detach_weapon(&mut self, weapon: WeaponId);
    /// Terminal death sequence for a character
    fn ragdoll(&mut self, character: PlayerId);
}

/// Animation playback collaborator.
///
/// `play` reports the montage duration; zero or negative means no animation
/// is available and the caller falls back to its configured constant.
pub trait AnimationDriver: Send {
    fn play(&mut self, character: PlayerId, montage: Montage) -> f32;
    fn stop(&mut self, character: PlayerId, montage: Montage);
}

/// Tracing passthrough sink for headless servers
pub struct LogEffects;

impl EffectsSink for LogEffects {
    fn weapon_fired(&mut self, weapon: WeaponId, trace_end: Vec3) {
        debug!(?weapon, ?trace_end, "weapon fired");
    }

    fn impact(&mut self, weapon: WeaponId, surface: SurfaceKind, point: Vec3) {
        debug!(?weapon, ?surface, ?point, "impact");
    }

    fn weapon_sound(&mut self, weapon: WeaponId, sound: WeaponSound) {
        debug!(?weapon, ?sound, "weapon sound");
    }

    fn fire_simulation(&mut self, weapon: WeaponId, active: bool) {
        debug!(?weapon, active, "fire simulation");
    }

    fn reload_simulation(&mut self, weapon: WeaponId, active: bool) {
        debug!(?weapon, active, "reload simulation");
    }

    fn attach_weapon(&mut self, weapon: WeaponId, character: PlayerId, slot: StorageSlot) {
        debug!(?weapon, %character, ?slot, "attach weapon");
    }

    fn detach_weapon(&mut self, weapon: WeaponId) {
        debug!(?weapon, "detach weapon");
    }

    fn ragdoll(&mut self, character: PlayerId) {
        debug!(%character, "ragdoll");
    }
}

/// No montages configured: every play reports zero duration, which pushes
/// callers onto their fallback durations.
pub struct NoAnimations;

impl AnimationDriver for NoAnimations {
    fn play(&mut self, _character: PlayerId, _montage: Montage) -> f32 {
        0.0
    }

    fn stop(&mut self, _character: PlayerId, _montage: Montage) {}
}

/// Test double that records every effect call in order.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEvent {
    Fired(WeaponId),
    Impact(WeaponId, SurfaceKind),
    Sound(WeaponId, WeaponSound),
    FireSim(WeaponId, bool),
    ReloadSim(WeaponId, bool),
    Attach(WeaponId, StorageSlot),
    Detach(WeaponId),
    Ragdoll(PlayerId),
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingEffects {
    pub events: std::sync::Arc<std::sync::Mutex<Vec<EffectEvent>>>,
}

#[cfg(test)]
impl RecordingEffects {
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<EffectEvent>>>) {
        let sink = Self::default();
        let events = sink.events.clone();
        (sink, events)
    }
}

#[cfg(test)]
impl EffectsSink for RecordingEffects {
    fn weapon_fired(&mut self, weapon: WeaponId, _trace_end: Vec3) {
        self.events.lock().unwrap().push(EffectEvent::Fired(weapon));
    }

    fn impact(&mut self, weapon: WeaponId, surface: SurfaceKind, _point: Vec3) {
        self.events
            .lock()
            .unwrap()
            .push(EffectEvent::Impact(weapon, surface));
    }

    fn weapon_sound(&mut self, weapon: WeaponId, sound: WeaponSound) {
        self.events
            .lock()
            .unwrap()
            .push(EffectEvent::Sound(weapon, sound));
    }

    fn fire_simulation(&mut self, weapon: WeaponId, active: bool) {
        self.events
            .lock()
            .unwrap()
            .push(EffectEvent::FireSim(weapon, active));
    }

    fn reload_simulation(&mut self, weapon: WeaponId, active: bool) {
        self.events
            .lock()
            .unwrap()
            .push(EffectEvent::ReloadSim(weapon, active));
    }

    fn attach_weapon(&mut self, weapon: WeaponId, _character: PlayerId, slot: StorageSlot) {
        self.events
            .lock()
            .unwrap()
            .push(EffectEvent::Attach(weapon, slot));
    }

    fn detach_weapon(&mut self, weapon: WeaponId) {
        self.events.lock().unwrap().push(EffectEvent::Detach(weapon));
    }

    fn ragdoll(&mut self, character: PlayerId) {
        self.events
            .lock()
            .unwrap()
            .push(EffectEvent::Ragdoll(character));
    }
}

/// Test animation driver with fixed montage durations.
#[cfg(test)]
pub struct FixedAnimations {
    pub reload_secs: f32,
    pub equip_secs: f32,
}

#[cfg(test)]
impl AnimationDriver for FixedAnimations {
    fn play(&mut self, _character: PlayerId, montage: Montage) -> f32 {
        match montage {
            Montage::Reload => self.reload_secs,
            Montage::Equip => self.equip_secs,
            Montage::Fire => 0.0,
        }
    }

    fn stop(&mut self, _character: PlayerId, _montage: Montage) {}
}
