//! Character state: health, movement flags, inventory references
//!
//! The character owns no weapon values. It holds arena ids; the world
//! mediates every transition between the inventory and the weapon state
//! machines. Non-authority sides only ever see a replicated mirror of this
//! data.

use glam::Vec3;

use super::arena::WeaponId;
use super::PlayerId;

pub const CHARACTER_MAX_HEALTH: f32 = 100.0;
pub const CHARACTER_BODY_RADIUS: f32 = 40.0;
pub const CHARACTER_EYE_HEIGHT: f32 = 160.0;
pub const CHARACTER_HEAD_RADIUS: f32 = 15.0;

/// One simulated character on the authority
pub struct Character {
    pub id: PlayerId,
    pub display_name: String,
    /// Authority-controlled (bot/server pawn) vs owned by a remote client.
    /// Decides whether autonomous reloads run directly or are pushed to the
    /// owning client.
    pub locally_controlled: bool,

    pub position: Vec3,
    pub aim_yaw: f32,
    pub aim_pitch: f32,

    pub health: f32,
    pub died: bool,

    // Latched movement intents, replicated skip-owner
    pub wants_to_sprint: bool,
    pub is_targeting: bool,
    pub is_jumping: bool,

    /// Carried weapons in insertion order (equip-cycling order)
    pub inventory: Vec<WeaponId>,
    pub current_weapon: Option<WeaponId>,
    /// Valid only during an equip transition, sequences the visual swap
    pub previous_weapon: Option<WeaponId>,
}

impl Character {
    pub fn new(id: PlayerId, display_name: String, position: Vec3) -> Self {
        Self {
            id,
            display_name,
            locally_controlled: false,
            position,
            aim_yaw: 0.0,
            aim_pitch: 0.0,
            health: CHARACTER_MAX_HEALTH,
            died: false,
            wants_to_sprint: false,
            is_targeting: false,
            is_jumping: false,
            inventory: Vec::new(),
            current_weapon: None,
            previous_weapon: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.died && self.health > 0.0
    }

    /// Firing permission hook (non-shooting areas, dialogue, etc. would go here)
    pub fn can_fire(&self) -> bool {
        self.is_alive()
    }

    pub fn can_reload(&self) -> bool {
        self.is_alive()
    }

    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::new(0.0, 0.0, CHARACTER_EYE_HEIGHT)
    }

    /// World-space aim direction from yaw/pitch
    pub fn aim_direction(&self) -> Vec3 {
        let (sy, cy) = self.aim_yaw.sin_cos();
        let (sp, cp) = self.aim_pitch.sin_cos();
        Vec3::new(cy * cp, sy * cp, sp).normalize_or_zero()
    }

    /// Apply damage; returns true when this crossed into death
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.died = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn character() -> Character {
        Character::new(Uuid::new_v4(), "tester".into(), Vec3::ZERO)
    }

    #[test]
    fn damage_kills_exactly_once() {
        let mut c = character();
        assert!(!c.take_damage(60.0));
        assert!(c.is_alive());
        assert!(c.take_damage(60.0));
        assert!(c.died);
        // Further damage reports no new death
        assert!(!c.take_damage(10.0));
    }

    #[test]
    fn dead_character_cannot_fire_or_reload() {
        let mut c = character();
        c.take_damage(200.0);
        assert!(!c.can_fire());
        assert!(!c.can_reload());
    }

    #[test]
    fn aim_direction_is_unit_length() {
        let mut c = character();
        c.aim_yaw = 1.1;
        c.aim_pitch = -0.4;
        assert!((c.aim_direction().length() - 1.0).abs() < 1e-5);
    }
}
