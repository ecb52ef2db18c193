//! Generational arena for weapon instances
//!
//! Characters reference weapons by `WeaponId` (index + generation), never by
//! owning pointers, so character -> weapon -> character back-references stay
//! cycle-free. A released slot bumps its generation, which invalidates every
//! stale id to that slot.

use serde::{Deserialize, Serialize};

use super::weapon::WeaponInstance;

/// Stable handle to a weapon instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeaponId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    weapon: Option<WeaponInstance>,
}

/// Storage for all weapon instances in a world
#[derive(Default)]
pub struct WeaponArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl WeaponArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a weapon, returning its stable id
    pub fn insert(&mut self, weapon: WeaponInstance) -> WeaponId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.weapon = Some(weapon);
            WeaponId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                weapon: Some(weapon),
            });
            WeaponId {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: WeaponId) -> Option<&WeaponInstance> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.weapon.as_ref()
    }

    pub fn get_mut(&mut self, id: WeaponId) -> Option<&mut WeaponInstance> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.weapon.as_mut()
    }

    pub fn contains(&self, id: WeaponId) -> bool {
        self.get(id).is_some()
    }

    /// Release a weapon. The slot's generation is bumped so the id goes stale.
    pub fn remove(&mut self, id: WeaponId) -> Option<WeaponInstance> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.weapon.is_none() {
            return None;
        }
        let weapon = slot.weapon.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        weapon
    }

    /// Iterate live weapons with their ids
    pub fn iter(&self) -> impl Iterator<Item = (WeaponId, &WeaponInstance)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.weapon.as_ref().map(|w| {
                (
                    WeaponId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    w,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.weapon.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
