//! Authoritative gameplay simulation
//!
//! The world and everything under it is single-threaded; a session task owns
//! one world and feeds it client intents and clock ticks. Replication turns
//! world changes into versioned field updates for connected observers.

pub mod ammo;
pub mod arena;
pub mod character;
pub mod effects;
pub mod hitscan;
pub mod replica;
pub mod replication;
pub mod scheduler;
pub mod session;
pub mod weapon;
pub mod world;

use uuid::Uuid;

/// Stable identifier for a connected player and their character
pub type PlayerId = Uuid;
