//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::arena::WeaponId;
use crate::game::hitscan::HitRecord;
use crate::game::weapon::{StorageSlot, WeaponKind};

/// Messages sent from client to server: intents asking the authority to act.
/// Every intent passes a validation gate on the authority and is silently
/// dropped when rejected; the client must not assume success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the session
    Join {
        display_name: Option<String>,
    },

    /// Update the aim direction used for shot resolution
    Aim {
        yaw: f32,
        pitch: f32,
    },

    SetSprinting {
        active: bool,
    },
    SetTargeting {
        active: bool,
    },
    SetJumping {
        active: bool,
    },

    StartFire,
    StopFire,
    StartReload,
    StopReload,

    /// Equip a carried weapon
    EquipWeapon {
        weapon: WeaponId,
    },
    /// Hotkey: equip whatever is carried in the given storage slot
    EquipSlot {
        slot: StorageSlot,
    },
    NextWeapon,
    PrevWeapon,
    /// Drop the current weapon as a pickup
    DropWeapon,
    /// Use the object in view (weapon pickups)
    UseObject,

    /// Ping for latency measurement
    Ping {
        t: u64,
    },

    /// Leave the session
    Leave,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        player_id: Uuid,
        server_time: u64,
    },

    PlayerJoined {
        player: PlayerInfo,
    },

    PlayerLeft {
        player_id: Uuid,
        reason: String,
    },

    /// One replicated field changed on the authority
    Update {
        update: FieldUpdate,
    },

    /// Authority push to a single owning client: begin reloading now.
    /// A one-time action trigger, not a state mirror.
    NotifyStartReload {
        weapon: WeaponId,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        t: u64,
    },
}

/// Player info for join announcements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: Uuid,
    pub display_name: String,
}

/// Replication condition declared per field; the wire contract that
/// preserves bandwidth/visibility semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Authority -> every connected client
    Always,
    /// Authority -> everyone except the owning client
    SkipOwner,
    /// Authority -> the owning client only
    OwnerOnly,
}

/// One versioned field change. Observers apply an update only when its
/// version exceeds the last seen version for that field; older or duplicated
/// deliveries are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldUpdate {
    /// Weapon identity and owning character (also announces new weapons)
    WeaponOwner {
        weapon: WeaponId,
        version: u32,
        owner: Option<Uuid>,
        kind: WeaponKind,
        slot: StorageSlot,
    },

    /// Reserve + clip counts, visible to the owner's UI only
    AmmoCounts {
        weapon: WeaponId,
        version: u32,
        total: u32,
        clip: u32,
    },

    /// Reload in progress; observers start/stop local reload visuals
    PendingReload {
        weapon: WeaponId,
        version: u32,
        pending: bool,
    },

    /// Fire-activity change detector; > 0 starts observer fire visuals,
    /// == 0 stops them
    BurstCounter {
        weapon: WeaponId,
        version: u32,
        counter: u32,
    },

    /// Most recent shot's replay data
    HitRecord {
        weapon: WeaponId,
        version: u32,
        record: HitRecord,
    },

    /// Weapon destroyed; observers drop their mirror
    WeaponRemoved {
        weapon: WeaponId,
        version: u32,
    },

    /// Equipped weapon changed; `previous` carries the outgoing weapon so
    /// observers can sequence the visual swap
    CurrentWeapon {
        character: Uuid,
        version: u32,
        current: Option<WeaponId>,
        previous: Option<WeaponId>,
    },

    /// Carried-weapon sequence mirror
    Inventory {
        character: Uuid,
        version: u32,
        weapons: Vec<WeaponId>,
    },

    /// Terminal flag; observers run the ragdoll/detach sequence
    Died {
        character: Uuid,
        version: u32,
        died: bool,
    },

    Sprinting {
        character: Uuid,
        version: u32,
        active: bool,
    },
    Targeting {
        character: Uuid,
        version: u32,
        active: bool,
    },
    Jumping {
        character: Uuid,
        version: u32,
        active: bool,
    },
}

impl FieldUpdate {
    /// The replication condition declared for this field
    pub fn condition(&self) -> Condition {
        match self {
            FieldUpdate::WeaponOwner { .. } => Condition::Always,
            FieldUpdate::AmmoCounts { .. } => Condition::OwnerOnly,
            FieldUpdate::PendingReload { .. } => Condition::SkipOwner,
            FieldUpdate::BurstCounter { .. } => Condition::SkipOwner,
            FieldUpdate::HitRecord { .. } => Condition::SkipOwner,
            FieldUpdate::WeaponRemoved { .. } => Condition::Always,
            FieldUpdate::CurrentWeapon { .. } => Condition::Always,
            FieldUpdate::Inventory { .. } => Condition::Always,
            FieldUpdate::Died { .. } => Condition::Always,
            FieldUpdate::Sprinting { .. } => Condition::SkipOwner,
            FieldUpdate::Targeting { .. } => Condition::SkipOwner,
            FieldUpdate::Jumping { .. } => Condition::SkipOwner,
        }
    }
}
