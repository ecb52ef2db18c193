//! Ammo ledger - reserve and clip counts for one weapon instance
//!
//! Invariants held across every operation:
//! `0 <= clip <= min(clip_size, total)` and `total <= max_ammo`.
//! The total includes the rounds currently in the clip; the reserve is
//! `total - clip`.

/// Ammo counts for a single weapon
#[derive(Debug, Clone, Copy)]
pub struct AmmoLedger {
    total: u32,
    clip: u32,
    max_ammo: u32,
    clip_size: u32,
}

impl AmmoLedger {
    pub fn new(start_ammo: u32, max_ammo: u32, clip_size: u32) -> Self {
        let total = start_ammo.min(max_ammo);
        Self {
            total,
            clip: clip_size.min(total),
            max_ammo,
            clip_size,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn clip(&self) -> u32 {
        self.clip
    }

    pub fn clip_size(&self) -> u32 {
        self.clip_size
    }

    pub fn max_ammo(&self) -> u32 {
        self.max_ammo
    }

    /// Rounds available outside the clip
    pub fn reserve(&self) -> u32 {
        self.total - self.clip
    }

    pub fn clip_empty(&self) -> bool {
        self.clip == 0
    }

    /// A reload would accomplish something: clip not full and reserve available
    pub fn needs_reload(&self) -> bool {
        self.clip < self.clip_size && self.reserve() > 0
    }

    /// Spend one round from the clip. Returns false when the clip is empty.
    pub fn use_round(&mut self) -> bool {
        if self.clip == 0 {
            return false;
        }
        self.clip -= 1;
        self.total -= 1;
        true
    }

    /// Add ammo to the total, returning the surplus that did not fit
    pub fn give(&mut self, amount: u32) -> u32 {
        let missing = self.max_ammo - self.total;
        let added = amount.min(missing);
        self.total += added;
        amount - added
    }

    /// Move rounds from the reserve into the clip. Returns the count moved.
    pub fn refill_clip(&mut self) -> u32 {
        let delta = (self.clip_size - self.clip).min(self.reserve());
        self.clip += delta;
        delta
    }

    /// Overwrite the total count, clamping and refitting the clip
    pub fn set_total(&mut self, new_total: u32) {
        self.total = new_total.min(self.max_ammo);
        self.clip = self.clip_size.min(self.total);
    }
}
