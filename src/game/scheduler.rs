//! Single-threaded timer scheduler for weapon state machines
//!
//! Every asynchronous weapon transition (fire cadence, clip refill, reload
//! visuals, equip completion) is a scheduled task keyed to its owning weapon.
//! Teardown cancels by owner in one pass, so a cancelled timer never fires -
//! callbacks do not need to defend against destroyed weapons.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::arena::WeaponId;

/// Handle to one scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Work performed when a timer elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Fire cadence tick (repeating)
    FireShot(WeaponId),
    /// Credit the clip near the end of the reload animation
    RefillClip(WeaponId),
    /// End of the reload animation
    StopReloadVisuals(WeaponId),
    /// Equip animation completed
    EquipFinished(WeaponId),
    /// Unequip animation completed (re-attach to storage slot)
    UnequipFinished(WeaponId),
}

impl TimerTask {
    /// The weapon this task belongs to, for bulk cancellation
    pub fn owner(&self) -> WeaponId {
        match *self {
            TimerTask::FireShot(w)
            | TimerTask::RefillClip(w)
            | TimerTask::StopReloadVisuals(w)
            | TimerTask::EquipFinished(w)
            | TimerTask::UnequipFinished(w) => w,
        }
    }
}

/// Seconds to whole microseconds. Deadlines are kept as integers so a
/// re-armed period accumulates exactly instead of drifting past the
/// multiples of the period the way widened f32 durations do.
fn micros(secs: f64) -> u64 {
    (secs.max(0.0) * 1_000_000.0).round() as u64
}

struct Entry {
    /// Deadline in whole microseconds
    due: u64,
    seq: u64,
    handle: TimerHandle,
    task: TimerTask,
    /// Re-arm interval for repeating timers, in whole microseconds
    period: Option<u64>,
}

// Min-heap by (due, seq): earliest deadline first, FIFO on ties so a refill
// scheduled before a stop-visuals timer at the same instant still wins.
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Deadline-ordered task queue driven by the world clock
#[derive(Default)]
pub struct Scheduler {
    entries: BinaryHeap<Entry>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot task `delay` seconds from `now`
    pub fn schedule(&mut self, now: f64, delay: f32, task: TimerTask) -> TimerHandle {
        self.push(micros(now) + micros(delay as f64), task, None)
    }

    /// Schedule a repeating task with an explicit first delay
    pub fn schedule_repeating(
        &mut self,
        now: f64,
        first_delay: f32,
        period: f32,
        task: TimerTask,
    ) -> TimerHandle {
        self.push(
            micros(now) + micros(first_delay as f64),
            task,
            Some(micros(period as f64)),
        )
    }

    fn push(&mut self, due: u64, task: TimerTask, period: Option<u64>) -> TimerHandle {
        let seq = self.next_id;
        self.next_id += 1;
        let handle = TimerHandle(seq);
        self.entries.push(Entry {
            due,
            seq,
            handle,
            task,
            period,
        });
        handle
    }

    /// Cancel a single task
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.entries.retain(|e| e.handle != handle);
    }

    /// Cancel every outstanding task keyed to `weapon`
    pub fn cancel_owner(&mut self, weapon: WeaponId) {
        self.entries.retain(|e| e.task.owner() != weapon);
    }

    /// Pop the next task due at or before `now`, re-arming repeating tasks
    pub fn pop_due(&mut self, now: f64) -> Option<TimerTask> {
        let now = micros(now);
        let head = self.entries.peek()?;
        if head.due > now {
            return None;
        }
        let entry = self.entries.pop()?;
        if let Some(period) = entry.period {
            let seq = self.next_id;
            self.next_id += 1;
            self.entries.push(Entry {
                due: entry.due + period,
                seq,
                handle: entry.handle,
                task: entry.task,
                period: entry.period,
            });
        }
        Some(entry.task)
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Outstanding task count for one weapon
    pub fn pending_for(&self, weapon: WeaponId) -> usize {
        self.entries
            .iter()
            .filter(|e| e.task.owner() == weapon)
            .count()
    }
}
