//! Interrupt priority arbitration shared by every installed strip.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};

/// Number of distinct interrupt priority levels.
pub const PRIORITY_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Default = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

/// Order in which slots are tried when the requested one is taken.
/// DEFAULT first since it is the most compatible.
pub const FALLBACK_ORDER: [Priority; PRIORITY_SLOTS] =
    [Priority::Default, Priority::High, Priority::Medium, Priority::Low];

impl Priority {
    pub fn name(self) -> &'static str {
        match self {
            Priority::Default => "DEFAULT",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.level())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub priority: Priority,
    pub used: bool,
}

#[derive(Debug, Default)]
struct Slots {
    used: [bool; PRIORITY_SLOTS],
    active: u8,
}

impl Slots {
    fn first_free(&self, requested: Priority) -> Option<Priority> {
        if !self.used[requested as usize] {
            return Some(requested);
        }
        FALLBACK_ORDER.into_iter().find(|p| !self.used[*p as usize])
    }

    fn mark_used(&mut self, priority: Priority) -> bool {
        let slot = &mut self.used[priority as usize];
        if *slot {
            return false;
        }
        *slot = true;
        self.active += 1;
        true
    }

    fn mark_free(&mut self, priority: Priority) -> bool {
        let slot = &mut self.used[priority as usize];
        if !*slot {
            return false;
        }
        *slot = false;
        self.active = self.active.saturating_sub(1);
        true
    }
}

/// Process-wide table of used priority slots plus the active channel count.
///
/// Every call takes one short lock over a 4-entry table; none of them block
/// on hardware.
#[derive(Debug, Default)]
pub struct PriorityPool {
    slots: Mutex<Slots>,
}

impl PriorityPool {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                used: [false; PRIORITY_SLOTS],
                active: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // The table stays consistent even if a holder panicked.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_available(&self, priority: Priority) -> bool {
        !self.lock().used[priority as usize]
    }

    /// The requested slot if free, else the first free slot in
    /// [`FALLBACK_ORDER`], else `None`.
    pub fn find_best_available(&self, requested: Priority) -> Option<Priority> {
        self.lock().first_free(requested)
    }

    /// Mark a slot used. Returns false (and changes nothing) if it already was.
    pub fn mark_used(&self, priority: Priority) -> bool {
        let mut slots = self.lock();
        let changed = slots.mark_used(priority);
        if changed {
            debug!(
                "Priority {} marked as used. Active channels: {}",
                priority, slots.active
            );
        }
        changed
    }

    /// Mark a slot free. Returns false (and changes nothing) if it already was.
    pub fn mark_free(&self, priority: Priority) -> bool {
        let mut slots = self.lock();
        let changed = slots.mark_free(priority);
        if changed {
            debug!(
                "Priority {} marked as free. Active channels: {}",
                priority, slots.active
            );
        }
        changed
    }

    /// Find and claim a slot in one critical section.
    pub fn acquire(&self, requested: Priority) -> Option<Priority> {
        let mut slots = self.lock();
        let priority = slots.first_free(requested)?;
        slots.mark_used(priority);
        debug!(
            "Priority {} acquired (requested {}). Active channels: {}",
            priority, requested, slots.active
        );
        Some(priority)
    }

    pub fn active_channels(&self) -> u8 {
        self.lock().active
    }

    pub fn snapshot(&self) -> [SlotStatus; PRIORITY_SLOTS] {
        let slots = self.lock();
        FALLBACK_ORDER.map(|priority| SlotStatus {
            priority,
            used: slots.used[priority as usize],
        })
    }

    /// Forget every allocation. Only for recovery after a fault.
    pub fn reset(&self) {
        *self.lock() = Slots::default();
        debug!("Priority tracking reset. All priorities now available.");
    }
}
