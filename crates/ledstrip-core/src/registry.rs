//! Channel → strip mapping used when a pin is taken away from a strip.
//!
//! The pin ownership manager itself lives outside this crate. When it hands a
//! strip's pin to another peripheral it calls
//! [`InstanceRegistry::on_channel_reclaimed`] with the channel it is tearing
//! down, and the owning strip is invalidated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::hal::ChannelId;

/// Maximum number of concurrently registered strips.
pub const MAX_INSTANCES: usize = 8;

/// Shared "this strip still owns its hardware" flag.
///
/// Cleared exactly once, by whichever of `free()` or a reclamation callback
/// gets there first.
#[derive(Debug)]
pub struct Validity {
    valid: AtomicBool,
    pin: u8,
}

impl Validity {
    pub fn new(pin: u8) -> Self {
        Self {
            valid: AtomicBool::new(true),
            pin,
        }
    }

    /// A flag that starts out cleared, for strips not yet installed.
    pub fn cleared(pin: u8) -> Self {
        Self {
            valid: AtomicBool::new(false),
            pin,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Clear the flag. Returns true only for the caller that cleared it.
    pub fn invalidate(&self) -> bool {
        self.valid
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug)]
struct Entry {
    channel: ChannelId,
    validity: Arc<Validity>,
}

#[derive(Debug, Default)]
pub struct InstanceRegistry {
    slots: Mutex<[Option<Entry>; MAX_INSTANCES]>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, [Option<Entry>; MAX_INSTANCES]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, channel: ChannelId, validity: Arc<Validity>) -> Result<()> {
        let mut slots = self.lock();
        let Some(slot) = slots.iter_mut().find(|s| s.is_none()) else {
            debug!("Instance registry full ({MAX_INSTANCES} entries)");
            return Err(Error::ResourceExhausted);
        };
        *slot = Some(Entry { channel, validity });
        Ok(())
    }

    /// Remove the mapping for `channel`. Returns false if there was none.
    pub fn unregister(&self, channel: ChannelId) -> bool {
        let mut slots = self.lock();
        match slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|e| e.channel == channel))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Like [`unregister`](Self::unregister), but only while the entry still
    /// belongs to `validity`. After a reclamation the channel may already be
    /// registered to another strip.
    pub fn unregister_owned(&self, channel: ChannelId, validity: &Arc<Validity>) -> bool {
        let mut slots = self.lock();
        match slots.iter_mut().find(|s| {
            s.as_ref()
                .is_some_and(|e| e.channel == channel && Arc::ptr_eq(&e.validity, validity))
        }) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn find(&self, channel: ChannelId) -> Option<Arc<Validity>> {
        self.lock()
            .iter()
            .flatten()
            .find(|e| e.channel == channel)
            .map(|e| Arc::clone(&e.validity))
    }

    pub fn active_count(&self) -> usize {
        self.lock().iter().flatten().count()
    }

    /// Called when `channel`'s pin is reassigned elsewhere. Invalidates the
    /// owning strip and drops the mapping; the channel hardware is left to
    /// the new owner. Returns false for channels no strip registered, which
    /// the caller may tear down freely.
    pub fn on_channel_reclaimed(&self, channel: ChannelId) -> bool {
        let entry = {
            let mut slots = self.lock();
            slots
                .iter_mut()
                .find(|s| s.as_ref().is_some_and(|e| e.channel == channel))
                .and_then(Option::take)
        };

        let Some(entry) = entry else {
            debug!("Channel {channel} reclaimed, no strip registered for it");
            return false;
        };

        if entry.validity.invalidate() {
            warn!(
                "GPIO {} forcibly reassigned - strip on channel {} invalidated",
                entry.validity.pin(),
                channel
            );
        } else {
            debug!("Channel {channel} reclaimed after its strip was already freed");
        }
        true
    }
}
