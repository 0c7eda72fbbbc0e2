//! Lock-free per-channel angle table.
//!
//! Each slot stores the bit pattern of an `f64` in an `AtomicU64`, so a
//! reader racing a writer sees either the old or the new angle, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};

use wavebot_models::{Channel, ChannelMap};

#[derive(Debug)]
pub struct PositionTable {
    slots: ChannelMap<AtomicU64>,
}

impl PositionTable {
    pub fn new(initial: &ChannelMap<f64>) -> Self {
        Self {
            slots: ChannelMap::from_fn(|ch| AtomicU64::new(initial[ch].to_bits())),
        }
    }

    #[inline]
    pub fn get(&self, channel: Channel) -> f64 {
        f64::from_bits(self.slots[channel].load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, channel: Channel, angle: f64) {
        self.slots[channel].store(angle.to_bits(), Ordering::Release);
    }

    /// Copy of every slot. Slots are read one at a time.
    pub fn snapshot(&self) -> ChannelMap<f64> {
        ChannelMap::from_fn(|ch| self.get(ch))
    }
}
