//! Servo channel definitions for the animatronic rig.
//!
//! The rig has a fixed, compiled-in set of actuator axes:
//!
//! - `EYE_LEFT_X` / `EYE_LEFT_Y`: left eye pan and tilt
//! - `EYE_RIGHT_X` / `EYE_RIGHT_Y`: right eye pan and tilt
//! - `HAND_RIGHT`: right hand wave
//! - `NECK_X` / `NECK_Y`: neck pan and tilt
//!
//! Every channel has two identities: the PWM pin it is wired to on the
//! servo board, and a dense index used to key fixed-size tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::ModelError;

/// A controllable actuator axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    EyeLeftX,
    EyeLeftY,
    EyeRightX,
    EyeRightY,
    HandRight,
    NeckX,
    NeckY,
}

impl Channel {
    /// Number of channels on the rig.
    pub const COUNT: usize = 7;

    /// All channels, in the fixed enumeration order used for centering.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::EyeLeftX,
        Channel::EyeLeftY,
        Channel::EyeRightX,
        Channel::EyeRightY,
        Channel::HandRight,
        Channel::NeckX,
        Channel::NeckY,
    ];

    /// Dense table index in `0..Channel::COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Channel::EyeLeftX => 0,
            Channel::EyeLeftY => 1,
            Channel::EyeRightX => 2,
            Channel::EyeRightY => 3,
            Channel::HandRight => 4,
            Channel::NeckX => 5,
            Channel::NeckY => 6,
        }
    }

    /// PWM output pin on the servo board.
    pub const fn pin(self) -> u8 {
        match self {
            Channel::EyeLeftX => 0,
            Channel::EyeLeftY => 1,
            Channel::EyeRightX => 2,
            Channel::EyeRightY => 3,
            Channel::HandRight => 4,
            Channel::NeckX => 8,
            Channel::NeckY => 9,
        }
    }

    /// Looks up a channel by its PWM pin.
    pub fn from_pin(pin: u8) -> Option<Channel> {
        Channel::ALL.into_iter().find(|ch| ch.pin() == pin)
    }

    /// Stable channel name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::EyeLeftX => "EYE_LEFT_X",
            Channel::EyeLeftY => "EYE_LEFT_Y",
            Channel::EyeRightX => "EYE_RIGHT_X",
            Channel::EyeRightY => "EYE_RIGHT_Y",
            Channel::HandRight => "HAND_RIGHT",
            Channel::NeckX => "NECK_X",
            Channel::NeckY => "NECK_Y",
        }
    }

    /// Returns true for the four eye axes.
    pub fn is_eye(&self) -> bool {
        matches!(
            self,
            Channel::EyeLeftX | Channel::EyeLeftY | Channel::EyeRightX | Channel::EyeRightY
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Channel::ALL
            .into_iter()
            .find(|ch| ch.as_str() == wanted)
            .ok_or_else(|| ModelError::UnknownChannel(s.to_string()))
    }
}

/// Fixed-size table with one slot per [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMap<T> {
    slots: [T; Channel::COUNT],
}

impl<T> ChannelMap<T> {
    /// Build a table by evaluating `f` for every channel.
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self {
            slots: Channel::ALL.map(&mut f),
        }
    }

    /// Iterate over `(channel, value)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().zip(self.slots.iter())
    }

    /// Apply `f` to every slot.
    pub fn map<U>(&self, mut f: impl FnMut(Channel, &T) -> U) -> ChannelMap<U> {
        ChannelMap::from_fn(|ch| f(ch, &self.slots[ch.index()]))
    }
}

impl<T: Copy> ChannelMap<T> {
    /// Table with the same value in every slot.
    pub fn splat(value: T) -> Self {
        Self {
            slots: [value; Channel::COUNT],
        }
    }
}

impl<T> Index<Channel> for ChannelMap<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        &self.slots[channel.index()]
    }
}

impl<T> IndexMut<Channel> for ChannelMap<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.slots[channel.index()]
    }
}
