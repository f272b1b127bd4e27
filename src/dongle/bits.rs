// Copyright 2026 FlooCast Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed views over the protocol's bitfield bytes.

/// Source state values reported via `ST`.
pub mod source_state {
    pub const IDLE: u8 = 1;
    pub const STREAMING_START: u8 = 4;
    pub const STREAMING: u8 = 6;
}

/// Audio operating mode reported via `AM`.
///
/// Bits 0..=1 select the mode, bit 7 reports whether the hardware has an
/// analog aux input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMode(pub u8);

pub const AUDIO_MODE_HIGH_QUALITY: u8 = 0;
pub const AUDIO_MODE_GAMING: u8 = 1;
pub const AUDIO_MODE_BROADCAST: u8 = 2;

impl AudioMode {
    const MODE_MASK: u8 = 0x03;
    const ANALOG_INPUT: u8 = 0x80;

    pub fn raw(&self) -> u8 {
        self.0
    }

    pub fn mode(&self) -> u8 {
        self.0 & Self::MODE_MASK
    }

    pub fn has_analog_input(&self) -> bool {
        self.0 & Self::ANALOG_INPUT != 0
    }

    pub fn with_mode(self, mode: u8) -> Self {
        Self((self.0 & !Self::MODE_MASK) | (mode & Self::MODE_MASK))
    }
}

/// Broadcast mode bitfield reported via `BM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastMode(pub u8);

impl BroadcastMode {
    const ENCRYPT: u8 = 0x01;
    const PUBLIC: u8 = 0x02;
    const HIGH_QUALITY: u8 = 0x04;
    const STOP_ON_IDLE: u8 = 0x08;
    const LATENCY_MASK: u8 = 0x30;
    const LATENCY_SHIFT: u8 = 4;
    const ALL_MASK: u8 = 0x3F;

    pub fn raw(&self) -> u8 {
        self.0
    }

    pub fn encrypt(&self) -> bool {
        self.0 & Self::ENCRYPT != 0
    }

    pub fn public(&self) -> bool {
        self.0 & Self::PUBLIC != 0
    }

    pub fn high_quality(&self) -> bool {
        self.0 & Self::HIGH_QUALITY != 0
    }

    pub fn stop_on_idle(&self) -> bool {
        self.0 & Self::STOP_ON_IDLE != 0
    }

    /// Latency class: 0 disabled, 1 lowest, 2 lower, 3 default.
    pub fn latency(&self) -> u8 {
        (self.0 & Self::LATENCY_MASK) >> Self::LATENCY_SHIFT
    }

    pub fn with_encrypt(self, on: bool) -> Self {
        self.with_bit(Self::ENCRYPT, on)
    }

    pub fn with_public(self, on: bool) -> Self {
        self.with_bit(Self::PUBLIC, on)
    }

    pub fn with_high_quality(self, on: bool) -> Self {
        self.with_bit(Self::HIGH_QUALITY, on)
    }

    pub fn with_stop_on_idle(self, on: bool) -> Self {
        self.with_bit(Self::STOP_ON_IDLE, on)
    }

    pub fn with_latency(self, latency: u8) -> Self {
        Self(
            (self.0 & !Self::LATENCY_MASK)
                | ((latency << Self::LATENCY_SHIFT) & Self::LATENCY_MASK),
        )
        .masked()
    }

    fn with_bit(self, bit: u8, on: bool) -> Self {
        if on {
            Self(self.0 | bit).masked()
        } else {
            Self(self.0 & !bit).masked()
        }
    }

    fn masked(self) -> Self {
        Self(self.0 & Self::ALL_MASK)
    }
}

/// Feature flags bitfield reported via `FT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags(pub u8);

impl FeatureFlags {
    const LED: u8 = 0x01;
    const APTX_LOSSLESS: u8 = 0x02;
    const GATT_CLIENT: u8 = 0x04;
    const AUDIO_SOURCE: u8 = 0x08;

    pub fn raw(&self) -> u8 {
        self.0
    }

    pub fn led(&self) -> bool {
        self.0 & Self::LED != 0
    }

    pub fn aptx_lossless(&self) -> bool {
        self.0 & Self::APTX_LOSSLESS != 0
    }

    pub fn gatt_client(&self) -> bool {
        self.0 & Self::GATT_CLIENT != 0
    }

    pub fn audio_source(&self) -> bool {
        self.0 & Self::AUDIO_SOURCE != 0
    }

    pub fn with_led(self, on: bool) -> Self {
        self.with_bit(Self::LED, on)
    }

    pub fn with_aptx_lossless(self, on: bool) -> Self {
        self.with_bit(Self::APTX_LOSSLESS, on)
    }

    pub fn with_gatt_client(self, on: bool) -> Self {
        self.with_bit(Self::GATT_CLIENT, on)
    }

    pub fn with_audio_source(self, on: bool) -> Self {
        self.with_bit(Self::AUDIO_SOURCE, on)
    }

    fn with_bit(self, bit: u8, on: bool) -> Self {
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_mode_fields() {
        let mode = AudioMode(0x82);
        assert_eq!(mode.mode(), AUDIO_MODE_BROADCAST);
        assert!(mode.has_analog_input());

        let switched = mode.with_mode(AUDIO_MODE_GAMING);
        assert_eq!(switched.mode(), AUDIO_MODE_GAMING);
        assert!(switched.has_analog_input());
    }

    #[test]
    fn broadcast_mode_bit_isolation() {
        let mode = BroadcastMode(0x00).with_public(true);
        assert_eq!(mode.raw(), 0x02);
        assert!(mode.public());
        assert!(!mode.encrypt());

        let mode = mode.with_encrypt(true).with_public(false);
        assert_eq!(mode.raw(), 0x01);
    }

    #[test]
    fn broadcast_latency_leaves_flags_alone() {
        let mode = BroadcastMode(0x0F).with_latency(3);
        assert_eq!(mode.raw(), 0x3F);
        assert_eq!(mode.latency(), 3);
        assert!(mode.stop_on_idle());

        let mode = mode.with_latency(1);
        assert_eq!(mode.latency(), 1);
        assert_eq!(mode.raw() & 0x0F, 0x0F);
    }

    #[test]
    fn broadcast_mode_discards_reserved_bits() {
        let mode = BroadcastMode(0xFF).with_encrypt(true);
        assert_eq!(mode.raw() & 0xC0, 0);
    }

    #[test]
    fn feature_withers_touch_one_bit() {
        let flags = FeatureFlags(0x0F).with_led(false);
        assert_eq!(flags.raw(), 0x0E);
        assert!(flags.aptx_lossless());
        assert!(flags.gatt_client());
        assert!(flags.audio_source());

        let flags = FeatureFlags(0x00).with_audio_source(true);
        assert_eq!(flags.raw(), 0x08);
    }
}
