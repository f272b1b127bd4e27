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

//! Consumer-facing indication boundary.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::dongle::{AudioMode, BroadcastMode, CodecStatus, ConnectionErrorKind};

/// Receives device-state indications from the state machine.
///
/// Calls arrive on whichever thread drove the state machine (usually the
/// serial polling thread or a timer thread). Implementations that need a
/// particular execution context should use [`IndicationSender`] and drain
/// the channel from that context instead of implementing this directly.
pub trait FlooDelegate: Send + Sync {
    /// Device came (or went); `version` is the firmware version string when
    /// known.
    fn device_detected(&self, present: bool, port: Option<&str>, version: Option<&str>);
    fn audio_mode_ind(&self, mode: AudioMode);
    fn source_state_ind(&self, state: u8);
    fn le_audio_state_ind(&self, state: u8);
    fn prefer_lea_ind(&self, prefer: bool);
    fn broadcast_mode_ind(&self, mode: BroadcastMode);
    fn broadcast_name_ind(&self, name: &str);
    fn paired_devices_ind(&self, names: &[String]);
    fn codec_in_use_ind(&self, status: &CodecStatus);
    fn led_enabled_ind(&self, on: bool);
    fn aptx_lossless_enabled_ind(&self, on: bool);
    fn gatt_client_enabled_ind(&self, on: bool);
    fn audio_source_enabled_ind(&self, on: bool);
    fn connection_error_ind(&self, kind: ConnectionErrorKind);
    /// Auto-reconnect exhausted its retry budget.
    fn reconnect_gave_up(&self) {}
}

/// An indication as a value, for channel-based consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum Indication {
    DeviceDetected {
        present: bool,
        port: Option<String>,
        version: Option<String>,
    },
    AudioMode(AudioMode),
    SourceState(u8),
    LeAudioState(u8),
    PreferLea(bool),
    BroadcastMode(BroadcastMode),
    BroadcastName(String),
    PairedDevices(Vec<String>),
    CodecInUse(CodecStatus),
    LedEnabled(bool),
    AptxLosslessEnabled(bool),
    GattClientEnabled(bool),
    AudioSourceEnabled(bool),
    ConnectionError(ConnectionErrorKind),
    ReconnectGaveUp,
}

/// Channel-backed [`FlooDelegate`] for consumers that marshal indications
/// onto their own thread.
pub struct IndicationSender {
    tx: Sender<Indication>,
}

impl IndicationSender {
    /// Create the sender half and the receiver the consumer drains.
    pub fn channel() -> (Self, Receiver<Indication>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    fn push(&self, ind: Indication) {
        // A hung-up consumer just discards indications.
        let _ = self.tx.send(ind);
    }
}

impl FlooDelegate for IndicationSender {
    fn device_detected(&self, present: bool, port: Option<&str>, version: Option<&str>) {
        self.push(Indication::DeviceDetected {
            present,
            port: port.map(String::from),
            version: version.map(String::from),
        });
    }

    fn audio_mode_ind(&self, mode: AudioMode) {
        self.push(Indication::AudioMode(mode));
    }

    fn source_state_ind(&self, state: u8) {
        self.push(Indication::SourceState(state));
    }

    fn le_audio_state_ind(&self, state: u8) {
        self.push(Indication::LeAudioState(state));
    }

    fn prefer_lea_ind(&self, prefer: bool) {
        self.push(Indication::PreferLea(prefer));
    }

    fn broadcast_mode_ind(&self, mode: BroadcastMode) {
        self.push(Indication::BroadcastMode(mode));
    }

    fn broadcast_name_ind(&self, name: &str) {
        self.push(Indication::BroadcastName(name.to_string()));
    }

    fn paired_devices_ind(&self, names: &[String]) {
        self.push(Indication::PairedDevices(names.to_vec()));
    }

    fn codec_in_use_ind(&self, status: &CodecStatus) {
        self.push(Indication::CodecInUse(*status));
    }

    fn led_enabled_ind(&self, on: bool) {
        self.push(Indication::LedEnabled(on));
    }

    fn aptx_lossless_enabled_ind(&self, on: bool) {
        self.push(Indication::AptxLosslessEnabled(on));
    }

    fn gatt_client_enabled_ind(&self, on: bool) {
        self.push(Indication::GattClientEnabled(on));
    }

    fn audio_source_enabled_ind(&self, on: bool) {
        self.push(Indication::AudioSourceEnabled(on));
    }

    fn connection_error_ind(&self, kind: ConnectionErrorKind) {
        self.push(Indication::ConnectionError(kind));
    }

    fn reconnect_gave_up(&self) {
        self.push(Indication::ReconnectGaveUp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indications_arrive_in_order() {
        let (sender, rx) = IndicationSender::channel();
        sender.source_state_ind(1);
        sender.audio_mode_ind(AudioMode(0x02));
        sender.reconnect_gave_up();

        assert_eq!(rx.try_recv().unwrap(), Indication::SourceState(1));
        assert_eq!(rx.try_recv().unwrap(), Indication::AudioMode(AudioMode(0x02)));
        assert_eq!(rx.try_recv().unwrap(), Indication::ReconnectGaveUp);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn hung_up_receiver_is_tolerated() {
        let (sender, rx) = IndicationSender::channel();
        drop(rx);
        sender.source_state_ind(6);
    }
}
