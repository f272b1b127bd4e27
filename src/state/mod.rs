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

//! Protocol state machine.
//!
//! Sequences the post-connect handshake, tracks confirmed device state,
//! exposes typed command methods with optimistic update and rollback, and
//! drives the auto-reconnect policy after a streaming interruption.

pub mod reconnect;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::delegate::FlooDelegate;
use crate::dongle::{
    source_state, AudioMode, BroadcastMode, ConnectionErrorKind, FeatureFlags, FlooInterface,
    FlooMessage, Header, InterfaceDelegate, PairedName,
};
use crate::settings::Settings;
use crate::timer::{self, OneShotTimer};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a command method refused to emit.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The wire protocol has no correlation IDs; only one mutating command
    /// may be outstanding.
    #[error("a command is already in flight")]
    Busy,
    #[error("device not connected")]
    NotConnected,
}

/// Where commands go. The production sink is [`FlooInterface`]; tests
/// substitute a recorder.
pub trait CommandSink: Send + Sync {
    fn send_msg(&self, msg: &FlooMessage);
}

impl CommandSink for FlooInterface {
    fn send_msg(&self, msg: &FlooMessage) {
        FlooInterface::send_msg(self, msg);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Init,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Byte(u8),
    Text(String),
}

struct Inner {
    link: LinkState,
    /// The single outstanding request, if any. Non-`None` only while a
    /// reply is awaited; cleared by `OK`, `ER`, a matching typed reply, or
    /// the command timeout.
    last_cmd: Option<FlooMessage>,
    pending: Option<Pending>,
    cmd_generation: u64,
    command_timer: Option<OneShotTimer>,

    port_name: Option<String>,
    version: Option<String>,
    a2dp_sink: bool,

    audio_mode: Option<AudioMode>,
    prefer_lea: Option<u8>,
    broadcast_mode: Option<BroadcastMode>,
    broadcast_name: Option<String>,
    paired_devices: Vec<String>,
    paired_accum: Vec<String>,
    source_state: Option<u8>,
    le_audio_state: Option<u8>,
    feature: Option<FeatureFlags>,

    state_before_disconnect: Option<u8>,
    reconnect_attempts: u32,
    reconnect_timer: Option<OneShotTimer>,
    last_saved_state: Option<u8>,

    settings: Settings,
}

/// The command/response sequencer. Cheap to clone; all clones share state.
pub struct FlooStateMachine {
    inner: Arc<Mutex<Inner>>,
    sink: Arc<dyn CommandSink>,
    delegate: Arc<dyn FlooDelegate>,
}

impl Clone for FlooStateMachine {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sink: Arc::clone(&self.sink),
            delegate: Arc::clone(&self.delegate),
        }
    }
}

impl FlooStateMachine {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        delegate: Arc<dyn FlooDelegate>,
        mut settings: Settings,
    ) -> Self {
        // Crash recovery: a persisted streaming marker means the previous
        // run was interrupted mid-stream, so arm the reconnect evaluation
        // for the next handshake.
        let restored = settings
            .last_streaming_state()
            .filter(|&s| s >= source_state::STREAMING_START);
        if restored.is_some() {
            info!(state = ?restored, "restored streaming marker from settings");
            settings.set_last_streaming_state(None);
        }
        Self {
            inner: Arc::new(Mutex::new(Inner {
                link: LinkState::Init,
                last_cmd: None,
                pending: None,
                cmd_generation: 0,
                command_timer: None,
                port_name: None,
                version: None,
                a2dp_sink: false,
                audio_mode: None,
                prefer_lea: None,
                broadcast_mode: None,
                broadcast_name: None,
                paired_devices: Vec::new(),
                paired_accum: Vec::new(),
                source_state: None,
                le_audio_state: None,
                feature: None,
                state_before_disconnect: restored,
                reconnect_attempts: 0,
                reconnect_timer: None,
                last_saved_state: None,
                settings,
            })),
            sink,
            delegate,
        }
    }

    // Cached state accessors.

    pub fn is_connected(&self) -> bool {
        self.inner.lock().link == LinkState::Connected
    }

    pub fn is_a2dp_sink(&self) -> bool {
        self.inner.lock().a2dp_sink
    }

    pub fn firmware_version(&self) -> Option<String> {
        self.inner.lock().version.clone()
    }

    pub fn audio_mode(&self) -> Option<AudioMode> {
        self.inner.lock().audio_mode
    }

    pub fn broadcast_mode(&self) -> Option<BroadcastMode> {
        self.inner.lock().broadcast_mode
    }

    pub fn broadcast_name(&self) -> Option<String> {
        self.inner.lock().broadcast_name.clone()
    }

    pub fn paired_devices(&self) -> Vec<String> {
        self.inner.lock().paired_devices.clone()
    }

    pub fn source_state(&self) -> Option<u8> {
        self.inner.lock().source_state
    }

    pub fn le_audio_state(&self) -> Option<u8> {
        self.inner.lock().le_audio_state
    }

    pub fn feature_flags(&self) -> Option<FeatureFlags> {
        self.inner.lock().feature
    }

    // Command methods. Each requires CONNECTED and an idle command slot;
    // bitfield setters skip the wire round-trip when nothing would change.

    pub fn set_audio_mode(&self, mode: u8) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        let target = inner.audio_mode.unwrap_or(AudioMode(0)).with_mode(mode);
        if inner.audio_mode == Some(target) {
            return Ok(());
        }
        self.issue(
            &mut inner,
            FlooMessage::AudioMode(Some(target.raw())),
            Some(Pending::Byte(target.raw())),
        );
        Ok(())
    }

    pub fn set_prefer_lea(&self, prefer: bool) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        let target = u8::from(prefer);
        if inner.prefer_lea == Some(target) {
            return Ok(());
        }
        self.issue(
            &mut inner,
            FlooMessage::PreferLea(Some(target)),
            Some(Pending::Byte(target)),
        );
        Ok(())
    }

    pub fn set_broadcast_encrypt(&self, on: bool) -> Result<(), CommandError> {
        self.update_broadcast_mode(|m| m.with_encrypt(on))
    }

    pub fn set_public_broadcast(&self, on: bool) -> Result<(), CommandError> {
        self.update_broadcast_mode(|m| m.with_public(on))
    }

    pub fn set_broadcast_high_quality(&self, on: bool) -> Result<(), CommandError> {
        self.update_broadcast_mode(|m| m.with_high_quality(on))
    }

    pub fn set_broadcast_stop_on_idle(&self, on: bool) -> Result<(), CommandError> {
        self.update_broadcast_mode(|m| m.with_stop_on_idle(on))
    }

    pub fn set_broadcast_latency(&self, latency: u8) -> Result<(), CommandError> {
        self.update_broadcast_mode(|m| m.with_latency(latency))
    }

    /// Set the broadcast name. The device limits names to 30 bytes; the
    /// caller validates length and charset.
    pub fn set_broadcast_name(&self, name: &str) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(
            &mut inner,
            FlooMessage::BroadcastName(Some(name.to_string())),
            Some(Pending::Text(name.to_string())),
        );
        Ok(())
    }

    /// Set the broadcast encryption key (16 bytes max, caller-validated).
    pub fn set_broadcast_key(&self, key: &str) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::BroadcastKey(Some(key.to_string())), None);
        Ok(())
    }

    pub fn enable_led(&self, on: bool) -> Result<(), CommandError> {
        self.update_feature(|f| f.with_led(on))
    }

    pub fn enable_aptx_lossless(&self, on: bool) -> Result<(), CommandError> {
        self.update_feature(|f| f.with_aptx_lossless(on))
    }

    pub fn enable_gatt_client(&self, on: bool) -> Result<(), CommandError> {
        self.update_feature(|f| f.with_gatt_client(on))
    }

    pub fn enable_usb_audio_source(&self, on: bool) -> Result<(), CommandError> {
        self.update_feature(|f| f.with_audio_source(on))
    }

    /// Make the dongle pair with a new device. The a2dp-sink variant uses
    /// discoverable mode; everything else starts an inquiry.
    pub fn set_new_pairing(&self) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        let msg = if inner.a2dp_sink {
            FlooMessage::Discoverable(Some(1))
        } else {
            FlooMessage::Inquiry
        };
        self.issue(&mut inner, msg, None);
        Ok(())
    }

    pub fn clear_all_paired_devices(&self) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::ClearPaired(None), None);
        Ok(())
    }

    pub fn clear_paired_device(&self, index: u8) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::ClearPaired(Some(index)), None);
        Ok(())
    }

    pub fn connect_and_trust(&self, index: u8) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::ConnectTrust(Some(index)), None);
        Ok(())
    }

    pub fn toggle_connection(&self, index: u8) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::ToggleConnection(Some(index)), None);
        Ok(())
    }

    pub fn disconnect_device(&self) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::Disconnect, None);
        Ok(())
    }

    pub fn factory_default(&self) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        self.issue(&mut inner, FlooMessage::FactoryDefault, None);
        Ok(())
    }

    /// Re-fetch the paired-device list. Replies stream in as unsolicited
    /// `FN` frames, so this does not occupy the command slot.
    pub fn refresh_paired_devices(&self) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        if inner.link != LinkState::Connected {
            return Err(CommandError::NotConnected);
        }
        inner.paired_accum.clear();
        self.sink.send_msg(&FlooMessage::PairedName(None));
        Ok(())
    }

    // Internals.

    fn check_ready(inner: &Inner) -> Result<(), CommandError> {
        if inner.link != LinkState::Connected {
            return Err(CommandError::NotConnected);
        }
        if inner.last_cmd.is_some() {
            return Err(CommandError::Busy);
        }
        Ok(())
    }

    fn update_broadcast_mode(
        &self,
        apply: impl FnOnce(BroadcastMode) -> BroadcastMode,
    ) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        let current = inner.broadcast_mode.unwrap_or(BroadcastMode(0));
        let target = apply(current);
        if inner.broadcast_mode == Some(target) {
            return Ok(());
        }
        self.issue(
            &mut inner,
            FlooMessage::BroadcastMode(Some(target.raw())),
            Some(Pending::Byte(target.raw())),
        );
        Ok(())
    }

    fn update_feature(
        &self,
        apply: impl FnOnce(FeatureFlags) -> FeatureFlags,
    ) -> Result<(), CommandError> {
        let mut inner = self.inner.lock();
        Self::check_ready(&inner)?;
        let current = inner.feature.unwrap_or(FeatureFlags(0));
        let target = apply(current);
        if inner.feature == Some(target) {
            return Ok(());
        }
        self.issue(
            &mut inner,
            FlooMessage::Feature(Some(target.raw())),
            Some(Pending::Byte(target.raw())),
        );
        Ok(())
    }

    /// Send a command, arm the timeout, and occupy the command slot.
    fn issue(&self, inner: &mut Inner, msg: FlooMessage, pending: Option<Pending>) {
        inner.pending = pending;
        inner.last_cmd = Some(msg.clone());
        inner.cmd_generation += 1;
        let generation = inner.cmd_generation;
        let this = self.clone();
        inner.command_timer = Some(timer::schedule(COMMAND_TIMEOUT, move || {
            this.command_timed_out(generation);
        }));
        self.sink.send_msg(&msg);
    }

    fn command_timed_out(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.cmd_generation != generation || inner.last_cmd.is_none() {
            return;
        }
        warn!(
            header = inner.last_cmd.as_ref().map(|m| m.header().as_str()),
            "command reply timed out, rolling back"
        );
        self.roll_back(&mut inner);
    }

    fn send_next(&self, inner: &mut Inner, msg: FlooMessage) {
        inner.last_cmd = Some(msg.clone());
        self.sink.send_msg(&msg);
    }

    fn indicate_features(&self, flags: FeatureFlags) {
        self.delegate.led_enabled_ind(flags.led());
        self.delegate.aptx_lossless_enabled_ind(flags.aptx_lossless());
        self.delegate.gatt_client_enabled_ind(flags.gatt_client());
        self.delegate.audio_source_enabled_ind(flags.audio_source());
    }

    /// Handshake driver. Each step is gated on `last_cmd` holding the query
    /// the step issued, so same-typed unsolicited frames cannot advance the
    /// sequence early.
    fn handle_handshake(&self, inner: &mut Inner, msg: FlooMessage) {
        let expecting = inner.last_cmd.as_ref().map(FlooMessage::header);
        match (expecting, msg) {
            (Some(Header::Vr), FlooMessage::Version(Some(version))) => {
                inner.a2dp_sink = version.starts_with("AS");
                debug!(%version, a2dp_sink = inner.a2dp_sink, "device identified");
                self.delegate.device_detected(
                    true,
                    inner.port_name.as_deref(),
                    Some(&version),
                );
                inner.version = Some(version);
                self.send_next(inner, FlooMessage::AudioMode(None));
            }
            (Some(Header::Am), FlooMessage::AudioMode(Some(raw))) => {
                let mode = AudioMode(raw);
                inner.audio_mode = Some(mode);
                self.delegate.audio_mode_ind(mode);
                self.send_next(inner, FlooMessage::SourceState(None));
            }
            (Some(Header::St), FlooMessage::SourceState(Some(state))) => {
                inner.source_state = Some(state);
                self.delegate.source_state_ind(state);
                self.send_next(inner, FlooMessage::LeAudioState(None));
            }
            // ST can arrive unsolicited at any point of the handshake; the
            // auto-reconnect evaluation needs the fresh value, so cache and
            // notify without advancing the chain.
            (_, FlooMessage::SourceState(Some(state))) => {
                inner.source_state = Some(state);
                self.delegate.source_state_ind(state);
            }
            (Some(Header::La), FlooMessage::LeAudioState(Some(state))) => {
                inner.le_audio_state = Some(state);
                self.delegate.le_audio_state_ind(state);
                self.send_next(inner, FlooMessage::PreferLea(None));
            }
            (Some(Header::Lf), FlooMessage::PreferLea(Some(prefer))) => {
                inner.prefer_lea = Some(prefer);
                self.delegate.prefer_lea_ind(prefer != 0);
                self.send_next(inner, FlooMessage::BroadcastMode(None));
            }
            (Some(Header::Bm), FlooMessage::BroadcastMode(Some(raw))) => {
                let mode = BroadcastMode(raw);
                inner.broadcast_mode = Some(mode);
                self.delegate.broadcast_mode_ind(mode);
                self.send_next(inner, FlooMessage::BroadcastName(None));
            }
            (Some(Header::Bn), FlooMessage::BroadcastName(Some(name))) => {
                self.delegate.broadcast_name_ind(&name);
                inner.broadcast_name = Some(name);
                inner.paired_devices.clear();
                inner.paired_accum.clear();
                self.send_next(inner, FlooMessage::PairedName(None));
            }
            (Some(Header::Fn), FlooMessage::PairedName(Some(PairedName::Entry {
                name, ..
            }))) => {
                inner.paired_accum.push(name);
            }
            (Some(Header::Fn), FlooMessage::PairedName(Some(PairedName::End { .. }))) => {
                inner.paired_devices = std::mem::take(&mut inner.paired_accum);
                self.delegate.paired_devices_ind(&inner.paired_devices);
                self.send_next(inner, FlooMessage::Feature(None));
            }
            (Some(Header::Ft), FlooMessage::Feature(Some(raw))) => {
                let flags = FeatureFlags(raw);
                inner.feature = Some(flags);
                self.indicate_features(flags);
                self.send_next(inner, FlooMessage::CodecInUse(None));
            }
            (Some(Header::Ac), FlooMessage::CodecInUse(Some(status))) => {
                self.delegate.codec_in_use_ind(&status);
                self.complete_handshake(inner);
            }
            (Some(Header::Ac), FlooMessage::Error(code)) => {
                // The firmware may reject the codec query outright; treat
                // it as handshake-terminal with no codec indication.
                warn!(code, "codec query rejected at end of handshake");
                self.complete_handshake(inner);
            }
            (_, FlooMessage::Unknown) => {
                debug!("ignoring unknown frame during handshake");
            }
            (expecting, msg) => {
                debug!(?expecting, header = msg.header().as_str(), "out-of-sequence frame during handshake");
            }
        }
    }

    fn complete_handshake(&self, inner: &mut Inner) {
        inner.last_cmd = None;
        inner.link = LinkState::Connected;
        info!("handshake complete");
        self.evaluate_auto_reconnect(inner);
    }

    fn handle_steady(&self, inner: &mut Inner, msg: FlooMessage) {
        match msg {
            FlooMessage::Ok => self.handle_ok(inner),
            FlooMessage::Error(code) => {
                if inner.last_cmd.is_some() {
                    warn!(code, "command rejected by device");
                    self.roll_back(inner);
                } else {
                    warn!(code, "unsolicited error report");
                }
            }
            FlooMessage::SourceState(Some(state)) => self.handle_source_state(inner, state),
            FlooMessage::LeAudioState(Some(state)) => {
                inner.le_audio_state = Some(state);
                self.delegate.le_audio_state_ind(state);
            }
            FlooMessage::CodecInUse(Some(status)) => {
                self.delegate.codec_in_use_ind(&status);
            }
            FlooMessage::Feature(Some(raw)) => {
                let flags = FeatureFlags(raw);
                inner.feature = Some(flags);
                self.indicate_features(flags);
            }
            FlooMessage::PairedName(Some(PairedName::Entry { name, .. })) => {
                inner.paired_accum.push(name);
            }
            FlooMessage::PairedName(Some(PairedName::End { .. })) => {
                inner.paired_devices = std::mem::take(&mut inner.paired_accum);
                self.delegate.paired_devices_ind(&inner.paired_devices);
            }
            FlooMessage::Unknown => debug!("ignoring unknown frame"),
            other => {
                debug!(header = other.header().as_str(), "unhandled frame");
            }
        }
    }

    fn handle_ok(&self, inner: &mut Inner) {
        inner.command_timer = None;
        let last = inner.last_cmd.take();
        let pending = inner.pending.take();
        match last {
            Some(FlooMessage::AudioMode(Some(_))) => {
                if let Some(Pending::Byte(b)) = pending {
                    inner.audio_mode = Some(AudioMode(b));
                }
            }
            Some(FlooMessage::PreferLea(Some(_))) => {
                if let Some(Pending::Byte(b)) = pending {
                    inner.prefer_lea = Some(b);
                }
            }
            Some(FlooMessage::BroadcastMode(Some(_))) => {
                if let Some(Pending::Byte(b)) = pending {
                    inner.broadcast_mode = Some(BroadcastMode(b));
                }
            }
            Some(FlooMessage::BroadcastName(Some(_))) => {
                if let Some(Pending::Text(t)) = pending {
                    inner.broadcast_name = Some(t);
                }
            }
            Some(FlooMessage::Feature(Some(_))) => {
                if let Some(Pending::Byte(b)) = pending {
                    inner.feature = Some(FeatureFlags(b));
                }
            }
            Some(FlooMessage::ClearPaired(None)) => {
                inner.paired_devices.clear();
                inner.paired_accum.clear();
                self.delegate.paired_devices_ind(&inner.paired_devices);
            }
            Some(FlooMessage::ClearPaired(Some(_))) => {
                // The list shifted; re-read it.
                inner.paired_accum.clear();
                self.sink.send_msg(&FlooMessage::PairedName(None));
            }
            Some(other) => {
                debug!(header = other.header().as_str(), "command acknowledged");
            }
            None => debug!("stray OK"),
        }
    }

    /// Roll an in-flight mutation back to the last confirmed value and
    /// re-indicate it so the consumer's optimistic view is corrected.
    fn roll_back(&self, inner: &mut Inner) {
        inner.command_timer = None;
        inner.pending = None;
        match inner.last_cmd.take() {
            Some(FlooMessage::AudioMode(Some(_))) => match inner.audio_mode {
                Some(mode) => self.delegate.audio_mode_ind(mode),
                None => warn!("no confirmed audio mode to restore"),
            },
            Some(FlooMessage::PreferLea(Some(_))) => match inner.prefer_lea {
                Some(v) => self.delegate.prefer_lea_ind(v != 0),
                None => warn!("no confirmed prefer-LE flag to restore"),
            },
            Some(FlooMessage::BroadcastMode(Some(_))) => match inner.broadcast_mode {
                Some(mode) => self.delegate.broadcast_mode_ind(mode),
                None => warn!("no confirmed broadcast mode to restore"),
            },
            Some(FlooMessage::BroadcastName(Some(_))) => match &inner.broadcast_name {
                Some(name) => self.delegate.broadcast_name_ind(name),
                None => warn!("no confirmed broadcast name to restore"),
            },
            Some(FlooMessage::Feature(Some(_))) => match inner.feature {
                Some(flags) => self.indicate_features(flags),
                None => warn!("no confirmed feature flags to restore"),
            },
            _ => {}
        }
    }

    fn handle_source_state(&self, inner: &mut Inner, state: u8) {
        inner.source_state = Some(state);
        self.delegate.source_state_ind(state);

        if state >= source_state::STREAMING_START && inner.last_saved_state != Some(state) {
            inner.settings.set_last_streaming_state(Some(state));
            inner.last_saved_state = Some(state);
        }
        // A fresh connection can reorder the MRU list.
        if state == source_state::STREAMING_START || state == source_state::STREAMING {
            inner.paired_accum.clear();
            self.sink.send_msg(&FlooMessage::PairedName(None));
        }
    }

    fn handle_link_up(&self, port: Option<&str>) {
        let mut inner = self.inner.lock();
        info!(port = ?port, "link up, starting handshake");
        inner.port_name = port.map(String::from);
        inner.link = LinkState::Init;
        inner.pending = None;
        self.send_next(&mut inner, FlooMessage::Version(None));
    }

    fn handle_link_down(&self) {
        let mut inner = self.inner.lock();
        info!("link down");
        if let Some(state) = inner.source_state {
            inner.state_before_disconnect = Some(state);
        }
        inner.link = LinkState::Init;
        inner.last_cmd = None;
        inner.pending = None;
        inner.cmd_generation += 1;
        if let Some(timer) = inner.command_timer.take() {
            timer.cancel();
        }
        if let Some(timer) = inner.reconnect_timer.take() {
            timer.cancel();
        }
        inner.a2dp_sink = false;
        inner.version = None;
        inner.feature = None;
        inner.port_name = None;
        drop(inner);
        self.delegate.device_detected(false, None, None);
    }
}

impl InterfaceDelegate for FlooStateMachine {
    fn interface_state(&self, up: bool, port: Option<&str>) {
        if up {
            self.handle_link_up(port);
        } else {
            self.handle_link_down();
        }
    }

    fn handle_message(&self, msg: FlooMessage) {
        let mut inner = self.inner.lock();
        match inner.link {
            LinkState::Init => self.handle_handshake(&mut inner, msg),
            LinkState::Connected => self.handle_steady(&mut inner, msg),
        }
    }

    fn connection_error(&self, kind: ConnectionErrorKind) {
        self.delegate.connection_error_ind(kind);
    }
}
