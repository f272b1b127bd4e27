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

//! Headless driver: wires the serial interface to the state machine and
//! logs every indication. GUI front ends consume the same channel.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use floocast_desktop::{
    FlooInterface, FlooStateMachine, Indication, IndicationSender, Settings,
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("floocast starting");

    let settings = Settings::load();
    let interface = Arc::new(FlooInterface::new());
    let (delegate, indications) = IndicationSender::channel();
    let machine = FlooStateMachine::new(interface.clone(), Arc::new(delegate), settings);

    let poller = Arc::clone(&interface);
    let driver = machine.clone();
    thread::Builder::new()
        .name("floo-serial".into())
        .spawn(move || poller.run(&driver))?;

    for indication in indications {
        match indication {
            Indication::DeviceDetected {
                present,
                port,
                version,
            } => info!(present, ?port, ?version, "device"),
            Indication::AudioMode(mode) => {
                info!(mode = mode.mode(), analog = mode.has_analog_input(), "audio mode")
            }
            Indication::SourceState(state) => info!(state, "source state"),
            Indication::LeAudioState(state) => info!(state, "LE audio state"),
            Indication::PreferLea(prefer) => info!(prefer, "prefer LE audio"),
            Indication::BroadcastMode(mode) => info!(raw = mode.raw(), "broadcast mode"),
            Indication::BroadcastName(name) => info!(%name, "broadcast name"),
            Indication::PairedDevices(names) => info!(?names, "paired devices"),
            Indication::CodecInUse(status) => info!(
                codec = status.codec,
                rssi_dbm = status.rssi_dbm(),
                spk_rate = status.spk_sample_rate,
                "codec in use"
            ),
            Indication::LedEnabled(on) => info!(on, "LED"),
            Indication::AptxLosslessEnabled(on) => info!(on, "aptX lossless"),
            Indication::GattClientEnabled(on) => info!(on, "GATT client"),
            Indication::AudioSourceEnabled(on) => info!(on, "USB audio source"),
            Indication::ConnectionError(kind) => info!(?kind, "connection error"),
            Indication::ReconnectGaveUp => info!("auto-reconnect gave up"),
        }
    }
    Ok(())
}
