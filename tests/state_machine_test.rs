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

//! End-to-end flows: wire frames in, typed commands out, through the
//! parser and the state machine exactly as the serial thread drives them.

use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use floocast_desktop::delegate::Indication;
use floocast_desktop::dongle::{parse_frame, BroadcastMode, InterfaceDelegate};
use floocast_desktop::state::CommandSink;
use floocast_desktop::{
    CommandError, FlooMessage, FlooStateMachine, IndicationSender, Settings,
};

struct WireRecorder {
    frames: Mutex<Vec<Vec<u8>>>,
}

impl WireRecorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
        })
    }

    fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.frames.lock())
    }
}

impl CommandSink for WireRecorder {
    fn send_msg(&self, msg: &FlooMessage) {
        self.frames.lock().push(msg.encode());
    }
}

struct Fixture {
    machine: FlooStateMachine,
    wire: Arc<WireRecorder>,
    indications: crossbeam_channel::Receiver<Indication>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from(dir.path().join("settings.json"));
    let wire = WireRecorder::new();
    let (delegate, indications) = IndicationSender::channel();
    let machine = FlooStateMachine::new(wire.clone(), Arc::new(delegate), settings);
    Fixture {
        machine,
        wire,
        indications,
        _dir: dir,
    }
}

/// Feed one receive line exactly as the read loop would.
fn feed(machine: &FlooStateMachine, line: &[u8]) {
    let msg = parse_frame(line).expect("test line must parse");
    machine.handle_message(msg);
}

fn connect(f: &Fixture) {
    f.machine.interface_state(true, Some("/dev/ttyACM0"));
    feed(&f.machine, b"VR=2.1.0");
    feed(&f.machine, b"AM=80");
    feed(&f.machine, b"ST=01");
    feed(&f.machine, b"LA=00");
    feed(&f.machine, b"LF=00");
    feed(&f.machine, b"BM=00");
    feed(&f.machine, b"BN=FlooGoo");
    feed(&f.machine, b"FN=00");
    feed(&f.machine, b"FT=01");
    feed(&f.machine, b"AC=06,C8,1F40,12C0,0640,2710,03E8,00FA");
}

#[test]
fn handshake_emits_queries_in_order_and_connects() {
    let f = fixture();
    connect(&f);

    assert!(f.machine.is_connected());
    let frames = f.wire.take();
    assert_eq!(
        frames,
        vec![
            b"BC:VR\r\n".to_vec(),
            b"BC:AM\r\n".to_vec(),
            b"BC:ST\r\n".to_vec(),
            b"BC:LA\r\n".to_vec(),
            b"BC:LF\r\n".to_vec(),
            b"BC:BM\r\n".to_vec(),
            b"BC:BN\r\n".to_vec(),
            b"BC:FN\r\n".to_vec(),
            b"BC:FT\r\n".to_vec(),
            b"BC:AC\r\n".to_vec(),
        ]
    );
}

#[test]
fn handshake_indications_reflect_device_state() {
    let f = fixture();
    connect(&f);

    let inds: Vec<_> = f.indications.try_iter().collect();
    assert!(inds.iter().any(|i| matches!(
        i,
        Indication::DeviceDetected { present: true, version: Some(v), .. } if v.as_str() == "2.1.0"
    )));
    assert!(inds
        .iter()
        .any(|i| matches!(i, Indication::AudioMode(m) if m.has_analog_input())));
    assert!(inds.contains(&Indication::SourceState(1)));
    assert!(inds.contains(&Indication::BroadcastName("FlooGoo".into())));
    assert!(inds.contains(&Indication::LedEnabled(true)));
    assert!(inds
        .iter()
        .any(|i| matches!(i, Indication::CodecInUse(c) if c.codec == 6 && c.rssi_dbm() == -56)));
}

#[test]
fn paired_device_list_streams_from_the_wire() {
    let f = fixture();
    f.machine.interface_state(true, Some("/dev/ttyACM0"));
    feed(&f.machine, b"VR=2.1.0");
    feed(&f.machine, b"AM=00");
    feed(&f.machine, b"ST=01");
    feed(&f.machine, b"LA=00");
    feed(&f.machine, b"LF=00");
    feed(&f.machine, b"BM=00");
    feed(&f.machine, b"BN=FlooGoo");
    feed(&f.machine, b"FN=00,112233445566,My Buds");
    feed(&f.machine, b"FN=01,AABBCCDDEEFF");
    feed(&f.machine, b"FN=02");
    feed(&f.machine, b"FT=00");
    feed(&f.machine, b"AC=01");

    assert!(f.machine.is_connected());
    assert_eq!(
        f.machine.paired_devices(),
        vec!["My Buds".to_string(), "No Name".to_string()]
    );
}

#[test]
fn broadcast_command_round_trip_commits_on_ok() {
    let f = fixture();
    connect(&f);
    f.wire.take();

    f.machine.set_public_broadcast(true).unwrap();
    assert_eq!(f.wire.take(), vec![b"BC:BM=02\r\n".to_vec()]);

    feed(&f.machine, b"OK");
    assert_eq!(f.machine.broadcast_mode(), Some(BroadcastMode(0x02)));

    // Redundant set is filtered out.
    f.machine.set_public_broadcast(true).unwrap();
    assert!(f.wire.take().is_empty());
}

#[test]
fn rejected_command_rolls_back_to_confirmed_value() {
    let f = fixture();
    connect(&f);
    while f.indications.try_recv().is_ok() {}

    f.machine.set_broadcast_latency(2).unwrap();
    feed(&f.machine, b"ER=01");

    assert_eq!(f.machine.broadcast_mode(), Some(BroadcastMode(0x00)));
    assert_eq!(
        f.indications.try_recv().unwrap(),
        Indication::BroadcastMode(BroadcastMode(0x00))
    );
    // The slot is free for the next command.
    assert_eq!(f.machine.set_broadcast_latency(2), Ok(()));
}

#[test]
fn command_slot_enforces_single_outstanding_request() {
    let f = fixture();
    connect(&f);
    f.wire.take();

    assert_eq!(f.machine.enable_led(false), Ok(()));
    assert_eq!(f.machine.enable_gatt_client(true), Err(CommandError::Busy));
    feed(&f.machine, b"OK");
    assert_eq!(f.machine.enable_gatt_client(true), Ok(()));

    let frames = f.wire.take();
    assert_eq!(frames, vec![b"BC:FT=00\r\n".to_vec(), b"BC:FT=04\r\n".to_vec()]);
}

#[test]
fn commands_are_rejected_while_disconnected() {
    let f = fixture();
    assert_eq!(f.machine.set_audio_mode(1), Err(CommandError::NotConnected));

    connect(&f);
    f.machine.interface_state(false, None);
    assert_eq!(f.machine.set_audio_mode(1), Err(CommandError::NotConnected));
    assert_eq!(f.machine.audio_mode().map(|m| m.raw()), Some(0x80));
}

#[test]
fn streaming_marker_survives_restart_and_clears() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    {
        let mut settings = Settings::load_from(path.clone());
        settings.set_last_streaming_state(Some(6));
    }

    // A fresh run consumes the marker.
    let wire = WireRecorder::new();
    let (delegate, _indications) = IndicationSender::channel();
    let _machine = FlooStateMachine::new(
        wire,
        Arc::new(delegate),
        Settings::load_from(path.clone()),
    );
    assert_eq!(Settings::load_from(path).last_streaming_state(), None);
}

#[test]
fn streaming_source_state_refetches_paired_list() {
    let f = fixture();
    connect(&f);
    f.wire.take();

    feed(&f.machine, b"ST=06");
    assert_eq!(f.wire.take(), vec![b"BC:FN\r\n".to_vec()]);
    assert_eq!(f.machine.source_state(), Some(6));
}

#[test]
fn unknown_frames_are_ignored_in_every_phase() {
    let f = fixture();
    f.machine.interface_state(true, Some("/dev/ttyACM0"));
    f.machine.handle_message(parse_frame(b"XX=42").unwrap());
    feed(&f.machine, b"VR=2.1.0");
    f.machine.handle_message(parse_frame(b"QQ").unwrap());
    feed(&f.machine, b"AM=00");
    feed(&f.machine, b"ST=01");
    feed(&f.machine, b"LA=00");
    feed(&f.machine, b"LF=00");
    feed(&f.machine, b"BM=00");
    feed(&f.machine, b"BN=FlooGoo");
    feed(&f.machine, b"FN=00");
    feed(&f.machine, b"FT=00");
    feed(&f.machine, b"AC=01");
    assert!(f.machine.is_connected());
}
