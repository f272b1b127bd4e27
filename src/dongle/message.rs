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

//! Wire message definitions and codec.
//!
//! The dongle speaks a line-oriented ASCII protocol. A command sent to the
//! device is framed as `BC:<HH>[=<payload>]\r\n`; a reply arrives as
//! `<HH>[=<payload>]` (the CRLF is stripped by the read loop before parsing).
//! Numeric fields are fixed-width uppercase hex, except for `ER`, `LA` and
//! the `FN`/`PL` index, which the firmware emits as decimal.

/// 2-character header tag of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Header {
    Ac,
    Ad,
    Am,
    Be,
    Bm,
    Bn,
    Cp,
    Ct,
    Dc,
    Er,
    Fd,
    Fn,
    Ft,
    Iq,
    La,
    Lf,
    Md,
    Ok,
    Pl,
    St,
    Tc,
    Unknown,
    Vr,
}

impl Header {
    pub fn as_str(&self) -> &'static str {
        match self {
            Header::Ac => "AC",
            Header::Ad => "AD",
            Header::Am => "AM",
            Header::Be => "BE",
            Header::Bm => "BM",
            Header::Bn => "BN",
            Header::Cp => "CP",
            Header::Ct => "CT",
            Header::Dc => "DC",
            Header::Er => "ER",
            Header::Fd => "FD",
            Header::Fn => "FN",
            Header::Ft => "FT",
            Header::Iq => "IQ",
            Header::La => "LA",
            Header::Lf => "LF",
            Header::Md => "MD",
            Header::Ok => "OK",
            Header::Pl => "PL",
            Header::St => "ST",
            Header::Tc => "TC",
            Header::Unknown => "~~",
            Header::Vr => "VR",
        }
    }
}

/// One element of the streamed paired-device list (`FN` replies).
///
/// The device streams the list as repeated `FN` replies; a reply carrying
/// only an index and no address terminates the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairedName {
    /// A list element: index, Bluetooth address and display name.
    Entry {
        index: u8,
        address: String,
        name: String,
    },
    /// End-of-list marker.
    End { index: u8 },
}

/// A `PL` (paired list) reply element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedListEntry {
    pub index: u8,
    pub address: String,
    pub name: String,
}

/// Codec-in-use status (`AC` reply).
///
/// The reply is variadic: depending on the payload length a prefix subset of
/// the fields is populated and the rest stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecStatus {
    pub codec: u8,
    /// Raw wire value; actual dBm is `rssi - 256`, see [`CodecStatus::rssi_dbm`].
    pub rssi: u8,
    pub rate: u16,
    /// Speaker sample rate in Hz (the wire carries units of 10 Hz).
    pub spk_sample_rate: u32,
    /// Microphone sample rate in Hz (the wire carries units of 10 Hz).
    pub mic_sample_rate: u32,
    pub sdu_interval: u16,
    /// Transport delay in units of 10 microseconds.
    pub transport_delay: u16,
    /// Presentation delay in units of 10 microseconds.
    pub present_delay: u16,
}

impl CodecStatus {
    pub fn new(codec: u8) -> Self {
        Self {
            codec,
            ..Self::default()
        }
    }

    /// Signal strength in dBm.
    pub fn rssi_dbm(&self) -> i16 {
        i16::from(self.rssi) - 256
    }

    /// Transport delay in milliseconds.
    pub fn transport_delay_ms(&self) -> f32 {
        f32::from(self.transport_delay) / 100.0
    }

    /// Presentation delay in milliseconds.
    pub fn present_delay_ms(&self) -> f32 {
        f32::from(self.present_delay) / 100.0
    }
}

/// A typed protocol message.
///
/// `None` payloads encode the query form of a command (`BC:AM\r\n` asks for
/// the current audio mode); `Some` payloads encode the set form. Decoded
/// replies always carry `Some` payloads, except `OK` which has none.
#[derive(Debug, Clone, PartialEq)]
pub enum FlooMessage {
    /// `AC`: codec in use, variadic-length reply.
    CodecInUse(Option<CodecStatus>),
    /// `AD`: device Bluetooth address.
    Address(Option<String>),
    /// `AM`: audio mode byte.
    AudioMode(Option<u8>),
    /// `BE`: broadcast encryption key (caller keeps it under 16 bytes).
    BroadcastKey(Option<String>),
    /// `BM`: broadcast mode bitfield.
    BroadcastMode(Option<u8>),
    /// `BN`: broadcast name (caller keeps it under 30 bytes).
    BroadcastName(Option<String>),
    /// `CP`: clear paired device(s); `None` clears all.
    ClearPaired(Option<u8>),
    /// `CT`: connect and trust.
    ConnectTrust(Option<u8>),
    /// `DC`: disconnect, send-only.
    Disconnect,
    /// `ER`: error code reply.
    Error(u8),
    /// `FD`: factory default, send-only.
    FactoryDefault,
    /// `FN`: paired-device list element or terminator.
    PairedName(Option<PairedName>),
    /// `FT`: feature bitfield.
    Feature(Option<u8>),
    /// `IQ`: start inquiry/pairing, send-only.
    Inquiry,
    /// `LA`: LE Audio state.
    LeAudioState(Option<u8>),
    /// `LF`: prefer-LE-audio flag.
    PreferLea(Option<u8>),
    /// `MD`: discoverable mode.
    Discoverable(Option<u8>),
    /// `OK`: command acknowledged.
    Ok,
    /// `PL`: paired list entry.
    PairedList(Option<PairedListEntry>),
    /// `ST`: source state.
    SourceState(Option<u8>),
    /// `TC`: toggle connection.
    ToggleConnection(Option<u8>),
    /// Registered-but-unrecognized frame sentinel.
    Unknown,
    /// `VR`: firmware version string.
    Version(Option<String>),
}

impl FlooMessage {
    pub fn header(&self) -> Header {
        match self {
            FlooMessage::CodecInUse(_) => Header::Ac,
            FlooMessage::Address(_) => Header::Ad,
            FlooMessage::AudioMode(_) => Header::Am,
            FlooMessage::BroadcastKey(_) => Header::Be,
            FlooMessage::BroadcastMode(_) => Header::Bm,
            FlooMessage::BroadcastName(_) => Header::Bn,
            FlooMessage::ClearPaired(_) => Header::Cp,
            FlooMessage::ConnectTrust(_) => Header::Ct,
            FlooMessage::Disconnect => Header::Dc,
            FlooMessage::Error(_) => Header::Er,
            FlooMessage::FactoryDefault => Header::Fd,
            FlooMessage::PairedName(_) => Header::Fn,
            FlooMessage::Feature(_) => Header::Ft,
            FlooMessage::Inquiry => Header::Iq,
            FlooMessage::LeAudioState(_) => Header::La,
            FlooMessage::PreferLea(_) => Header::Lf,
            FlooMessage::Discoverable(_) => Header::Md,
            FlooMessage::Ok => Header::Ok,
            FlooMessage::PairedList(_) => Header::Pl,
            FlooMessage::SourceState(_) => Header::St,
            FlooMessage::ToggleConnection(_) => Header::Tc,
            FlooMessage::Unknown => Header::Unknown,
            FlooMessage::Version(_) => Header::Vr,
        }
    }

    /// Encode as a send frame: `BC:<HH>[=<payload>]\r\n`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(b"BC:");
        out.extend_from_slice(self.header().as_str().as_bytes());
        if let Some(payload) = self.payload_string() {
            out.push(b'=');
            out.extend_from_slice(payload.as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    fn payload_string(&self) -> Option<String> {
        match self {
            FlooMessage::CodecInUse(Some(c)) => Some(format!(
                "{:02X},{:02X},{:04X},{:04X},{:04X},{:04X},{:04X},{:04X}",
                c.codec,
                c.rssi,
                c.rate,
                c.spk_sample_rate / 10,
                c.mic_sample_rate / 10,
                c.sdu_interval,
                c.transport_delay,
                c.present_delay
            )),
            FlooMessage::Address(Some(addr)) => Some(addr.clone()),
            FlooMessage::AudioMode(Some(v))
            | FlooMessage::BroadcastMode(Some(v))
            | FlooMessage::ClearPaired(Some(v))
            | FlooMessage::ConnectTrust(Some(v))
            | FlooMessage::Feature(Some(v))
            | FlooMessage::LeAudioState(Some(v))
            | FlooMessage::PreferLea(Some(v))
            | FlooMessage::Discoverable(Some(v))
            | FlooMessage::SourceState(Some(v))
            | FlooMessage::ToggleConnection(Some(v)) => Some(format!("{v:02X}")),
            // The firmware expects the error code in decimal.
            FlooMessage::Error(code) => Some(format!("{code:02}")),
            FlooMessage::PairedName(Some(PairedName::Entry {
                index,
                address,
                name,
            })) => Some(format!("{index:02X},{address},{name}")),
            FlooMessage::PairedName(Some(PairedName::End { index })) => {
                Some(format!("{index:02X}"))
            }
            FlooMessage::PairedList(Some(e)) => {
                Some(format!("{:02X},{},{}", e.index, e.address, e.name))
            }
            FlooMessage::BroadcastKey(Some(s))
            | FlooMessage::BroadcastName(Some(s))
            | FlooMessage::Version(Some(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

// Decoders. `payload` is the full receive frame including the header, so the
// field offsets below are absolute, matching the wire layout tables.

fn hex_u8(bytes: &[u8]) -> Option<u8> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
}

fn hex_u16(bytes: &[u8]) -> Option<u16> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| u16::from_str_radix(s, 16).ok())
}

fn dec_u8(bytes: &[u8]) -> Option<u8> {
    std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok())
}

fn utf8(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}

pub(super) fn decode_ok(payload: &[u8]) -> Option<FlooMessage> {
    (payload.len() == 2).then_some(FlooMessage::Ok)
}

pub(super) fn decode_er(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() != 5 {
        return None;
    }
    dec_u8(&payload[3..5]).map(FlooMessage::Error)
}

pub(super) fn decode_am(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 5 {
        return None;
    }
    hex_u8(&payload[3..5]).map(|v| FlooMessage::AudioMode(Some(v)))
}

pub(super) fn decode_st(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() != 5 {
        return None;
    }
    hex_u8(&payload[3..5]).map(|v| FlooMessage::SourceState(Some(v)))
}

pub(super) fn decode_bm(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() != 5 {
        return None;
    }
    hex_u8(&payload[3..5]).map(|v| FlooMessage::BroadcastMode(Some(v)))
}

pub(super) fn decode_ft(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 5 {
        return None;
    }
    hex_u8(&payload[3..5]).map(|v| FlooMessage::Feature(Some(v)))
}

pub(super) fn decode_lf(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 5 {
        return None;
    }
    hex_u8(&payload[3..5]).map(|v| FlooMessage::PreferLea(Some(v)))
}

pub(super) fn decode_la(payload: &[u8]) -> Option<FlooMessage> {
    // The firmware reports LA in decimal, unlike the other state bytes.
    if payload.len() != 5 {
        return None;
    }
    dec_u8(&payload[3..5]).map(|v| FlooMessage::LeAudioState(Some(v)))
}

pub(super) fn decode_vr(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 4 {
        return None;
    }
    utf8(&payload[3..]).map(|s| FlooMessage::Version(Some(s)))
}

pub(super) fn decode_bn(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 4 {
        return None;
    }
    utf8(&payload[3..]).map(|s| FlooMessage::BroadcastName(Some(s)))
}

pub(super) fn decode_ad(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() != 15 {
        return None;
    }
    utf8(&payload[3..15]).map(|s| FlooMessage::Address(Some(s)))
}

pub(super) fn decode_fn(payload: &[u8]) -> Option<FlooMessage> {
    let index = dec_u8(payload.get(3..5)?)?;
    match payload.len() {
        5 => Some(FlooMessage::PairedName(Some(PairedName::End { index }))),
        18 => Some(FlooMessage::PairedName(Some(PairedName::Entry {
            index,
            address: utf8(&payload[6..])?,
            name: "No Name".to_string(),
        }))),
        n if n > 19 => Some(FlooMessage::PairedName(Some(PairedName::Entry {
            index,
            address: utf8(&payload[6..18])?,
            name: String::from_utf8_lossy(&payload[19..]).into_owned(),
        }))),
        _ => None,
    }
}

pub(super) fn decode_pl(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 20 {
        return None;
    }
    Some(FlooMessage::PairedList(Some(PairedListEntry {
        index: dec_u8(&payload[3..5])?,
        address: utf8(&payload[6..18])?,
        name: utf8(&payload[19..])?,
    })))
}

pub(super) fn decode_ac(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 5 {
        return None;
    }
    let mut status = CodecStatus::new(hex_u8(&payload[3..5])?);
    // Each documented length populates one more field of the prefix; any
    // other length degrades to codec-only.
    match payload.len() {
        5 => {}
        13 | 18 | 23 | 38 => {
            status.rssi = hex_u8(&payload[6..8])?;
            status.rate = hex_u16(&payload[9..13])?;
            if payload.len() >= 18 {
                status.spk_sample_rate = u32::from(hex_u16(&payload[14..18])?) * 10;
            }
            if payload.len() >= 23 {
                status.mic_sample_rate = u32::from(hex_u16(&payload[19..23])?) * 10;
            }
            if payload.len() == 38 {
                status.sdu_interval = hex_u16(&payload[24..28])?;
                status.transport_delay = hex_u16(&payload[29..33])?;
                status.present_delay = hex_u16(&payload[34..38])?;
            }
        }
        _ => {}
    }
    Some(FlooMessage::CodecInUse(Some(status)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_frame_has_no_payload() {
        assert_eq!(FlooMessage::Version(None).encode(), b"BC:VR\r\n");
        assert_eq!(FlooMessage::PairedName(None).encode(), b"BC:FN\r\n");
        assert_eq!(FlooMessage::Disconnect.encode(), b"BC:DC\r\n");
    }

    #[test]
    fn set_frame_uses_padded_hex() {
        assert_eq!(FlooMessage::AudioMode(Some(1)).encode(), b"BC:AM=01\r\n");
        assert_eq!(
            FlooMessage::BroadcastMode(Some(0x2A)).encode(),
            b"BC:BM=2A\r\n"
        );
        assert_eq!(
            FlooMessage::ToggleConnection(Some(0)).encode(),
            b"BC:TC=00\r\n"
        );
    }

    #[test]
    fn string_payloads_are_verbatim() {
        assert_eq!(
            FlooMessage::BroadcastName(Some("Living Room".into())).encode(),
            b"BC:BN=Living Room\r\n"
        );
        assert_eq!(
            FlooMessage::BroadcastKey(Some("s3cret".into())).encode(),
            b"BC:BE=s3cret\r\n"
        );
    }

    #[test]
    fn error_code_is_decimal() {
        assert_eq!(FlooMessage::Error(12).encode(), b"BC:ER=12\r\n");
        assert_eq!(decode_er(b"ER=07"), Some(FlooMessage::Error(7)));
        assert_eq!(decode_er(b"ER=0A"), None);
    }

    #[test]
    fn audio_mode_round_trip() {
        let encoded = FlooMessage::AudioMode(Some(0x81)).encode();
        let frame = &encoded[3..encoded.len() - 2];
        assert_eq!(decode_am(frame), Some(FlooMessage::AudioMode(Some(0x81))));
    }

    #[test]
    fn source_state_round_trip() {
        let encoded = FlooMessage::SourceState(Some(6)).encode();
        let frame = &encoded[3..encoded.len() - 2];
        assert_eq!(decode_st(frame), Some(FlooMessage::SourceState(Some(6))));
    }

    #[test]
    fn broadcast_mode_round_trip() {
        let encoded = FlooMessage::BroadcastMode(Some(0x0F)).encode();
        let frame = &encoded[3..encoded.len() - 2];
        assert_eq!(
            decode_bm(frame),
            Some(FlooMessage::BroadcastMode(Some(0x0F)))
        );
    }

    #[test]
    fn short_payload_yields_none() {
        assert_eq!(decode_st(b"ST=1"), None);
        assert_eq!(decode_bm(b"BM"), None);
        assert_eq!(decode_vr(b"VR="), None);
        assert_eq!(decode_er(b"ER=1"), None);
    }

    #[test]
    fn malformed_hex_yields_none() {
        assert_eq!(decode_st(b"ST=ZZ"), None);
        assert_eq!(decode_ft(b"FT=x1"), None);
    }

    #[test]
    fn version_decodes_utf8_tail() {
        assert_eq!(
            decode_vr(b"VR=AS1.2.3"),
            Some(FlooMessage::Version(Some("AS1.2.3".into())))
        );
    }

    #[test]
    fn ac_length_5_is_codec_only() {
        let msg = decode_ac(b"AC=03").unwrap();
        assert_eq!(msg, FlooMessage::CodecInUse(Some(CodecStatus::new(3))));
    }

    #[test]
    fn ac_length_13_adds_rssi_and_rate() {
        let msg = decode_ac(b"AC=06,C8,1F40").unwrap();
        let FlooMessage::CodecInUse(Some(status)) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(status.codec, 6);
        assert_eq!(status.rssi, 0xC8);
        assert_eq!(status.rate, 0x1F40);
        assert_eq!(status.spk_sample_rate, 0);
    }

    #[test]
    fn ac_length_18_adds_speaker_rate() {
        let msg = decode_ac(b"AC=06,C8,1F40,12C0").unwrap();
        let FlooMessage::CodecInUse(Some(status)) = msg else {
            panic!("wrong variant");
        };
        // Wire unit is 10 Hz: 0x12C0 = 4800 -> 48000 Hz.
        assert_eq!(status.spk_sample_rate, 48_000);
        assert_eq!(status.mic_sample_rate, 0);
    }

    #[test]
    fn ac_length_23_adds_mic_rate() {
        let msg = decode_ac(b"AC=06,C8,1F40,12C0,0640").unwrap();
        let FlooMessage::CodecInUse(Some(status)) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(status.mic_sample_rate, 16_000);
        assert_eq!(status.sdu_interval, 0);
    }

    #[test]
    fn ac_length_38_populates_all_fields() {
        let msg = decode_ac(b"AC=06,C8,1F40,12C0,0640,2710,03E8,00FA").unwrap();
        let FlooMessage::CodecInUse(Some(status)) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(status.codec, 6);
        assert_eq!(status.rssi, 0xC8);
        assert_eq!(status.rate, 0x1F40);
        assert_eq!(status.spk_sample_rate, 48_000);
        assert_eq!(status.mic_sample_rate, 16_000);
        assert_eq!(status.sdu_interval, 0x2710);
        assert_eq!(status.transport_delay, 0x03E8);
        assert_eq!(status.present_delay, 0x00FA);
    }

    #[test]
    fn ac_odd_length_falls_back_to_codec_only() {
        let msg = decode_ac(b"AC=06,C8").unwrap();
        assert_eq!(msg, FlooMessage::CodecInUse(Some(CodecStatus::new(6))));
        assert_eq!(decode_ac(b"AC"), None);
    }

    #[test]
    fn ac_full_round_trip() {
        let status = CodecStatus {
            codec: 10,
            rssi: 200,
            rate: 2400,
            spk_sample_rate: 48_000,
            mic_sample_rate: 32_000,
            sdu_interval: 100,
            transport_delay: 1000,
            present_delay: 250,
        };
        let encoded = FlooMessage::CodecInUse(Some(status)).encode();
        let frame = &encoded[3..encoded.len() - 2];
        assert_eq!(frame.len(), 38);
        assert_eq!(decode_ac(frame), Some(FlooMessage::CodecInUse(Some(status))));
    }

    #[test]
    fn rssi_and_delay_helpers() {
        let status = CodecStatus {
            rssi: 200,
            transport_delay: 1000,
            present_delay: 250,
            ..CodecStatus::default()
        };
        assert_eq!(status.rssi_dbm(), -56);
        assert!((status.transport_delay_ms() - 10.0).abs() < f32::EPSILON);
        assert!((status.present_delay_ms() - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn fn_terminator_round_trip() {
        let msg = FlooMessage::PairedName(Some(PairedName::End { index: 3 }));
        let encoded = msg.encode();
        let frame = &encoded[3..encoded.len() - 2];
        assert_eq!(decode_fn(frame), Some(msg));
    }

    #[test]
    fn fn_entry_round_trip() {
        let msg = FlooMessage::PairedName(Some(PairedName::Entry {
            index: 1,
            address: "123456789ABC".into(),
            name: "My Headphones".into(),
        }));
        let encoded = msg.encode();
        let frame = &encoded[3..encoded.len() - 2];
        assert_eq!(decode_fn(frame), Some(msg));
    }

    #[test]
    fn fn_entry_without_name_defaults() {
        let msg = decode_fn(b"FN=02,123456789ABC").unwrap();
        assert_eq!(
            msg,
            FlooMessage::PairedName(Some(PairedName::Entry {
                index: 2,
                address: "123456789ABC".into(),
                name: "No Name".into(),
            }))
        );
    }

    #[test]
    fn fn_length_19_is_rejected() {
        assert_eq!(decode_fn(b"FN=02,123456789ABC,"), None);
    }

    #[test]
    fn pl_entry_decodes() {
        let msg = decode_pl(b"PL=01,123456789ABC,Speaker").unwrap();
        assert_eq!(
            msg,
            FlooMessage::PairedList(Some(PairedListEntry {
                index: 1,
                address: "123456789ABC".into(),
                name: "Speaker".into(),
            }))
        );
        assert_eq!(decode_pl(b"PL=01,123456789ABC"), None);
    }

    #[test]
    fn ok_requires_bare_header() {
        assert_eq!(decode_ok(b"OK"), Some(FlooMessage::Ok));
        assert_eq!(decode_ok(b"OK=00"), None);
    }

    #[test]
    fn la_is_decimal() {
        assert_eq!(
            decode_la(b"LA=10"),
            Some(FlooMessage::LeAudioState(Some(10)))
        );
        assert_eq!(decode_la(b"LA=0A"), None);
    }
}
