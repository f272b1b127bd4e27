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

//! Receive-frame dispatch.

use tracing::trace;

use super::message::{self, FlooMessage};

/// Parse a delimiter-stripped receive frame into a typed message.
///
/// The first two bytes select the decoder; the decoder gets the whole frame
/// since field offsets are absolute. An unregistered or non-ASCII header
/// yields [`FlooMessage::Unknown`] so the caller can log and move on, while
/// a malformed payload under a registered header yields `None` and counts as
/// a parse failure.
pub fn parse_frame(payload: &[u8]) -> Option<FlooMessage> {
    if payload.len() < 2 {
        return None;
    }
    let Ok(header) = std::str::from_utf8(&payload[..2]) else {
        return Some(FlooMessage::Unknown);
    };
    match header {
        "OK" => message::decode_ok(payload),
        "PL" => message::decode_pl(payload),
        "AD" => message::decode_ad(payload),
        "AM" => message::decode_am(payload),
        "LA" => message::decode_la(payload),
        "ST" => message::decode_st(payload),
        "BM" => message::decode_bm(payload),
        "BN" => message::decode_bn(payload),
        "FN" => message::decode_fn(payload),
        "ER" => message::decode_er(payload),
        "AC" => message::decode_ac(payload),
        "LF" => message::decode_lf(payload),
        "VR" => message::decode_vr(payload),
        "FT" => message::decode_ft(payload),
        _ => {
            trace!(header, "unregistered frame header");
            Some(FlooMessage::Unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dongle::message::PairedName;

    #[test]
    fn dispatches_registered_headers() {
        assert_eq!(parse_frame(b"OK"), Some(FlooMessage::Ok));
        assert_eq!(parse_frame(b"ST=06"), Some(FlooMessage::SourceState(Some(6))));
        assert_eq!(
            parse_frame(b"VR=AS2.0.1"),
            Some(FlooMessage::Version(Some("AS2.0.1".into())))
        );
        assert_eq!(
            parse_frame(b"FN=00"),
            Some(FlooMessage::PairedName(Some(PairedName::End { index: 0 })))
        );
    }

    #[test]
    fn unregistered_header_is_unknown() {
        assert_eq!(parse_frame(b"ZZ=01"), Some(FlooMessage::Unknown));
        // MD and CP are send-only; the device never replies with them, so
        // they are not registered for decode.
        assert_eq!(parse_frame(b"MD=01"), Some(FlooMessage::Unknown));
        assert_eq!(parse_frame(b"CP"), Some(FlooMessage::Unknown));
    }

    #[test]
    fn non_ascii_header_is_unknown() {
        assert_eq!(parse_frame(&[0xFF, 0xFE, b'=', b'0']), Some(FlooMessage::Unknown));
    }

    #[test]
    fn short_frame_is_rejected() {
        assert_eq!(parse_frame(b""), None);
        assert_eq!(parse_frame(b"A"), None);
    }

    #[test]
    fn malformed_registered_payload_is_none() {
        assert_eq!(parse_frame(b"ST=XX"), None);
        assert_eq!(parse_frame(b"AM"), None);
        assert_eq!(parse_frame(b"OK=1"), None);
    }
}
