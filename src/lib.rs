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

//! Device communication core for the FlooGoo FMA120 USB Bluetooth audio
//! dongle.
//!
//! The dongle speaks a line-oriented ASCII protocol over USB serial. This
//! crate provides the message codec, the port discovery and read loop, and
//! the command/response state machine that handshakes with the device,
//! tracks its reported state, and auto-reconnects after a streaming
//! interruption. Consumers implement [`delegate::FlooDelegate`] (or drain an
//! [`delegate::IndicationSender`] channel) to observe device state.

pub mod delegate;
pub mod dongle;
pub mod settings;
pub mod state;
mod timer;

pub use delegate::{FlooDelegate, Indication, IndicationSender};
pub use dongle::{FlooInterface, FlooMessage};
pub use settings::Settings;
pub use state::{CommandError, FlooStateMachine};
