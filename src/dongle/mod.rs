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

//! Dongle communication module.
//!
//! Serial protocol codec, frame parser, port monitor and the connection
//! interface that feeds parsed messages to a delegate.

pub mod bits;
pub mod interface;
pub mod message;
pub mod monitor;
pub mod parser;

pub use bits::{source_state, AudioMode, BroadcastMode, FeatureFlags};
pub use interface::{ConnectionErrorKind, FlooInterface, InterfaceDelegate};
pub use message::{CodecStatus, FlooMessage, Header, PairedListEntry, PairedName};
pub use monitor::PortMonitor;
pub use parser::parse_frame;
