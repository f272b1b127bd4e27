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

//! Connection interface: the discover/open/read/dispatch loop.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::message::FlooMessage;
use super::monitor::{PollStatus, PortMonitor, SharedPort};
use super::parser::parse_frame;

/// Transport error conditions surfaced to the delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Device present but the port is held by another process.
    PortBusy,
    /// Open or read failed for a non-contention reason.
    PortError,
}

/// Consumer of link events and parsed messages.
///
/// Methods are invoked on the interface's polling thread; the delegate
/// marshals onto its own context as needed.
pub trait InterfaceDelegate {
    /// Called on every open/close transition of the link.
    fn interface_state(&self, up: bool, port: Option<&str>);
    /// Called for every successfully parsed frame.
    fn handle_message(&self, msg: FlooMessage);
    /// Transport conditions that are not themselves link transitions.
    fn connection_error(&self, kind: ConnectionErrorKind);
}

const IDLE_POLL: Duration = Duration::from_millis(10);
const SLEEP_POLL: Duration = Duration::from_millis(500);
const RETRY_BACKOFF: Duration = Duration::from_secs(1);
const BUSY_BACKOFF: Duration = Duration::from_secs(5);

// Re-check device enumeration after this many empty read polls (~1 s).
const ENUM_CHECK_TICKS: u32 = 100;
const MAX_PARSE_FAILURES: u32 = 3;

/// Drives the serial link on a dedicated thread and bridges it to a
/// delegate.
///
/// `run` owns the polling loop for the lifetime of the process; `send_msg`
/// and `set_sleep` are safe to call from any thread.
pub struct FlooInterface {
    port: SharedPort,
    sleeping: AtomicBool,
}

impl Default for FlooInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl FlooInterface {
    pub fn new() -> Self {
        Self {
            port: Arc::new(Mutex::new(None)),
            sleeping: AtomicBool::new(false),
        }
    }

    /// Pause or resume polling without tearing the link down.
    pub fn set_sleep(&self, sleep: bool) {
        self.sleeping.store(sleep, Ordering::Relaxed);
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping.load(Ordering::Relaxed)
    }

    /// Fire-and-forget write of one command frame.
    ///
    /// Write failures are logged, not propagated; the caller observes the
    /// missing reply through its own timeout handling.
    pub fn send_msg(&self, msg: &FlooMessage) {
        if self.is_sleeping() {
            return;
        }
        let mut guard = self.port.lock();
        let Some(port) = guard.as_mut() else {
            debug!(header = msg.header().as_str(), "send with port closed");
            return;
        };
        if let Err(e) = port.write_all(&msg.encode()) {
            warn!(header = msg.header().as_str(), error = %e, "serial write failed");
        }
    }

    /// Discover/open/read/dispatch loop, intended to run for the lifetime
    /// of the process on its own thread.
    pub fn run(&self, delegate: &dyn InterfaceDelegate) {
        let mut monitor = PortMonitor::new(Arc::clone(&self.port));
        let mut parse_failures = 0u32;

        loop {
            if self.is_sleeping() {
                thread::sleep(SLEEP_POLL);
                continue;
            }
            match monitor.poll() {
                PollStatus::Open => {
                    if !self.pump(&monitor, delegate, &mut parse_failures) {
                        let port = monitor.port_name().map(String::from);
                        monitor.reset();
                        delegate.interface_state(false, port.as_deref());
                        thread::sleep(RETRY_BACKOFF);
                    }
                }
                PollStatus::Opened(name) => {
                    parse_failures = 0;
                    delegate.interface_state(true, Some(&name));
                }
                PollStatus::Busy => {
                    delegate.connection_error(ConnectionErrorKind::PortBusy);
                    thread::sleep(BUSY_BACKOFF);
                }
                PollStatus::Error => {
                    delegate.connection_error(ConnectionErrorKind::PortError);
                    thread::sleep(RETRY_BACKOFF);
                }
                PollStatus::Lost => {
                    delegate.interface_state(false, None);
                    thread::sleep(RETRY_BACKOFF);
                }
                PollStatus::Idle => {
                    thread::sleep(RETRY_BACKOFF);
                }
            }
        }
    }

    /// Drain and dispatch waiting lines. Returns false when the link must
    /// be torn down (I/O error or a wedged stream of unparseable lines).
    fn pump(
        &self,
        monitor: &PortMonitor,
        delegate: &dyn InterfaceDelegate,
        parse_failures: &mut u32,
    ) -> bool {
        let mut idle_ticks = 0u32;
        loop {
            if self.is_sleeping() {
                return true;
            }
            match monitor.read_line() {
                Ok(None) => {
                    idle_ticks += 1;
                    if idle_ticks >= ENUM_CHECK_TICKS {
                        return true;
                    }
                    thread::sleep(IDLE_POLL);
                }
                Ok(Some(line)) => {
                    idle_ticks = 0;
                    if line.len() < 2 {
                        // Line noise, not a decode failure.
                        continue;
                    }
                    match parse_frame(&line) {
                        Some(msg) => {
                            *parse_failures = 0;
                            delegate.handle_message(msg);
                        }
                        None => {
                            *parse_failures += 1;
                            warn!(
                                line = %String::from_utf8_lossy(&line),
                                failures = *parse_failures,
                                "unparseable frame"
                            );
                            if *parse_failures >= MAX_PARSE_FAILURES {
                                *parse_failures = 0;
                                return false;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "serial read failed");
                    return false;
                }
            }
        }
    }
}
