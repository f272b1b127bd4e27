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

//! Bounded auto-reconnect after a streaming interruption.
//!
//! Armed when a fresh handshake completes, the device was streaming right
//! before the link dropped, and the new source state is exactly idle. Each
//! attempt toggles the connection to the most-recently-used device and
//! checks the result after a fixed delay; retries back off along a delay
//! table until the attempt budget is spent.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{FlooStateMachine, Inner, LinkState};
use crate::dongle::{source_state, FlooMessage};
use crate::timer;

const RECONNECT_DELAYS_SECS: [u64; 8] = [2, 3, 4, 5, 6, 8, 10, 15];
const MAX_ATTEMPTS: u32 = 8;
const RESULT_CHECK_DELAY: Duration = Duration::from_secs(3);

impl FlooStateMachine {
    /// Called once per completed handshake. Consumes the pre-disconnect
    /// marker either way so a later manual disconnect cannot re-arm it.
    pub(super) fn evaluate_auto_reconnect(&self, inner: &mut Inner) {
        let Some(before) = inner.state_before_disconnect.take() else {
            return;
        };
        if before < source_state::STREAMING_START {
            return;
        }
        if inner.source_state != Some(source_state::IDLE) {
            debug!(
                state = ?inner.source_state,
                "not idle after reconnect, leaving recovery to the device"
            );
            return;
        }
        info!(before, "streaming was interrupted, starting auto-reconnect");
        inner.reconnect_attempts = 0;
        self.schedule_reconnect(inner);
    }

    /// Schedule the next attempt, or give up when the budget is spent.
    pub(super) fn schedule_reconnect(&self, inner: &mut Inner) {
        if inner.reconnect_attempts >= MAX_ATTEMPTS {
            warn!(attempts = inner.reconnect_attempts, "auto-reconnect giving up");
            inner.reconnect_timer = None;
            inner.last_saved_state = None;
            inner.settings.set_last_streaming_state(None);
            self.delegate.reconnect_gave_up();
            return;
        }
        let index = (inner.reconnect_attempts as usize).min(RECONNECT_DELAYS_SECS.len() - 1);
        let delay = Duration::from_secs(RECONNECT_DELAYS_SECS[index]);
        debug!(attempt = inner.reconnect_attempts + 1, ?delay, "scheduling reconnect");
        let this = self.clone();
        inner.reconnect_timer = Some(timer::schedule(delay, move || {
            this.run_reconnect_attempt();
        }));
    }

    fn run_reconnect_attempt(&self) {
        let mut inner = self.inner.lock();
        // A link bounce since scheduling cleared the timer slot; the state
        // re-checks below keep a racing expiry harmless.
        if inner.link != LinkState::Connected {
            return;
        }
        inner.reconnect_timer = None;
        match inner.source_state {
            Some(s) if s >= source_state::STREAMING_START => {
                debug!("streaming already restored, reconnect canceled");
                inner.reconnect_attempts = 0;
            }
            Some(source_state::IDLE) => {
                inner.reconnect_attempts += 1;
                info!(attempt = inner.reconnect_attempts, "toggling connection to MRU device");
                self.issue_internal(&mut inner, FlooMessage::ToggleConnection(Some(0)));
                let this = self.clone();
                inner.reconnect_timer = Some(timer::schedule(RESULT_CHECK_DELAY, move || {
                    this.check_reconnect_result();
                }));
            }
            _ => {
                // Mid-transition; defer without spending an attempt.
                self.schedule_reconnect(&mut inner);
            }
        }
    }

    fn check_reconnect_result(&self) {
        let mut inner = self.inner.lock();
        if inner.link != LinkState::Connected {
            return;
        }
        inner.reconnect_timer = None;
        match inner.source_state {
            Some(s) if s >= source_state::STREAMING_START => {
                info!("auto-reconnect succeeded");
                inner.reconnect_attempts = 0;
            }
            Some(source_state::IDLE) => self.schedule_reconnect(&mut inner),
            _ => {}
        }
    }

    fn issue_internal(&self, inner: &mut Inner, msg: FlooMessage) {
        inner.last_cmd = Some(msg.clone());
        inner.pending = None;
        self.sink.send_msg(&msg);
    }
}
