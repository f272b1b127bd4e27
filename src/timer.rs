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

//! Cancelable one-shot timer on a short-lived thread.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// Handle to a scheduled callback. Dropping the handle cancels the timer if
/// it has not fired yet.
pub struct OneShotTimer {
    _cancel: Sender<()>,
}

impl OneShotTimer {
    pub fn cancel(self) {
        // Dropping the sender disconnects the waiter.
    }
}

/// Run `callback` after `delay` unless the returned handle is dropped first.
///
/// The callback runs on a dedicated short-lived thread; anything it touches
/// must tolerate being reached from there.
pub fn schedule<F>(delay: Duration, callback: F) -> OneShotTimer
where
    F: FnOnce() + Send + 'static,
{
    let (cancel, armed) = bounded::<()>(1);
    thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = armed.recv_timeout(delay) {
            callback();
        }
    });
    OneShotTimer { _cancel: cancel }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = schedule(Duration::from_millis(10), move || {
            flag.store(true, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(100));
        assert!(fired.load(Ordering::SeqCst));
        drop(timer);
    }

    #[test]
    fn drop_cancels() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = schedule(Duration::from_millis(50), move || {
            flag.store(true, Ordering::SeqCst);
        });
        timer.cancel();
        thread::sleep(Duration::from_millis(150));
        assert!(!fired.load(Ordering::SeqCst));
    }
}
