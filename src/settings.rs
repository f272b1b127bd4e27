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

//! Persistent key-value settings store.
//!
//! A small JSON document under the user config directory. Saves are atomic
//! (temp file + rename) so a crash mid-write never truncates the store.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const APP_DIR: &str = "FlooCast";
const SETTINGS_FILE: &str = "settings.json";

const LAST_STREAMING_STATE: &str = "last_streaming_state";

pub struct Settings {
    path: PathBuf,
    data: Map<String, Value>,
}

impl Settings {
    /// Load from the default per-user location, starting empty when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(SETTINGS_FILE);
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "settings file malformed, starting fresh");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        debug!(path = %path.display(), keys = data.len(), "settings loaded");
        Self { path, data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    /// Write the store atomically.
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(&Value::Object(self.data.clone()))?;
        fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600));
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Source state persisted while the device was last streaming, if any.
    pub fn last_streaming_state(&self) -> Option<u8> {
        self.get(LAST_STREAMING_STATE)
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
    }

    /// Persist or clear the streaming marker, saving immediately.
    pub fn set_last_streaming_state(&mut self, state: Option<u8>) {
        match state {
            Some(v) => self.set(LAST_STREAMING_STATE, Value::from(v)),
            None => self.remove(LAST_STREAMING_STATE),
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to persist settings");
        }
    }
}
