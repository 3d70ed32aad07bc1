// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! Read-only settings access
//!
//! The session never writes settings; it only consults them. Everything is
//! string-keyed so the embedding frontend can back the [`Settings`] trait
//! with whatever preference store it already has. [`FileSettings`] is a
//! TOML-backed implementation for hosts that do not, and
//! [`MemorySettings`] is handy for tests and programmatic setup.
//!
//! Key conventions used across the crate:
//!
//! - `auto_save` - bool, gate for automatic save states
//! - `input_device_enabled_<device>` - bool, per-device opt in/out
//! - `input_bindings_<device>` - JSON map of key remappings
//! - `input_shortcut_<device>_<action>` - JSON two-key combo
//! - `controller_type_<system>_<port>` - controller config name
//! - `cv_<system>_<key>` - core variable override

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Settings key for the auto-save gate
pub const AUTO_SAVE_ENABLED_KEY: &str = "auto_save";

/// Read-only, string-keyed settings store
pub trait Settings: Send + Sync {
    /// Raw string value for `key`, if present
    fn get_string(&self, key: &str) -> Option<String>;

    /// Boolean value for `key`, falling back to `default`
    ///
    /// Accepts `true`/`false` and `1`/`0`; anything else falls back too.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_string(key).as_deref() {
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            _ => default,
        }
    }
}

/// Normalize a device or system name into a settings key fragment
///
/// Lowercases and collapses anything that is not alphanumeric to `_` so
/// names like "8BitDo SN30 Pro" become stable key parts.
pub fn key_fragment(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// TOML file backed settings
///
/// The file is a flat table; string, boolean, and numeric values are
/// accepted and exposed through the string API.
///
/// # Example
///
/// ```no_run
/// use retrodock::config::{FileSettings, Settings};
///
/// let settings = FileSettings::load("retrodock.toml")?;
/// let auto_save = settings.get_bool("auto_save", true);
/// # Ok::<(), retrodock::SessionError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSettings {
    values: HashMap<String, String>,
}

impl FileSettings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let table: HashMap<String, toml::Value> = toml::from_str(&contents)?;

        let mut values = HashMap::new();
        for (key, value) in table {
            let flat = match value {
                toml::Value::String(s) => s,
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                other => {
                    log::warn!("Ignoring non-scalar settings value for '{}': {}", key, other);
                    continue;
                }
            };
            values.insert(key, flat);
        }

        log::info!("Loaded {} settings from file", values.len());
        Ok(FileSettings { values })
    }
}

impl Settings for FileSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// In-memory settings for tests and programmatic configuration
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        MemorySettings::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

impl Settings for MemorySettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
