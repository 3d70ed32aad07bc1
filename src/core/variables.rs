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

//! Core configuration variables
//!
//! Cores expose tunables (frameskip, color correction, dynarec toggles) as
//! string key/value pairs. The effective set for a session is the system
//! profile's defaults overlaid with the user's overrides from settings, and
//! it is pushed to the core as a full replacement on readiness and on every
//! resume. Pushing the same set twice is harmless.
//!
//! Override keys in settings are prefixed: `cv_<system>_<variable>`. Boolean
//! settings values become the `enabled`/`disabled` strings cores expect.

use serde::{Deserialize, Serialize};

use crate::config::settings::Settings;
use crate::config::system::SystemProfile;

/// One core variable, e.g. `("pcsx_rearmed_drc", "disabled")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreVariable {
    pub key: String,
    pub value: String,
}

impl CoreVariable {
    pub fn new(key: &str, value: &str) -> Self {
        CoreVariable {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Settings key holding the user's override for a core variable
pub fn variable_pref_key(profile: &SystemProfile, variable: &str) -> String {
    format!("cv_{}_{}", profile.system.id(), variable)
}

/// Effective variable set for a (system, core) pair
///
/// Profile defaults merged with user overrides; overrides for exposed
/// variables with no default are included too. The result is sorted by key
/// so repeated pushes are byte-identical.
pub fn variables_for_core(profile: &SystemProfile, settings: &dyn Settings) -> Vec<CoreVariable> {
    let mut variables: Vec<CoreVariable> = Vec::new();

    for (key, default_value) in profile.default_variables {
        let value = read_override(profile, settings, key).unwrap_or_else(|| default_value.to_string());
        variables.push(CoreVariable::new(key, &value));
    }

    for key in profile.exposed_variables {
        if variables.iter().any(|v| v.key == *key) {
            continue;
        }
        if let Some(value) = read_override(profile, settings, key) {
            variables.push(CoreVariable::new(key, &value));
        }
    }

    variables.sort_by(|a, b| a.key.cmp(&b.key));
    variables
}

/// Read one override, translating stored booleans to core conventions
fn read_override(profile: &SystemProfile, settings: &dyn Settings, key: &str) -> Option<String> {
    let raw = settings.get_string(&variable_pref_key(profile, key))?;
    let value = match raw.as_str() {
        "true" => "enabled".to_string(),
        "false" => "disabled".to_string(),
        _ => raw,
    };
    Some(value)
}
