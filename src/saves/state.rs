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

//! Save-state data model
//!
//! A save state is an opaque serialized-core payload plus a small metadata
//! record. The metadata travels as a JSON sidecar next to the payload file and
//! carries everything needed to restore the snapshot safely on a later run:
//! the disk that was inserted (multi-disk systems restore it before loading),
//! the state-format version of the core that produced it (a mismatch refuses
//! the restore outright), and the capture timestamp shown in slot listings.
//!
//! Snapshots written before the sidecar existed have no metadata file;
//! [`StateMetadata::default`] stands in for them. Its version of zero never
//! matches a real core version, so such snapshots are treated as incompatible
//! rather than fed to a core that may crash on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured core snapshot together with its sidecar metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveState {
    /// Opaque serialized core state
    pub payload: Vec<u8>,
    pub metadata: StateMetadata,
}

/// Sidecar record describing a snapshot
///
/// Serialized as JSON next to the payload file. Fields missing from an old
/// sidecar fall back to their defaults on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMetadata {
    /// Index of the disk that was inserted when the snapshot was taken
    pub disk_index: u32,
    /// State-format version of the producing core
    pub version: u32,
    /// Capture time
    pub saved_at: DateTime<Utc>,
}

impl Default for StateMetadata {
    fn default() -> Self {
        StateMetadata {
            disk_index: 0,
            version: 0,
            saved_at: DateTime::UNIX_EPOCH,
        }
    }
}

/// Summary of one save slot, as shown in slot listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// Zero-based slot index
    pub index: usize,
    pub exists: bool,
    /// Capture time of the stored snapshot, when one exists
    pub saved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json_round_trip() {
        let metadata = StateMetadata {
            disk_index: 2,
            version: 1,
            saved_at: Utc::now(),
        };

        let json = serde_json::to_string(&metadata).expect("serialize");
        let decoded: StateMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_default_metadata_is_incompatible_with_real_cores() {
        let metadata = StateMetadata::default();

        assert_eq!(metadata.version, 0);
        assert_eq!(metadata.disk_index, 0);
        assert_eq!(metadata.saved_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_partial_sidecar_fills_missing_fields() {
        // Sidecars written by older builds may lack newer fields.
        let decoded: StateMetadata = serde_json::from_str(r#"{"disk_index":1}"#).expect("deserialize");

        assert_eq!(decoded.disk_index, 1);
        assert_eq!(decoded.version, 0);
        assert_eq!(decoded.saved_at, DateTime::UNIX_EPOCH);
    }
}
