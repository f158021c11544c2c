#![allow(dead_code)]

//! Configuration data model for a single sync configuration.
//!
//! `SyncConfiguration` is owned by the external store (a relational table
//! in the surrounding application); this crate only ever receives a
//! snapshot of it. `#[serde(default)]` means a partially-populated record
//! (e.g. round-tripped through a database row, or assembled from CLI
//! flags) still fills in sane defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Retention policy applied to the destination by the retention engine (C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
	/// Delete entries older than `retention_value` days.
	#[default]
	Days,
	/// Keep only the `retention_value` newest entries.
	Count,
	/// No destination-side retention; deletion is driven by source-side
	/// delete events instead.
	Sync,
}

/// A single sync configuration.
///
/// Invariant: `source_root` must be an existing directory at `start` time;
/// `destination_root` is created on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfiguration {
	/// Stable integer identifier.
	pub id: u64,

	/// Free-form label.
	pub name: String,

	/// Absolute source directory path.
	pub source_root: PathBuf,

	/// Absolute destination directory path.
	pub destination_root: PathBuf,

	/// Ordered, case-insensitive glob patterns. Empty means `["*"]`.
	pub patterns: Vec<String>,

	/// Retention policy.
	pub retention_mode: RetentionMode,

	/// Non-negative; meaning depends on `retention_mode`. Must be 0 for
	/// `sync`; a day count for `days`; a max-kept-files limit for `count`.
	pub retention_value: u64,

	/// Minimum period (seconds) of size+mtime stability before a file is
	/// eligible for copy.
	pub settle_seconds: u64,

	/// Minutes between full source rescans; 0 disables periodic rescan.
	pub scan_interval_minutes: u64,

	/// Whether the supervisor should resume this configuration on boot.
	pub is_active: bool,
}

impl Default for SyncConfiguration {
	fn default() -> Self {
		SyncConfiguration {
			id: 0,
			name: String::new(),
			source_root: PathBuf::new(),
			destination_root: PathBuf::new(),
			patterns: Vec::new(),
			retention_mode: RetentionMode::Days,
			retention_value: 60,
			settle_seconds: 10,
			scan_interval_minutes: 10,
			is_active: false,
		}
	}
}

impl SyncConfiguration {
	/// Patterns normalized so the empty list becomes `["*"]`.
	pub fn effective_patterns(&self) -> Vec<String> {
		if self.patterns.is_empty() {
			vec!["*".to_string()]
		} else {
			self.patterns.clone()
		}
	}

	/// Validate the configuration. Called by the supervisor/engine at
	/// `start()`; does not mutate the filesystem beyond this check.
	/// Creating `destination_root` is left to first use.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !is_existing_dir(&self.source_root) {
			return Err(ConfigError::SourceNotFound {
				path: self.source_root.display().to_string(),
			});
		}

		match self.retention_mode {
			RetentionMode::Sync if self.retention_value != 0 => {
				return Err(ConfigError::InvalidRetention {
					message: "retention_value must be 0 when retention_mode=sync".to_string(),
				});
			}
			_ => {}
		}

		Ok(())
	}
}

fn is_existing_dir(path: &Path) -> bool {
	path.metadata().map(|m| m.is_dir()).unwrap_or(false)
}


// vim: ts=4
