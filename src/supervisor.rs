#![allow(dead_code)]

//! Supervisor (C9): starts, stops, restarts, and resumes engines for the
//! set of active configurations. Owns the coordinator all engines share.

use crate::config::SyncConfiguration;
use crate::coordinator::Coordinator;
use crate::engine::{self, EngineHandle, EngineStatus, StatusCallback};
use crate::error::ConfigError;
use crate::logging::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of a `stop()` call, so the caller (which owns persistence) can
/// decide whether to clear `is_active` for the configuration.
pub struct StopOutcome {
	pub joined_in_time: bool,
	pub clear_is_active: bool,
}

pub struct Supervisor {
	coordinator: Coordinator,
	engines: Mutex<HashMap<u64, EngineHandle>>,
}

impl Supervisor {
	pub fn new() -> Self {
		Supervisor { coordinator: Coordinator::new(), engines: Mutex::new(HashMap::new()) }
	}

	/// Start a configuration's engine. Rejects a second start for an id
	/// that is already running.
	pub fn start(&self, config: SyncConfiguration, callback: Arc<StatusCallback>) -> Result<(), ConfigError> {
		let mut engines = self.engines.lock().unwrap();
		if engines.contains_key(&config.id) {
			return Err(ConfigError::Invalid {
				message: format!("configuration {} is already running", config.id),
			});
		}

		let handle = engine::spawn(config, self.coordinator.clone(), callback)?;
		engines.insert(handle.config_id, handle);
		Ok(())
	}

	/// Signal cancellation and join the worker, waiting up to 2 seconds.
	/// `preserve_db` records the caller's intent not to clear `is_active`
	/// (e.g. during a process-wide restart); this crate does not own
	/// persistence, so it only reports the decision back.
	pub fn stop(&self, id: u64, preserve_db: bool) -> StopOutcome {
		let handle = self.engines.lock().unwrap().remove(&id);
		match handle {
			Some(handle) => {
				handle.signal_stop();
				let joined = handle.join_with_timeout(STOP_JOIN_TIMEOUT);
				if !joined {
					warn!("engine {} did not stop within {:?}; slot is abandoned, thread detached", id, STOP_JOIN_TIMEOUT);
				}
				StopOutcome { joined_in_time: joined, clear_is_active: !preserve_db }
			}
			None => StopOutcome { joined_in_time: true, clear_is_active: !preserve_db },
		}
	}

	/// Stop then start with a (possibly edited) configuration.
	pub fn restart(&self, config: SyncConfiguration, callback: Arc<StatusCallback>) -> Result<(), ConfigError> {
		self.stop(config.id, true);
		self.start(config, callback)
	}

	/// Start every active configuration, continuing past individual
	/// failures and reporting them per id.
	pub fn resume_all(
		&self,
		configs: Vec<SyncConfiguration>,
		callback_for: impl Fn(u64) -> Arc<StatusCallback>,
	) -> Vec<(u64, Result<(), ConfigError>)> {
		configs
			.into_iter()
			.filter(|c| c.is_active)
			.map(|config| {
				let id = config.id;
				let callback = callback_for(id);
				(id, self.start(config, callback))
			})
			.collect()
	}

	pub fn status(&self, id: u64) -> Option<EngineStatus> {
		self.engines.lock().unwrap().get(&id).map(|h| h.status())
	}

	pub fn running_ids(&self) -> Vec<u64> {
		self.engines.lock().unwrap().keys().copied().collect()
	}

	/// Stop every running engine without touching persisted `is_active`,
	/// for process-wide shutdown/restart.
	pub fn shutdown_all(&self) {
		let ids: Vec<u64> = self.running_ids();
		for id in ids {
			self.stop(id, true);
		}
	}
}

impl Default for Supervisor {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::RetentionMode;
	use std::thread;
	use tempfile::TempDir;

	fn config(id: u64, source: &std::path::Path, destination: &std::path::Path) -> SyncConfiguration {
		SyncConfiguration {
			id,
			name: format!("cfg-{}", id),
			source_root: source.to_path_buf(),
			destination_root: destination.to_path_buf(),
			patterns: vec!["*".to_string()],
			retention_mode: RetentionMode::Days,
			retention_value: 60,
			settle_seconds: 0,
			scan_interval_minutes: 0,
			is_active: true,
		}
	}

	#[test]
	fn test_double_start_is_rejected() {
		let source = TempDir::new().unwrap();
		let destination = TempDir::new().unwrap();
		let supervisor = Supervisor::new();

		let c1 = config(1, source.path(), destination.path());
		let c2 = config(1, source.path(), destination.path());

		assert!(supervisor.start(c1, Arc::new(|_, _, _| {})).is_ok());
		assert!(supervisor.start(c2, Arc::new(|_, _, _| {})).is_err());

		supervisor.stop(1, true);
	}

	#[test]
	fn test_stop_unknown_id_is_a_noop_success() {
		let supervisor = Supervisor::new();
		let outcome = supervisor.stop(999, false);
		assert!(outcome.joined_in_time);
		assert!(outcome.clear_is_active);
	}

	#[test]
	fn test_start_stop_restart_cycle() {
		let source = TempDir::new().unwrap();
		let destination = TempDir::new().unwrap();
		let supervisor = Supervisor::new();

		let c = config(1, source.path(), destination.path());
		supervisor.start(c.clone(), Arc::new(|_, _, _| {})).unwrap();
		assert!(supervisor.running_ids().contains(&1));

		let outcome = supervisor.stop(1, false);
		assert!(outcome.joined_in_time);
		assert!(outcome.clear_is_active);
		assert!(!supervisor.running_ids().contains(&1));

		supervisor.restart(c, Arc::new(|_, _, _| {})).unwrap();
		assert!(supervisor.running_ids().contains(&1));
		supervisor.shutdown_all();
	}

	#[test]
	fn test_resume_all_only_starts_active_configs() {
		let source = TempDir::new().unwrap();
		let destination = TempDir::new().unwrap();
		let supervisor = Supervisor::new();

		let mut inactive = config(2, source.path(), destination.path());
		inactive.is_active = false;
		let active = config(1, source.path(), destination.path());

		let results = supervisor.resume_all(vec![active, inactive], |_id| Arc::new(|_, _, _| {}));

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].0, 1);
		assert!(supervisor.running_ids().contains(&1));
		assert!(!supervisor.running_ids().contains(&2));

		supervisor.shutdown_all();
	}

	#[test]
	fn test_shutdown_all_stops_every_engine() {
		let source = TempDir::new().unwrap();
		let destination = TempDir::new().unwrap();
		let supervisor = Supervisor::new();

		supervisor.start(config(1, source.path(), destination.path()), Arc::new(|_, _, _| {})).unwrap();
		supervisor.start(config(2, source.path(), destination.path()), Arc::new(|_, _, _| {})).unwrap();

		supervisor.shutdown_all();
		thread::sleep(Duration::from_millis(50));
		assert!(supervisor.running_ids().is_empty());
	}
}

// vim: ts=4
