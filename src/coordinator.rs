#![allow(dead_code)]

//! Copy coordinator (C8): a process-wide fairness queue serializing copies
//! whose source roots collide. One `CopyLane` per canonical source root;
//! the `Coordinator` owns the map of lanes.

use crate::cancel::CancelSignal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

const WAIT_POLL: Duration = Duration::from_millis(500);
const ON_WAIT_INTERVAL: Duration = Duration::from_secs(1);

struct LaneState {
	active_id: Option<u64>,
	waiting: Vec<u64>,
	last_served_id: Option<u64>,
}

impl LaneState {
	fn new() -> Self {
		LaneState { active_id: None, waiting: Vec::new(), last_served_id: None }
	}

	/// Smallest waiter id greater than `last_served_id`, falling back to
	/// the smallest waiter id overall. `None` if there are no waiters.
	fn next_candidate(&self) -> Option<u64> {
		let mut candidates: Vec<u64> = self.waiting.clone();
		candidates.sort_unstable();
		candidates.dedup();

		if candidates.is_empty() {
			return None;
		}

		match self.last_served_id {
			Some(last) => candidates.iter().copied().find(|&id| id > last).or(candidates.first().copied()),
			None => candidates.first().copied(),
		}
	}
}

/// One source root's serialization point: at most one configuration may
/// be the active holder at a time; others queue and are served in
/// round-robin order by configuration id.
pub struct CopyLane {
	state: Mutex<LaneState>,
	condvar: Condvar,
}

impl CopyLane {
	fn new() -> Self {
		CopyLane { state: Mutex::new(LaneState::new()), condvar: Condvar::new() }
	}

	/// Block until `config_id` becomes both the active holder and the
	/// lane's next candidate, or until `cancel` is asserted. Returns
	/// `true` if the slot was acquired, `false` if cancelled.
	pub fn acquire(&self, config_id: u64, cancel: &CancelSignal, mut on_wait: impl FnMut(Option<u64>)) -> bool {
		let mut state = self.state.lock().unwrap();
		if !state.waiting.contains(&config_id) {
			state.waiting.push(config_id);
		}

		let mut last_notified = Instant::now() - ON_WAIT_INTERVAL;

		loop {
			if cancel.is_cancelled() {
				state.waiting.retain(|&id| id != config_id);
				return false;
			}

			let can_proceed = state.active_id.map(|id| id == config_id).unwrap_or(true)
				&& state.next_candidate() == Some(config_id);

			if can_proceed {
				state.active_id = Some(config_id);
				state.waiting.retain(|&id| id != config_id);
				return true;
			}

			if last_notified.elapsed() >= ON_WAIT_INTERVAL {
				on_wait(state.active_id);
				last_notified = Instant::now();
			}

			let (guard, _timeout) = self.condvar.wait_timeout(state, WAIT_POLL).unwrap();
			state = guard;
		}
	}

	/// Release the slot if `config_id` currently holds it.
	pub fn release(&self, config_id: u64) {
		let mut state = self.state.lock().unwrap();
		if state.active_id == Some(config_id) {
			state.active_id = None;
			state.last_served_id = Some(config_id);
		}
		self.condvar.notify_all();
	}

	/// Unconditionally drop `config_id` from both the active and waiting
	/// positions. Used when an engine stops outright.
	pub fn abandon(&self, config_id: u64) {
		let mut state = self.state.lock().unwrap();
		if state.active_id == Some(config_id) {
			state.active_id = None;
			state.last_served_id = Some(config_id);
		}
		state.waiting.retain(|&id| id != config_id);
		self.condvar.notify_all();
	}
}

/// Owns one `CopyLane` per canonical source root.
#[derive(Clone)]
pub struct Coordinator {
	lanes: Arc<Mutex<HashMap<PathBuf, Arc<CopyLane>>>>,
}

impl Coordinator {
	pub fn new() -> Self {
		Coordinator { lanes: Arc::new(Mutex::new(HashMap::new())) }
	}

	pub fn lane_for(&self, source_root: &Path) -> Arc<CopyLane> {
		let key = canonical_key(source_root);
		let mut lanes = self.lanes.lock().unwrap();
		lanes.entry(key).or_insert_with(|| Arc::new(CopyLane::new())).clone()
	}
}

impl Default for Coordinator {
	fn default() -> Self {
		Self::new()
	}
}

fn canonical_key(path: &Path) -> PathBuf {
	path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}


// vim: ts=4
