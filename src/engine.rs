#![allow(dead_code)]

//! Sync engine (C7): per-configuration state machine orchestrating the
//! observer, pending queue, copier, history store, and retention engine,
//! plus status broadcasting.

use crate::cancel::CancelSignal;
use crate::config::{RetentionMode, SyncConfiguration};
use crate::coordinator::Coordinator;
use crate::copier::{self, CopyOutcome};
use crate::error::ConfigError;
use crate::history::{self, History};
use crate::logging::*;
use crate::observer::{Observer, ObserverEvent};
use crate::patterns::PatternMatcher;
use crate::pending::PendingQueue;
use chrono::Utc;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
	Idle,
	Scanning,
	Waiting,
	Copying,
	Stopped,
}

#[derive(Debug, Clone)]
pub struct EngineStatus {
	pub state: EngineState,
	pub current_file: Option<String>,
	pub details: String,
	pub progress_percent: u8,
	pub last_sync_time: Option<String>,
	pub updated_at: String,
}

impl EngineStatus {
	fn new() -> Self {
		EngineStatus {
			state: EngineState::Idle,
			current_file: None,
			details: String::new(),
			progress_percent: 0,
			last_sync_time: None,
			updated_at: Utc::now().to_rfc3339(),
		}
	}
}

pub type StatusCallback = dyn Fn(u64, bool, EngineStatus) + Send + Sync;

struct StatusBroadcaster {
	config_id: u64,
	status: Arc<Mutex<EngineStatus>>,
	callback: Arc<StatusCallback>,
}

impl StatusBroadcaster {
	fn set(&self, mutate: impl FnOnce(&mut EngineStatus)) {
		let snapshot = {
			let mut status = self.status.lock().unwrap();
			mutate(&mut status);
			status.updated_at = Utc::now().to_rfc3339();
			status.clone()
		};

		let is_running = !matches!(snapshot.state, EngineState::Stopped);
		let callback = self.callback.clone();
		let config_id = self.config_id;
		let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
			callback(config_id, is_running, snapshot);
		}));
		if result.is_err() {
			warn!("status callback panicked for configuration {}", config_id);
		}
	}
}

/// A running engine: the caller keeps this handle to read status, signal
/// cancellation, and join the worker thread.
pub struct EngineHandle {
	pub config_id: u64,
	cancel: CancelSignal,
	status: Arc<Mutex<EngineStatus>>,
	thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
	pub fn status(&self) -> EngineStatus {
		self.status.lock().unwrap().clone()
	}

	pub fn signal_stop(&self) {
		self.cancel.cancel();
	}

	/// Join the worker thread, waiting at most `timeout`. Returns `true`
	/// if it exited in time.
	pub fn join_with_timeout(mut self, timeout: Duration) -> bool {
		let Some(handle) = self.thread.take() else { return true };
		let deadline = Instant::now() + timeout;
		while Instant::now() < deadline {
			if handle.is_finished() {
				let _ = handle.join();
				return true;
			}
			thread::sleep(Duration::from_millis(20));
		}
		// Detach: the thread releases its coordinator slot via `abandon`
		// on its way out regardless of whether anyone waits for it.
		false
	}
}

/// Validate `config` and spawn its worker thread. The thread runs until
/// `signal_stop()` is called (or panics, which is not expected).
pub fn spawn(
	config: SyncConfiguration,
	coordinator: Coordinator,
	callback: Arc<StatusCallback>,
) -> Result<EngineHandle, ConfigError> {
	config.validate()?;

	let cancel = CancelSignal::new();
	let status = Arc::new(Mutex::new(EngineStatus::new()));

	let handle_cancel = cancel.clone();
	let handle_status = status.clone();
	let config_id = config.id;

	let thread = thread::spawn(move || {
		run_loop(config, coordinator, handle_cancel, handle_status, callback);
	});

	Ok(EngineHandle { config_id, cancel, status, thread: Some(thread) })
}

fn run_loop(
	config: SyncConfiguration,
	coordinator: Coordinator,
	cancel: CancelSignal,
	status: Arc<Mutex<EngineStatus>>,
	callback: Arc<StatusCallback>,
) {
	let broadcaster = StatusBroadcaster { config_id: config.id, status, callback };
	let matcher = match PatternMatcher::new(&config.effective_patterns()) {
		Ok(m) => m,
		Err(e) => {
			broadcaster.set(|s| {
				s.state = EngineState::Stopped;
				s.details = format!("invalid pattern configuration: {}", e);
			});
			return;
		}
	};

	broadcaster.set(|s| {
		s.state = EngineState::Scanning;
		s.details = "starting up".to_string();
	});

	let (observer, events_rx) = match Observer::start(&config.source_root) {
		Ok(pair) => pair,
		Err(e) => {
			broadcaster.set(|s| {
				s.state = EngineState::Stopped;
				s.details = format!("failed to start observer: {}", e);
			});
			return;
		}
	};

	let mut history = history::load(&config.destination_root);
	let mut history_dirty = retention_pass(&config, &matcher, &mut history);
	if history_dirty {
		history::save_best_effort(&config.destination_root, &history);
		history_dirty = false;
	}

	let mut pending = PendingQueue::new();
	seed_initial_scan(&config, &matcher, &mut pending);

	let lane = coordinator.lane_for(&config.source_root);
	let scan_interval = if config.scan_interval_minutes > 0 {
		Some(Duration::from_secs(config.scan_interval_minutes * 60))
	} else {
		None
	};
	let mut last_rescan = Instant::now();

	'outer: loop {
		if cancel.is_cancelled() {
			break;
		}

		while let Ok(event) = events_rx.try_recv() {
			match event {
				ObserverEvent::Changed(path) => {
					pending.register(&path, &config.source_root, &config.destination_root, &matcher);
				}
				ObserverEvent::Deleted(path) => {
					if config.retention_mode == RetentionMode::Sync {
						mirror_delete(&config, &path, &mut history);
						history_dirty = true;
					}
					pending.remove(&path);
				}
			}
		}

		if let Some(interval) = scan_interval {
			if last_rescan.elapsed() >= interval {
				seed_initial_scan(&config, &matcher, &mut pending);
				last_rescan = Instant::now();
			}
		}

		if history_dirty {
			history::save_best_effort(&config.destination_root, &history);
			history_dirty = false;
		}

		let count_mode = config.retention_mode == RetentionMode::Count;
		let eligible = pending.tick(config.settle_seconds, count_mode);

		if eligible.is_empty() {
			if pending.is_empty() {
				broadcaster.set(|s| {
					s.state = EngineState::Idle;
					s.current_file = None;
					s.details = "Watching for file changes...".to_string();
					s.progress_percent = 0;
				});
			}
			thread::sleep(TICK_INTERVAL);
			continue;
		}

		broadcaster.set(|s| {
			s.state = EngineState::Scanning;
			s.details = format!("{} file(s) ready to copy", eligible.len());
		});

		let total_bytes = pending.queue_total_bytes().max(1);
		let mut completed_bytes: u64 = 0;

		for file in eligible {
			if cancel.is_cancelled() {
				break 'outer;
			}

			let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string();

			if config.retention_mode == RetentionMode::Days && config.retention_value > 0 && is_past_retention(&config, &file) {
				info!("skipping old file (exceeds retention): {}", name);
				pending.remove(&file);
				continue;
			}

			let acquired = lane.acquire(config.id, &cancel, |blocker| {
				broadcaster.set(|s| {
					s.state = EngineState::Waiting;
					s.current_file = Some(name_clone_for_waiting(&file));
					s.details = match blocker {
						Some(id) => format!("waiting for source lock held by configuration {}", id),
						None => "waiting for source lock".to_string(),
					};
				});
			});

			if !acquired {
				pending.remove(&file);
				break 'outer;
			}

			broadcaster.set(|s| {
				s.state = EngineState::Copying;
				s.current_file = Some(name.clone());
				s.progress_percent = percent(completed_bytes, total_bytes);
			});

			let overwrite = config.retention_mode == RetentionMode::Sync || target_differs(&config, &file);
			let file_size = std::fs::metadata(&file).map(|m| m.len()).unwrap_or(0);

			let broadcaster_ref = &broadcaster;
			let name_ref = name.clone();
			let result = copier::copy_file(
				&file,
				&config.destination_root,
				&config.source_root,
				overwrite,
				&cancel,
				|_name, copied, _total| {
					broadcaster_ref.set(|s| {
						s.current_file = Some(name_ref.clone());
						s.progress_percent = percent(completed_bytes + copied, total_bytes);
					});
				},
			);

			lane.release(config.id);

			match result {
				Ok(CopyOutcome::Copied(_)) => {
					let key = history::key(&config.destination_root, &file);
					history.insert(key, history::now_timestamp());
					completed_bytes += file_size;
					retention_pass(&config, &matcher, &mut history);
					history::save_best_effort(&config.destination_root, &history);
					pending.remove(&file);
				}
				Ok(CopyOutcome::Skipped) => {
					pending.remove(&file);
				}
				Err(crate::error::CopyError::Cancelled) => {
					break 'outer;
				}
				Err(e) => {
					warn!("copy failed for {}: {}", file.display(), e);
					pending.remove(&file);
				}
			}
		}

		broadcaster.set(|s| {
			s.progress_percent = 100;
			s.last_sync_time = Some(Utc::now().to_rfc3339());
		});
		broadcaster.set(|s| {
			s.progress_percent = 0;
		});
	}

	lane.abandon(config.id);
	observer.stop();

	broadcaster.set(|s| {
		s.state = EngineState::Stopped;
		s.details = "stopped".to_string();
	});
}

fn name_clone_for_waiting(path: &std::path::Path) -> String {
	path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string()
}

fn percent(completed: u64, total: u64) -> u8 {
	if total == 0 {
		return 100;
	}
	((completed.min(total) * 100) / total) as u8
}

/// Whether `source_file`'s mtime already falls outside `days` retention,
/// so it is not worth copying at all (it would be deleted by the very
/// next retention pass).
fn is_past_retention(config: &SyncConfiguration, source_file: &std::path::Path) -> bool {
	let threshold = Utc::now() - chrono::Duration::days(config.retention_value as i64);
	match std::fs::metadata(source_file).and_then(|m| m.modified()) {
		Ok(mtime) => chrono::DateTime::<Utc>::from(mtime) < threshold,
		Err(_) => false,
	}
}

fn target_differs(config: &SyncConfiguration, source_file: &std::path::Path) -> bool {
	let target = copier::build_destination_path(&config.destination_root, source_file, &config.source_root, true);
	match (std::fs::metadata(source_file), std::fs::metadata(&target)) {
		(Ok(src), Ok(dst)) => src.len() != dst.len(),
		_ => true,
	}
}

fn retention_pass(config: &SyncConfiguration, matcher: &PatternMatcher, history: &mut History) -> bool {
	if !config.destination_root.exists() {
		return false;
	}
	crate::retention::enforce(&config.destination_root, config.retention_mode, config.retention_value, matcher, history)
}

fn mirror_delete(config: &SyncConfiguration, source_path: &std::path::Path, history: &mut History) {
	let rel = match source_path.strip_prefix(&config.source_root) {
		Ok(rel) => rel,
		Err(_) => return,
	};
	let target = config.destination_root.join(rel);
	match std::fs::symlink_metadata(&target) {
		Ok(meta) if meta.is_file() => {
			if let Err(e) = std::fs::remove_file(&target) {
				warn!("failed to mirror delete of {}: {}", target.display(), e);
				return;
			}
			let key = history::key(&config.destination_root, &target);
			history.remove(&key);
		}
		_ => {}
	}
}

fn seed_initial_scan(config: &SyncConfiguration, matcher: &PatternMatcher, pending: &mut PendingQueue) {
	let mut seen: Vec<PathBuf> = Vec::new();
	for entry in walkdir::WalkDir::new(&config.source_root).into_iter().filter_map(|e| e.ok()) {
		if !entry.file_type().is_file() {
			continue;
		}
		let path = entry.path().to_path_buf();
		if pending.register(&path, &config.source_root, &config.destination_root, matcher)
			== crate::pending::RegisterOutcome::Registered
		{
			seen.push(path);
		}
	}

	if config.retention_mode == RetentionMode::Count && config.retention_value > 0 {
		cap_pending_to_newest(config, pending, seen);
	}
}

fn cap_pending_to_newest(config: &SyncConfiguration, pending: &mut PendingQueue, mut seen: Vec<PathBuf>) {
	seen.sort_by_key(|p| std::cmp::Reverse(std::fs::metadata(p).and_then(|m| m.modified()).ok()));
	for stale in seen.into_iter().skip(config.retention_value as usize) {
		pending.remove(&stale);
	}
	let _ = config;
}


// vim: ts=4
