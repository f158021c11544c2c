#![allow(dead_code)]

//! Pending queue & debouncer (C6): holds observed paths, tracks stability
//! (size+mtime unchanged for N seconds), and releases them for copy.

use crate::copier::build_destination_path;
use crate::patterns::PatternMatcher;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// One file observed but not yet mirrored.
#[derive(Debug, Clone)]
pub struct PendingFile {
	pub path: PathBuf,
	pub last_size: u64,
	pub last_mtime: SystemTime,
	pub stable_since: Instant,
}

/// Why a registration attempt did not add an entry.
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
	Registered,
	AlreadyMirrored,
	Rejected,
	Coalesced,
}

#[derive(Default)]
pub struct PendingQueue {
	entries: HashMap<PathBuf, PendingFile>,
	queue_total_bytes: u64,
}

impl PendingQueue {
	pub fn new() -> Self {
		PendingQueue::default()
	}

	pub fn queue_total_bytes(&self) -> u64 {
		self.queue_total_bytes
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Register (or refresh) `path`. Rejects non-files, paths outside
	/// `source_root`, and paths whose leaf doesn't match `matcher`. Skips
	/// paths whose destination copy already has the same size as the
	/// source. Duplicates are coalesced into a single entry, resetting
	/// `stable_since` only if `(size, mtime)` actually changed.
	pub fn register(
		&mut self,
		path: &Path,
		source_root: &Path,
		destination_root: &Path,
		matcher: &PatternMatcher,
	) -> RegisterOutcome {
		if !path.starts_with(source_root) {
			return RegisterOutcome::Rejected;
		}

		let name = match path.file_name().and_then(|n| n.to_str()) {
			Some(n) => n,
			None => return RegisterOutcome::Rejected,
		};
		if !matcher.matches_name(name) {
			return RegisterOutcome::Rejected;
		}

		let meta = match fs::metadata(path) {
			Ok(m) if m.is_file() => m,
			_ => return RegisterOutcome::Rejected,
		};

		let size = meta.len();
		let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

		let dest = build_destination_path(destination_root, path, source_root, true);
		if let Ok(dest_meta) = fs::metadata(&dest) {
			if dest_meta.len() == size {
				self.remove(path);
				return RegisterOutcome::AlreadyMirrored;
			}
		}

		match self.entries.get_mut(path) {
			Some(existing) if existing.last_size == size && existing.last_mtime == mtime => {
				RegisterOutcome::Coalesced
			}
			Some(existing) => {
				self.queue_total_bytes = self.queue_total_bytes.saturating_sub(existing.last_size);
				existing.last_size = size;
				existing.last_mtime = mtime;
				existing.stable_since = Instant::now();
				self.queue_total_bytes += size;
				RegisterOutcome::Registered
			}
			None => {
				self.entries.insert(
					path.to_path_buf(),
					PendingFile { path: path.to_path_buf(), last_size: size, last_mtime: mtime, stable_since: Instant::now() },
				);
				self.queue_total_bytes += size;
				RegisterOutcome::Registered
			}
		}
	}

	pub fn remove(&mut self, path: &Path) {
		if let Some(entry) = self.entries.remove(path) {
			self.queue_total_bytes = self.queue_total_bytes.saturating_sub(entry.last_size);
		}
	}

	/// Advance one debounce tick: drop entries whose file is gone, refresh
	/// entries whose `(size, mtime)` changed, and return the set of paths
	/// that have now been unchanged for at least `settle_seconds`.
	///
	/// Ordering: when `count_mode` is set the eligible paths are sorted
	/// newest-mtime-first; otherwise they come back in insertion order.
	pub fn tick(&mut self, settle_seconds: u64, count_mode: bool) -> Vec<PathBuf> {
		let paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
		let mut eligible: Vec<(PathBuf, SystemTime)> = Vec::new();

		for path in paths {
			let meta = match fs::metadata(&path) {
				Ok(m) if m.is_file() => m,
				_ => {
					self.remove(&path);
					continue;
				}
			};

			let size = meta.len();
			let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

			let entry = self.entries.get_mut(&path).expect("present, just checked");
			if entry.last_size != size || entry.last_mtime != mtime {
				self.queue_total_bytes = self.queue_total_bytes.saturating_sub(entry.last_size);
				entry.last_size = size;
				entry.last_mtime = mtime;
				entry.stable_since = Instant::now();
				self.queue_total_bytes += size;
				continue;
			}

			if entry.stable_since.elapsed().as_secs() >= settle_seconds {
				eligible.push((path, mtime));
			}
		}

		if count_mode {
			eligible.sort_by(|a, b| b.1.cmp(&a.1));
		}

		eligible.into_iter().map(|(path, _)| path).collect()
	}
}


// vim: ts=4
