#![allow(dead_code)]

//! Retention engine (C4): enforces `days` / `count` / `sync` retention on
//! destination entries that match a configuration's patterns.

use crate::config::RetentionMode;
use crate::history::{self, History};
use crate::logging::*;
use crate::patterns::PatternMatcher;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const HISTORY_DIR_NAME: &str = ".history";

/// A destination entry (file or directory) considered for retention,
/// together with the timestamp used to rank it.
struct Candidate {
	path: PathBuf,
	history_key: String,
	effective_time: DateTime<Utc>,
	is_dir: bool,
}

/// Walk `destination_root` and delete entries per `mode`, mutating
/// `history` in place for every entry removed. Returns `true` if history
/// changed, so the caller knows whether to persist it.
pub fn enforce(
	destination_root: &Path,
	mode: RetentionMode,
	retention_value: u64,
	matcher: &PatternMatcher,
	history: &mut History,
) -> bool {
	match mode {
		RetentionMode::Sync => false,
		RetentionMode::Days => enforce_days(destination_root, retention_value, matcher, history),
		RetentionMode::Count => enforce_count(destination_root, retention_value, matcher, history),
	}
}

fn enforce_days(
	destination_root: &Path,
	retention_days: u64,
	matcher: &PatternMatcher,
	history: &mut History,
) -> bool {
	if retention_days == 0 {
		return false;
	}

	let threshold = Utc::now() - Duration::days(retention_days as i64);
	let candidates = collect_candidates(destination_root, matcher, history);

	let mut changed = false;
	for candidate in candidates {
		if candidate.effective_time < threshold {
			delete_entry(&candidate, history);
			changed = true;
		}
	}
	changed
}

fn enforce_count(
	destination_root: &Path,
	retention_count: u64,
	matcher: &PatternMatcher,
	history: &mut History,
) -> bool {
	if retention_count == 0 {
		return false;
	}

	let mut candidates = collect_candidates(destination_root, matcher, history);
	if (candidates.len() as u64) <= retention_count {
		return false;
	}

	candidates.sort_by(|a, b| b.effective_time.cmp(&a.effective_time));

	let mut changed = false;
	for candidate in candidates.into_iter().skip(retention_count as usize) {
		delete_entry(&candidate, history);
		changed = true;
	}
	changed
}

fn collect_candidates(
	destination_root: &Path,
	matcher: &PatternMatcher,
	history: &History,
) -> Vec<Candidate> {
	let mut candidates = Vec::new();

	let entries = match fs::read_dir(destination_root) {
		Ok(entries) => entries,
		Err(e) => {
			warn!("retention: failed to list {}: {}", destination_root.display(), e);
			return candidates;
		}
	};

	for entry in entries.flatten() {
		let path = entry.path();
		let name = entry.file_name();
		let name = name.to_string_lossy();

		if name == HISTORY_DIR_NAME {
			continue;
		}
		if !matcher.matches_name(&name) {
			continue;
		}

		let is_dir = match entry.file_type() {
			Ok(ft) => ft.is_dir(),
			Err(e) => {
				warn!("retention: failed to stat {}: {}", path.display(), e);
				continue;
			}
		};

		let key = history::key(destination_root, &path);
		let effective_time = match history.get(&key).and_then(|ts| DateTime::parse_from_rfc3339(ts).ok()) {
			Some(dt) => dt.with_timezone(&Utc),
			None => match newest_mtime(&path, is_dir) {
				Some(t) => t,
				None => {
					warn!("retention: skipping {} (no readable mtime)", path.display());
					continue;
				}
			},
		};

		candidates.push(Candidate { path, history_key: key, effective_time, is_dir });
	}

	candidates
}

fn newest_mtime(path: &Path, is_dir: bool) -> Option<DateTime<Utc>> {
	if !is_dir {
		return fs::metadata(path).and_then(|m| m.modified()).ok().map(system_time_to_utc);
	}

	let mut newest: Option<SystemTime> = None;
	for entry in walkdir::WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
		if let Ok(meta) = entry.metadata() {
			if let Ok(modified) = meta.modified() {
				newest = Some(match newest {
					Some(current) if current >= modified => current,
					_ => modified,
				});
			}
		}
	}
	newest.map(system_time_to_utc)
}

fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
	DateTime::<Utc>::from(time)
}

fn delete_entry(candidate: &Candidate, history: &mut History) {
	let result = if candidate.is_dir {
		fs::remove_dir_all(&candidate.path)
	} else {
		fs::remove_file(&candidate.path)
	};

	match result {
		Ok(()) => {
			info!("retention removed {}", candidate.path.display());
			history.remove(&candidate.history_key);
		}
		Err(e) => {
			warn!("retention: failed to remove {}: {}", candidate.path.display(), e);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use filetime::{set_file_mtime, FileTime};
	use tempfile::TempDir;

	fn matcher_all() -> PatternMatcher {
		PatternMatcher::new(&[]).unwrap()
	}

	fn write_with_age(path: &Path, days_ago: i64) {
		fs::write(path, b"data").unwrap();
		let mtime = Utc::now() - Duration::days(days_ago);
		set_file_mtime(path, FileTime::from_system_time(mtime.into())).unwrap();
	}

	#[test]
	fn test_days_retention_removes_old_entries_and_keeps_recent() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("a.bak"), 3);
		write_with_age(&dir.path().join("b.bak"), 61);

		let mut history = History::new();
		let changed = enforce(dir.path(), RetentionMode::Days, 60, &matcher_all(), &mut history);

		assert!(changed);
		assert!(dir.path().join("a.bak").exists());
		assert!(!dir.path().join("b.bak").exists());
	}

	#[test]
	fn test_days_retention_zero_disables_policy() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("old.bak"), 999);

		let mut history = History::new();
		let changed = enforce(dir.path(), RetentionMode::Days, 0, &matcher_all(), &mut history);

		assert!(!changed);
		assert!(dir.path().join("old.bak").exists());
	}

	#[test]
	fn test_count_retention_keeps_newest_n() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("x1"), 4);
		write_with_age(&dir.path().join("x2"), 3);
		write_with_age(&dir.path().join("x3"), 2);
		write_with_age(&dir.path().join("x4"), 1);

		let mut history = History::new();
		let changed = enforce(dir.path(), RetentionMode::Count, 2, &matcher_all(), &mut history);

		assert!(changed);
		assert!(!dir.path().join("x1").exists());
		assert!(!dir.path().join("x2").exists());
		assert!(dir.path().join("x3").exists());
		assert!(dir.path().join("x4").exists());
	}

	#[test]
	fn test_count_retention_under_limit_is_noop() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("x1"), 1);

		let mut history = History::new();
		let changed = enforce(dir.path(), RetentionMode::Count, 5, &matcher_all(), &mut history);

		assert!(!changed);
		assert!(dir.path().join("x1").exists());
	}

	#[test]
	fn test_sync_mode_is_always_noop() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("x1"), 999);

		let mut history = History::new();
		let changed = enforce(dir.path(), RetentionMode::Sync, 0, &matcher_all(), &mut history);

		assert!(!changed);
		assert!(dir.path().join("x1").exists());
	}

	#[test]
	fn test_history_key_removed_on_deletion() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("old.bak"), 999);

		let mut history = History::new();
		history.insert("old.bak".to_string(), (Utc::now() - Duration::days(999)).to_rfc3339());

		enforce(dir.path(), RetentionMode::Days, 60, &matcher_all(), &mut history);

		assert!(!history.contains_key("old.bak"));
	}

	#[test]
	fn test_history_dir_itself_is_never_a_candidate() {
		let dir = TempDir::new().unwrap();
		let hist_dir = dir.path().join(HISTORY_DIR_NAME);
		fs::create_dir_all(&hist_dir).unwrap();
		fs::write(hist_dir.join("sync_history.json"), "{}").unwrap();

		let mut history = History::new();
		enforce(dir.path(), RetentionMode::Days, 1, &matcher_all(), &mut history);

		assert!(hist_dir.exists());
	}

	#[test]
	fn test_invalid_history_timestamp_falls_back_to_mtime() {
		let dir = TempDir::new().unwrap();
		write_with_age(&dir.path().join("a.bak"), 999);

		let mut history = History::new();
		history.insert("a.bak".to_string(), "not-a-timestamp".to_string());

		let changed = enforce(dir.path(), RetentionMode::Days, 60, &matcher_all(), &mut history);
		assert!(changed);
		assert!(!dir.path().join("a.bak").exists());
	}
}

// vim: ts=4
