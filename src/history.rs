#![allow(dead_code)]

//! History store (C2): a durable map from destination-relative POSIX path
//! to the ISO-8601 UTC timestamp of that file's last successful sync,
//! persisted at `<destination>/.history/sync_history.json`.

use crate::error::HistoryError;
use crate::logging::*;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

pub const HISTORY_DIR: &str = ".history";
pub const HISTORY_FILE: &str = "sync_history.json";

/// In-memory form of the on-disk history: destination-relative POSIX path
/// → ISO-8601 UTC timestamp string.
pub type History = BTreeMap<String, String>;

fn history_path(destination: &Path) -> PathBuf {
	destination.join(HISTORY_DIR).join(HISTORY_FILE)
}

/// Load the history map for a destination.
///
/// Missing file, malformed JSON, or a non-object payload all return an
/// empty map. History is a durability optimization, not a source of
/// truth, so corruption is recovered from rather than propagated.
pub fn load(destination: &Path) -> History {
	let path = history_path(destination);

	let contents = match std::fs::read_to_string(&path) {
		Ok(c) => c,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return History::new(),
		Err(e) => {
			warn!("failed to read history file {}: {}", path.display(), e);
			return History::new();
		}
	};

	match serde_json::from_str::<serde_json::Value>(&contents) {
		Ok(serde_json::Value::Object(map)) => map
			.into_iter()
			.filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
			.collect(),
		Ok(_) => {
			warn!("history file {} is not a JSON object, discarding", path.display());
			History::new()
		}
		Err(e) => {
			warn!("history file {} is malformed JSON ({}), discarding", path.display(), e);
			History::new()
		}
	}
}

/// Persist the history map atomically (write-temp + rename), pretty
/// printed with 2-space indent, UTF-8, non-ASCII preserved.
pub fn save(destination: &Path, history: &History) -> Result<(), HistoryError> {
	let dir = destination.join(HISTORY_DIR);
	std::fs::create_dir_all(&dir)?;

	let path = dir.join(HISTORY_FILE);
	let temp_path = dir.join(format!("{}.tmp", HISTORY_FILE));

	let json = serde_json::to_string_pretty(history)?;
	std::fs::write(&temp_path, json)?;
	std::fs::rename(&temp_path, &path)?;
	Ok(())
}

/// Best-effort save: logs and swallows failures rather than propagating
/// them. The next successful write restores durability.
pub fn save_best_effort(destination: &Path, history: &History) {
	if let Err(e) = save(destination, history) {
		warn!("failed to persist history for {}: {}", destination.display(), e);
	}
}

/// Compute the destination-relative POSIX key for `path` under
/// `destination`. If `path` is not under `destination`, falls back to its
/// leaf name. Keys never contain backslashes.
pub fn key(destination: &Path, path: &Path) -> String {
	let rel = match path.strip_prefix(destination) {
		Ok(rel) => rel,
		Err(_) => return leaf_name(path),
	};
	to_posix(rel)
}

fn leaf_name(path: &Path) -> String {
	path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

fn to_posix(rel: &Path) -> String {
	rel.components()
		.filter(|c| matches!(c, Component::Normal(_)))
		.map(|c| c.as_os_str().to_string_lossy().replace('\\', "/"))
		.collect::<Vec<_>>()
		.join("/")
}

/// Current UTC time formatted as the ISO-8601 string history entries use.
pub fn now_timestamp() -> String {
	Utc::now().to_rfc3339()
}


// vim: ts=4
