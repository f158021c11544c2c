#![allow(dead_code)]

//! Source observer (C5): wraps the OS-native recursive filesystem watch
//! and emits file-level change/delete events for paths under a source
//! root. Directory events are ignored.

use crate::error::ObserverError;
use crate::logging::*;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

/// A single observed change, already classified per the create/modify,
/// move, and delete rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
	/// File created or modified: register it as pending.
	Changed(PathBuf),
	/// File removed, or the "from" side of a move: drop it from pending
	/// and, in `sync` retention mode, mirror the deletion.
	Deleted(PathBuf),
}

/// Owns the OS watch handle and the thread relaying raw events into
/// classified `ObserverEvent`s on `events`.
pub struct Observer {
	watcher: Option<RecommendedWatcher>,
	relay: Option<JoinHandle<()>>,
}

impl Observer {
	/// Start watching `source_root` recursively. Classified events are
	/// sent on the returned channel until `stop()` is called or the
	/// sender side is dropped.
	pub fn start(source_root: &Path) -> Result<(Self, Receiver<ObserverEvent>), ObserverError> {
		let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<Event>>();
		let (events_tx, events_rx) = mpsc::channel::<ObserverEvent>();

		let mut watcher = RecommendedWatcher::new(raw_tx, Config::default())
			.map_err(|e| ObserverError::StartFailed { message: e.to_string() })?;

		watcher
			.watch(source_root, RecursiveMode::Recursive)
			.map_err(|e| ObserverError::StartFailed { message: e.to_string() })?;

		let relay = std::thread::spawn(move || relay_loop(raw_rx, events_tx));

		Ok((Observer { watcher: Some(watcher), relay: Some(relay) }, events_rx))
	}

	/// Stop watching. Dropping the watcher unregisters the OS watch; the
	/// relay thread then exits once its channel closes.
	pub fn stop(mut self) {
		self.watcher.take();
		if let Some(handle) = self.relay.take() {
			let _ = handle.join();
		}
	}
}

fn relay_loop(raw_rx: Receiver<notify::Result<Event>>, events_tx: Sender<ObserverEvent>) {
	for result in raw_rx.iter() {
		match result {
			Ok(event) => {
				for classified in classify(event) {
					if events_tx.send(classified).is_err() {
						return;
					}
				}
			}
			Err(e) => warn!("observer watch error: {}", e),
		}
	}
}

fn classify(event: Event) -> Vec<ObserverEvent> {
	use notify::event::{ModifyKind, RenameMode};

	match event.kind {
		EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
			event.paths.into_iter().filter(|p| is_file_path(p)).map(ObserverEvent::Changed).collect()
		}
		EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
			let mut out = Vec::new();
			if let Some(from) = event.paths.first() {
				out.push(ObserverEvent::Deleted(from.clone()));
			}
			if let Some(to) = event.paths.get(1) {
				out.push(ObserverEvent::Changed(to.clone()));
			}
			out
		}
		EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
			event.paths.into_iter().map(ObserverEvent::Deleted).collect()
		}
		EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
			event.paths.into_iter().filter(|p| is_file_path(p)).map(ObserverEvent::Changed).collect()
		}
		EventKind::Remove(_) => event.paths.into_iter().map(ObserverEvent::Deleted).collect(),
		_ => Vec::new(),
	}
}

fn is_file_path(path: &Path) -> bool {
	path.metadata().map(|m| m.is_file()).unwrap_or(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::time::Duration;
	use tempfile::TempDir;

	#[test]
	fn test_start_and_stop_round_trip() {
		let dir = TempDir::new().unwrap();
		let (observer, _rx) = Observer::start(dir.path()).expect("observer should start");
		observer.stop();
	}

	#[test]
	fn test_create_event_is_classified_as_changed() {
		let dir = TempDir::new().unwrap();
		let (observer, rx) = Observer::start(dir.path()).expect("observer should start");

		fs::write(dir.path().join("a.bak"), b"hello").unwrap();

		let event = rx.recv_timeout(Duration::from_secs(5)).expect("expected an event");
		match event {
			ObserverEvent::Changed(path) => assert_eq!(path.file_name().unwrap(), "a.bak"),
			ObserverEvent::Deleted(_) => panic!("expected Changed"),
		}

		observer.stop();
	}

	#[test]
	fn test_start_fails_on_missing_root() {
		let missing = Path::new("/no/such/root/hopefully");
		let result = Observer::start(missing);
		assert!(result.is_err());
	}
}

// vim: ts=4
