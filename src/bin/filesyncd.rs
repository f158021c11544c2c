//! One-shot CLI entry point: parses a single `SyncConfiguration` from
//! flags, runs one engine to completion, and stops cleanly on Ctrl-C.

use filesyncd::cli;
use filesyncd::coordinator::Coordinator;
use filesyncd::engine::{self, EngineState};
use filesyncd::logging::*;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> ExitCode {
	let matches = cli::build_command().get_matches();

	let (config, log_level) = match cli::configuration_from_matches(&matches) {
		Ok(parsed) => parsed,
		Err(e) => {
			eprintln!("error: {}", e);
			return ExitCode::from(1);
		}
	};

	if std::env::var("RUST_LOG").is_err() {
		std::env::set_var("RUST_LOG", &log_level);
	}
	init_tracing();

	if let Err(e) = config.validate() {
		eprintln!("error: {}", e);
		return ExitCode::from(1);
	}

	let interrupted = Arc::new(AtomicBool::new(false));
	let interrupted_handler = interrupted.clone();
	if let Err(e) = ctrlc::set_handler(move || {
		interrupted_handler.store(true, Ordering::SeqCst);
	}) {
		warn!("failed to install Ctrl-C handler: {}", e);
	}

	let callback: Arc<engine::StatusCallback> = Arc::new(|config_id, _is_running, status| {
		info!(
			"[{}] {:?} {} ({}%)",
			config_id,
			status.state,
			status.current_file.as_deref().unwrap_or(&status.details),
			status.progress_percent
		);
	});

	let coordinator = Coordinator::new();
	let handle = match engine::spawn(config, coordinator, callback) {
		Ok(handle) => handle,
		Err(e) => {
			eprintln!("error: {}", e);
			return ExitCode::from(1);
		}
	};

	while !interrupted.load(Ordering::SeqCst) {
		if matches!(handle.status().state, EngineState::Stopped) {
			break;
		}
		std::thread::sleep(Duration::from_millis(200));
	}

	handle.signal_stop();
	handle.join_with_timeout(Duration::from_secs(2));

	ExitCode::from(0)
}

// vim: ts=4
