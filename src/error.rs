//! Error types for filesyncd operations

use std::error::Error;
use std::fmt;
use std::io;

/// Errors raised while validating a `SyncConfiguration`.
#[derive(Debug)]
pub enum ConfigError {
	/// `source_root` does not exist or is not a directory
	SourceNotFound { path: String },
	/// `retention_value` is invalid for the selected `retention_mode`
	InvalidRetention { message: String },
	/// Any other configuration problem
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::SourceNotFound { path } => {
				write!(f, "source folder does not exist or is not a directory: {}", path)
			}
			ConfigError::InvalidRetention { message } => write!(f, "invalid retention: {}", message),
			ConfigError::Invalid { message } => write!(f, "invalid configuration: {}", message),
		}
	}
}

impl Error for ConfigError {}

/// Errors raised by the history store (C2). History corruption is recovered
/// from by the caller; this type exists for the rare case a caller wants
/// to observe the failure instead of swallowing it.
#[derive(Debug)]
pub enum HistoryError {
	Io(io::Error),
	Serialize(serde_json::Error),
}

impl fmt::Display for HistoryError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HistoryError::Io(e) => write!(f, "history I/O error: {}", e),
			HistoryError::Serialize(e) => write!(f, "history serialization error: {}", e),
		}
	}
}

impl Error for HistoryError {}

impl From<io::Error> for HistoryError {
	fn from(e: io::Error) -> Self {
		HistoryError::Io(e)
	}
}

impl From<serde_json::Error> for HistoryError {
	fn from(e: serde_json::Error) -> Self {
		HistoryError::Serialize(e)
	}
}

/// Outcome of a chunked-copy attempt (C3). `Cancelled` is modeled as a
/// result kind rather than an exception, so the engine loop can branch on
/// it explicitly instead of unwinding.
#[derive(Debug)]
pub enum CopyError {
	Io(io::Error),
	Cancelled,
}

impl fmt::Display for CopyError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CopyError::Io(e) => write!(f, "copy I/O error: {}", e),
			CopyError::Cancelled => write!(f, "copy cancelled"),
		}
	}
}

impl Error for CopyError {}

impl From<io::Error> for CopyError {
	fn from(e: io::Error) -> Self {
		CopyError::Io(e)
	}
}

/// Errors raised by the source observer (C5).
#[derive(Debug)]
pub enum ObserverError {
	StartFailed { message: String },
}

impl fmt::Display for ObserverError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ObserverError::StartFailed { message } => {
				write!(f, "failed to start filesystem observer: {}", message)
			}
		}
	}
}

impl Error for ObserverError {}

/// Main error type for sync operations
///
/// This is the unified error type that encompasses all sync-related errors.
/// It contains both direct variants for common errors and nested variants
/// for domain-specific errors.
#[derive(Debug)]
pub enum SyncError {
	/// Invalid configuration (nested)
	Config(ConfigError),

	/// History store error (nested)
	History(HistoryError),

	/// Chunked-copy error (nested)
	Copy(CopyError),

	/// Filesystem observer error (nested)
	Observer(ObserverError),

	/// I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Config(e) => write!(f, "{}", e),
			SyncError::History(e) => write!(f, "{}", e),
			SyncError::Copy(e) => write!(f, "{}", e),
			SyncError::Observer(e) => write!(f, "{}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

impl From<HistoryError> for SyncError {
	fn from(e: HistoryError) -> Self {
		SyncError::History(e)
	}
}

impl From<CopyError> for SyncError {
	fn from(e: CopyError) -> Self {
		SyncError::Copy(e)
	}
}

impl From<ObserverError> for SyncError {
	fn from(e: ObserverError) -> Self {
		SyncError::Observer(e)
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

// vim: ts=4
