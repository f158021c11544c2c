//! # filesyncd: file-replication daemon core
//!
//! A long-running file-replication daemon that watches source directories
//! for newly-created or modified backup files and mirrors them to a
//! matching destination directory, enforcing a retention policy on the
//! destination. Multiple independent sync configurations run concurrently
//! in the same process under one `Supervisor`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filesyncd::config::SyncConfiguration;
//! use filesyncd::supervisor::Supervisor;
//! use std::sync::Arc;
//!
//! let supervisor = Supervisor::new();
//! let config = SyncConfiguration { /* ... */ ..Default::default() };
//! supervisor.start(config, Arc::new(|id, running, status| {
//!     println!("{} running={} {:?}", id, running, status.state);
//! }))?;
//! # Ok::<(), filesyncd::error::ConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(dead_code)]

pub mod cancel;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod copier;
pub mod engine;
pub mod error;
pub mod history;
pub mod logging;
pub mod observer;
pub mod patterns;
pub mod pending;
pub mod retention;
pub mod supervisor;

pub use config::{RetentionMode, SyncConfiguration};
pub use coordinator::{Coordinator, CopyLane};
pub use engine::{EngineHandle, EngineState, EngineStatus, StatusCallback};
pub use error::{ConfigError, CopyError, HistoryError, ObserverError, SyncError};
pub use supervisor::{StopOutcome, Supervisor};

// vim: ts=4
