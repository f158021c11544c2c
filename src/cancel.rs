#![allow(dead_code)]

//! A cheap, clonable flag shared between an engine's worker thread, its
//! copier calls, and any `CopyLane` wait it is parked in, so any of them
//! can ask the others to stop promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
	pub fn new() -> Self {
		CancelSignal(Arc::new(AtomicBool::new(false)))
	}

	/// Assert the signal. Idempotent.
	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	/// Clear the signal so the same handle can be reused for a new run.
	pub fn reset(&self) {
		self.0.store(false, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_starts_uncancelled() {
		let sig = CancelSignal::new();
		assert!(!sig.is_cancelled());
	}

	#[test]
	fn test_cancel_is_observed_across_clones() {
		let sig = CancelSignal::new();
		let clone = sig.clone();
		clone.cancel();
		assert!(sig.is_cancelled());
	}

	#[test]
	fn test_reset_clears() {
		let sig = CancelSignal::new();
		sig.cancel();
		sig.reset();
		assert!(!sig.is_cancelled());
	}
}

// vim: ts=4
