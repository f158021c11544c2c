#![allow(dead_code)]

//! Pattern matcher (C1): case-insensitive multi-glob membership test over
//! a file's leaf name. No include/exclude layering, no anchoring, no
//! "always excluded" built-ins, just membership in a configured set of
//! glob patterns.

use crate::error::ConfigError;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Compiled, case-insensitive glob set for a sync configuration's
/// `patterns` list. The empty list is normalized to `["*"]`.
pub struct PatternMatcher {
	set: GlobSet,
}

impl PatternMatcher {
	/// Build a matcher from a configuration's raw pattern list.
	pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
		let normalized: Vec<String> =
			if patterns.is_empty() { vec!["*".to_string()] } else { patterns.to_vec() };

		let mut builder = GlobSetBuilder::new();
		for pattern in &normalized {
			let glob = build_case_insensitive_glob(pattern)?;
			builder.add(glob);
		}
		let set = builder.build().map_err(|e| ConfigError::Invalid {
			message: format!("failed to build pattern set: {}", e),
		})?;

		Ok(PatternMatcher { set })
	}

	/// Test whether `name` (a file leaf, not a full path) matches any
	/// pattern. Matching is case-insensitive on both pattern and name.
	pub fn matches_name(&self, name: &str) -> bool {
		self.set.is_match(Path::new(name))
	}
}

fn build_case_insensitive_glob(pattern: &str) -> Result<Glob, ConfigError> {
	GlobBuilder::new(pattern).case_insensitive(true).literal_separator(false).build().map_err(
		|e| ConfigError::Invalid { message: format!("invalid pattern '{}': {}", pattern, e) },
	)
}

/// One-shot convenience form of the match test, for callers that don't
/// want to keep a compiled `PatternMatcher` around (e.g. a one-off CLI
/// check). Invalid patterns are treated as non-matching rather than
/// propagated, since this helper has no error channel.
pub fn matches(name: &str, patterns: &[String]) -> bool {
	match PatternMatcher::new(patterns) {
		Ok(matcher) => matcher.matches_name(name),
		Err(_) => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_star_matches_everything() {
		let m = PatternMatcher::new(&[]).unwrap();
		assert!(m.matches_name("anything.txt"));
		assert!(m.matches_name("README"));
	}

	#[test]
	fn test_basic_extension_match() {
		let m = PatternMatcher::new(&["*.bak".to_string()]).unwrap();
		assert!(m.matches_name("database.bak"));
		assert!(!m.matches_name("database.txt"));
	}

	#[test]
	fn test_case_insensitivity_both_sides() {
		assert!(matches("A.BAK", &["*.bak".to_string()]));
		assert!(matches("a.bak", &["*.BAK".to_string()]));
		assert!(matches("A.BAK", &["*.BAK".to_string()]));
	}

	#[test]
	fn test_multiple_patterns_are_ored() {
		let m = PatternMatcher::new(&["*.bak".to_string(), "*.pbd".to_string()]).unwrap();
		assert!(m.matches_name("x.bak"));
		assert!(m.matches_name("x.pbd"));
		assert!(!m.matches_name("x.txt"));
	}

	#[test]
	fn test_question_mark_and_set_globs() {
		let m = PatternMatcher::new(&["file?.txt".to_string()]).unwrap();
		assert!(m.matches_name("file1.txt"));
		assert!(!m.matches_name("file12.txt"));

		let m = PatternMatcher::new(&["file[0-9].txt".to_string()]).unwrap();
		assert!(m.matches_name("file5.txt"));
		assert!(!m.matches_name("fileA.txt"));
	}

	#[test]
	fn test_invalid_pattern_errors() {
		let result = PatternMatcher::new(&["[".to_string()]);
		assert!(result.is_err());
	}
}

// vim: ts=4
