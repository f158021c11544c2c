#![allow(dead_code)]

//! CLI front-end (C10): parses the one-shot invocation flags into a
//! `SyncConfiguration` for the standalone binary.

use crate::config::{RetentionMode, SyncConfiguration};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

pub fn build_command() -> Command {
	Command::new("filesyncd")
		.about("Watches a source directory and mirrors matching files to a destination with retention")
		.arg(Arg::new("source").long("source").required(true).value_name("PATH").help("Source directory to watch"))
		.arg(
			Arg::new("destination")
				.long("destination")
				.required(true)
				.value_name("PATH")
				.help("Destination directory to mirror into"),
		)
		.arg(
			Arg::new("pattern")
				.long("pattern")
				.value_name("GLOB")
				.action(ArgAction::Append)
				.help("Case-insensitive glob to match (repeatable); default is every file"),
		)
		.arg(
			Arg::new("retention-mode")
				.long("retention-mode")
				.value_name("MODE")
				.value_parser(["days", "count", "sync"])
				.default_value("days")
				.help("Retention policy applied to the destination"),
		)
		.arg(
			Arg::new("retention")
				.long("retention")
				.value_name("N")
				.help("Retention value; meaning depends on --retention-mode"),
		)
		.arg(
			Arg::new("retention-days")
				.long("retention-days")
				.value_name("N")
				.conflicts_with("retention")
				.help("Alias for --retention when --retention-mode=days"),
		)
		.arg(
			Arg::new("retention-files")
				.long("retention-files")
				.value_name("N")
				.conflicts_with("retention")
				.help("Alias for --retention when --retention-mode=count"),
		)
		.arg(
			Arg::new("settle-seconds")
				.long("settle-seconds")
				.value_name("SECONDS")
				.default_value("10")
				.help("Stability period required before a file is eligible for copy"),
		)
		.arg(
			Arg::new("scan-interval-minutes")
				.long("scan-interval-minutes")
				.value_name("MINUTES")
				.default_value("10")
				.help("Minutes between full source rescans; 0 disables"),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.value_name("LEVEL")
				.default_value("info")
				.help("Overrides RUST_LOG for this invocation"),
		)
}

#[derive(Debug)]
pub struct CliError(pub String);

impl std::fmt::Display for CliError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Parsed flags, before `SyncConfiguration::validate()`.
pub fn configuration_from_matches(matches: &clap::ArgMatches) -> Result<(SyncConfiguration, String), CliError> {
	let retention_mode = match matches.get_one::<String>("retention-mode").map(String::as_str) {
		Some("count") => RetentionMode::Count,
		Some("sync") => RetentionMode::Sync,
		_ => RetentionMode::Days,
	};

	let retention_value = resolve_retention_value(matches, retention_mode)?;

	let patterns: Vec<String> =
		matches.get_many::<String>("pattern").map(|values| values.cloned().collect()).unwrap_or_default();

	let config = SyncConfiguration {
		id: 1,
		name: "cli".to_string(),
		source_root: PathBuf::from(matches.get_one::<String>("source").unwrap()),
		destination_root: PathBuf::from(matches.get_one::<String>("destination").unwrap()),
		patterns,
		retention_mode,
		retention_value,
		settle_seconds: parse_u64(matches, "settle-seconds")?,
		scan_interval_minutes: parse_u64(matches, "scan-interval-minutes")?,
		is_active: true,
	};

	let log_level = matches.get_one::<String>("log-level").cloned().unwrap_or_else(|| "info".to_string());
	Ok((config, log_level))
}

fn resolve_retention_value(matches: &clap::ArgMatches, mode: RetentionMode) -> Result<u64, CliError> {
	if let Some(value) = matches.get_one::<String>("retention") {
		return parse_field(value, "--retention");
	}
	match mode {
		RetentionMode::Days => match matches.get_one::<String>("retention-days") {
			Some(value) => parse_field(value, "--retention-days"),
			None => Ok(60),
		},
		RetentionMode::Count => match matches.get_one::<String>("retention-files") {
			Some(value) => parse_field(value, "--retention-files"),
			None => Ok(10),
		},
		RetentionMode::Sync => Ok(0),
	}
}

fn parse_u64(matches: &clap::ArgMatches, name: &str) -> Result<u64, CliError> {
	parse_field(matches.get_one::<String>(name).unwrap(), name)
}

fn parse_field(value: &str, field: &str) -> Result<u64, CliError> {
	value.parse::<u64>().map_err(|_| CliError(format!("{} must be a non-negative integer, got '{}'", field, value)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> Result<(SyncConfiguration, String), CliError> {
		let matches = build_command().try_get_matches_from(args).expect("args should parse");
		configuration_from_matches(&matches)
	}

	#[test]
	fn test_minimal_invocation_uses_defaults() {
		let (config, log_level) = parse(&["filesyncd", "--source", "/src", "--destination", "/dst"]).unwrap();
		assert_eq!(config.retention_mode, RetentionMode::Days);
		assert_eq!(config.retention_value, 60);
		assert_eq!(config.settle_seconds, 10);
		assert_eq!(log_level, "info");
	}

	#[test]
	fn test_retention_days_alias() {
		let (config, _) =
			parse(&["filesyncd", "--source", "/src", "--destination", "/dst", "--retention-mode", "days", "--retention-days", "30"])
				.unwrap();
		assert_eq!(config.retention_value, 30);
	}

	#[test]
	fn test_retention_files_alias_under_count_mode() {
		let (config, _) = parse(&[
			"filesyncd",
			"--source",
			"/src",
			"--destination",
			"/dst",
			"--retention-mode",
			"count",
			"--retention-files",
			"5",
		])
		.unwrap();
		assert_eq!(config.retention_mode, RetentionMode::Count);
		assert_eq!(config.retention_value, 5);
	}

	#[test]
	fn test_explicit_retention_flag_wins_over_alias_defaults() {
		let (config, _) =
			parse(&["filesyncd", "--source", "/src", "--destination", "/dst", "--retention", "7"]).unwrap();
		assert_eq!(config.retention_value, 7);
	}

	#[test]
	fn test_sync_mode_forces_zero_retention() {
		let (config, _) =
			parse(&["filesyncd", "--source", "/src", "--destination", "/dst", "--retention-mode", "sync"]).unwrap();
		assert_eq!(config.retention_value, 0);
	}

	#[test]
	fn test_multiple_patterns_collected() {
		let (config, _) = parse(&[
			"filesyncd",
			"--source",
			"/src",
			"--destination",
			"/dst",
			"--pattern",
			"*.bak",
			"--pattern",
			"*.pbd",
		])
		.unwrap();
		assert_eq!(config.patterns, vec!["*.bak".to_string(), "*.pbd".to_string()]);
	}

	#[test]
	fn test_invalid_numeric_field_is_rejected() {
		let result = parse(&["filesyncd", "--source", "/src", "--destination", "/dst", "--retention", "not-a-number"]);
		assert!(result.is_err());
	}
}

// vim: ts=4
