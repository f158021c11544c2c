#![allow(dead_code)]

//! Chunked copier (C3): resumable byte-stream copy with cancellation and
//! progress reporting, publishing atomically via temp file + rename.
//!
//! Copying runs synchronously on the engine's own worker thread, so plain
//! `std::fs` I/O is enough; there is nothing else for that thread to
//! overlap with while a copy is in flight.

use crate::cancel::CancelSignal;
use crate::error::CopyError;
use crate::logging::*;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Fixed chunk size for copy I/O.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Result of a completed (non-cancelled, non-error) copy attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum CopyOutcome {
	/// The file was copied (or resumed to completion) at this path.
	Copied(PathBuf),
	/// The source file disappeared before the copy could start.
	Skipped,
}

/// Compute the destination path for a source file.
///
/// With `overwrite = true`, always returns `destination_root / rel`. With
/// `overwrite = false`, if that path already exists on disk, a
/// `{stem}_{YYYYMMDD-HHMMSS}{suffix}` variant (local time) is returned
/// instead, so repeated non-overwrite copies never clobber a prior one.
pub fn build_destination_path(
	destination_root: &Path,
	source_file: &Path,
	source_root: &Path,
	overwrite: bool,
) -> PathBuf {
	let rel = match source_file.strip_prefix(source_root) {
		Ok(rel) => rel.to_path_buf(),
		Err(_) => PathBuf::from(source_file.file_name().unwrap_or_default()),
	};

	let target = destination_root.join(rel);

	if !overwrite && target.exists() {
		let timestamp = Local::now().format("%Y%m%d-%H%M%S");
		let stem = target.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
		let suffix = target.extension().and_then(|s| s.to_str()).map(|s| format!(".{}", s));
		let new_name = match suffix {
			Some(suffix) => format!("{}_{}{}", stem, timestamp, suffix),
			None => format!("{}_{}", stem, timestamp),
		};
		return target.with_file_name(new_name);
	}

	target
}

fn part_path(target: &Path) -> PathBuf {
	let mut name = target.file_name().unwrap_or_default().to_os_string();
	name.push(".part");
	target.with_file_name(name)
}

/// Copy `source_file` into `destination_root`, mirroring its relative
/// position under `source_root`.
///
/// `progress_cb(name, bytes_copied, total_bytes)` fires at least once at
/// start, once per chunk boundary, and once at completion. `cancel` is
/// polled before every read and after every chunk; an asserted signal
/// aborts the copy with `CopyError::Cancelled`, leaving the `.part` file
/// in place for a future resume.
pub fn copy_file(
	source_file: &Path,
	destination_root: &Path,
	source_root: &Path,
	overwrite: bool,
	cancel: &CancelSignal,
	mut progress_cb: impl FnMut(&str, u64, u64),
) -> Result<CopyOutcome, CopyError> {
	let file_name = source_file.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string();

	let total_bytes = match fs::metadata(source_file) {
		Ok(meta) => meta.len(),
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CopyOutcome::Skipped),
		Err(e) => return Err(CopyError::Io(e)),
	};

	let target = build_destination_path(destination_root, source_file, source_root, overwrite);
	if let Some(parent) = target.parent() {
		fs::create_dir_all(parent)?;
	}

	let temp = part_path(&target);
	let resume_offset = match fs::metadata(&temp) {
		Ok(meta) if meta.len() > 0 && meta.len() < total_bytes => meta.len(),
		_ => 0,
	};

	info!(
		"starting copy {} ({} bytes, resume_offset={}) -> {}",
		source_file.display(),
		total_bytes,
		resume_offset,
		target.display()
	);

	progress_cb(&file_name, resume_offset, total_bytes);

	let result =
		run_chunk_loop(source_file, &temp, resume_offset, total_bytes, cancel, |copied| {
			progress_cb(&file_name, copied, total_bytes)
		});

	match result {
		Ok(()) => {}
		Err(CopyError::Cancelled) => {
			info!("copy cancelled for {} ({}, preserved for resume)", source_file.display(), temp.display());
			return Err(CopyError::Cancelled);
		}
		Err(e) => {
			warn!("copy failed for {}: {} (leaving {} for retry)", source_file.display(), e, temp.display());
			return Err(e);
		}
	}

	if target.exists() {
		if let Err(e) = fs::remove_file(&target) {
			if e.kind() == io::ErrorKind::PermissionDenied {
			warn!("cannot remove existing {} (in use), skipping copy", target.display());
			return Ok(CopyOutcome::Skipped);
		}
		return Err(CopyError::Io(e));
		}
	}

	publish(&temp, &target)?;
	if let Err(e) = copy_metadata(source_file, &target) {
		warn!("failed to copy metadata onto {}: {}", target.display(), e);
	}

	progress_cb(&file_name, total_bytes, total_bytes);
	info!("copied {} -> {}", source_file.display(), target.display());

	Ok(CopyOutcome::Copied(target))
}

fn run_chunk_loop(
	source_file: &Path,
	temp: &Path,
	resume_offset: u64,
	total_bytes: u64,
	cancel: &CancelSignal,
	mut on_progress: impl FnMut(u64),
) -> Result<(), CopyError> {
	let mut src = File::open(source_file)?;
	if resume_offset > 0 {
		src.seek(SeekFrom::Start(resume_offset))?;
	}

	let mut dst = OpenOptions::new()
		.create(true)
		.write(true)
		.append(resume_offset > 0)
		.truncate(resume_offset == 0)
		.open(temp)?;

	let mut copied = resume_offset;
	let mut buf = vec![0u8; CHUNK_SIZE];

	loop {
		if cancel.is_cancelled() {
			return Err(CopyError::Cancelled);
		}

		let n = src.read(&mut buf)?;
		if n == 0 {
			break;
		}

		dst.write_all(&buf[..n])?;
		copied += n as u64;

		if cancel.is_cancelled() {
			return Err(CopyError::Cancelled);
		}

		on_progress(copied);

		if copied >= total_bytes {
			break;
		}
	}

	dst.flush()?;
	Ok(())
}

fn publish(temp: &Path, target: &Path) -> Result<(), CopyError> {
	match fs::rename(temp, target) {
		Ok(()) => Ok(()),
		Err(e) if is_cross_device(&e) => {
			fs::copy(temp, target)?;
			fs::remove_file(temp)?;
			Ok(())
		}
		Err(e) => Err(CopyError::Io(e)),
	}
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
	e.raw_os_error() == Some(libc_exdev())
}

#[cfg(not(unix))]
fn is_cross_device(_e: &io::Error) -> bool {
	false
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
	18 // EXDEV on Linux/BSD/macOS
}

fn copy_metadata(source_file: &Path, target: &Path) -> io::Result<()> {
	let source_meta = fs::metadata(source_file)?;
	let mtime = filetime::FileTime::from_last_modification_time(&source_meta);
	let atime = filetime::FileTime::from_last_access_time(&source_meta);
	filetime::set_file_times(target, atime, mtime)?;
	fs::set_permissions(target, source_meta.permissions())?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write as _;
	use tempfile::TempDir;

	fn write_file(path: &Path, bytes: &[u8]) {
		let mut f = File::create(path).unwrap();
		f.write_all(bytes).unwrap();
	}

	#[test]
	fn test_build_destination_path_overwrite_true_is_deterministic() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("sub/a.bak");
		fs::create_dir_all(source_file.parent().unwrap()).unwrap();
		write_file(&source_file, b"hello");

		let p1 = build_destination_path(dest_root.path(), &source_file, src_root.path(), true);
		let p2 = build_destination_path(dest_root.path(), &source_file, src_root.path(), true);
		assert_eq!(p1, p2);
		assert_eq!(p1, dest_root.path().join("sub/a.bak"));
	}

	#[test]
	fn test_build_destination_path_leaf_fallback_outside_root() {
		let src_root = TempDir::new().unwrap();
		let other_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = other_root.path().join("a.bak");
		write_file(&source_file, b"hi");

		let p = build_destination_path(dest_root.path(), &source_file, src_root.path(), true);
		assert_eq!(p, dest_root.path().join("a.bak"));
	}

	#[test]
	fn test_build_destination_path_non_overwrite_suffixes_on_collision() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("a.bak");
		write_file(&source_file, b"hi");

		let existing = dest_root.path().join("a.bak");
		write_file(&existing, b"old");

		let p = build_destination_path(dest_root.path(), &source_file, src_root.path(), false);
		assert_ne!(p, existing);
		assert!(p.file_stem().unwrap().to_str().unwrap().starts_with("a_"));
		assert_eq!(p.extension().unwrap(), "bak");
	}

	#[test]
	fn test_copy_small_file_end_to_end() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("a.bak");
		write_file(&source_file, b"hello world");

		let cancel = CancelSignal::new();
		let mut calls = Vec::new();
		let outcome = copy_file(&source_file, dest_root.path(), src_root.path(), true, &cancel, |_name, copied, total| {
			calls.push((copied, total));
		})
		.unwrap();

		match outcome {
			CopyOutcome::Copied(path) => {
				assert_eq!(fs::read(&path).unwrap(), b"hello world");
				assert!(!part_path(&path).exists());
			}
			CopyOutcome::Skipped => panic!("expected Copied"),
		}
		assert!(calls.last().unwrap().0 == calls.last().unwrap().1);
	}

	#[test]
	fn test_copy_missing_source_is_skipped() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("gone.bak");

		let cancel = CancelSignal::new();
		let outcome =
			copy_file(&source_file, dest_root.path(), src_root.path(), true, &cancel, |_, _, _| {}).unwrap();
		assert_eq!(outcome, CopyOutcome::Skipped);
	}

	#[test]
	fn test_resume_from_partial_part_file() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("big.bin");
		let content = vec![42u8; CHUNK_SIZE * 3 + 17];
		write_file(&source_file, &content);

		let target = dest_root.path().join("big.bin");
		let partial = part_path(&target);
		fs::create_dir_all(partial.parent().unwrap()).unwrap();
		write_file(&partial, &content[..CHUNK_SIZE]);

		let cancel = CancelSignal::new();
		let outcome =
			copy_file(&source_file, dest_root.path(), src_root.path(), true, &cancel, |_, _, _| {}).unwrap();

		match outcome {
			CopyOutcome::Copied(path) => {
				assert_eq!(fs::read(&path).unwrap(), content);
			}
			CopyOutcome::Skipped => panic!("expected Copied"),
		}
	}

	#[test]
	fn test_cancel_preserves_part_file() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("big.bin");
		write_file(&source_file, &vec![7u8; CHUNK_SIZE * 2]);

		let cancel = CancelSignal::new();
		cancel.cancel();
		let result =
			copy_file(&source_file, dest_root.path(), src_root.path(), true, &cancel, |_, _, _| {});

		assert!(matches!(result, Err(CopyError::Cancelled)));
		let target = dest_root.path().join("big.bin");
		assert!(!target.exists());
	}

	#[test]
	fn test_overwrite_replaces_existing_target() {
		let src_root = TempDir::new().unwrap();
		let dest_root = TempDir::new().unwrap();
		let source_file = src_root.path().join("a.bak");
		write_file(&source_file, b"new content");

		let existing = dest_root.path().join("a.bak");
		write_file(&existing, b"stale");

		let cancel = CancelSignal::new();
		let outcome =
			copy_file(&source_file, dest_root.path(), src_root.path(), true, &cancel, |_, _, _| {}).unwrap();

		match outcome {
			CopyOutcome::Copied(path) => assert_eq!(fs::read(&path).unwrap(), b"new content"),
			CopyOutcome::Skipped => panic!("expected Copied"),
		}
	}
}

// vim: ts=4
