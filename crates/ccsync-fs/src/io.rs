//! Atomic I/O operations with file locking and bounded retries

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Distinguishes temp files written concurrently by one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Tuning for atomic writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to wait for the advisory lock before giving up
    pub lock_timeout: Duration,
    /// Flush file contents to disk before the rename
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// Bounded exponential backoff for operations that may race a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Classification of a failed attempt.
#[derive(Debug)]
pub enum Retry<E> {
    /// Worth trying again after a delay
    Transient(E),
    /// Retrying cannot help
    Permanent(E),
}

/// Run `op` until it succeeds, fails permanently, or exhausts the policy.
///
/// Returns the last error when attempts run out.
pub fn retry_bounded<T, E>(
    policy: RetryPolicy,
    mut op: impl FnMut() -> std::result::Result<T, Retry<E>>,
) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.base_delay)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_interval(Duration::from_secs(30))
        .with_max_elapsed_time(None)
        .build();

    let result = backoff::retry_notify(
        backoff,
        || {
            attempt += 1;
            match op() {
                Ok(value) => Ok(value),
                Err(Retry::Permanent(e)) => Err(backoff::Error::permanent(e)),
                Err(Retry::Transient(e)) if attempt >= max_attempts => {
                    Err(backoff::Error::permanent(e))
                }
                Err(Retry::Transient(e)) => Err(backoff::Error::transient(e)),
            }
        },
        |e: E, delay: Duration| {
            tracing::warn!(
                error = %e,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, retrying"
            );
        },
    );

    result.map_err(|e| match e {
        backoff::Error::Permanent(e) => e,
        backoff::Error::Transient { err, .. } => err,
    })
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so concurrent readers never observe a
/// partial file. The temp file is locked while it is being written.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default(),
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let result = write_locked(&temp_path, &native_path, content, config)
        .and_then(|()| fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e)));

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_locked(
    temp_path: &std::path::Path,
    target: &std::path::Path,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    acquire_exclusive(&temp_file, target, config.lock_timeout)?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if config.enable_fsync {
        temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    }

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;

    Ok(())
}

fn acquire_exclusive(file: &fs::File, target: &std::path::Path, timeout: Duration) -> Result<()> {
    let started = Instant::now();
    let mut delay = Duration::from_millis(5);
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                if started.elapsed() >= timeout {
                    return Err(Error::LockTimeout {
                        path: target.to_path_buf(),
                        timeout_ms: timeout.as_millis(),
                    });
                }
                std::thread::sleep(delay);
                delay = (delay * 2).min(Duration::from_millis(200));
            }
            Err(_) => {
                return Err(Error::LockFailed {
                    path: target.to_path_buf(),
                });
            }
        }
    }
}

/// Read raw bytes from a file.
pub fn read_bytes(path: &NormalizedPath) -> Result<Vec<u8>> {
    let native_path = path.to_native();
    fs::read(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str, config: RobustnessConfig) -> Result<()> {
    write_atomic(path, content.as_bytes(), config)
}
