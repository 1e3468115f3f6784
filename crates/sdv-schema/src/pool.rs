//! # Workers, Cancellation and File Loading
//!
//! All per-file and per-sample work runs on a dedicated rayon pool whose
//! size is the configured concurrency limit. That one number bounds open
//! file handles and the number of validations in flight.
//!
//! Workers never write shared state. Each returns a private result, and the
//! catalog builders merge once every worker has finished. Cancellation is a
//! flag every worker checks before blocking work; a cancelled build returns
//! [`Cancelled`] and its partial results are dropped.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Cancelled, HarnessError};

/// Cloneable cancellation signal shared between the host and the workers.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A bounded rayon pool.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Start a pool with `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::WorkerPool` if rayon cannot spawn the threads.
    pub fn new(threads: usize) -> Result<Self, HarnessError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sdv-worker-{i}"))
            .build()
            .map_err(|e| HarnessError::WorkerPool(e.to_string()))?;
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `op` inside the pool; any rayon parallel iterator it uses is
    /// scheduled on this pool's threads only.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("threads", &self.threads).finish()
    }
}

/// Settings shared by both catalog builders.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Extra attempts for reads that fail with a transient error.
    pub io_retries: u32,
    pub cancel: CancellationFlag,
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}

/// Read a file, retrying transient failures. Reads are idempotent, so a
/// retry can never observe a partial effect.
pub(crate) fn read_with_retry(path: &Path, retries: u32) -> std::io::Result<Vec<u8>> {
    let mut attempt = 0;
    loop {
        match std::fs::read(path) {
            Ok(bytes) => return Ok(bytes),
            Err(e) if is_transient(e.kind()) && attempt < retries => {
                attempt += 1;
                tracing::debug!(path = %path.display(), attempt, error = %e, "retrying read");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Load one JSON document. The error is a human-readable detail for a
/// [`crate::error::LoadError`].
pub(crate) fn load_json(path: &Path, options: &LoadOptions) -> Result<Value, String> {
    let bytes =
        read_with_retry(path, options.io_retries).map_err(|e| format!("cannot read file: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(flag.check().is_ok());
        clone.cancel();
        assert!(flag.is_cancelled());
        assert_eq!(flag.check(), Err(Cancelled));
    }

    #[test]
    fn test_worker_pool_bounds_threads() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2);
        let n = pool.install(rayon::current_num_threads);
        assert_eq!(n, 2);
    }

    #[test]
    fn test_load_json_reports_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_json(&path, &LoadOptions::default()).unwrap_err();
        assert!(err.starts_with("invalid JSON"), "{err}");
    }

    #[test]
    fn test_load_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json(&dir.path().join("absent.json"), &LoadOptions::default()).unwrap_err();
        assert!(err.starts_with("cannot read file"), "{err}");
    }

    #[test]
    fn test_load_json_keeps_decimal_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n.json");
        std::fs::write(&path, r#"{"value": 0.10000000000000000555}"#).unwrap();
        let v = load_json(&path, &LoadOptions::default()).unwrap();
        assert_eq!(v["value"].to_string(), "0.10000000000000000555");
    }
}
