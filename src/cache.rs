//! In-process memo of the content collection.
//!
//! Walking the blog directory and parsing every front matter block is the
//! only I/O in the query path. [`ContentCache`] runs it once per
//! *generation* and hands every later caller the same immutable records.
//!
//! # Design
//!
//! - **Generation counter**: [`ContentCache::invalidate`] bumps an atomic
//!   counter and drops the memo, both under the memo lock. The next
//!   [`get_all`](ContentCache::get_all) reads the counter under that same
//!   lock and reloads everything. There is no per-file or per-slug
//!   invalidation.
//!
//! - **Shared, immutable records**: the memo is an `Arc<Vec<ContentRecord>>`.
//!   Readers clone the `Arc`, never the records, and nothing mutates them
//!   after load, so any number of threads can read concurrently.
//!
//! - **Single load per generation**: the loader runs while the memo lock is
//!   held. Concurrent first callers wait for that load instead of each
//!   walking the filesystem.
//!
//! - **Degraded mode**: a loader that panics poisons the lock. Later callers
//!   do not fail; they log a warning and load without memoizing.
//!
//! The loader sits behind [`ContentSource`] so tests can count loads.

use crate::extract;
use crate::types::ContentRecord;
use crate::walk;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Produces the full content collection. Called at most once per generation.
pub trait ContentSource: Send + Sync {
    fn load(&self) -> Vec<ContentRecord>;
}

/// Walks `root` for `*.{extension}` files and extracts each one.
#[derive(Debug, Clone)]
pub struct FsSource {
    pub root: PathBuf,
    pub extension: String,
    pub public_prefix: String,
}

impl ContentSource for FsSource {
    fn load(&self) -> Vec<ContentRecord> {
        let paths = walk::walk(&self.root, &self.extension);
        let records = extract::extract_all(&paths, &self.public_prefix);
        info!(
            root = %self.root.display(),
            found = paths.len(),
            loaded = records.len(),
            "loaded content"
        );
        records
    }
}

struct Memo {
    generation: u64,
    records: Arc<Vec<ContentRecord>>,
}

pub struct ContentCache<S: ContentSource = FsSource> {
    source: S,
    generation: AtomicU64,
    memo: Mutex<Option<Memo>>,
}

impl<S: ContentSource> ContentCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
            memo: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// All records of the current generation, loading them on first use.
    pub fn get_all(&self) -> Arc<Vec<ContentRecord>> {
        let mut memo = match self.memo.lock() {
            Ok(memo) => memo,
            Err(_) => {
                warn!(
                    generation = self.generation(),
                    "content cache unavailable, loading uncached"
                );
                return Arc::new(self.source.load());
            }
        };
        // Read under the lock so a load can never be stored under a
        // generation older than one already memoized.
        let generation = self.generation();

        if let Some(m) = memo.as_ref()
            && m.generation == generation
        {
            debug!(generation, "content cache hit");
            return Arc::clone(&m.records);
        }

        debug!(generation, "content cache rebuild");
        let records = Arc::new(self.source.load());
        *memo = Some(Memo {
            generation,
            records: Arc::clone(&records),
        });
        records
    }

    /// Start a new generation. The next [`get_all`](Self::get_all) reloads.
    pub fn invalidate(&self) {
        let generation = match self.memo.lock() {
            Ok(mut memo) => {
                *memo = None;
                self.generation.fetch_add(1, Ordering::AcqRel) + 1
            }
            Err(_) => self.generation.fetch_add(1, Ordering::AcqRel) + 1,
        };
        debug!(generation, "content cache invalidated");
    }
}
