//! Per-invocation stage environment: base directory, clock, run ids.

use regimelab_core::data::PartitionedStore;
use regimelab_core::domain::{Clock, RandomRunIds, RunIdGenerator, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a stage needs besides its own config.
///
/// Relative cache and report directories resolve against `base_dir`.
#[derive(Clone)]
pub struct StageEnv {
    pub base_dir: PathBuf,
    pub clock: Arc<dyn Clock>,
    pub run_ids: Arc<dyn RunIdGenerator>,
}

impl StageEnv {
    /// Wall clock and random run ids.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            clock: Arc::new(SystemClock),
            run_ids: Arc::new(RandomRunIds),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_run_ids(mut self, run_ids: impl RunIdGenerator + 'static) -> Self {
        self.run_ids = Arc::new(run_ids);
        self
    }

    /// `dir` under the base directory, or `dir` itself when absolute.
    pub fn resolve(&self, dir: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(dir)
    }

    pub fn store(&self, dir: impl AsRef<Path>) -> PartitionedStore {
        PartitionedStore::new(self.resolve(dir))
    }

    /// The caller's run id if given and non-blank, else a fresh one.
    pub fn run_id(&self, supplied: Option<&str>) -> String {
        match supplied.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => self.run_ids.next_run_id(self.clock.now_utc()),
        }
    }
}

impl std::fmt::Debug for StageEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageEnv")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}
