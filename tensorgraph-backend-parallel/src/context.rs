use crate::error::BackendError;
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Environment variable read by [`BackendConfig::from_env`].
pub const NUM_THREADS_ENV: &str = "TENSORGRAPH_NUM_THREADS";

/// Settings for a [`crate::ParallelBackend`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Worker threads in the pool. `None` lets rayon pick (one per core).
    pub num_threads: Option<usize>,
    /// Elements per rayon task for element-wise kernels.
    pub min_chunk: Option<usize>,
}

impl BackendConfig {
    /// Reads `TENSORGRAPH_NUM_THREADS`. An unset variable means the default;
    /// an unparsable or zero value is logged and ignored.
    pub fn from_env() -> Self {
        let num_threads = match std::env::var(NUM_THREADS_ENV) {
            Ok(raw) => parse_thread_count(&raw),
            Err(_) => None,
        };
        BackendConfig {
            num_threads,
            ..BackendConfig::default()
        }
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.min_chunk.unwrap_or(DEFAULT_MIN_CHUNK).max(1)
    }
}

const DEFAULT_MIN_CHUNK: usize = 1024;

pub(crate) fn parse_thread_count(raw: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => {
            warn!("{}=0 ignored, using the default thread count", NUM_THREADS_ENV);
            None
        }
        Ok(n) => Some(n),
        Err(e) => {
            warn!(
                "{}={:?} is not a thread count ({}), using the default",
                NUM_THREADS_ENV, raw, e
            );
            None
        }
    }
}

/// Installs `env_logger` the first time it is called. Later calls do nothing.
///
/// The level follows `RUST_LOG` (e.g. `RUST_LOG=tensorgraph_backend_parallel=debug`).
pub fn initialize_with_logging() {
    static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();
    LOGGER_INITIALIZED.get_or_init(|| {
        match env_logger::builder().is_test(false).try_init() {
            Ok(_) => info!("tensorgraph parallel backend logger initialized."),
            Err(e) => eprintln!(
                "Failed to initialize logger: {}. Logging might not work as expected.",
                e
            ),
        };
    });
}

/// Builds the worker pool described by `config`.
pub fn build_thread_pool(config: &BackendConfig) -> Result<ThreadPool, BackendError> {
    let mut builder = ThreadPoolBuilder::new()
        .thread_name(|index| format!("tensorgraph-worker-{}", index));
    if let Some(n) = config.num_threads {
        if n == 0 {
            return Err(BackendError::InvalidConfig(
                "num_threads must be positive".to_string(),
            ));
        }
        builder = builder.num_threads(n);
    }
    let pool = builder.build()?;
    debug!("Built thread pool with {} worker(s)", pool.current_num_threads());
    Ok(pool)
}
