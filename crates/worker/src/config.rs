/// Job worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of jobs processed at the same time (default: `10`).
    pub concurrency: usize,
    /// Redeliveries after a failed handler run before a message is dropped
    /// (default: `3`).
    pub max_retries: u32,
    /// Multiplier applied to each job type's simulated work duration
    /// (default: `1.0`; `0.0` makes jobs finish immediately).
    pub work_delay_scale: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_retries: 3,
            work_delay_scale: 1.0,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default |
    /// |------------------------|---------|
    /// | `JOB_CONCURRENCY`      | `10`    |
    /// | `JOB_MAX_RETRIES`      | `3`     |
    /// | `JOB_WORK_DELAY_SCALE` | `1.0`   |
    ///
    /// # Panics
    ///
    /// Panics if a variable is set but does not parse, or if
    /// `JOB_CONCURRENCY` is zero.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let concurrency: usize = std::env::var("JOB_CONCURRENCY")
            .map(|v| v.parse().expect("JOB_CONCURRENCY must be a valid usize"))
            .unwrap_or(defaults.concurrency);
        assert!(concurrency > 0, "JOB_CONCURRENCY must be at least 1");

        let max_retries: u32 = std::env::var("JOB_MAX_RETRIES")
            .map(|v| v.parse().expect("JOB_MAX_RETRIES must be a valid u32"))
            .unwrap_or(defaults.max_retries);

        let work_delay_scale: f64 = std::env::var("JOB_WORK_DELAY_SCALE")
            .map(|v| v.parse().expect("JOB_WORK_DELAY_SCALE must be a valid f64"))
            .unwrap_or(defaults.work_delay_scale);
        assert!(
            work_delay_scale >= 0.0,
            "JOB_WORK_DELAY_SCALE must not be negative"
        );

        Self {
            concurrency,
            max_retries,
            work_delay_scale,
        }
    }
}
