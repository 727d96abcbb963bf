//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use std::time::Duration;

/// Configuration for handle pool behavior
///
/// # Examples
///
/// ```
/// use handle_pool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_poll_interval(Duration::from_secs(10))
///     .with_idle_timeout(Duration::from_secs(60))
///     .with_warmup(4);
///
/// assert_eq!(config.poll_interval, Duration::from_secs(10));
/// assert_eq!(config.warmup_size, Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration {
    /// How often the sweeper scans the pool for idle entries
    pub poll_interval: Duration,

    /// How long an entry may sit unused in the pool before it is closed
    pub idle_timeout: Duration,

    /// Number of resources to create when the pool is constructed
    pub warmup_size: Option<usize>,

    /// Name given to the background sweeper thread
    pub sweeper_thread_name: String,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(5 * 60),
            warmup_size: None,
            sweeper_thread_name: "Handle Pool Cleaner".to_string(),
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweeper poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the idle timeout after which pooled entries are closed
    ///
    /// # Examples
    ///
    /// ```
    /// use handle_pool::PoolConfiguration;
    /// use std::time::Duration;
    ///
    /// let config = PoolConfiguration::new()
    ///     .with_idle_timeout(Duration::from_millis(30));
    ///
    /// assert_eq!(config.idle_timeout, Duration::from_millis(30));
    /// ```
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set warm-up size
    pub fn with_warmup(mut self, size: usize) -> Self {
        self.warmup_size = Some(size);
        self
    }

    /// Set the sweeper thread name
    pub fn with_sweeper_thread_name(mut self, name: impl Into<String>) -> Self {
        self.sweeper_thread_name = name.into();
        self
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        if self.poll_interval.is_zero() {
            return Err(PoolError::InvalidConfiguration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
