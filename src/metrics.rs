//! Metrics collection and export for handle pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use handle_pool::{Close, HandlePool, PoolConfiguration};
///
/// struct Handle;
///
/// impl Close for Handle {
///     type Error = std::io::Error;
///     fn close(self) -> Result<(), Self::Error> { Ok(()) }
/// }
///
/// let pool = HandlePool::new(|| Ok::<_, std::io::Error>(Handle), PoolConfiguration::default()).unwrap();
///
/// {
///     let _handle = pool.acquire().unwrap();
///     let metrics = pool.metrics();
///     assert_eq!(metrics.total_created, 1);
///     assert_eq!(metrics.checked_out, 1);
/// }
/// assert_eq!(pool.metrics().idle, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Resources produced by the factory
    pub total_created: usize,

    /// Acquisitions served from the pool
    pub total_reused: usize,

    /// Handles returned to the pool
    pub total_returned: usize,

    /// Entries removed by the sweeper for being idle
    pub total_evicted: usize,

    /// Resources the pool has closed, for any reason
    pub total_closed: usize,

    /// Close calls that reported an error
    pub close_failures: usize,

    /// Factory calls that reported an error
    pub factory_failures: usize,

    /// Handles currently held by callers
    pub checked_out: usize,

    /// Entries currently sitting in the pool
    pub idle: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_reused".to_string(), self.total_reused.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("total_evicted".to_string(), self.total_evicted.to_string());
        metrics.insert("total_closed".to_string(), self.total_closed.to_string());
        metrics.insert("close_failures".to_string(), self.close_failures.to_string());
        metrics.insert("factory_failures".to_string(), self.factory_failures.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert("idle".to_string(), self.idle.to_string());
        metrics
    }

    /// Share of acquisitions served without calling the factory (0.0 to 1.0)
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.total_created + self.total_reused;
        if total > 0 {
            self.total_reused as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use handle_pool::{MetricsExporter, PoolMetrics};
    /// use std::collections::HashMap;
    ///
    /// let metrics = PoolMetrics {
    ///     total_created: 2,
    ///     total_reused: 5,
    ///     total_returned: 6,
    ///     total_evicted: 1,
    ///     total_closed: 1,
    ///     close_failures: 0,
    ///     factory_failures: 0,
    ///     checked_out: 1,
    ///     idle: 0,
    /// };
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "http".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&metrics, "curl", Some(&tags));
    /// assert!(output.contains("handlepool_handles_checked_out{pool=\"curl\",service=\"http\"} 1"));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        let gauges = [
            ("handlepool_handles_checked_out", "Handles currently checked out", metrics.checked_out),
            ("handlepool_handles_idle", "Handles idle in the pool", metrics.idle),
        ];
        for (name, help, value) in gauges {
            Self::push_metric(&mut output, name, help, "gauge", &labels, value);
        }

        let counters = [
            ("handlepool_created_total", "Handles created by the factory", metrics.total_created),
            ("handlepool_reused_total", "Acquisitions served from the pool", metrics.total_reused),
            ("handlepool_returned_total", "Handles returned to the pool", metrics.total_returned),
            ("handlepool_evicted_total", "Idle handles evicted", metrics.total_evicted),
            ("handlepool_closed_total", "Handles closed by the pool", metrics.total_closed),
            ("handlepool_close_failures_total", "Failed close calls", metrics.close_failures),
            ("handlepool_factory_failures_total", "Failed factory calls", metrics.factory_failures),
        ];
        for (name, help, value) in counters {
            Self::push_metric(&mut output, name, help, "counter", &labels, value);
        }

        output
    }

    fn push_metric(output: &mut String, name: &str, help: &str, kind: &str, labels: &str, value: usize) {
        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} {}\n", name, kind));
        output.push_str(&format!("{}{{{}}} {}\n", name, labels, value));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub created: AtomicUsize,
    pub reused: AtomicUsize,
    pub returned: AtomicUsize,
    pub evicted: AtomicUsize,
    pub closed: AtomicUsize,
    pub close_failures: AtomicUsize,
    pub factory_failures: AtomicUsize,
    pub checked_out: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, idle: usize) -> PoolMetrics {
        // Before `created`: a handle fresh from the factory bumps `created` first.
        let checked_out = self.checked_out.load(Ordering::Acquire);
        PoolMetrics {
            total_created: self.created.load(Ordering::Relaxed),
            total_reused: self.reused.load(Ordering::Relaxed),
            total_returned: self.returned.load(Ordering::Relaxed),
            total_evicted: self.evicted.load(Ordering::Relaxed),
            total_closed: self.closed.load(Ordering::Relaxed),
            close_failures: self.close_failures.load(Ordering::Relaxed),
            factory_failures: self.factory_failures.load(Ordering::Relaxed),
            checked_out,
            idle,
        }
    }
}
