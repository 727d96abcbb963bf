//! # handle_pool
//!
//! Time based, thread-safe pool of closeable handles for Rust. Amortizes the
//! cost of creating expensive native handles across many short-lived uses.
//!
//! ## Features
//!
//! - Reuse-or-create acquisition that never waits for availability
//! - Automatic return of handles via RAII (Drop trait)
//! - Most recently returned handles are reused first
//! - Background eviction of handles idle longer than a timeout
//! - Clean shutdown that closes every idle handle exactly once
//! - Async acquisition running the factory off the async runtime
//! - Pool warm-up/pre-population
//! - Metrics and Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use handle_pool::{Close, HandlePool, PoolConfiguration};
//! use std::time::Duration;
//!
//! struct Curl(u64);
//!
//! impl Close for Curl {
//!     type Error = std::io::Error;
//!     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! let config = PoolConfiguration::new()
//!     .with_poll_interval(Duration::from_secs(30))
//!     .with_idle_timeout(Duration::from_secs(120));
//!
//! let pool = HandlePool::new(|| Ok::<_, std::io::Error>(Curl(0)), config).unwrap();
//! {
//!     let handle = pool.acquire().unwrap();
//!     println!("Got: {}", handle.0);
//!     // Handle automatically returned when `handle` goes out of scope
//! }
//! pool.shutdown();
//! ```

mod config;
mod errors;
mod eviction;
mod metrics;
mod pool;
mod resource;
mod sweeper;

pub use config::PoolConfiguration;
pub use errors::{BoxError, PoolError, PoolResult};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{HandlePool, PooledHandle};
pub use resource::Close;
