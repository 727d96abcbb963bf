// handle_pool - time based pool of closeable handles
//
// This is just a binary wrapper - the actual library is in lib.rs
// Run demos with: cargo run --example basic

use handle_pool::{Close, HandlePool, PoolConfiguration};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct DemoHandle(u64);

impl Close for DemoHandle {
    type Error = std::io::Error;

    fn close(self) -> Result<(), Self::Error> {
        println!("  Closing handle {}", self.0);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== handle_pool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    println!("Quick Demo:");
    let next_id = AtomicU64::new(1);
    let config = PoolConfiguration::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_idle_timeout(Duration::from_millis(30));
    let pool = HandlePool::new(
        move || Ok::<_, std::io::Error>(DemoHandle(next_id.fetch_add(1, Ordering::Relaxed))),
        config,
    )?;

    {
        let handle = pool.acquire()?;
        println!("  Got handle: {}", handle.0);
    }
    println!("  Idle after return: {}", pool.idle_count());

    std::thread::sleep(Duration::from_millis(60));
    println!("  Idle after sweep: {}", pool.idle_count());

    pool.shutdown();
    Ok(())
}
