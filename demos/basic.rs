//! Basic usage examples for HandlePool

use handle_pool::{Close, HandlePool, PoolConfiguration, PoolResult};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
struct Handle(u32);

impl Close for Handle {
    type Error = std::io::Error;

    fn close(self) -> Result<(), Self::Error> {
        println!("   Closing handle {}", self.0);
        Ok(())
    }
}

fn numbered_pool(config: PoolConfiguration) -> PoolResult<HandlePool<Handle>> {
    let next = AtomicU32::new(1);
    HandlePool::new(
        move || Ok::<_, std::io::Error>(Handle(next.fetch_add(1, Ordering::Relaxed))),
        config,
    )
}

fn main() -> PoolResult<()> {
    println!("=== handle_pool - Basic Examples ===\n");

    // Example 1: Scoped return
    scoped_return()?;

    // Example 2: Most recently returned first
    stack_order()?;

    // Example 3: Metrics
    metrics()?;

    Ok(())
}

fn scoped_return() -> PoolResult<()> {
    println!("1. Scoped Return:");
    let pool = numbered_pool(PoolConfiguration::default())?;

    {
        let handle = pool.acquire()?;
        println!("   Got handle: {}", handle.0);
        // Handle automatically returned when dropped
    }

    println!("   Idle after return: {}\n", pool.idle_count());
    Ok(())
}

fn stack_order() -> PoolResult<()> {
    println!("2. Stack Order:");
    let pool = numbered_pool(PoolConfiguration::default())?;

    let first = pool.acquire()?;
    let second = pool.acquire()?;
    pool.release(first);
    pool.release(second);

    let next = pool.acquire()?;
    println!("   Next acquire got handle {} (the last one returned)\n", next.0);
    Ok(())
}

fn metrics() -> PoolResult<()> {
    println!("3. Metrics:");
    let pool = numbered_pool(PoolConfiguration::new().with_warmup(2))?;

    for _ in 0..5 {
        let _handle = pool.acquire()?;
    }

    let metrics = pool.metrics();
    println!("   Reuse ratio: {:.1}%", metrics.reuse_ratio() * 100.0);
    for (key, value) in pool.export_metrics() {
        println!("     {}: {}", key, value);
    }

    pool.shutdown();
    Ok(())
}
