//! Advanced features: idle eviction, close failures, Prometheus export

use handle_pool::{Close, HandlePool, PoolConfiguration};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    id: u32,
    broken: bool,
}

impl Close for Connection {
    type Error = std::io::Error;

    fn close(self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(std::io::Error::other(format!("connection {} already reset", self.id)));
        }
        println!("   Closed connection {}", self.id);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== handle_pool - Advanced Examples ===\n");

    let next = AtomicU32::new(1);
    let config = PoolConfiguration::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_idle_timeout(Duration::from_millis(30))
        .with_sweeper_thread_name("connection-sweeper");

    let pool = HandlePool::new(
        move || {
            let id = next.fetch_add(1, Ordering::Relaxed);
            Ok::<_, std::io::Error>(Connection { id, broken: id % 2 == 0 })
        },
        config,
    )?;

    println!("1. Idle Eviction:");
    pool.warmup(4)?;
    println!("   Idle before sweep: {}", pool.idle_count());
    thread::sleep(Duration::from_millis(60));
    println!("   Idle after sweep: {}", pool.idle_count());
    println!("   Close failures (ignored): {}\n", pool.metrics().close_failures);

    println!("2. Replacement After Eviction:");
    {
        let conn = pool.acquire()?;
        println!("   Fresh connection: {}\n", conn.id);
    }

    println!("3. Prometheus Export:");
    let mut tags = HashMap::new();
    tags.insert("service".to_string(), "http".to_string());
    print!("{}", pool.export_metrics_prometheus("connections", Some(&tags)));

    pool.shutdown();
    Ok(())
}
