//! Async usage examples

use handle_pool::{Close, HandlePool, PoolConfiguration};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::sleep;

struct Session(u32);

impl Close for Session {
    type Error = std::io::Error;

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== handle_pool - Async Examples ===\n");

    let next = AtomicU32::new(1);
    let pool = Arc::new(HandlePool::new(
        move || {
            // Pretend this is an expensive native call.
            std::thread::sleep(Duration::from_millis(20));
            Ok::<_, std::io::Error>(Session(next.fetch_add(1, Ordering::Relaxed)))
        },
        PoolConfiguration::default(),
    )?);

    println!("1. Concurrent Access:");
    let mut tasks = vec![];
    for i in 0..10 {
        let pool = Arc::clone(&pool);
        tasks.push(tokio::spawn(async move {
            match pool.acquire_async().await {
                Ok(session) => {
                    println!("   Task {} got session {}", i, session.0);
                    sleep(Duration::from_millis(10)).await;
                }
                Err(e) => println!("   Task {} failed: {}", i, e),
            }
        }));
    }

    for task in tasks {
        task.await?;
    }

    let metrics = pool.metrics();
    println!(
        "   Created: {}, reused: {}, idle: {}",
        metrics.total_created, metrics.total_reused, metrics.idle
    );

    pool.shutdown();
    Ok(())
}
