use handle_pool::{Close, HandlePool, PoolConfiguration, PoolError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Records how many times each resource was closed
#[derive(Default, Debug)]
struct Ledger {
    created: AtomicUsize,
    closes: Mutex<HashMap<usize, usize>>,
}

impl Ledger {
    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn total_closes(&self) -> usize {
        self.closes.lock().unwrap().values().sum()
    }

    fn max_closes_per_resource(&self) -> usize {
        self.closes.lock().unwrap().values().copied().max().unwrap_or(0)
    }
}

#[derive(Debug)]
struct Tracked {
    id: usize,
    ledger: Arc<Ledger>,
    fail_close: bool,
}

impl Close for Tracked {
    type Error = std::io::Error;

    fn close(self) -> Result<(), Self::Error> {
        *self.ledger.closes.lock().unwrap().entry(self.id).or_insert(0) += 1;
        if self.fail_close {
            Err(std::io::Error::other("handle already gone"))
        } else {
            Ok(())
        }
    }
}

fn tracked_pool(config: PoolConfiguration) -> (HandlePool<Tracked>, Arc<Ledger>) {
    tracked_pool_with(config, |_| false)
}

fn tracked_pool_with(
    config: PoolConfiguration,
    fail_close: fn(usize) -> bool,
) -> (HandlePool<Tracked>, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::default());
    let factory_ledger = Arc::clone(&ledger);
    let pool = HandlePool::new(
        move || {
            let id = factory_ledger.created.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Tracked {
                id,
                ledger: Arc::clone(&factory_ledger),
                fail_close: fail_close(id),
            })
        },
        config,
    )
    .unwrap();
    (pool, ledger)
}

fn fast_config() -> PoolConfiguration {
    PoolConfiguration::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_idle_timeout(Duration::from_millis(30))
}

#[test]
fn idle_handle_is_closed_and_replaced() {
    let (pool, ledger) = tracked_pool(fast_config());

    drop(pool.acquire().unwrap());
    assert_eq!(ledger.created(), 1);

    thread::sleep(Duration::from_millis(80));

    assert_eq!(ledger.total_closes(), 1);
    assert_eq!(pool.idle_count(), 0);

    let handle = pool.acquire().unwrap();
    assert_eq!(handle.id, 1);
    assert_eq!(ledger.created(), 2);
}

#[test]
fn handle_reacquired_before_timeout_is_not_evicted() {
    let config = PoolConfiguration::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_idle_timeout(Duration::from_millis(200));
    let (pool, ledger) = tracked_pool(config);

    for _ in 0..10 {
        drop(pool.acquire().unwrap());
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(ledger.created(), 1);
    assert_eq!(ledger.total_closes(), 0);
}

#[test]
fn reuse_over_create() {
    let (pool, ledger) = tracked_pool(PoolConfiguration::default());
    let n = 8;

    let handles: Vec<_> = (0..n).map(|_| pool.acquire().unwrap()).collect();
    drop(handles);
    assert_eq!(pool.idle_count(), n);

    let again: Vec<_> = (0..n).map(|_| pool.acquire().unwrap()).collect();
    assert_eq!(ledger.created(), n);
    assert_eq!(pool.metrics().total_reused, n);
    drop(again);
}

#[test]
fn most_recently_released_wins() {
    let (pool, _) = tracked_pool(PoolConfiguration::default());

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    let (a_id, b_id) = (a.id, b.id);

    pool.release(a);
    pool.release(b);
    assert_eq!(pool.acquire().unwrap().id, b_id);

    // `b` went straight back to the front, so it wins again over `a`.
    let next = pool.acquire().unwrap();
    assert_eq!(next.id, b_id);
    let other = pool.acquire().unwrap();
    assert_eq!(other.id, a_id);
}

#[test]
fn shutdown_drains_everything_once() {
    let config = PoolConfiguration::new()
        .with_poll_interval(Duration::from_millis(10))
        .with_idle_timeout(Duration::from_millis(500));
    let (pool, ledger) = tracked_pool(config);
    pool.warmup(5).unwrap();

    pool.shutdown();

    assert_eq!(pool.idle_count(), 0);
    assert_eq!(ledger.total_closes(), 5);
    assert_eq!(ledger.max_closes_per_resource(), 1);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(ledger.total_closes(), 5);
    assert!(matches!(pool.acquire(), Err(PoolError::ShutDown)));
}

#[test]
fn dropping_pool_shuts_it_down() {
    let (pool, ledger) = tracked_pool(PoolConfiguration::default());
    pool.warmup(3).unwrap();

    drop(pool);
    assert_eq!(ledger.total_closes(), 3);
}

#[test]
fn close_failures_are_swallowed() {
    let (pool, ledger) = tracked_pool_with(fast_config(), |id| id % 2 == 0);
    pool.warmup(4).unwrap();

    thread::sleep(Duration::from_millis(80));

    assert_eq!(ledger.total_closes(), 4);
    let metrics = pool.metrics();
    assert_eq!(metrics.total_evicted, 4);
    assert_eq!(metrics.close_failures, 2);

    // The sweeper keeps running after failures.
    drop(pool.acquire().unwrap());
    thread::sleep(Duration::from_millis(80));
    assert_eq!(ledger.total_closes(), 5);
}

#[test]
fn factory_failure_reaches_caller() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let pool: HandlePool<Tracked> = HandlePool::with_defaults(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err("device busy")
    })
    .unwrap();

    let err = pool.acquire().unwrap_err();
    assert!(err.to_string().contains("device busy"));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_poll_interval_is_rejected() {
    let config = PoolConfiguration::new().with_poll_interval(Duration::ZERO);
    let result = HandlePool::new(|| Ok::<_, std::io::Error>(Noop), config);
    assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
}

struct Noop;

impl Close for Noop {
    type Error = std::io::Error;

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[test]
fn concurrent_use_never_double_closes() {
    let config = PoolConfiguration::new()
        .with_poll_interval(Duration::from_millis(2))
        .with_idle_timeout(Duration::from_millis(1));
    let (pool, ledger) = tracked_pool(config);
    let pool = Arc::new(pool);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..200 {
                    let handle = pool.acquire().unwrap();
                    if i % 10 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                    drop(handle);
                }
            })
        })
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let pool = Arc::clone(&pool);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut samples = 0;
            while !done.load(Ordering::SeqCst) {
                let metrics = pool.metrics();
                assert!(
                    metrics.checked_out + metrics.idle <= metrics.total_created,
                    "{metrics:?}"
                );
                samples += 1;
                thread::yield_now();
            }
            samples
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    assert!(observer.join().unwrap() > 0);

    pool.shutdown();

    let metrics = pool.metrics();
    assert_eq!(metrics.checked_out, 0);
    assert_eq!(metrics.idle, 0);
    assert_eq!(metrics.total_closed, metrics.total_created);
    assert_eq!(ledger.max_closes_per_resource(), 1);
    assert_eq!(ledger.total_closes(), ledger.created());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_acquire_reuses_and_creates() {
    let (pool, ledger) = tracked_pool(PoolConfiguration::default());

    let first = pool.acquire_async().await.unwrap();
    let second = pool.acquire_async().await.unwrap();
    assert_eq!(ledger.created(), 2);

    let second_id = second.id;
    drop(first);
    drop(second);

    assert_eq!(pool.acquire_async().await.unwrap().id, second_id);
    assert_eq!(ledger.created(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_async_acquire_returns_handle_to_pool() {
    let ledger = Arc::new(Ledger::default());
    let factory_ledger = Arc::clone(&ledger);
    let pool = HandlePool::new(
        move || {
            thread::sleep(Duration::from_millis(50));
            let id = factory_ledger.created.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Tracked {
                id,
                ledger: Arc::clone(&factory_ledger),
                fail_close: false,
            })
        },
        PoolConfiguration::default(),
    )
    .unwrap();

    let attempt = tokio::time::timeout(Duration::from_millis(5), pool.acquire_async()).await;
    assert!(attempt.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ledger.created(), 1);
    assert_eq!(pool.checked_out_count(), 0);
    assert_eq!(pool.idle_count(), 1);

    pool.shutdown();
    assert_eq!(ledger.total_closes(), 1);
    assert_eq!(pool.metrics().total_closed, 1);
}
