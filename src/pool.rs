//! Core handle pool implementation

use crate::config::PoolConfiguration;
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::eviction::{self, Entry};
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};
use crate::resource::Close;
use crate::sweeper::Sweeper;

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::{ControlFlow, Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

type Factory<T> = Box<dyn Fn() -> Result<T, BoxError> + Send + Sync>;

/// Idle entries, most recently returned at the front
struct Store<T> {
    entries: VecDeque<Entry<T>>,
    open: bool,
}

/// State shared between the pool, its handles and the sweeper thread
struct Shared<T> {
    store: Mutex<Store<T>>,
    factory: Factory<T>,
    config: PoolConfiguration,
    metrics: MetricsTracker,
}

impl<T: Close> Shared<T> {
    fn create(&self) -> PoolResult<Entry<T>> {
        match (self.factory)() {
            Ok(resource) => {
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("created new pooled handle");
                Ok(Entry::new(resource))
            }
            Err(err) => {
                self.metrics.factory_failures.fetch_add(1, Ordering::Relaxed);
                Err(PoolError::factory(err))
            }
        }
    }

    /// Pop the front entry. A hit is counted as checked out before the lock
    /// is released, so a metrics snapshot never sees it in both places.
    fn pop_idle(self: &Arc<Self>) -> PoolResult<Option<PooledHandle<T>>> {
        let mut store = self.store.lock();
        if !store.open {
            return Err(PoolError::ShutDown);
        }
        let Some(entry) = store.entries.pop_front() else {
            return Ok(None);
        };
        self.metrics.reused.fetch_add(1, Ordering::Relaxed);
        self.metrics.checked_out.fetch_add(1, Ordering::Release);
        tracing::trace!(idle = store.entries.len(), "reusing pooled handle");
        drop(store);
        Ok(Some(self.wrap(entry)))
    }

    /// Run the factory and hand the new entry out.
    ///
    /// The result is already a handle, so if nobody ends up receiving it
    /// (an abandoned async acquire) dropping it returns the entry to the pool.
    fn create_checked_out(self: &Arc<Self>) -> PoolResult<PooledHandle<T>> {
        let entry = self.create()?;
        self.metrics.checked_out.fetch_add(1, Ordering::Release);
        Ok(self.wrap(entry))
    }

    fn wrap(self: &Arc<Self>, mut entry: Entry<T>) -> PooledHandle<T> {
        entry.meta.touch();
        PooledHandle::new(entry, Arc::clone(self))
    }

    fn release(&self, entry: Entry<T>) {
        let mut store = self.store.lock();
        self.metrics.checked_out.fetch_sub(1, Ordering::Release);
        if store.open {
            // Front of the store: busy pools keep reusing the same few
            // handles and the surplus ages out at the back.
            store.entries.push_front(entry);
            self.metrics.returned.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(store);
            tracing::warn!("handle returned after shutdown, closing it");
            eviction::close_quietly(entry.resource, &self.metrics);
        }
    }

    fn discard(&self, entries: Vec<Entry<T>>) {
        for entry in entries {
            eviction::close_quietly(entry.resource, &self.metrics);
        }
    }

    fn sweep(&self) -> usize {
        let mut store = self.store.lock();
        if !store.open {
            return 0;
        }
        let evicted = eviction::sweep_idle(&mut store.entries, self.config.idle_timeout, &self.metrics);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = store.entries.len(), "swept idle handles");
        }
        evicted
    }
}

/// A pooled handle that returns to the pool when dropped
///
/// Dereferences to the underlying resource. The resource is never closed by
/// dropping the handle; it goes back to the front of the pool instead.
pub struct PooledHandle<T: Close> {
    entry: Option<Entry<T>>,
    shared: Arc<Shared<T>>,
}

impl<T: Close> PooledHandle<T> {
    fn new(entry: Entry<T>, shared: Arc<Shared<T>>) -> Self {
        Self {
            entry: Some(entry),
            shared,
        }
    }

    /// When this handle was checked out of the pool
    pub fn last_used(&self) -> Instant {
        self.entry().meta.last_used
    }

    /// Take the resource out of the pool for good.
    ///
    /// The pool forgets about it: it will neither be reused nor closed by the
    /// pool, so closing it becomes the caller's job.
    pub fn detach(mut self) -> T {
        let entry = self.entry.take().expect("Entry already taken");
        self.shared.metrics.checked_out.fetch_sub(1, Ordering::Release);
        entry.resource
    }

    fn entry(&self) -> &Entry<T> {
        self.entry.as_ref().expect("Entry already taken")
    }
}

impl<T: Close> Deref for PooledHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.entry().resource
    }
}

impl<T: Close> DerefMut for PooledHandle<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entry.as_mut().expect("Entry already taken").resource
    }
}

impl<T: Close> Drop for PooledHandle<T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.shared.release(entry);
        }
    }
}

impl<T: Close + fmt::Debug> fmt::Debug for PooledHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledHandle")
            .field("resource", &self.entry.as_ref().map(|e| &e.resource))
            .finish()
    }
}

/// Thread-safe pool of closeable handles with time based eviction
///
/// Acquiring never waits: an idle handle is reused when one exists, otherwise
/// the factory creates a new one. There is no upper bound on the number of
/// live handles. A background thread closes handles that have sat idle in
/// the pool for longer than the configured idle timeout.
///
/// A handle that is never dropped is never reclaimed.
///
/// # Examples
///
/// ```
/// use handle_pool::{Close, HandlePool, PoolConfiguration};
///
/// struct Conn(u32);
///
/// impl Close for Conn {
///     type Error = std::io::Error;
///     fn close(self) -> Result<(), Self::Error> { Ok(()) }
/// }
///
/// let pool = HandlePool::new(|| Ok::<_, std::io::Error>(Conn(1)), PoolConfiguration::default()).unwrap();
/// {
///     let conn = pool.acquire().unwrap();
///     assert_eq!(conn.0, 1);
///     // Returned to the pool when `conn` goes out of scope
/// }
/// assert_eq!(pool.idle_count(), 1);
/// pool.shutdown();
/// ```
pub struct HandlePool<T: Close + Send + 'static> {
    shared: Arc<Shared<T>>,
    sweeper: Mutex<Sweeper>,
}

impl<T: Close + Send + 'static> HandlePool<T> {
    /// Create a pool with the given factory and configuration.
    ///
    /// The sweeper starts right away and fires its first tick one poll
    /// interval later. A failing warm-up closes whatever it already created.
    pub fn new<F, E>(factory: F, config: PoolConfiguration) -> PoolResult<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        config.validate()?;

        let poll_interval = config.poll_interval;
        let thread_name = config.sweeper_thread_name.clone();
        let warmup_size = config.warmup_size;

        let shared = Arc::new(Shared {
            store: Mutex::new(Store {
                entries: VecDeque::new(),
                open: true,
            }),
            factory: Box::new(move || factory().map_err(Into::<BoxError>::into)),
            config,
            metrics: MetricsTracker::new(),
        });

        let weak = Arc::downgrade(&shared);
        let sweeper = Sweeper::spawn(&thread_name, poll_interval, move || match weak.upgrade() {
            Some(shared) => {
                shared.sweep();
                ControlFlow::Continue(())
            }
            None => ControlFlow::Break(()),
        })?;

        let pool = Self {
            shared,
            sweeper: Mutex::new(sweeper),
        };
        if let Some(count) = warmup_size {
            pool.warmup(count)?;
        }
        Ok(pool)
    }

    /// Create a pool polling every minute and evicting after five idle minutes
    pub fn with_defaults<F, E>(factory: F) -> PoolResult<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::new(factory, PoolConfiguration::default())
    }

    /// Get a handle, reusing the most recently returned one if any.
    ///
    /// Factory failures are returned as [`PoolError::Factory`]; the pool does
    /// not retry.
    pub fn acquire(&self) -> PoolResult<PooledHandle<T>> {
        match self.shared.pop_idle()? {
            Some(handle) => Ok(handle),
            None => self.shared.create_checked_out(),
        }
    }

    /// Get a handle, running the factory on the blocking thread pool on a miss
    ///
    /// If the returned future is dropped while the factory is still running,
    /// the new handle goes into the pool once it is ready. A panicking factory
    /// panics here too, as it would in [`acquire`](Self::acquire).
    pub async fn acquire_async(&self) -> PoolResult<PooledHandle<T>> {
        if let Some(handle) = self.shared.pop_idle()? {
            return Ok(handle);
        }

        let shared = Arc::clone(&self.shared);
        match tokio::task::spawn_blocking(move || shared.create_checked_out()).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(PoolError::Cancelled),
        }
    }

    /// Return a handle to the pool. Same as dropping it.
    pub fn release(&self, handle: PooledHandle<T>) {
        drop(handle);
    }

    /// Pre-create `count` handles and put them in the pool.
    ///
    /// If the factory fails part way, the handles created so far are closed.
    pub fn warmup(&self, count: usize) -> PoolResult<()> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            match self.shared.create() {
                Ok(entry) => created.push(entry),
                Err(err) => {
                    self.shared.discard(created);
                    return Err(err);
                }
            }
        }

        let mut store = self.shared.store.lock();
        if !store.open {
            drop(store);
            self.shared.discard(created);
            return Err(PoolError::ShutDown);
        }
        for entry in created {
            store.entries.push_front(entry);
        }
        Ok(())
    }

    /// Stop the sweeper and close every idle handle.
    ///
    /// Does not wait for a sweep already in progress. Handles still checked
    /// out are closed when they are dropped. Calling this again is a no-op.
    pub fn shutdown(&self) {
        self.sweeper.lock().stop();

        let mut store = self.shared.store.lock();
        if !store.open {
            return;
        }
        store.open = false;

        let drained = store.entries.len();
        for entry in store.entries.drain(..) {
            eviction::close_quietly(entry.resource, &self.shared.metrics);
        }
        tracing::info!(closed = drained, "handle pool shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        !self.shared.store.lock().open
    }

    /// Number of handles idle in the pool
    pub fn idle_count(&self) -> usize {
        self.shared.store.lock().entries.len()
    }

    /// Number of handles currently checked out
    pub fn checked_out_count(&self) -> usize {
        self.shared.metrics.checked_out.load(Ordering::Relaxed)
    }

    /// Get pool metrics
    ///
    /// Taken under the store lock, so `checked_out + idle <= total_created`
    /// holds for every snapshot.
    pub fn metrics(&self) -> PoolMetrics {
        let store = self.shared.store.lock();
        self.shared.metrics.get_metrics(store.entries.len())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.metrics(), pool_name, tags)
    }

    /// The configuration the pool was built with
    pub fn config(&self) -> &PoolConfiguration {
        &self.shared.config
    }

}

impl<T: Close + Send + 'static> Drop for HandlePool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Close + Send + 'static> fmt::Debug for HandlePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("config", &self.shared.config)
            .field("idle", &self.idle_count())
            .field("checked_out", &self.checked_out_count())
            .finish()
    }
}
