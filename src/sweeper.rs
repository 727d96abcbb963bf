//! Background thread that runs idle eviction on a fixed-rate timer

use crate::errors::PoolResult;
use crossbeam::channel::{self, Sender};
use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

/// Handle to a running sweeper thread.
///
/// Ticks fire at a fixed rate, the first one `interval` after spawning.
pub(crate) struct Sweeper {
    stop: Option<Sender<()>>,
}

impl Sweeper {
    /// Spawn the sweeper thread. `tick` runs on every timer tick until it
    /// returns `ControlFlow::Break` or the sweeper is stopped.
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> PoolResult<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        thread::Builder::new().name(name.to_string()).spawn(move || {
            loop {
                let flow = channel::select! {
                    recv(stop_rx) -> _ => ControlFlow::Break(()),
                    recv(ticker) -> _ => tick(),
                };
                if flow.is_break() {
                    break;
                }
            }
            tracing::debug!("sweeper stopped");
        })?;

        Ok(Self { stop: Some(stop_tx) })
    }

    /// Signal the thread to exit without waiting for it. A tick already in
    /// progress runs to completion; no further ticks start.
    pub fn stop(&mut self) {
        // Disconnecting the channel wakes the select.
        self.stop.take();
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
