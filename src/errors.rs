//! Error types for the handle pool

use thiserror::Error;

/// Boxed error produced by a resource factory
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Factory failed to create a new resource: {0}")]
    Factory(#[source] BoxError),

    #[error("Pool has been shut down")]
    ShutDown,

    #[error("Failed to start the sweeper thread: {0}")]
    Sweeper(#[from] std::io::Error),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    /// The blocking task behind an async acquire was cancelled before it ran
    /// (the runtime shutting down). A panicking factory is not reported here;
    /// the panic is resumed in the caller.
    #[error("Operation was cancelled")]
    Cancelled,
}

impl PoolError {
    pub(crate) fn factory<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        PoolError::Factory(err.into())
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
