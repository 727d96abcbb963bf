//! The capability a pooled resource must provide

/// A resource holding some underlying handle that must be released explicitly.
///
/// `close` takes the resource by value, so a resource can be closed at most
/// once. The pool calls it when an idle entry is evicted or the pool shuts
/// down; failures are logged and otherwise ignored.
///
/// # Examples
///
/// ```
/// use handle_pool::Close;
///
/// struct Socket(u32);
///
/// impl Close for Socket {
///     type Error = std::io::Error;
///
///     fn close(self) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
///
/// assert!(Socket(7).close().is_ok());
/// ```
pub trait Close {
    /// Error reported when releasing the handle fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Release the underlying handle
    fn close(self) -> Result<(), Self::Error>;
}
