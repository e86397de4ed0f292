use std::io;

/// Writes byte records to a single output destination.
///
/// This is the seam between the components of this crate: the
/// [`RotatingSink`](crate::RotatingSink) implements it, and the
/// [`BufferedWriter`](crate::BufferedWriter) both consumes a boxed instance as
/// its downstream and implements the trait itself, so the two can be stacked or
/// used independently.
///
/// All methods take `&self`; implementations serialize internally.
pub trait LogSink: Send + Sync {
    /// Appends a byte record, returning the number of bytes accepted.
    ///
    /// A short count is reported verbatim; retrying the remainder is the
    /// caller's responsibility.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from the underlying output, or a sentinel error whose
    /// message contains "write on closed" after [`close`](LogSink::close).
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Hands buffered bytes to the next layer.
    ///
    /// The default implementation is a no-op for sinks that do not buffer.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from the underlying output.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Asks the operating system to persist written data.
    ///
    /// The default implementation is a no-op for destinations without a
    /// meaningful sync operation.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from the underlying output, or a sentinel error whose
    /// message contains "sync on closed" after [`close`](LogSink::close).
    fn sync(&self) -> io::Result<()> {
        Ok(())
    }

    /// Closes the sink deterministically.
    ///
    /// Closing is idempotent. Once a sink is closed, `write` and `sync` fail
    /// with sentinel errors; background workers owned by the sink have
    /// terminated when this method returns.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from flushing or closing the underlying output.
    fn close(&self) -> io::Result<()>;
}
