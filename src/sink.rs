mod builder;
mod catalog;
mod config;
mod janitor;
mod naming;
mod retention;
mod state;

pub use builder::RotatingSinkBuilder;
pub use catalog::ArchiveInfo;

use self::{config::SinkConfig, janitor::Janitor, state::State};
use crate::{log_sink::LogSink, util::io_err};
use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

/// A write destination that retires its output file into timestamped archives.
///
/// The sink appends records to the configured *active file*. Before a record is
/// appended, two rotation triggers are evaluated: the configured maximum size,
/// and (if enabled) the day boundary. A rotation renames the active file to
/// `{prefix}_{YYYYMMDDhhmmss}{suffix}` — optionally below a `YYYY-MM-DD` day
/// directory — reopens a fresh active file, and hands the archives to the
/// janitor, which deletes aged or excess ones and optionally compresses the
/// rest.
///
/// All operations take `&self` and can be called from any thread; they are
/// serialized internally. The sink assumes it is the only writer to the active
/// path, see the [crate docs](crate).
///
/// Instances are created with [`RotatingSink::builder`].
#[derive(Debug)]
pub struct RotatingSink {
    config: Arc<SinkConfig>,
    state: Mutex<State>,
    janitor: Janitor,
}

impl RotatingSink {
    /// Instantiates a builder for a sink writing to the given active file path.
    #[must_use]
    pub fn builder<P: Into<PathBuf>>(active_path: P) -> RotatingSinkBuilder {
        RotatingSinkBuilder::new(active_path.into())
    }

    pub(crate) fn from_config(config: SinkConfig) -> Self {
        let config = Arc::new(config);
        Self {
            state: Mutex::new(State::new(Arc::clone(&config))),
            janitor: Janitor::new(Arc::clone(&config)),
            config,
        }
    }

    fn lock_state(&self) -> io::Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| io_err("the sink serializer is poisoned"))
    }

    /// Appends a record to the active file, rotating first if a threshold is
    /// crossed, and returns the number of bytes written.
    ///
    /// A zero-length record is a no-op and neither creates nor rotates a file.
    /// A short write is reported verbatim; the remainder is the caller's to
    /// retry.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from directory creation, opening, renaming, or writing
    /// the active file, or a sentinel error containing "write on closed" after
    /// [`close`](RotatingSink::close).
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.lock_state()?.write(&self.janitor, buf)
    }

    /// Asks the operating system to persist the active file.
    ///
    /// A no-op if no file is currently open.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from the platform sync, or a sentinel error containing
    /// "sync on closed" after [`close`](RotatingSink::close).
    pub fn sync(&self) -> io::Result<()> {
        self.lock_state()?.sync()
    }

    /// Retires the active file into an archive now, regardless of thresholds,
    /// and opens a fresh active file.
    ///
    /// Useful for hosts that rotate on an external signal. Triggers a janitor
    /// pass like any other rotation.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from renaming or reopening, or a sentinel error after
    /// [`close`](RotatingSink::close).
    pub fn rotate(&self) -> io::Result<()> {
        self.lock_state()?.forced_rotate(&self.janitor)
    }

    /// Closes the sink: further writes and syncs fail, the file handle is
    /// released, and a janitor worker that may still be running is drained
    /// before this method returns.
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for a failing close of
    /// the underlying file.
    pub fn close(&self) -> io::Result<()> {
        let was_open = self.lock_state()?.close(&self.janitor);
        if was_open {
            self.janitor.shutdown();
        }
        Ok(())
    }

    /// Returns all archives currently on disk, newest first.
    ///
    /// Meant for host observability; the listing re-reads the directory on
    /// every call.
    #[must_use]
    pub fn archives(&self) -> Vec<ArchiveInfo> {
        catalog::list_archives(&self.config)
    }

    #[cfg(test)]
    pub(crate) fn set_now(&self, now: chrono::DateTime<chrono::Local>) {
        self.state.lock().unwrap().set_now(now);
    }
}

impl LogSink for RotatingSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        RotatingSink::write(self, buf)
    }

    fn sync(&self) -> io::Result<()> {
        RotatingSink::sync(self)
    }

    fn close(&self) -> io::Result<()> {
        RotatingSink::close(self)
    }
}

impl io::Write for &RotatingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingSink::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RotatingSink {
    fn drop(&mut self) {
        self.close().ok();
    }
}
