use thiserror::Error;

/// Describes errors in the construction and operation of the sink.
///
/// I/O errors that occur *per record* (on `write`, `sync`, `rotate`, `close`)
/// are reported as plain [`std::io::Error`] through the respective method;
/// this enum covers everything that is raised eagerly or during setup.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RotologError {
    /// The configured active file path does not name a file.
    #[error("the active file path does not name a file")]
    EmptyActivePath,

    /// The configured active file path points to an existing directory.
    #[error("the active file path points to an existing directory")]
    ActivePathIsDirectory,

    /// The buffered writer was configured with all three flush triggers disabled.
    ///
    /// With no byte limit, no write-count limit and no flush interval, buffered
    /// bytes would only ever leave the buffer on `close`.
    #[error("at least one flush trigger must be enabled")]
    NoFlushTrigger,

    /// A codec tag could not be mapped to a [`Codec`](crate::Codec) variant.
    #[cfg(feature = "compress")]
    #[cfg_attr(docsrs, doc(cfg(feature = "compress")))]
    #[error("unknown compression codec tag: {0:?}")]
    UnknownCodec(String),

    /// The log output cannot be accessed.
    #[error("the log output cannot be accessed")]
    OutputIo(#[from] std::io::Error),

    /// Spawning a background worker thread failed.
    #[error("spawning a background worker thread failed")]
    WorkerSpawn(#[source] std::io::Error),

    /// Some synchronization object is poisoned.
    #[error("some synchronization object is poisoned")]
    Poison,
}
