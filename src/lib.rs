#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

//! A rotating file sink for logging backends.
//!
//! `rotolog` is not a logger: it neither formats log lines nor filters by level.
//! It is the *destination* that a logging frontend (or the host program directly)
//! writes its already-formatted byte records to. The sink
//!
//! * appends records to an *active file*,
//! * retires the active file into a timestamped *archive* when it grows beyond a
//!   configurable size or when a new day begins,
//! * lets a *janitor* delete aged or excess archives and optionally compress them,
//!   inline or on a background thread,
//! * and offers an independently usable [`BufferedWriter`] that batches small
//!   writes against any downstream sink.
//!
//! Minimal usage:
//! ```rust,no_run
//! use rotolog::RotatingSink;
//!
//! let sink = RotatingSink::builder("logs/app.log")
//!     .max_size_mb(50)
//!     .max_files(7)
//!     .try_build()
//!     .unwrap();
//! sink.write(b"2024-06-01 12:00:00 INFO  ready\n").unwrap();
//! sink.close().unwrap();
//! ```
//!
//! The sink owns its active file and the archive siblings exclusively; running two
//! sinks (or two processes) against the same path is not supported.
//!
//! Internal problems that must not surface through the write path (janitor and
//! compression failures, flush errors in background threads) are reported to a
//! configurable side channel, see [`ErrorChannel`].

mod buffered;
#[cfg(feature = "compress")]
mod codec;
mod error;
pub mod error_info;
mod log_sink;
mod sink;
mod util;

pub use buffered::{BufferedWriter, BufferedWriterBuilder};
#[cfg(feature = "compress")]
pub use codec::Codec;
pub use error::RotologError;
pub use log_sink::LogSink;
pub use sink::{ArchiveInfo, RotatingSink, RotatingSinkBuilder};
pub use util::{set_error_channel, ErrorChannel};
