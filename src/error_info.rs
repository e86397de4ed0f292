//! Error codes of `rotolog`.
//!
//! Problems that cannot be returned to the host through the write path are
//! reported to the side channel (see [`ErrorChannel`](crate::ErrorChannel))
//! with one of the following error codes. More details on them can be found here.
//!
//! ## `Write`
//!
//! Writing buffered bytes to the downstream sink failed.
//!
//! Example:
//!
//! ```text
//! [rotolog][ERRCODE::Write] timed flush could not drain the buffer, caused by ...
//! ```
//!
//! This code is only used by the background flusher of the
//! [`BufferedWriter`](crate::BufferedWriter); errors in host-initiated writes are
//! returned to the host directly.
//!
//! ## `Flush`
//!
//! Automatic flushing of buffered bytes to the downstream sink failed, or the
//! background flusher stopped working.
//!
//! ## `Cleanup`
//!
//! A janitor pass could not list, delete, or (with the `compress` feature)
//! compress archive files. The janitor continues with its remaining work items;
//! all failures of one pass are reported as a single numbered list.
//!
//! Example:
//!
//! ```text
//! [rotolog][ERRCODE::Cleanup] cleanup pass failed for 2 of 7 archives:
//!     (1) "app_20240601120000.log": Permission denied (os error 13)
//!     (2) "app_20240602120000.log": Permission denied (os error 13)
//! ```
//!
//! Deleted archives may be read concurrently by external tools; races on delete
//! are tolerated and reported here.
//!
//! ## `Compress`
//!
//! One or more archives could not be compressed, reported as a numbered list
//! like for [Cleanup](#cleanup). The uncompressed archives are left in place
//! and will be retried on the next janitor pass.
//!
//! ## `Poison`
//!
//! Records can be written by all threads of your program, so the mutable parts of
//! the sink are guarded by `Mutex`es. In case a thread panics while owning one of
//! these locks, the lock is subsequently considered "poisoned".
//!
//! ## `Ownership`
//!
//! This code can only occur on unix systems and indicates that the owner and
//! group of the previous active file could not be propagated to the archive
//! produced from it. The archive itself is intact.
