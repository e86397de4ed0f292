use crate::{
    log_sink::LogSink,
    util::{eprint_err, eprint_msg, io_err, ErrorCode},
    RotologError,
};
use std::{
    io::{self, Write as _},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        mpsc::{RecvTimeoutError, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

const FLUSHER: &str = "rotolog-buffered-flusher";

/// Batches host writes against any downstream [`LogSink`].
///
/// Incoming records accumulate in a byte buffer; the buffer is handed to the
/// downstream sink as soon as any enabled flush trigger fires:
///
/// * the buffered byte count reaches `max_buffer_bytes`,
/// * the number of buffered writes reaches `max_write_count`,
/// * the time since the last flush reaches `flush_interval`.
///
/// A zero value disables the respective trigger. With a nonzero
/// `flush_interval`, a background thread additionally wakes at that interval
/// so records do not linger in a quiet phase.
///
/// The buffered writer is independent of the [`RotatingSink`](crate::RotatingSink):
/// any `LogSink` can be wrapped, including a plain stdout sink
/// (see [`BufferedWriterBuilder::try_build_for_stdout`]).
pub struct BufferedWriter {
    state: Arc<Mutex<BufState>>,
    o_flusher: Mutex<Option<FlusherHandle>>,
}

/// Builder for [`BufferedWriter`].
pub struct BufferedWriterBuilder {
    max_buffer_bytes: usize,
    max_write_count: usize,
    flush_interval: Duration,
}

impl Default for BufferedWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedWriterBuilder {
    /// Initializes the builder with an 8 kB byte trigger, no write-count
    /// trigger, and a flush interval of one second.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_buffer_bytes: 8 * 1024,
            max_write_count: 0,
            flush_interval: Duration::from_secs(1),
        }
    }

    /// Flush when this many bytes are buffered; `0` disables the trigger.
    #[must_use]
    pub fn max_buffer_bytes(mut self, max_buffer_bytes: usize) -> Self {
        self.max_buffer_bytes = max_buffer_bytes;
        self
    }

    /// Flush after this many buffered writes; `0` disables the trigger.
    #[must_use]
    pub fn max_write_count(mut self, max_write_count: usize) -> Self {
        self.max_write_count = max_write_count;
        self
    }

    /// Flush when this much time has passed since the last flush;
    /// [`Duration::ZERO`] disables the trigger and the background thread.
    #[must_use]
    pub fn flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Produces a [`BufferedWriter`] that owns the given downstream sink.
    ///
    /// # Errors
    ///
    /// [`RotologError::NoFlushTrigger`] if all three triggers are disabled;
    /// [`RotologError::WorkerSpawn`] if the background flusher cannot be
    /// spawned.
    pub fn try_build(self, downstream: Box<dyn LogSink>) -> Result<BufferedWriter, RotologError> {
        if self.max_buffer_bytes == 0 && self.max_write_count == 0 && self.flush_interval.is_zero()
        {
            return Err(RotologError::NoFlushTrigger);
        }

        let state = Arc::new(Mutex::new(BufState {
            downstream,
            buffer: Vec::with_capacity(self.max_buffer_bytes.clamp(512, 64 * 1024)),
            write_count: 0,
            last_flush: Instant::now(),
            closed: false,
            max_buffer_bytes: self.max_buffer_bytes,
            max_write_count: self.max_write_count,
            flush_interval: self.flush_interval,
        }));

        let o_flusher = if self.flush_interval.is_zero() {
            None
        } else {
            Some(start_flusher(Arc::clone(&state), self.flush_interval)?)
        };

        Ok(BufferedWriter {
            state,
            o_flusher: Mutex::new(o_flusher),
        })
    }

    /// Produces a [`BufferedWriter`] in front of stdout.
    ///
    /// Closing the writer flushes stdout but does not close it, so the stream
    /// stays usable for the rest of the process.
    ///
    /// # Errors
    ///
    /// As for [`try_build`](Self::try_build).
    pub fn try_build_for_stdout(self) -> Result<BufferedWriter, RotologError> {
        self.try_build(Box::new(StdoutSink))
    }
}

struct BufState {
    downstream: Box<dyn LogSink>,
    buffer: Vec<u8>,
    write_count: usize,
    last_flush: Instant,
    closed: bool,
    max_buffer_bytes: usize,
    max_write_count: usize,
    flush_interval: Duration,
}

impl BufState {
    fn trigger_fired(&self) -> bool {
        (self.max_buffer_bytes > 0 && self.buffer.len() >= self.max_buffer_bytes)
            || (self.max_write_count > 0 && self.write_count >= self.max_write_count)
            || (!self.flush_interval.is_zero() && self.last_flush.elapsed() >= self.flush_interval)
    }

    // Write-all with remainder preserved: whatever the downstream accepted is
    // removed from the buffer, the rest stays for the next attempt.
    fn drain_to_downstream(&mut self) -> io::Result<()> {
        let mut written = 0;
        let result = loop {
            if written == self.buffer.len() {
                break Ok(());
            }
            match self.downstream.write(&self.buffer[written..]) {
                Ok(0) => {
                    break Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "downstream sink accepted no bytes",
                    ));
                }
                Ok(n) => written += n,
                Err(e) => break Err(e),
            }
        };
        self.buffer.drain(..written);
        self.write_count = 0;
        self.last_flush = Instant::now();
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_to_downstream()?;
        self.downstream.flush()
    }
}

impl BufferedWriter {
    /// Instantiates a builder.
    #[must_use]
    pub fn builder() -> BufferedWriterBuilder {
        BufferedWriterBuilder::new()
    }

    fn lock_state(&self) -> io::Result<MutexGuard<'_, BufState>> {
        self.state
            .lock()
            .map_err(|_| io_err("the buffered writer is poisoned"))
    }

    /// Appends the record to the buffer and flushes if a trigger fires.
    ///
    /// The record is always accepted in full; the returned count equals
    /// `buf.len()`. If a triggered flush fails, the error of the downstream
    /// write is returned, and the unflushed remainder stays buffered.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from a triggered downstream flush, or a sentinel error
    /// containing "write on closed" after [`close`](BufferedWriter::close).
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock_state()?;
        if state.closed {
            return Err(io_err("write on closed buffered writer"));
        }
        state.buffer.extend_from_slice(buf);
        state.write_count += 1;
        if state.trigger_fired() {
            state.flush()?;
        }
        Ok(buf.len())
    }

    /// Hands all buffered bytes to the downstream sink now.
    ///
    /// A no-op after [`close`](BufferedWriter::close).
    ///
    /// # Errors
    ///
    /// `std::io::Error` from the downstream sink.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.lock_state()?;
        if state.closed {
            return Ok(());
        }
        state.flush()
    }

    /// Forwards a sync request to the downstream sink.
    ///
    /// Buffered bytes are drained first so the sync covers them.
    ///
    /// # Errors
    ///
    /// `std::io::Error` from the downstream sink, or a sentinel error
    /// containing "sync on closed" after [`close`](BufferedWriter::close).
    pub fn sync(&self) -> io::Result<()> {
        let mut state = self.lock_state()?;
        if state.closed {
            return Err(io_err("sync on closed buffered writer"));
        }
        state.drain_to_downstream()?;
        state.downstream.sync()
    }

    /// Closes the writer: a final flush is attempted, the downstream sink is
    /// closed, the background flusher (if any) is stopped and joined, and
    /// further writes are rejected.
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// The final flush error if there was one, otherwise the downstream close
    /// error.
    pub fn close(&self) -> io::Result<()> {
        let o_results = {
            let mut state = self.lock_state()?;
            if state.closed {
                None
            } else {
                state.closed = true;
                let flush_result = state.drain_to_downstream();
                let close_result = state.downstream.close();
                Some((flush_result, close_result))
            }
        };

        if let Ok(mut slot) = self.o_flusher.lock() {
            if let Some(flusher) = slot.take() {
                flusher.shutdown();
            }
        }

        match o_results {
            None => Ok(()),
            Some((Err(e), _)) => Err(e),
            Some((Ok(()), close_result)) => close_result,
        }
    }

    /// Returns the number of currently buffered bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.state.lock().map_or(0, |state| state.buffer.len())
    }

    /// Returns the number of writes buffered since the last flush.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.write_count)
    }

    /// Returns the time elapsed since the last (attempted) flush.
    #[must_use]
    pub fn time_since_last_flush(&self) -> Duration {
        self.state
            .lock()
            .map_or(Duration::ZERO, |state| state.last_flush.elapsed())
    }

    /// Returns true once [`close`](BufferedWriter::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().map_or(true, |state| state.closed)
    }
}

impl LogSink for BufferedWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        BufferedWriter::write(self, buf)
    }

    fn flush(&self) -> io::Result<()> {
        BufferedWriter::flush(self)
    }

    fn sync(&self) -> io::Result<()> {
        BufferedWriter::sync(self)
    }

    fn close(&self) -> io::Result<()> {
        BufferedWriter::close(self)
    }
}

impl io::Write for &BufferedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferedWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedWriter::flush(self)
    }
}

impl Drop for BufferedWriter {
    fn drop(&mut self) {
        self.close().ok();
    }
}

struct FlusherHandle {
    shutdown: Sender<()>,
    join_handle: JoinHandle<()>,
}
impl FlusherHandle {
    fn shutdown(self) {
        drop(self.shutdown);
        self.join_handle.join().ok();
    }
}

// One thread per buffered writer; wakes at the interval and flushes. Panics
// out of the downstream sink are caught so the loop survives them; the thread
// ends when the sender half is dropped on close.
fn start_flusher(
    am_state: Arc<Mutex<BufState>>,
    flush_interval: Duration,
) -> Result<FlusherHandle, RotologError> {
    let (shutdown, rx) = std::sync::mpsc::channel::<()>();
    let builder = std::thread::Builder::new().name(FLUSHER.to_string());
    #[cfg(not(feature = "dont_minimize_extra_stacks"))]
    let builder = builder.stack_size(128 * 1024);
    let join_handle = builder
        .spawn(move || loop {
            match rx.recv_timeout(flush_interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if catch_unwind(AssertUnwindSafe(|| timed_flush(&am_state))).is_err() {
                        eprint_msg(ErrorCode::Flush, "timed flush panicked");
                    }
                }
                _ => break,
            }
        })
        .map_err(RotologError::WorkerSpawn)?;
    Ok(FlusherHandle {
        shutdown,
        join_handle,
    })
}

fn timed_flush(am_state: &Mutex<BufState>) {
    let Ok(mut state) = am_state.lock() else {
        return;
    };
    if state.closed || state.buffer.is_empty() {
        return;
    }
    if state.last_flush.elapsed() >= state.flush_interval {
        if let Err(e) = state.flush() {
            eprint_err(ErrorCode::Write, "timed flush could not drain the buffer", &e);
        }
    }
}

// Non-closing stdout endpoint: close flushes the stream but leaves it open.
struct StdoutSink;
impl LogSink for StdoutSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        std::io::stdout().lock().write(buf)
    }

    fn flush(&self) -> io::Result<()> {
        std::io::stdout().lock().flush()
    }

    fn close(&self) -> io::Result<()> {
        self.flush()
    }
}
