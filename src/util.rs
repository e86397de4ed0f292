use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Copy, Clone, Debug)]
pub(crate) enum ErrorCode {
    Write,
    Flush,
    Cleanup,
    #[cfg(feature = "compress")]
    Compress,
    Poison,
    #[cfg(target_family = "unix")]
    Ownership,
}
impl ErrorCode {
    fn as_index(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Flush => "flush",
            Self::Cleanup => "cleanup",
            #[cfg(feature = "compress")]
            Self::Compress => "compress",
            Self::Poison => "poison",
            #[cfg(target_family = "unix")]
            Self::Ownership => "ownership",
        }
    }
}

pub(crate) fn eprint_err(error_code: ErrorCode, msg: &str, err: &dyn std::error::Error) {
    let s = format!(
        "[rotolog][ERRCODE::{code:?}] {msg}, caused by {err:?}\n    \
         See https://docs.rs/rotolog/latest/rotolog/error_info/index.html#{code_lc}",
        code = error_code,
        code_lc = error_code.as_index(),
    );
    try_to_write(&s);
}

pub(crate) fn eprint_msg(error_code: ErrorCode, msg: &str) {
    let s = format!(
        "[rotolog][ERRCODE::{code:?}] {msg}\n    \
         See https://docs.rs/rotolog/latest/rotolog/error_info/index.html#{code_lc}",
        code = error_code,
        code_lc = error_code.as_index(),
    );
    try_to_write(&s);
}

/// Describes the output channel for internal diagnostics.
///
/// Problems that occur outside the host-facing call path — janitor failures,
/// compression failures, flush errors in background threads — cannot be returned
/// to the host and are reported to this channel instead.
///
/// Is set with [`set_error_channel`](crate::set_error_channel).
#[derive(Clone, Debug, Default)]
pub enum ErrorChannel {
    /// Write diagnostics to `stderr`, the default.
    #[default]
    StdErr,
    /// Write diagnostics to `stdout`.
    StdOut,
    /// Append diagnostics to the given file.
    File(PathBuf),
    /// Swallow diagnostics.
    DevNull,
}

static ERROR_CHANNEL: RwLock<ErrorChannel> = RwLock::new(ErrorChannel::StdErr);

/// Redirects the channel to which internal diagnostics are written.
pub fn set_error_channel(channel: ErrorChannel) {
    match ERROR_CHANNEL.write() {
        Ok(mut guard) => {
            *guard = channel;
        }
        Err(e) => {
            eprint_err(ErrorCode::Poison, "error channel cannot be set", &e);
        }
    }
}

fn try_to_write(s: &str) {
    match &*(ERROR_CHANNEL.read().unwrap()) {
        ErrorChannel::StdErr => {
            eprintln!("{s}");
        }
        ErrorChannel::StdOut => {
            println!("{s}");
        }
        ErrorChannel::File(path) => try_to_write_to_file(s, path).unwrap_or_else(|e| {
            eprintln!("{s}");
            eprintln!("Can't open error output file, caused by: {e}");
        }),
        ErrorChannel::DevNull => {}
    }
}

fn try_to_write_to_file(s: &str, path: &Path) -> Result<(), std::io::Error> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{s}")?;
    file.flush()
}

pub(crate) fn io_err(s: &'static str) -> std::io::Error {
    std::io::Error::other(s)
}

// Capacity for file-copy buffers, adapted to the size of the source file.
#[cfg(feature = "compress")]
pub(crate) fn copy_buffer_capacity(len: u64) -> usize {
    const MIN: u64 = 8 * 1024;
    const MAX: u64 = 1024 * 1024;
    usize::try_from(len.next_power_of_two().clamp(MIN, MAX)).unwrap_or(MAX as usize)
}
