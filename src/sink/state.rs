use super::{config::SinkConfig, janitor::Janitor, naming};
use crate::util::io_err;
use chrono::{DateTime, Local, NaiveDateTime};
use std::{
    fs::{File, Metadata, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::Arc,
};

// The mutable state of a RotatingSink. All access is serialized by the mutex
// in the facade; everything in here may assume exclusive access.
//
// `o_open_ts` is the timestamp under which the currently active file was
// opened (for a file taken over from a previous process run: its creation
// timestamp). A rotation archives the file under this timestamp, so content
// written before midnight ends up in an archive named with the old day, and
// the day-boundary check compares against the same value.
#[derive(Debug)]
pub(super) struct State {
    config: Arc<SinkConfig>,
    file: Option<File>,
    current_size: u64,
    o_open_ts: Option<NaiveDateTime>,
    closed: bool,
    o_now_override: Option<DateTime<Local>>,
}

impl State {
    pub(super) fn new(config: Arc<SinkConfig>) -> Self {
        Self {
            config,
            file: None,
            current_size: 0,
            o_open_ts: None,
            closed: false,
            o_now_override: None,
        }
    }

    fn now(&self) -> DateTime<Local> {
        self.o_now_override.unwrap_or_else(Local::now)
    }

    fn naming_now(&self) -> NaiveDateTime {
        self.config.naive_timestamp(&self.now())
    }

    pub(super) fn write(&mut self, janitor: &Janitor, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io_err("write on closed sink"));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.file.is_none() {
            self.open_existing_or_new(janitor, buf.len() as u64)?;
        }

        let size_exceeded = self.current_size > 0
            && self.current_size.saturating_add(buf.len() as u64) >= self.config.max_size;
        let day_changed = self.config.rotate_by_day
            && self
                .o_open_ts
                .is_some_and(|ts| ts.date() != self.naming_now().date());
        if size_exceeded || day_changed {
            self.rotate(janitor)?;
        }

        let Some(file) = self.file.as_mut() else {
            return Err(io_err("active file is not open"));
        };
        let written = file.write(buf)?;
        self.current_size += written as u64;
        Ok(written)
    }

    pub(super) fn sync(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(io_err("sync on closed sink"));
        }
        match &self.file {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    // First half of close; the facade drains the janitor afterwards, outside
    // the serializer.
    pub(super) fn close(&mut self, janitor: &Janitor) -> bool {
        janitor.note_closed();
        if self.closed {
            return false;
        }
        self.closed = true;
        self.file = None;
        true
    }

    pub(super) fn forced_rotate(&mut self, janitor: &Janitor) -> io::Result<()> {
        if self.closed {
            return Err(io_err("rotate on closed sink"));
        }
        self.rotate(janitor)
    }

    // Decides how to obtain a file handle when none is open: reuse the active
    // file if the pending write still fits, otherwise retire it first.
    fn open_existing_or_new(&mut self, janitor: &Janitor, write_len: u64) -> io::Result<()> {
        ensure_dir(&self.config.directory)?;
        match std::fs::metadata(&self.config.active_path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.open_new(),
            Err(e) => Err(e),
            Ok(metadata) => {
                if metadata.len().saturating_add(write_len) < self.config.max_size {
                    let file = OpenOptions::new()
                        .append(true)
                        .open(&self.config.active_path)?;
                    self.file = Some(file);
                    self.current_size = metadata.len();
                    self.o_open_ts = Some(
                        self.config
                            .naive_timestamp(&creation_timestamp(&metadata, self.now())),
                    );
                    Ok(())
                } else {
                    self.rotate(janitor)
                }
            }
        }
    }

    fn open_new(&mut self) -> io::Result<()> {
        let file = open_active_file(&self.config.active_path, None)?;
        self.file = Some(file);
        self.current_size = 0;
        self.o_open_ts = Some(self.naming_now());
        Ok(())
    }

    // close -> rename to the archive name -> reopen fresh -> janitor.
    //
    // On a rename or reopen failure the handle stays `None` and `o_open_ts`
    // keeps describing the not-yet-archived file; the next write goes through
    // open_existing_or_new again.
    fn rotate(&mut self, janitor: &Janitor) -> io::Result<()> {
        self.file = None;

        let o_mode = match std::fs::metadata(&self.config.active_path) {
            Ok(metadata) => {
                let open_ts = self.o_open_ts.unwrap_or_else(|| {
                    self.config
                        .naive_timestamp(&creation_timestamp(&metadata, self.now()))
                });
                let (_, archive_path) =
                    naming::collision_free_archive_path(&self.config, open_ts);
                if self.config.date_dir_layout {
                    if let Some(day_dir) = archive_path.parent() {
                        ensure_dir(day_dir)?;
                    }
                }
                std::fs::rename(&self.config.active_path, &archive_path)?;
                platform::inherit_ownership(&archive_path, &metadata);
                file_mode(&metadata)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let file = open_active_file(&self.config.active_path, o_mode)?;
        self.file = Some(file);
        self.current_size = 0;
        self.o_open_ts = Some(self.naming_now());

        janitor.trigger();
        Ok(())
    }

    #[cfg(test)]
    pub(super) fn set_now(&mut self, now: DateTime<Local>) {
        self.o_now_override = Some(now);
    }
}

fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(target_family = "unix")]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

// New active files are created with mode 0o600; a rotation re-creates the
// active file with the mode the previous one had.
fn open_active_file(path: &Path, o_mode: Option<u32>) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(target_family = "unix")]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(o_mode.unwrap_or(0o600));
    }
    #[cfg(not(target_family = "unix"))]
    let _ = o_mode;
    options.open(path)
}

// On windows the created() result exists but is transferred from deleted
// predecessors, so it is not usable here; everywhere else created() is tried
// first and the modification timestamp is the fallback.
fn creation_timestamp(metadata: &Metadata, fallback: DateTime<Local>) -> DateTime<Local> {
    if cfg!(target_os = "windows") {
        fallback
    } else {
        metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_or(fallback, DateTime::<Local>::from)
    }
}

#[cfg(target_family = "unix")]
fn file_mode(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}
#[cfg(not(target_family = "unix"))]
fn file_mode(_metadata: &Metadata) -> Option<u32> {
    None
}

mod platform {
    #[cfg(target_family = "unix")]
    use crate::util::{eprint_err, ErrorCode};
    use std::{fs::Metadata, path::Path};

    // Propagates the owner of the previous active file to the archive produced
    // from it. A no-op on platforms without POSIX ownership.
    pub(super) fn inherit_ownership(path: &Path, metadata: &Metadata) {
        unix_inherit_ownership(path, metadata);
    }

    #[cfg(target_family = "unix")]
    fn unix_inherit_ownership(path: &Path, metadata: &Metadata) {
        use std::os::unix::fs::MetadataExt;
        if let Err(e) = std::os::unix::fs::chown(path, Some(metadata.uid()), Some(metadata.gid())) {
            eprint_err(ErrorCode::Ownership, "cannot propagate file ownership", &e);
        }
    }

    #[cfg(not(target_family = "unix"))]
    fn unix_inherit_ownership(_: &Path, _: &Metadata) {}
}
