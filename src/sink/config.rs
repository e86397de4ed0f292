#[cfg(feature = "compress")]
use crate::Codec;
use chrono::{DateTime, Local, NaiveDateTime};
use std::path::PathBuf;

pub(crate) const DEFAULT_MAX_SIZE_MB: u64 = 10;
pub(crate) const MEGABYTE: u64 = 1024 * 1024;

// The immutable configuration of a RotatingSink.
//
// `prefix` and `o_suffix` are derived from the file name of `active_path` once,
// at build time; archive naming and catalog scans work on these parts only.
#[derive(Debug)]
pub(crate) struct SinkConfig {
    pub(crate) active_path: PathBuf,
    pub(crate) directory: PathBuf,
    pub(crate) active_file_name: String,
    pub(crate) prefix: String,
    pub(crate) o_suffix: Option<String>,
    pub(crate) max_size: u64,
    pub(crate) max_age_days: usize,
    pub(crate) max_files: usize,
    pub(crate) use_local_time: bool,
    #[cfg(feature = "compress")]
    pub(crate) o_codec: Option<Codec>,
    pub(crate) date_dir_layout: bool,
    pub(crate) rotate_by_day: bool,
    pub(crate) async_cleanup: bool,
}

impl SinkConfig {
    // Wall-clock timestamp in the configured timezone choice.
    //
    // Archive names, day directories, the day-boundary check and retention
    // cutoffs all go through this one conversion, so they cannot disagree
    // across a DST transition.
    pub(crate) fn naive_timestamp(&self, now: &DateTime<Local>) -> NaiveDateTime {
        if self.use_local_time {
            now.naive_local()
        } else {
            now.naive_utc()
        }
    }

    // Returns true if a janitor pass would have anything to do.
    pub(crate) fn needs_cleanup(&self) -> bool {
        #[cfg(feature = "compress")]
        if self.o_codec.is_some() {
            return true;
        }
        self.max_age_days > 0 || self.max_files > 0
    }
}
