use super::{
    config::{SinkConfig, DEFAULT_MAX_SIZE_MB, MEGABYTE},
    RotatingSink,
};
#[cfg(feature = "compress")]
use crate::Codec;
use crate::RotologError;
use std::path::PathBuf;

/// Builder for [`RotatingSink`].
///
/// All options have defaults; only the active file path is mandatory and is
/// given to [`RotatingSink::builder`]. The parent directory of the active file
/// is *not* created here but on the first write that needs it.
pub struct RotatingSinkBuilder {
    active_path: PathBuf,
    max_size_mb: u64,
    max_age_days: usize,
    max_files: usize,
    use_local_time: bool,
    #[cfg(feature = "compress")]
    o_codec: Option<Codec>,
    date_dir_layout: bool,
    rotate_by_day: bool,
    async_cleanup: bool,
    #[cfg(test)]
    o_max_size_bytes: Option<u64>,
}

impl RotatingSinkBuilder {
    pub(crate) fn new(active_path: PathBuf) -> Self {
        Self {
            active_path,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_age_days: 0,
            max_files: 0,
            use_local_time: false,
            #[cfg(feature = "compress")]
            o_codec: None,
            date_dir_layout: false,
            rotate_by_day: false,
            async_cleanup: true,
            #[cfg(test)]
            o_max_size_bytes: None,
        }
    }

    /// Size threshold of the active file in megabytes; reaching it rotates.
    ///
    /// The default is 10 MB; `0` is coerced to the default.
    #[must_use]
    pub fn max_size_mb(mut self, max_size_mb: u64) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Number of days after which archives are deleted by the janitor.
    ///
    /// `0` (the default) disables age-based deletion.
    #[must_use]
    pub fn max_age_days(mut self, max_age_days: usize) -> Self {
        self.max_age_days = max_age_days;
        self
    }

    /// Number of archives the janitor keeps.
    ///
    /// Interpreted as "archives per calendar day" when combined with
    /// [`max_age_days`](Self::max_age_days), otherwise as the total cap over
    /// all archives. `0` (the default) disables count-based deletion.
    #[must_use]
    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Use the local timezone instead of UTC, both for the timestamps embedded
    /// in archive names and for the day-boundary computation.
    #[must_use]
    pub fn use_local_time(mut self, use_local_time: bool) -> Self {
        self.use_local_time = use_local_time;
        self
    }

    /// Makes the janitor compress archives with the given codec.
    ///
    /// Equivalent to `o_compress(Some(codec))`.
    #[cfg(feature = "compress")]
    #[cfg_attr(docsrs, doc(cfg(feature = "compress")))]
    #[must_use]
    pub fn compress(self, codec: Codec) -> Self {
        self.o_compress(Some(codec))
    }

    /// Defines if and how the janitor compresses archives; `None` (the
    /// default) disables compression.
    #[cfg(feature = "compress")]
    #[cfg_attr(docsrs, doc(cfg(feature = "compress")))]
    #[must_use]
    pub fn o_compress(mut self, o_codec: Option<Codec>) -> Self {
        self.o_codec = o_codec;
        self
    }

    /// Places new archives below per-day `YYYY-MM-DD` subdirectories of the
    /// active file's directory, and makes catalog scans include them.
    #[must_use]
    pub fn date_dir_layout(mut self, date_dir_layout: bool) -> Self {
        self.date_dir_layout = date_dir_layout;
        self
    }

    /// Rotates on the first write of a new day, in the timezone chosen with
    /// [`use_local_time`](Self::use_local_time).
    #[must_use]
    pub fn rotate_by_day(mut self, rotate_by_day: bool) -> Self {
        self.rotate_by_day = rotate_by_day;
        self
    }

    /// Defines whether janitor passes run on a background worker (the default)
    /// or inline in the thread that caused a rotation.
    #[must_use]
    pub fn async_cleanup(mut self, async_cleanup: bool) -> Self {
        self.async_cleanup = async_cleanup;
        self
    }

    #[cfg(test)]
    pub(crate) fn max_size_bytes(mut self, max_size: u64) -> Self {
        self.o_max_size_bytes = Some(max_size);
        self
    }

    /// Produces the [`RotatingSink`].
    ///
    /// # Errors
    ///
    /// [`RotologError::EmptyActivePath`] if the path has no file name,
    /// [`RotologError::ActivePathIsDirectory`] if it points to an existing
    /// directory.
    pub fn try_build(self) -> Result<RotatingSink, RotologError> {
        let Some(active_file_name) = self
            .active_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
        else {
            return Err(RotologError::EmptyActivePath);
        };
        if self.active_path.is_dir() {
            return Err(RotologError::ActivePathIsDirectory);
        }

        let (prefix, o_suffix) = match active_file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => {
                (stem.to_string(), Some(extension.to_string()))
            }
            _ => (active_file_name.clone(), None),
        };

        let max_size_mb = if self.max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            self.max_size_mb
        };
        #[allow(unused_mut)]
        let mut max_size = max_size_mb.saturating_mul(MEGABYTE);
        #[cfg(test)]
        if let Some(max_size_bytes) = self.o_max_size_bytes {
            max_size = max_size_bytes;
        }

        // a bare file name has an empty parent; the scan needs a real directory
        let directory = match self.active_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(RotatingSink::from_config(SinkConfig {
            active_path: self.active_path,
            directory,
            active_file_name,
            prefix,
            o_suffix,
            max_size,
            max_age_days: self.max_age_days,
            max_files: self.max_files,
            use_local_time: self.use_local_time,
            #[cfg(feature = "compress")]
            o_codec: self.o_codec,
            date_dir_layout: self.date_dir_layout,
            rotate_by_day: self.rotate_by_day,
            async_cleanup: self.async_cleanup,
        }))
    }
}

#[cfg(test)]
mod test {
    use crate::{RotatingSink, RotologError};

    #[test]
    fn rejects_pathological_paths() {
        assert!(matches!(
            RotatingSink::builder("").try_build(),
            Err(RotologError::EmptyActivePath)
        ));
        assert!(matches!(
            RotatingSink::builder("/").try_build(),
            Err(RotologError::EmptyActivePath)
        ));
        let dir = temp_dir::TempDir::new().unwrap();
        assert!(matches!(
            RotatingSink::builder(dir.path()).try_build(),
            Err(RotologError::ActivePathIsDirectory)
        ));
    }

    #[test]
    fn zero_size_is_coerced_to_the_default() {
        let dir = temp_dir::TempDir::new().unwrap();
        let sink = RotatingSink::builder(dir.path().join("app.log"))
            .max_size_mb(0)
            .try_build()
            .unwrap();
        // a small write must neither rotate nor fail
        assert_eq!(sink.write(b"hello").unwrap(), 5);
        assert!(sink.archives().is_empty());
    }
}
