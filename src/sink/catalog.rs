use super::{config::SinkConfig, naming};
use crate::util::{eprint_err, ErrorCode};
use chrono::NaiveDateTime;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Information about one archive sibling of the active file.
///
/// Returned by [`RotatingSink::archives`](super::RotatingSink::archives);
/// the same listing drives the janitor's retention decisions.
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    /// Location of the archive.
    pub path: PathBuf,
    /// File name relative to its containing directory.
    pub file_name: String,
    /// The timestamp parsed from the file name, in the timezone the sink was
    /// configured with. Ordering and age decisions use this value, not the
    /// filesystem metadata.
    pub timestamp: NaiveDateTime,
    /// File size in bytes at scan time.
    pub size: u64,
    /// Modification timestamp from the filesystem, if available.
    pub modified: Option<SystemTime>,
    /// True if the name carries the configured codec suffix.
    pub compressed: bool,
}

// Scans the active directory (and its day directories, if configured) for
// archives of this sink, newest first.
//
// Two files that parse to the same timestamp (e.g. an archive next to its
// compressed twin after an interrupted compression) are collapsed to the first
// one encountered; the other is ignored, not deleted. Unreadable directories
// are reported to the side channel and skipped.
pub(crate) fn list_archives(config: &SinkConfig) -> Vec<ArchiveInfo> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    collect_from_dir(config, &config.directory, &mut entries, &mut seen);

    if config.date_dir_layout {
        match std::fs::read_dir(&config.directory) {
            Ok(read_dir) => {
                for dir_entry in read_dir.flatten() {
                    let path = dir_entry.path();
                    let is_day_dir = path
                        .file_name()
                        .map(|n| n.to_string_lossy())
                        .and_then(|n| naming::parse_day_dir_name(&n))
                        .is_some();
                    if is_day_dir && path.is_dir() {
                        collect_from_dir(config, &path, &mut entries, &mut seen);
                    }
                }
            }
            Err(e) => {
                eprint_err(ErrorCode::Cleanup, "can't scan for day directories", &e);
            }
        }
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

fn collect_from_dir(
    config: &SinkConfig,
    dir: &Path,
    entries: &mut Vec<ArchiveInfo>,
    seen: &mut HashSet<NaiveDateTime>,
) {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                eprint_err(ErrorCode::Cleanup, "can't read archive directory", &e);
            }
            return;
        }
    };

    for dir_entry in read_dir.flatten() {
        let path = dir_entry.path();
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if file_name == config.active_file_name {
            continue;
        }
        let Some((timestamp, compressed)) = naming::parse_archive_file_name(config, &file_name)
        else {
            continue;
        };
        let Ok(metadata) = dir_entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        if !seen.insert(timestamp) {
            continue;
        }
        entries.push(ArchiveInfo {
            path,
            file_name,
            timestamp,
            size: metadata.len(),
            modified: metadata.modified().ok(),
            compressed,
        });
    }
}

#[cfg(test)]
mod test {
    use super::super::config::{SinkConfig, DEFAULT_MAX_SIZE_MB, MEGABYTE};
    use std::path::{Path, PathBuf};
    use temp_dir::TempDir;

    fn config(directory: &Path) -> SinkConfig {
        SinkConfig {
            active_path: directory.join("foobar.log"),
            directory: directory.to_path_buf(),
            active_file_name: "foobar.log".to_string(),
            prefix: "foobar".to_string(),
            o_suffix: Some("log".to_string()),
            max_size: DEFAULT_MAX_SIZE_MB * MEGABYTE,
            max_age_days: 0,
            max_files: 0,
            use_local_time: false,
            #[cfg(feature = "compress")]
            o_codec: None,
            date_dir_layout: false,
            rotate_by_day: false,
            async_cleanup: false,
        }
    }

    fn touch(path: PathBuf) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn newest_first_with_noise_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path().join("foobar.log")); // the active file
        touch(dir.path().join("foobar_20230101120000.log"));
        touch(dir.path().join("foobar_20230103120000.log"));
        touch(dir.path().join("foobar_20230102120000.log"));
        touch(dir.path().join("unrelated.txt"));
        touch(dir.path().join("other_20230104120000.log"));

        let entries = super::list_archives(&config(dir.path()));
        let names: Vec<String> = entries.iter().map(|e| e.file_name.clone()).collect();
        assert_eq!(
            names,
            [
                "foobar_20230103120000.log",
                "foobar_20230102120000.log",
                "foobar_20230101120000.log",
            ]
        );
        assert!(entries.iter().all(|e| e.size == 1));
        assert!(entries.iter().all(|e| e.modified.is_some()));
    }

    #[cfg(feature = "compress")]
    #[test]
    fn same_timestamp_collapses_to_one_entry() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.o_codec = Some(crate::Codec::Zip);
        touch(dir.path().join("foobar_20230101120000.log"));
        touch(dir.path().join("foobar_20230101120000.log.zip"));

        let entries = super::list_archives(&config);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn includes_day_directories_when_configured() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.date_dir_layout = true;
        touch(dir.path().join("foobar_20230103120000.log"));
        touch(dir.path().join("2023-01-01/foobar_20230101120000.log"));
        touch(dir.path().join("2023-01-02/foobar_20230102120000.log"));
        // not a day directory
        touch(dir.path().join("subdir/foobar_20230104120000.log"));

        let entries = super::list_archives(&config);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].file_name, "foobar_20230103120000.log");
    }
}
