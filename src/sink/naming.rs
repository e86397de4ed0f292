use super::config::SinkConfig;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

const TS_FORMAT: &str = "%Y%m%d%H%M%S";
const TS_LEN: usize = 14;
const DAY_DIR_FORMAT: &str = "%Y-%m-%d";

// `{prefix}_{YYYYMMDDhhmmss}` plus the suffix of the active file, if it has one.
pub(super) fn archive_file_name(config: &SinkConfig, ts: NaiveDateTime) -> String {
    match &config.o_suffix {
        Some(suffix) => format!("{}_{}.{suffix}", config.prefix, ts.format(TS_FORMAT)),
        None => format!("{}_{}", config.prefix, ts.format(TS_FORMAT)),
    }
}

pub(super) fn archive_path(config: &SinkConfig, ts: NaiveDateTime) -> PathBuf {
    let mut path = config.directory.clone();
    if config.date_dir_layout {
        path.push(ts.format(DAY_DIR_FORMAT).to_string());
    }
    path.push(archive_file_name(config, ts));
    path
}

// Reverses archive_file_name. Accepts the plain suffix and, with compression
// configured, the suffix extended by the codec suffix; everything else is a
// parse failure and the file is not an archive of this sink.
pub(super) fn parse_archive_file_name(
    config: &SinkConfig,
    file_name: &str,
) -> Option<(NaiveDateTime, bool)> {
    let rest = file_name
        .strip_prefix(config.prefix.as_str())?
        .strip_prefix('_')?;
    let (digits, compressed) = strip_known_suffix(config, rest)?;
    if digits.len() != TS_LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(digits, TS_FORMAT)
        .ok()
        .map(|ts| (ts, compressed))
}

fn strip_known_suffix<'a>(config: &SinkConfig, rest: &'a str) -> Option<(&'a str, bool)> {
    #[cfg(feature = "compress")]
    if let Some(codec) = config.o_codec {
        let compressed_suffix = match &config.o_suffix {
            Some(suffix) => format!(".{suffix}.{}", codec.suffix()),
            None => format!(".{}", codec.suffix()),
        };
        if let Some(digits) = rest.strip_suffix(compressed_suffix.as_str()) {
            return Some((digits, true));
        }
    }
    match &config.o_suffix {
        Some(suffix) => rest
            .strip_suffix(format!(".{suffix}").as_str())
            .map(|digits| (digits, false)),
        None => Some((rest, false)),
    }
}

// Picks the archive path for the given timestamp, stepping the timestamp
// forward one second at a time while the name (or its compressed twin) is
// already taken. Rapid rotations within the same second would otherwise
// overwrite an earlier archive; stepping keeps the name format intact.
pub(super) fn collision_free_archive_path(
    config: &SinkConfig,
    ts: NaiveDateTime,
) -> (NaiveDateTime, PathBuf) {
    let mut ts = ts;
    loop {
        let path = archive_path(config, ts);
        if !path.exists() && !compressed_twin_exists(config, &path) {
            return (ts, path);
        }
        match ts.checked_add_signed(chrono::Duration::seconds(1)) {
            Some(next) => ts = next,
            None => return (ts, path),
        }
    }
}

#[cfg(feature = "compress")]
fn compressed_twin_exists(config: &SinkConfig, path: &std::path::Path) -> bool {
    match config.o_codec {
        Some(codec) => {
            let mut twin = path.as_os_str().to_os_string();
            twin.push(".");
            twin.push(codec.suffix());
            PathBuf::from(twin).exists()
        }
        None => false,
    }
}
#[cfg(not(feature = "compress"))]
fn compressed_twin_exists(_config: &SinkConfig, _path: &std::path::Path) -> bool {
    false
}

// Recognizes `YYYY-MM-DD` child directories of the active directory.
// chrono would also accept unpadded fields, so the length is checked first.
pub(super) fn parse_day_dir_name(name: &str) -> Option<NaiveDate> {
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, DAY_DIR_FORMAT).ok()
}
