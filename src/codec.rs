use crate::{util::copy_buffer_capacity, RotologError};
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
};

/// The compression codec applied to archives by the janitor.
///
/// The codec determines both the on-disk format and the suffix that is appended
/// to the archive name (e.g. `app_20240601120000.log.zip`). The suffix is also
/// used to recognize already-compressed archives during catalog scans, so the
/// codec should not be changed while archives from an earlier configuration are
/// still present.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[non_exhaustive]
pub enum Codec {
    /// A single-entry zip archive, the default.
    #[default]
    Zip,
    /// An uncompressed single-entry tar archive.
    Tar,
    /// A gzip-compressed single-entry tar archive, with suffix `tgz`.
    Tgz,
    /// A gzip-compressed single-entry tar archive, with suffix `tar.gz`.
    TarGz,
    /// A gzip stream.
    Gz,
    /// A bzip2 stream.
    Bz2,
    /// Alias of [`Codec::Bz2`]; produces the same format and suffix.
    Bzip2,
    /// A zlib stream.
    Zlib,
}

impl Codec {
    /// Returns the file name suffix (without leading dot) of this codec.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::Tgz => "tgz",
            Self::TarGz => "tar.gz",
            Self::Gz => "gz",
            Self::Bz2 | Self::Bzip2 => "bz2",
            Self::Zlib => "zlib",
        }
    }
}

impl FromStr for Codec {
    type Err = RotologError;

    /// Maps a codec tag, as it would appear in a host's configuration,
    /// to the corresponding variant.
    fn from_str(tag: &str) -> Result<Self, RotologError> {
        match tag {
            "zip" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            "tgz" => Ok(Self::Tgz),
            "targz" => Ok(Self::TarGz),
            "gz" => Ok(Self::Gz),
            "bz2" => Ok(Self::Bz2),
            "bzip2" => Ok(Self::Bzip2),
            "zlib" => Ok(Self::Zlib),
            _ => Err(RotologError::UnknownCodec(tag.to_string())),
        }
    }
}

// Produces `{src}.{suffix}` from `{src}` and removes `{src}`.
//
// On failure the source file is left untouched (the next janitor pass will
// retry it) and the partial output is removed.
pub(crate) fn compress_file(src: &Path, codec: Codec) -> io::Result<PathBuf> {
    let mut dst_name = src.as_os_str().to_os_string();
    dst_name.push(".");
    dst_name.push(codec.suffix());
    let dst = PathBuf::from(dst_name);

    match write_compressed(src, &dst, codec) {
        Ok(()) => {
            std::fs::remove_file(src)?;
            Ok(dst)
        }
        Err(e) => {
            std::fs::remove_file(&dst).ok();
            Err(e)
        }
    }
}

fn write_compressed(src: &Path, dst: &Path, codec: Codec) -> io::Result<()> {
    let len = std::fs::metadata(src)?.len();
    let mut input = BufReader::with_capacity(copy_buffer_capacity(len), File::open(src)?);
    let output = File::create(dst)?;
    let entry_name = src.file_name().unwrap_or(src.as_os_str()).to_os_string();

    match codec {
        Codec::Gz => {
            let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
            io::copy(&mut input, &mut encoder)?;
            encoder.finish()?;
        }
        Codec::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(output, flate2::Compression::default());
            io::copy(&mut input, &mut encoder)?;
            encoder.finish()?;
        }
        Codec::Bz2 | Codec::Bzip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(output, bzip2::Compression::default());
            io::copy(&mut input, &mut encoder)?;
            encoder.finish()?;
        }
        Codec::Zip => {
            let mut zip = zip::ZipWriter::new(output);
            zip.start_file(
                entry_name.to_string_lossy(),
                zip::write::FileOptions::default(),
            )
            .map_err(io::Error::other)?;
            io::copy(&mut input, &mut zip)?;
            zip.finish().map_err(io::Error::other)?;
        }
        Codec::Tar => {
            let mut builder = tar::Builder::new(output);
            builder.append_path_with_name(src, &entry_name)?;
            builder.finish()?;
        }
        Codec::Tgz | Codec::TarGz => {
            let encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_path_with_name(src, &entry_name)?;
            builder.into_inner()?.finish()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{compress_file, Codec};
    use std::{fs::File, io::Read, path::Path, str::FromStr};
    use temp_dir::TempDir;

    const CONTENT: &[u8] = b"The quick brown fox jumps over the lazy dog";

    fn seed(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, CONTENT).unwrap();
        path
    }

    #[test]
    fn suffixes_and_tags() {
        for (tag, codec, suffix) in [
            ("zip", Codec::Zip, "zip"),
            ("tar", Codec::Tar, "tar"),
            ("tgz", Codec::Tgz, "tgz"),
            ("targz", Codec::TarGz, "tar.gz"),
            ("gz", Codec::Gz, "gz"),
            ("bz2", Codec::Bz2, "bz2"),
            ("bzip2", Codec::Bzip2, "bz2"),
            ("zlib", Codec::Zlib, "zlib"),
        ] {
            assert_eq!(Codec::from_str(tag).unwrap(), codec);
            assert_eq!(codec.suffix(), suffix);
        }
        assert!(Codec::from_str("lz4").is_err());
    }

    #[test]
    fn gz_round_trip() {
        let dir = TempDir::new().unwrap();
        let src = seed(dir.path(), "app_20240601120000.log");

        let dst = compress_file(&src, Codec::Gz).unwrap();
        assert!(!src.exists());
        assert_eq!(dst, dir.path().join("app_20240601120000.log.gz"));

        let mut decoder = flate2::read::GzDecoder::new(File::open(&dst).unwrap());
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, CONTENT);
    }

    #[test]
    fn zip_round_trip() {
        let dir = TempDir::new().unwrap();
        let src = seed(dir.path(), "app_20240601120000.log");

        let dst = compress_file(&src, Codec::Zip).unwrap();
        assert!(!src.exists());

        let mut zip = zip::ZipArchive::new(File::open(&dst).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
        let mut entry = zip.by_index(0).unwrap();
        assert_eq!(entry.name(), "app_20240601120000.log");
        let mut restored = Vec::new();
        entry.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, CONTENT);
    }

    #[test]
    fn targz_round_trip() {
        let dir = TempDir::new().unwrap();
        let src = seed(dir.path(), "app_20240601120000.log");

        let dst = compress_file(&src, Codec::TarGz).unwrap();
        assert!(!src.exists());
        assert_eq!(dst, dir.path().join("app_20240601120000.log.tar.gz"));

        let decoder = flate2::read::GzDecoder::new(File::open(&dst).unwrap());
        let mut archive = tar::Archive::new(decoder);
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(
            entry.path().unwrap().to_string_lossy(),
            "app_20240601120000.log"
        );
        let mut restored = Vec::new();
        entry.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, CONTENT);
        assert!(entries.next().is_none());
    }

    #[test]
    fn failure_preserves_source() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("not_there.log");
        assert!(compress_file(&missing, Codec::Zip).is_err());
        assert!(!dir.path().join("not_there.log.zip").exists());
    }
}
