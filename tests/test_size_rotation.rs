mod test_utils;

use rotolog::RotatingSink;
use temp_dir::TempDir;

// One megabyte plus one byte of 'A', then a single 'b': the second write must
// retire the full file and land alone in a fresh active file.
#[test]
fn size_rotation_keeps_exactly_one_archive() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("foobar.log");
    let sink = RotatingSink::builder(&active)
        .max_size_mb(1)
        .max_files(1)
        .try_build()
        .unwrap();

    let payload = vec![b'A'; 1_048_577];
    assert_eq!(sink.write(&payload).unwrap(), 1_048_577);
    assert_eq!(sink.write(b"b").unwrap(), 1);
    sink.close().unwrap();

    assert_eq!(std::fs::read_to_string(&active).unwrap(), "b");

    let archives = test_utils::files_except(dir.path(), "foobar.log");
    assert_eq!(archives.len(), 1, "expected exactly one archive");
    let archived = std::fs::read(&archives[0]).unwrap();
    assert_eq!(archived.len(), 1_048_577);
    assert!(archived.iter().all(|b| *b == b'A'));
}

#[test]
fn archives_accumulate_without_retention_rules() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("foobar.log");
    let sink = RotatingSink::builder(&active).try_build().unwrap();

    for record in [&b"one"[..], b"two", b"three", b"four"] {
        sink.write(record).unwrap();
        sink.rotate().unwrap();
    }
    sink.close().unwrap();

    assert_eq!(test_utils::files_except(dir.path(), "foobar.log").len(), 4);
}

#[test]
fn total_bytes_are_conserved_across_rotations() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("foobar.log");
    let sink = RotatingSink::builder(&active)
        .max_size_mb(1)
        .try_build()
        .unwrap();

    let record = vec![b'r'; 300_000];
    let mut written = 0_u64;
    for _ in 0..12 {
        written += sink.write(&record).unwrap() as u64;
    }
    sink.close().unwrap();

    let mut on_disk = std::fs::metadata(&active).unwrap().len();
    for archive in test_utils::files_except(dir.path(), "foobar.log") {
        on_disk += std::fs::metadata(archive).unwrap().len();
    }
    assert_eq!(written, on_disk);
}

#[test]
fn operations_on_closed_sink_fail_with_sentinels() {
    let dir = TempDir::new().unwrap();
    let sink = RotatingSink::builder(dir.path().join("foobar.log"))
        .try_build()
        .unwrap();
    sink.write(b"x").unwrap();
    sink.close().unwrap();
    // closing again is a no-op
    sink.close().unwrap();

    let write_err = sink.write(b"y").unwrap_err();
    assert!(write_err.to_string().contains("write on closed"));
    let sync_err = sink.sync().unwrap_err();
    assert!(sync_err.to_string().contains("sync on closed"));
}
