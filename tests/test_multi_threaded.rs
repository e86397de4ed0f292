mod test_utils;

use rotolog::RotatingSink;
use std::{
    collections::HashSet,
    sync::{Arc, Barrier},
    thread::JoinHandle,
};
use temp_dir::TempDir;

const NO_OF_THREADS: usize = 10;
const NO_OF_WRITES_PER_THREAD: usize = 100;

// Ten writer threads, a hundred records each, with forced rotations from the
// main thread in between. Afterwards every record must appear exactly once
// across the active file and all archives.
#[test]
fn records_survive_concurrent_writes_and_rotations() {
    let dir = TempDir::new().unwrap();
    let active = dir.path().join("foobar.log");
    let sink = Arc::new(
        RotatingSink::builder(&active)
            .max_size_mb(1)
            .try_build()
            .unwrap(),
    );

    let barrier = Arc::new(Barrier::new(NO_OF_THREADS));
    let worker_handles: Vec<JoinHandle<()>> = (0..NO_OF_THREADS)
        .map(|thread_number| {
            let sink = Arc::clone(&sink);
            let barrier = Arc::clone(&barrier);
            std::thread::Builder::new()
                .name(thread_number.to_string())
                .spawn(move || {
                    barrier.wait();
                    for write_number in 0..NO_OF_WRITES_PER_THREAD {
                        let record = format!("Worker {thread_number}, Write {write_number}\n");
                        let written = sink.write(record.as_bytes()).unwrap();
                        assert_eq!(written, record.len(), "no short writes expected here");
                    }
                })
                .unwrap()
        })
        .collect();

    // interleave a few forced rotations with the writers
    for _ in 0..3 {
        std::thread::sleep(std::time::Duration::from_millis(10));
        sink.rotate().unwrap();
    }

    for worker_handle in worker_handles {
        worker_handle.join().unwrap();
    }
    sink.close().unwrap();

    let mut all_lines = Vec::new();
    all_lines.extend(test_utils::lines_of(&active));
    for archive in test_utils::files_except(dir.path(), "foobar.log") {
        all_lines.extend(test_utils::lines_of(&archive));
    }

    assert_eq!(all_lines.len(), NO_OF_THREADS * NO_OF_WRITES_PER_THREAD);
    let unique: HashSet<&String> = all_lines.iter().collect();
    assert_eq!(
        unique.len(),
        all_lines.len(),
        "every (thread, write) pair must appear exactly once"
    );
}
