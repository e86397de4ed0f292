use super::{catalog, config::SinkConfig, retention};
use crate::util::{eprint_err, eprint_msg, ErrorCode};
use chrono::Local;
use std::{
    fmt::Write as _,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
};

const JANITOR: &str = "rotolog-janitor";

// Retention executor of one sink. In async mode at most one worker thread is
// alive at any time; triggers that arrive while it runs are coalesced into a
// single re-run.
#[derive(Debug)]
pub(super) struct Janitor {
    shared: Arc<JanitorShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct JanitorShared {
    config: Arc<SinkConfig>,
    // false <=> no worker scheduled
    cleanup_running: AtomicBool,
    // set when a trigger arrives while a worker is running
    rerun_needed: AtomicBool,
    closed: AtomicBool,
}

impl Janitor {
    pub(super) fn new(config: Arc<SinkConfig>) -> Self {
        Self {
            shared: Arc::new(JanitorShared {
                config,
                cleanup_running: AtomicBool::new(false),
                rerun_needed: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    // Requests a cleanup pass. Called by the rotation engine, under the sink's
    // serializer; after `note_closed` all triggers degrade to no-ops.
    pub(super) fn trigger(&self) {
        let shared = &self.shared;
        if !shared.config.needs_cleanup() || shared.closed.load(Ordering::Acquire) {
            return;
        }
        if !shared.config.async_cleanup {
            run_pass(&shared.config);
            return;
        }

        if shared
            .cleanup_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let shared_for_worker = Arc::clone(shared);
            let builder = std::thread::Builder::new().name(JANITOR.to_string());
            #[cfg(not(feature = "dont_minimize_extra_stacks"))]
            let builder = builder.stack_size(512 * 1024);
            match builder.spawn(move || worker_loop(&shared_for_worker)) {
                Ok(join_handle) => {
                    if let Ok(mut slot) = self.worker.lock() {
                        // a previous worker can only be in the slot after it
                        // exited, so this join is instantaneous
                        if let Some(old) = slot.replace(join_handle) {
                            old.join().ok();
                        }
                    }
                }
                Err(e) => {
                    shared.cleanup_running.store(false, Ordering::Release);
                    eprint_err(ErrorCode::Cleanup, "can't spawn the janitor worker", &e);
                }
            }
        } else {
            shared.rerun_needed.store(true, Ordering::Release);
        }
    }

    // Part of the close handshake: no new workers after this, and the current
    // one (if any) is drained.
    //
    // The caller must have set `note_closed` while holding the sink's
    // serializer, so no trigger can race this join with a fresh spawn.
    pub(super) fn shutdown(&self) {
        if let Ok(mut slot) = self.worker.lock() {
            if let Some(join_handle) = slot.take() {
                join_handle.join().ok();
            }
        }
    }

    pub(super) fn note_closed(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

fn worker_loop(shared: &JanitorShared) {
    loop {
        run_pass(&shared.config);
        if shared.rerun_needed.swap(false, Ordering::AcqRel) {
            continue;
        }
        shared.cleanup_running.store(false, Ordering::Release);
        // a trigger that lost the race against the store above would be
        // dropped; reclaim the running flag for it and go around once more
        if shared.rerun_needed.load(Ordering::Acquire)
            && shared
                .cleanup_running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            continue;
        }
        return;
    }
}

// One pass: re-read the catalog, evaluate retention, delete, compress.
// Failures of one pass are collected into numbered lists per concern; they
// never reach the host.
pub(super) fn run_pass(config: &SinkConfig) {
    let entries = catalog::list_archives(config);
    let total = entries.len();
    let now = config.naive_timestamp(&Local::now());
    let plan = retention::evaluate(config, entries, now);

    let mut delete_failures: Vec<(std::path::PathBuf, std::io::Error)> = Vec::new();
    for entry in plan.delete {
        if let Err(e) = std::fs::remove_file(&entry.path) {
            delete_failures.push((entry.path, e));
        }
    }
    report_failures(
        ErrorCode::Cleanup,
        "cleanup pass failed",
        total,
        &delete_failures,
    );

    #[cfg(feature = "compress")]
    if let Some(codec) = config.o_codec {
        let mut compress_failures: Vec<(std::path::PathBuf, std::io::Error)> = Vec::new();
        for entry in plan.compress {
            if let Err(e) = crate::codec::compress_file(&entry.path, codec) {
                compress_failures.push((entry.path, e));
            }
        }
        report_failures(
            ErrorCode::Compress,
            "compression failed",
            total,
            &compress_failures,
        );
    }
}

fn report_failures(
    error_code: ErrorCode,
    what: &str,
    total: usize,
    failures: &[(std::path::PathBuf, std::io::Error)],
) {
    if failures.is_empty() {
        return;
    }
    let mut msg = format!("{what} for {} of {total} archives:", failures.len());
    for (index, (path, e)) in failures.iter().enumerate() {
        write!(msg, "\n    ({}) {:?}: {e}", index + 1, path.display()).ok();
    }
    eprint_msg(error_code, &msg);
}
