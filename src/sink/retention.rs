use super::{catalog::ArchiveInfo, config::SinkConfig};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

// What one janitor pass has to do to the given catalog.
pub(crate) struct RetentionPlan {
    pub(crate) delete: Vec<ArchiveInfo>,
    #[cfg(feature = "compress")]
    pub(crate) compress: Vec<ArchiveInfo>,
}

// Applies the retention policy to a catalog (newest first).
//
// With both rules set, `max_files` caps each calendar day that is still within
// the age window; with only one rule set it acts globally. Archives with a
// timestamp at or before `now - max_age_days * 24h` are always purged when the
// age rule is active. Ordering decisions use timestamps only.
pub(crate) fn evaluate(
    config: &SinkConfig,
    entries: Vec<ArchiveInfo>,
    now: NaiveDateTime,
) -> RetentionPlan {
    let mut delete = Vec::new();
    let mut keep = Vec::new();

    match (config.max_age_days > 0, config.max_files > 0) {
        (true, true) => {
            let cutoff = cutoff(now, config.max_age_days);
            let mut per_day: HashMap<chrono::NaiveDate, usize> = HashMap::new();
            for entry in entries {
                if entry.timestamp <= cutoff {
                    delete.push(entry);
                    continue;
                }
                let kept_today = per_day.entry(entry.timestamp.date()).or_insert(0);
                if *kept_today < config.max_files {
                    *kept_today += 1;
                    keep.push(entry);
                } else {
                    delete.push(entry);
                }
            }
        }
        (false, true) => {
            for (index, entry) in entries.into_iter().enumerate() {
                if index < config.max_files {
                    keep.push(entry);
                } else {
                    delete.push(entry);
                }
            }
        }
        (true, false) => {
            let cutoff = cutoff(now, config.max_age_days);
            for entry in entries {
                if entry.timestamp <= cutoff {
                    delete.push(entry);
                } else {
                    keep.push(entry);
                }
            }
        }
        (false, false) => {
            keep = entries;
        }
    }

    #[cfg(feature = "compress")]
    let compress = if config.o_codec.is_some() {
        keep.into_iter().filter(|e| !e.compressed).collect()
    } else {
        Vec::new()
    };
    #[cfg(not(feature = "compress"))]
    drop(keep);

    RetentionPlan {
        delete,
        #[cfg(feature = "compress")]
        compress,
    }
}

// `now - max_age_days * 24h`; archives at or before this point fall to the age rule.
fn cutoff(now: NaiveDateTime, max_age_days: usize) -> NaiveDateTime {
    i64::try_from(max_age_days)
        .ok()
        .and_then(|days| now.checked_sub_signed(Duration::days(days)))
        .unwrap_or(NaiveDateTime::MIN)
}
