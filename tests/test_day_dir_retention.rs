mod test_utils;

use chrono::{Duration, Utc};
use rotolog::RotatingSink;
use temp_dir::TempDir;

// Seed two archives per day across five consecutive days in day-directory
// layout, then force a janitor pass. With max_age_days=3 and max_files=2 only
// the three most recent days may keep files, at most two each.
#[test]
fn day_dir_retention_prunes_old_days() {
    let dir = TempDir::new().unwrap();

    let now = Utc::now().naive_utc();
    let mut seeded_days = Vec::new();
    for day_offset in 0..5 {
        let first = now - Duration::days(day_offset) - Duration::hours(1);
        let second = first - Duration::minutes(1);
        let day_dir = dir.path().join(first.format("%Y-%m-%d").to_string());
        std::fs::create_dir_all(&day_dir).unwrap();
        for ts in [first, second] {
            let name = format!("foobar_{}.log", ts.format("%Y%m%d%H%M%S"));
            std::fs::write(day_dir.join(name), b"seeded").unwrap();
        }
        seeded_days.push(day_dir);
    }

    let sink = RotatingSink::builder(dir.path().join("foobar.log"))
        .max_age_days(3)
        .max_files(2)
        .date_dir_layout(true)
        .async_cleanup(false)
        .try_build()
        .unwrap();
    sink.rotate().unwrap();
    sink.close().unwrap();

    let remaining = test_utils::files_except(dir.path(), "foobar.log");
    assert_eq!(remaining.len(), 6, "three days with two files each");
    for (day_offset, day_dir) in seeded_days.iter().enumerate() {
        let files_in_day = remaining
            .iter()
            .filter(|p| p.starts_with(day_dir))
            .count();
        if day_offset < 3 {
            assert_eq!(files_in_day, 2, "recent day {day_offset} must keep its files");
        } else {
            assert_eq!(files_in_day, 0, "old day {day_offset} must be purged");
        }
    }
}

// With only the count rule, the janitor caps the total number of archives.
#[test]
fn count_cap_holds_after_a_pass() {
    let dir = TempDir::new().unwrap();
    for hour in 10..15 {
        let name = format!("foobar_20230501{hour}0000.log");
        std::fs::write(dir.path().join(name), b"seeded").unwrap();
    }

    let sink = RotatingSink::builder(dir.path().join("foobar.log"))
        .max_files(2)
        .async_cleanup(false)
        .try_build()
        .unwrap();
    sink.rotate().unwrap();
    sink.close().unwrap();

    let remaining: Vec<String> = sink
        .archives()
        .iter()
        .map(|a| a.file_name.clone())
        .collect();
    // the two newest seeded archives survive, newest first
    assert_eq!(
        remaining,
        ["foobar_20230501140000.log", "foobar_20230501130000.log"]
    );
}

// With only the age rule, everything older than the cutoff goes, regardless
// of count.
#[test]
fn age_rule_purges_regardless_of_count() {
    let dir = TempDir::new().unwrap();
    let now = Utc::now().naive_utc();
    for day_offset in [1_i64, 2, 8, 9, 10] {
        let ts = now - Duration::days(day_offset);
        let name = format!("foobar_{}.log", ts.format("%Y%m%d%H%M%S"));
        std::fs::write(dir.path().join(name), b"seeded").unwrap();
    }

    let sink = RotatingSink::builder(dir.path().join("foobar.log"))
        .max_age_days(7)
        .async_cleanup(false)
        .try_build()
        .unwrap();
    sink.rotate().unwrap();
    sink.close().unwrap();

    assert_eq!(sink.archives().len(), 2);
}
