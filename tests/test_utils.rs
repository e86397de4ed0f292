#![allow(dead_code)]

use std::path::{Path, PathBuf};

// All files below `dir` (recursively), except the one with the given name.
pub fn files_except(dir: &Path, excluded_name: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect(dir, excluded_name, &mut found);
    found.sort();
    found
}

fn collect(dir: &Path, excluded_name: &str, found: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).unwrap().flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, excluded_name, found);
        } else if path.file_name().is_some_and(|n| n != excluded_name) {
            found.push(path);
        }
    }
}

pub fn lines_of(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(ToString::to_string)
        .collect()
}
