//! CI validation tests for println! usage
//!
//! Library modules report through the `log` facade; only the CLI commands and
//! the server binary write to the terminal directly.

use std::fs;
use std::path::{Path, PathBuf};

/// Directories whose sources must log instead of printing
const LIBRARY_DIRS: &[&str] = &[
    "src/services",
    "src/transport",
    "src/server",
    "src/models",
    "src/security",
    "src/config",
    "src/errors",
];

fn rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rust_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

/// Line numbers of print macros outside comments and test modules
fn print_lines(content: &str) -> Vec<usize> {
    let mut found = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        if trimmed.contains("println!") || trimmed.contains("print!(") {
            found.push(index + 1);
        }
    }
    found
}

#[test]
fn test_no_println_in_library_modules() {
    let mut files = Vec::new();
    for dir in LIBRARY_DIRS {
        rust_files(Path::new(dir), &mut files);
    }
    assert!(!files.is_empty(), "no library sources found");

    let offenders: Vec<String> = files
        .iter()
        .filter_map(|path| {
            let content = fs::read_to_string(path)
                .unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
            let lines = print_lines(&content);
            (!lines.is_empty()).then(|| format!("{}: lines {:?}", path.display(), lines))
        })
        .collect();

    assert!(
        offenders.is_empty(),
        "Found print statements in library code, use log macros instead:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn test_print_detection_skips_comments_and_tests() {
    let source = "fn a() {}\n// println!(\"doc\")\nfn b() { println!(\"x\"); }\n#[cfg(test)]\nmod tests { fn c() { println!(\"ok\"); } }\n";
    assert_eq!(print_lines(source), vec![3]);
}
