//! Performance benchmarks for the raw-REPL hot paths
//!
//! Program generation and reply parsing run once per file, so large text
//! files are where regressions would show.

use boardxfer::security::FilenameValidator;
use boardxfer::services::repl_protocol::{
    download_reply_complete, parse_download_response, upload_command,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn sample_source(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("value_{i} = 'item {i}'  # path C:\\\\data\\\\{i}\n"))
        .collect()
}

/// Benchmark upload program generation with escaping
fn benchmark_upload_command(c: &mut Criterion) {
    let small = sample_source(20);
    let large = sample_source(2_000);

    c.bench_function("upload_command_small", |b| {
        b.iter(|| black_box(upload_command(black_box("main.py"), black_box(&small))));
    });

    c.bench_function("upload_command_large", |b| {
        b.iter(|| black_box(upload_command(black_box("main.py"), black_box(&large))));
    });
}

/// Benchmark sentinel scanning on a download reply
fn benchmark_parse_download_response(c: &mut Criterion) {
    let body = sample_source(2_000).replace('\n', "\r\n");
    let reply = format!(
        "raw REPL; CTRL-B to exit\r\n>OKFILE_START\r\n{}\r\nFILE_END\r\n\u{4}\u{4}>",
        body
    );

    c.bench_function("download_reply_complete", |b| {
        b.iter(|| black_box(download_reply_complete(black_box(&reply))));
    });

    c.bench_function("parse_download_response", |b| {
        b.iter(|| {
            let parsed = parse_download_response(black_box(&reply));
            black_box(parsed)
        });
    });
}

/// Benchmark file name sanitization
fn benchmark_sanitize(c: &mut Criterion) {
    let names = [
        "main.py",
        "../../etc/passwd",
        "my  config file.json",
        "x'),os.remove('boot.py",
    ];

    c.bench_function("sanitize_filenames", |b| {
        b.iter(|| {
            for name in &names {
                black_box(FilenameValidator::sanitize(black_box(name)));
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_upload_command,
    benchmark_parse_download_response,
    benchmark_sanitize
);
criterion_main!(benches);
