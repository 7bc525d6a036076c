//! Benchmarks for segmentation and demuxing.
//!
//! Run with: cargo bench
//!
//! The demux benchmark requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{hint::black_box, path::Path};

use criterion::{BenchmarkId, Criterion};
use isplit::{Bounds, FfmpegLogLevel, FrameSource, VideoPackets, segment};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.avi";

/// Keyframe flags for `len` frames with one keyframe every `interval` frames.
fn keyframe_flags(len: usize, interval: usize) -> Vec<bool> {
    (0..len).map(|index| index % interval == 0).collect()
}

fn benchmark_segmentation(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("segment");

    for len in [1_000, 100_000, 1_000_000] {
        let flags = keyframe_flags(len, 30);
        group.bench_with_input(BenchmarkId::new("unbounded", len), &flags, |bencher, flags| {
            bencher.iter(|| segment(black_box(flags), Bounds::default()));
        });
    }

    let flags = keyframe_flags(1_000_000, 30);
    group.bench_function("bounded middle range", |bencher| {
        bencher.iter(|| segment(black_box(&flags), Bounds::new(Some(10_000), Some(20_000))));
    });

    group.finish();
}

fn benchmark_demux(criterion: &mut Criterion) {
    isplit::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("demux and segment sample video", |bencher| {
        bencher.iter(|| {
            let packets = VideoPackets::open(SAMPLE_VIDEO).unwrap();
            segment(packets.frames(), Bounds::default())
        });
    });
}

criterion::criterion_group!(benches, benchmark_segmentation, benchmark_demux);
criterion::criterion_main!(benches);
