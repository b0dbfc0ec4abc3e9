use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scanstream::sampler::hash::FrameHash;
use scanstream::sampler::enhance;
use scanstream::testing::synthetic;
use scanstream::validate;

fn bench_validator(c: &mut Criterion) {
    c.bench_function("validate_ean13", |b| {
        b.iter(|| validate(black_box("4006381333931")))
    });
    c.bench_function("validate_upca", |b| {
        b.iter(|| validate(black_box("123456789012")))
    });
    c.bench_function("validate_rejects_garbage", |b| {
        b.iter(|| validate(black_box("not-a-barcode")))
    });
}

fn bench_frame_pipeline(c: &mut Criterion) {
    let frame = synthetic::ean13_frame("4006381333931", 1280, 720);
    let roi = enhance::luma_roi(&frame, 0.6);

    c.bench_function("luma_roi_720p", |b| {
        b.iter(|| enhance::luma_roi(black_box(&frame), 0.6))
    });
    c.bench_function("frame_hash", |b| {
        b.iter(|| FrameHash::compute(black_box(&roi)))
    });
    c.bench_function("enhance_roi", |b| {
        b.iter(|| enhance::enhance(black_box(&roi)))
    });

    let a = FrameHash::compute(&roi);
    let blank = enhance::luma_roi(&synthetic::flat_frame(200, 1280, 720), 0.6);
    let b_hash = FrameHash::compute(&blank);
    c.bench_function("hash_change_ratio", |b| {
        b.iter(|| black_box(&a).change_ratio(black_box(&b_hash)))
    });
}

criterion_group!(benches, bench_validator, bench_frame_pipeline);
criterion_main!(benches);
