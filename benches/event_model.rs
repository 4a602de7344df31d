//! Event Model Benchmarks
//!
//! Measures the hot paths of the event pipeline: sparse coordinate access,
//! capability range checks, transformed getters, and parcel serialization.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use evhub::event::axis;
use evhub::event::transform::{Orientation, Transform};
use evhub::{BitArray, MotionAction, MotionEvent, MotionEventBuilder, PointerBuilder, Source};

fn touch_move(pointer_count: usize) -> MotionEvent {
    let mut builder = MotionEventBuilder::new(MotionAction::Move, Source::TOUCHSCREEN)
        .transform(Transform::oriented(Orientation::Rotate90, 1920.0, 1080.0))
        .raw_transform(Transform::from_scale_offset(1.5, 1.5, 0.0, 0.0));
    for i in 0..pointer_count {
        builder = builder.pointer(
            PointerBuilder::new(i as i32, evhub::event::ToolType::Finger)
                .x(100.0 + i as f32)
                .y(200.0 + i as f32)
                .axis(axis::PRESSURE, 0.5)
                .axis(axis::TOUCH_MAJOR, 4.0),
        );
    }
    builder.build()
}

fn bench_pointer_coords(c: &mut Criterion) {
    let event = touch_move(2);
    c.bench_function("coords_axis_lookup", |b| {
        b.iter(|| black_box(event.raw_pointer_coords(1).axis_value(axis::PRESSURE)))
    });
}

fn bench_transformed_getters(c: &mut Criterion) {
    let event = touch_move(2);
    c.bench_function("transformed_x", |b| b.iter(|| black_box(event.x(1))));
    c.bench_function("raw_x", |b| b.iter(|| black_box(event.raw_x(1))));
}

fn bench_bitarray_any(c: &mut Criterion) {
    let mut bits = BitArray::<24>::new();
    bits.set(30);
    bits.set(500);
    c.bench_function("bitarray_any_full_range", |b| {
        b.iter(|| black_box(bits.any(0, 768)))
    });
    c.bench_function("bitarray_any_narrow_range", |b| {
        b.iter(|| black_box(bits.any(96, 128)))
    });
}

fn bench_parcel_round_trip(c: &mut Criterion) {
    let event = touch_move(2);
    c.bench_function("motion_event_parcel_round_trip", |b| {
        b.iter(|| {
            let mut parcel = bytes::BytesMut::new();
            event.write_to_parcel(&mut parcel);
            black_box(MotionEvent::read_from_parcel(&mut parcel.freeze()).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_pointer_coords,
    bench_transformed_getters,
    bench_bitarray_any,
    bench_parcel_round_trip
);
criterion_main!(benches);
