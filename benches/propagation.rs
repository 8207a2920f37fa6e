//! Benchmarks for attribute propagation fan-out
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use displayctl_rs::attributes::{
    AttributeDefaults, AttributeFlag, AttributeSet, AttributeState, FlaggedVisual, Propagator,
    VisualRegistry,
};
use displayctl_rs::registry::ColorTableRegistry;
use displayctl_rs::types::{Color, ColorTable, Range};
use displayctl_rs::units::Unit;
use displayctl_rs::visual::{RecordingVisual, VisualKind};
use std::sync::atomic::AtomicBool;

fn registry(size: usize) -> VisualRegistry {
    let mut registry = VisualRegistry::new();
    for i in 0..size {
        // Alternate line and surface visuals so every category has takers
        let (kind, flags) = if i % 2 == 0 {
            (
                VisualKind::ContourLines,
                AttributeSet::of(&[
                    AttributeFlag::Color,
                    AttributeFlag::Contour,
                    AttributeFlag::LineWidth,
                    AttributeFlag::DisplayUnit,
                ]),
            )
        } else {
            (
                VisualKind::ColorFilledSurface,
                AttributeSet::of(&[
                    AttributeFlag::ColorTable,
                    AttributeFlag::Range,
                    AttributeFlag::SelectRange,
                    AttributeFlag::ZPosition,
                    AttributeFlag::Smoothing,
                ]),
            )
        };
        registry.add(FlaggedVisual::new(
            RecordingVisual::shared(kind, format!("visual {}", i)),
            flags,
        ));
    }
    registry
}

fn defaults() -> AttributeDefaults {
    AttributeDefaults {
        color: Some(Color::CYAN),
        color_table: ColorTableRegistry::with_builtins().default_table(),
        range: Some(Range::new(250.0, 310.0)),
        range_unit: None,
        display_unit: Unit::parse("K").ok(),
    }
}

fn bench_single_category(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_color");

    for size in [8, 64, 512].iter() {
        let registry = registry(*size);
        let defaults = defaults();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let mut state = AttributeState {
                color: Some(Color::RED),
                ..Default::default()
            };
            b.iter(|| {
                let propagator = Propagator::new(&registry, &defaults);
                black_box(propagator.apply(AttributeFlag::Color, &mut state))
            })
        });
    }

    group.finish();
}

fn bench_full_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_refresh");
    let removed = AtomicBool::new(false);

    for size in [8, 64, 512].iter() {
        let registry = registry(*size);
        let defaults = defaults();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let mut state = AttributeState::default();
            b.iter(|| {
                let propagator = Propagator::new(&registry, &defaults);
                black_box(propagator.apply_all(&mut state, &[], &removed))
            })
        });
    }

    group.finish();
}

fn bench_dimmed_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("dimmed_table");

    for steps in [16, 256, 4096].iter() {
        let table = ColorTable::ramp("bench", [0.0, 0.0, 1.0, 1.0], [1.0, 0.0, 0.0, 1.0], *steps);
        group.throughput(Throughput::Elements(*steps as u64));
        group.bench_with_input(BenchmarkId::from_parameter(steps), steps, |b, _| {
            b.iter(|| black_box(table.dimmed(black_box(0.6))))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_category,
    bench_full_refresh,
    bench_dimmed_table
);
criterion_main!(benches);
