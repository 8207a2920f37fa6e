//! Integration tests for attribute propagation through a control

mod common;

use common::builders::HarnessBuilder;
use common::assert_float_eq;
use displayctl_rs::attributes::AttributeFlag;
use displayctl_rs::control::{BasicBehavior, VisualSpec};
use displayctl_rs::data::DataReference;
use displayctl_rs::types::{Color, ColorTable, ContourSpec, Range};
use displayctl_rs::units::Unit;
use displayctl_rs::visual::VisualKind;
use displayctl_rs::ControlError;
use proptest::prelude::*;

fn split_behavior() -> BasicBehavior {
    BasicBehavior::new("split")
        .with_visual(VisualSpec::new(VisualKind::Lines, "outline", &[AttributeFlag::Color]))
        .with_visual(VisualSpec::new(
            VisualKind::ColorFilledSurface,
            "fill",
            &[AttributeFlag::ColorTable],
        ))
}

fn sample_table() -> ColorTable {
    ColorTable::ramp("sample", [0.0, 0.2, 1.0, 1.0], [1.0, 0.8, 0.0, 0.5], 8)
}

#[test]
fn test_color_only_reaches_color_visuals() {
    let harness = HarnessBuilder::new().dataset("T", &[1.0, 2.0], "K").build();
    let control = harness.ready(split_behavior(), DataReference::new("T"));
    let outline = harness.visual("outline");
    let fill = harness.visual("fill");
    let fill_before = fill.snapshot();

    let report = control.set_color(Color::RED);

    assert_eq!(report.pushed, 1);
    assert_eq!(outline.snapshot().color, Some(Color::RED));
    assert_eq!(fill.snapshot().color, None);
    assert_eq!(fill.snapshot().color_table, fill_before.color_table);
    assert_eq!(
        fill.push_count(AttributeFlag::ColorTable),
        fill_before.pushes.get(&AttributeFlag::ColorTable).copied().unwrap_or(0)
    );
}

#[test]
fn test_rejected_color_falls_back_for_every_visual() {
    let harness = HarnessBuilder::new().dataset("T", &[1.0, 2.0], "K").build();
    let behavior = split_behavior().with_visual(VisualSpec::new(
        VisualKind::Lines,
        "second outline",
        &[AttributeFlag::Color],
    ));
    let control = harness.ready(behavior, DataReference::new("T"));
    let initial = control.attributes().color;
    harness.visual("outline").reject(AttributeFlag::Color);

    let report = control.set_color(Color::BLUE);

    assert!(report.fell_back);
    assert_eq!(report.failures, 1);
    assert_eq!(report.pushed, 1);
    assert_eq!(control.attributes().color, initial);
    assert_eq!(harness.visual("second outline").snapshot().color, initial);
}

#[test]
fn test_dimness_scales_the_pushed_table() {
    let harness = HarnessBuilder::new().dataset("T", &[1.0, 2.0], "K").build();
    let control = harness.ready(split_behavior(), DataReference::new("T"));
    let fill = harness.visual("fill");
    let table = sample_table();

    control.set_color_table(table.clone());
    control.set_dimness(0.5);
    assert_eq!(fill.snapshot().color_table, Some(table.dimmed(0.5)));
    assert_eq!(control.attributes().color_table, Some(table.clone()));

    control.set_dimness(1.0);
    assert_eq!(fill.snapshot().color_table, Some(table));
}

#[test]
fn test_dimness_is_clamped() {
    let harness = HarnessBuilder::new().dataset("T", &[1.0, 2.0], "K").build();
    let control = harness.ready(split_behavior(), DataReference::new("T"));

    control.set_dimness(0.0);
    assert_float_eq(f64::from(control.attributes().dimness()), 0.1, 1e-6);
    control.set_dimness(3.0);
    assert_float_eq(f64::from(control.attributes().dimness()), 1.0, 1e-6);
}

#[test]
fn test_display_unit_converts_range_and_contour() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[273.15, 283.15, 293.15], "K")
        .build();
    let control = harness.ready(BasicBehavior::contour_plot("T"), DataReference::new("T"));
    control.set_range(Range::new(273.15, 293.15));
    control.set_contour(ContourSpec::parse("5;273.15;273.15;293.15").unwrap());

    control.set_display_unit(Unit::parse("C").unwrap()).unwrap();

    let attrs = control.attributes();
    assert_eq!(attrs.display_unit.map(|u| u.name), Some("C".to_string()));
    let range = attrs.range.unwrap();
    assert_float_eq(range.min, 0.0, 1e-9);
    assert_float_eq(range.max, 20.0, 1e-9);
    let contour = attrs.contour.unwrap();
    assert_float_eq(contour.interval, 5.0, 1e-9);
    assert_float_eq(contour.base, 0.0, 1e-9);
    let pushed = harness.visual("T contours").snapshot().contour.unwrap();
    assert_float_eq(pushed.max, 20.0, 1e-9);
}

#[test]
fn test_incompatible_contour_unit_rolls_back() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[270.0, 280.0, 290.0], "K")
        .build();
    let control = harness.ready(BasicBehavior::contour_plot("T"), DataReference::new("T"));
    let mut contour = ContourSpec::parse("10;0;0;100").unwrap();
    contour.unit = Some("m".to_string());
    control.set_contour(contour);
    let before = control.attributes();

    let err = control.set_display_unit(Unit::parse("C").unwrap()).unwrap_err();

    assert!(matches!(err, ControlError::UnitChangeRejected { .. }));
    let after = control.attributes();
    assert_eq!(after.display_unit, before.display_unit);
    assert_eq!(after.contour, before.contour);
    assert_eq!(after.range, before.range);
}

#[test]
fn test_rejected_unit_rolls_back() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[270.0, 280.0, 290.0], "K")
        .build();
    let control = harness.ready(BasicBehavior::contour_plot("T"), DataReference::new("T"));
    let visual = harness.visual("T contours");
    visual.reject_unit("F");
    let before = control.attributes();

    let result = control.set_display_unit(Unit::parse("F").unwrap());

    assert!(result.is_err());
    assert_eq!(control.attributes().display_unit, before.display_unit);
    assert_eq!(control.attributes().range, before.range);
    assert_eq!(
        visual.snapshot().display_unit,
        Some(before.display_unit.clone())
    );
}

proptest! {
    #[test]
    fn test_dimming_round_trip(
        dimness in 0.1f32..=1.0,
        entries in prop::collection::vec(prop::array::uniform4(0.0f32..=1.0), 1..16),
    ) {
        let table = ColorTable::new("prop", entries);
        let restored = table.dimmed(dimness).dimmed(1.0 / dimness);

        for (original, back) in table.entries.iter().zip(&restored.entries) {
            for channel in 0..3 {
                prop_assert!((original[channel] - back[channel]).abs() < 1e-4);
            }
            prop_assert_eq!(original[3], back[3]);
        }
    }
}
