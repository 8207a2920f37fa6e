//! Integration tests for data references, data changes and the time driver

mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::builders::HarnessBuilder;
use common::{test_timeout, wait_until};
use displayctl_rs::control::{BasicBehavior, ControlEvent};
use displayctl_rs::data::{DataReference, ReplaceOutcome, SampledData};
use displayctl_rs::types::Range;
use displayctl_rs::units::Unit;
use serial_test::serial;

fn forecast_times(count: i64) -> Vec<chrono::DateTime<Utc>> {
    let run = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..count).map(|h| run + ChronoDuration::hours(6 * h)).collect()
}

#[test]
fn test_same_name_keeps_unit_and_range() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[270.0, 280.0, 290.0], "K")
        .build();
    let control = harness.ready(BasicBehavior::plan_view("T"), DataReference::new("T"));
    control.set_range(Range::new(250.0, 260.0));
    control.set_display_unit(Unit::parse("C").unwrap()).unwrap();
    let before = control.attributes();

    let outcome = control
        .set_data_references(vec![DataReference::new("T").with_source("rerun")])
        .unwrap();

    assert_eq!(outcome, ReplaceOutcome::PreserveOverrides);
    let after = control.attributes();
    assert_eq!(after.display_unit, before.display_unit);
    assert_eq!(after.range, before.range);
    assert_eq!(after.select_range, before.select_range);
}

#[test]
fn test_unrelated_data_rederives_unit_and_range() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[270.0, 280.0, 290.0], "K")
        .dataset("Z500", &[5200.0, 5760.0], "m")
        .build();
    let control = harness.ready(BasicBehavior::plan_view("T"), DataReference::new("T"));
    control.set_range(Range::new(250.0, 260.0));
    control.set_display_unit(Unit::parse("C").unwrap()).unwrap();

    let outcome = control
        .set_data_references(vec![DataReference::new("Z500")])
        .unwrap();

    assert_eq!(outcome, ReplaceOutcome::ClearOverrides);
    let attrs = control.attributes();
    assert_eq!(attrs.display_unit, Some(Unit::parse("m").unwrap()));
    assert_eq!(attrs.range, Some(Range::new(5200.0, 5760.0)));
    assert_eq!(
        harness.visual("T surface").snapshot().range,
        Some(Range::new(5200.0, 5760.0))
    );
}

#[test]
fn test_failed_replacement_keeps_current_data() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[270.0, 280.0, 290.0], "K")
        .build();
    let control = harness.ready(BasicBehavior::plan_view("T"), DataReference::new("T"));
    control.set_range(Range::new(250.0, 260.0));
    let events = control.subscribe();

    let err = control
        .set_data_references(vec![DataReference::new("Z500")])
        .unwrap_err();

    assert!(err.is_data_unavailable());
    assert!(control.state().is_ready());
    assert_eq!(control.data_references()[0].name, "T");
    assert_eq!(control.data_instance_count(), 1);
    assert_eq!(control.attributes().range, Some(Range::new(250.0, 260.0)));
    assert_eq!(
        harness.visual("T surface").snapshot().range,
        Some(Range::new(250.0, 260.0))
    );
    assert!(events
        .try_iter()
        .any(|e| matches!(e, ControlEvent::Failure { .. })));
}

#[test]
fn test_data_change_refreshes_in_place() {
    let harness = HarnessBuilder::new()
        .dataset("T", &[270.0, 280.0], "K")
        .build();
    let reference = DataReference::new("T");
    let control = harness.ready(BasicBehavior::plan_view("T"), reference.clone());
    let events = control.subscribe();
    let surface = harness.visual("T surface");
    let visuals = control.visual_ids();

    harness.resolver.update(
        &reference,
        SampledData::new(vec![260.0, 270.0, 280.0, 290.0]).with_unit(Unit::parse("K").unwrap()),
    );
    harness.settle();

    assert_eq!(surface.snapshot().data_points, Some(4));
    assert_eq!(control.visual_ids(), visuals);
    assert_eq!(harness.factory.created().len(), 1);
    assert!(events
        .try_iter()
        .any(|e| e == ControlEvent::DataChanged(control.id())));
}

#[test]
#[serial]
fn test_driver_data_change_reloads_consumers() {
    let times = forecast_times(4);
    let harness = HarnessBuilder::new()
        .data(
            "Z500",
            SampledData::new(vec![5200.0, 5480.0, 5760.0])
                .with_unit(Unit::parse("m").unwrap())
                .with_times(times.clone()),
        )
        .data(
            "T",
            SampledData::new(vec![270.0, 280.0])
                .with_unit(Unit::parse("K").unwrap())
                .with_times(times.clone()),
        )
        .build();

    let consumer = harness.ready(BasicBehavior::plan_view("T"), DataReference::new("T"));
    consumer.set_uses_time_driver(true).unwrap();
    let heights = DataReference::new("Z500");
    let driver = harness.ready(BasicBehavior::contour_plot("Z500"), heights.clone());
    driver.become_time_driver().unwrap();
    harness.settle();
    assert!(driver.is_time_driver());
    let before = harness.resolver.resolve_count("T");

    harness.resolver.update(
        &heights,
        SampledData::new(vec![5100.0, 5700.0])
            .with_unit(Unit::parse("m").unwrap())
            .with_times(times),
    );

    assert!(wait_until(test_timeout(), || {
        harness.resolver.resolve_count("T") > before
    }));
    harness.settle();
    assert_eq!(driver.animation_times().len(), 4);
}

#[test]
fn test_second_driver_revokes_the_first() {
    let harness = HarnessBuilder::new()
        .data(
            "T",
            SampledData::new(vec![1.0]).with_times(forecast_times(2)),
        )
        .build();
    let first = harness.ready(BasicBehavior::contour_plot("T"), DataReference::new("T"));
    let second = harness.ready(BasicBehavior::contour_plot("T"), DataReference::new("T"));
    let events = first.subscribe();

    first.become_time_driver().unwrap();
    let revoked = second.become_time_driver().unwrap();

    assert_eq!(revoked, Some(first.id()));
    assert!(second.is_time_driver());
    assert!(wait_until(test_timeout(), || !first.is_time_driver()));
    harness.settle();
    assert!(events
        .try_iter()
        .any(|e| e == ControlEvent::TimeDriverRevoked(first.id())));
}
