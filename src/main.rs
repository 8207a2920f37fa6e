//! displayctl - headless walkthrough of the display control framework
//!
//! Wires two controls to an in-memory view and data source, edits their
//! attributes, pans the camera, pushes a data update and tears everything
//! down again. Pass a config file path as the first argument to override
//! the default configuration.

use anyhow::Context;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use displayctl_rs::{
    config::FrameworkConfig,
    control::{BasicBehavior, ControlEnv, DisplayControl},
    data::{DataReference, DataSelection, MemoryResolver, SampledData},
    logging,
    types::LatLonBox,
    units::Unit,
    view::MemoryView,
    visual::RecordingFactory,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = FrameworkConfig::load_or_default(config_path.as_deref());

    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    tracing::info!("Starting displayctl demo");

    let run = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().context("Invalid run time")?;
    let times: Vec<_> = (0..4).map(|h| run + ChronoDuration::hours(6 * h)).collect();

    let resolver = Arc::new(MemoryResolver::new());
    resolver.insert(
        "T",
        SampledData::new(vec![268.0, 275.5, 283.0, 291.2])
            .with_unit(Unit::parse("K")?)
            .with_times(times.clone()),
    );
    resolver.insert(
        "Z500",
        SampledData::new(vec![5200.0, 5480.0, 5760.0])
            .with_unit(Unit::parse("m")?)
            .with_times(times),
    );

    let factory = Arc::new(RecordingFactory::new());
    let view = Arc::new(MemoryView::new("main").with_bounds(LatLonBox::new(20.0, 60.0, -130.0, -60.0)));
    let env = ControlEnv::new(config, resolver.clone(), factory.clone())?;

    // Plan view that follows the visible region
    let temperature = DataReference::new("T")
        .with_long_name("Air temperature")
        .with_source("demo model")
        .with_run_time(run);
    let plan = DisplayControl::new(Arc::new(BasicBehavior::plan_view("T")), env.clone());
    let events = plan.subscribe();
    plan.init(
        vec![temperature.clone()],
        view.clone(),
        None,
        DataSelection {
            use_view_bounds: true,
            ..Default::default()
        },
    )?;

    // Contours that drive the animation clock
    let heights = DataReference::new("Z500").with_long_name("500 hPa height");
    let contours = DisplayControl::new(Arc::new(BasicBehavior::contour_plot("Z500")), env.clone());
    contours.init(vec![heights], view.clone(), None, DataSelection::default())?;
    contours.become_time_driver()?;

    plan.set_color_table_by_name("Temperature")?;
    plan.set_dimness(0.6);
    plan.set_display_unit(Unit::parse("C")?)?;
    plan.set_legend_template("%shortname% (%displayunit%) +%fhour%h");
    contours.set_line_width(2.0);

    // A burst of camera moves settles into one reload
    for step in 0..5 {
        let shift = f64::from(step) * 2.0;
        view.set_bounds(LatLonBox::new(20.0 + shift, 60.0 + shift, -130.0, -60.0));
    }
    std::thread::sleep(env.config.debounce.to_config().delay * 3);

    resolver.update(
        &temperature,
        SampledData::new(vec![270.0, 279.5, 286.0, 293.4]).with_unit(Unit::parse("K")?),
    );
    env.workers.wait_idle(Duration::from_secs(5));

    for frame in plan.frame_labels() {
        tracing::info!("Frame label: {}", frame);
    }
    tracing::info!("Legend: {}", plan.legend_label());
    tracing::info!("Menu: {}", contours.menu_label());
    tracing::info!(
        "Time driver: {}",
        if contours.is_time_driver() { "contours" } else { "none" }
    );

    plan.save("demo.plan")?;
    contours.save_parameter_defaults()?;

    plan.remove();
    contours.remove();

    for event in events.try_iter() {
        tracing::debug!("Event: {:?}", event);
    }
    tracing::info!(
        "Created {} visual(s), {} left in view",
        factory.created().len(),
        view.visual_count()
    );
    Ok(())
}
