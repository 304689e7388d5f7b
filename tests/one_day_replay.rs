use eplus_live::draw::chart::Chart;
use eplus_live::draw::config::ChartConfig;
use eplus_live::draw::rerun::{RerunChart, Viewer, start_session};
use eplus_live::sim::driver::{DriverError, OutdoorOverride, RunConfig, ZoneSpec, run_simulation};
use eplus_live::sim::epw_writer::create_epw_file;
use eplus_live::sim::replay::{ReplayConfig, ReplayEngine};
use eplus_live::sim::weather::WeatherData;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("eplus-live-it-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn replay_engine_for(config: &RunConfig) -> ReplayEngine {
    let names: Vec<&str> = config.zones.iter().map(|z| z.name.as_str()).collect();
    ReplayEngine::new(ReplayConfig::for_zones(&names))
}

fn preset_in(dir: &PathBuf, mut config: RunConfig) -> RunConfig {
    config.weather_file = dir.join("weather.epw");
    config.output_dir = dir.join("eplus_out");
    config.seed = Some(42);
    create_epw_file(&config.weather_file, 30.0, 5.0).unwrap();
    config
}

#[test]
fn five_zone_day_fills_every_buffer() {
    let dir = scratch_dir("five");
    let config = preset_in(&dir, RunConfig::five_zone_demand_limit());
    let mut engine = replay_engine_for(&config);

    let summary = run_simulation(&mut engine, &config, Chart::headless()).unwrap();

    let rec = &summary.recorder;
    assert_eq!(rec.series().len(), 6);
    assert!(rec.series().iter().all(|s| s.len() == 96));
    assert!(rec.outdoor().unwrap().values().iter().all(|v| *v == 15.0));

    let first = rec.outdoor().unwrap().samples()[0].timestamp;
    assert_eq!(first.to_string(), "2024-07-07 00:15:00");
    for s in rec.series() {
        let ts = s.timestamps();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]), "{} not ordered", s.nickname);
    }
    // Zones with larger internal gains settle warmer.
    let south = *rec.get("south").unwrap().values().last().unwrap();
    let center = *rec.get("center").unwrap().values().last().unwrap();
    assert!(center > south);
    assert!(engine.severe_messages().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn one_zone_random_override_stays_in_band() {
    let dir = scratch_dir("one");
    let config = preset_in(&dir, RunConfig::one_zone_random_oat());
    let mut engine = replay_engine_for(&config);

    let summary = run_simulation(&mut engine, &config, Chart::headless()).unwrap();
    let outdoor = summary.recorder.outdoor().unwrap().values();
    assert_eq!(outdoor.len(), 96);
    assert!(outdoor.iter().all(|v| (10.0..=35.0).contains(v)));
    // Not a constant sequence.
    assert!(outdoor.iter().any(|v| *v != outdoor[0]));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_zone_is_a_fatal_handle_error() {
    let dir = scratch_dir("missing");
    let config = preset_in(&dir, RunConfig::five_zone_demand_limit());
    // The engine only knows four of the five zones.
    let names = ["SPACE1-1", "SPACE2-1", "SPACE3-1", "SPACE4-1"];
    let mut engine = ReplayEngine::new(ReplayConfig::for_zones(&names));

    let err = run_simulation(&mut engine, &config, Chart::headless()).unwrap_err();
    match err.downcast_ref::<DriverError>() {
        Some(DriverError::UnresolvedHandles { nicknames }) => assert_eq!(nicknames, &["center"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.severe_messages().len(), 1);
    assert!(engine.severe_messages()[0].contains("center"));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn weather_file_round_trips_through_reader() {
    let dir = scratch_dir("epw");
    let path = dir.join("weather.epw");
    let written = create_epw_file(&path, 20.0, 3.0).unwrap();

    let weather = WeatherData::read_epw(&path).unwrap();
    assert_eq!(weather.num_hours(), 24);
    assert!(weather.location.contains("MINNEAPOLIS"));
    for (w, r) in written.iter().zip(weather.records.iter()) {
        assert_eq!(w.hour, r.hour);
        assert!((w.dry_bulb_temperature - r.dry_bulb_temperature).abs() < 1e-9);
        assert!((r.dew_point_temperature - (r.dry_bulb_temperature - 3.0)).abs() < 1e-6);
    }
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn run_streams_into_a_rerun_recording() {
    let dir = scratch_dir("rrd");
    let mut config = preset_in(&dir, RunConfig::new());
    config.zones = vec![ZoneSpec::new("zone", "Zone One")];
    config.outdoor_override = OutdoorOverride::Constant { value_c: 18.0 };

    let chart_config = ChartConfig::default();
    let session = start_session(&chart_config, &Viewer::Buffered).unwrap();
    let sink = RerunChart::new(session, chart_config.clone());
    let chart = Chart::new(chart_config, sink);

    let mut engine = replay_engine_for(&config);
    let summary = run_simulation(&mut engine, &config, chart).unwrap();
    assert_eq!(summary.timesteps, 96);
    std::fs::remove_dir_all(&dir).ok();
}
