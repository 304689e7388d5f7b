use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rerun as rr;

use super::chart::{ChartFrame, ChartSink, Panel};
use super::config::ChartConfig;

/// Where a live chart session sends its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Spawn (or connect to) a local Rerun viewer.
    Spawn,
    /// Write an `.rrd` recording to disk.
    Save(PathBuf),
    /// Keep everything in memory (tests).
    Buffered,
}

pub fn start_session(config: &ChartConfig, viewer: &Viewer) -> Result<rr::RecordingStream> {
    let builder = rr::RecordingStreamBuilder::new(config.application_id.as_str());
    let session = match viewer {
        // Connects to the viewer's gRPC server on localhost:9876, spawning it if needed.
        Viewer::Spawn => builder.spawn()?,
        Viewer::Save(path) => builder.save(path)?,
        Viewer::Buffered => builder.buffered()?,
    };
    Ok(session)
}

/// Streams chart frames to Rerun as time series.
///
/// Every panel is logged under its own top-level entity named after the panel
/// title, so the viewer builds one time series view per panel. Series styles
/// are logged once as static data. Each refresh sends only the points the
/// viewer has not seen yet, so refreshing unchanged buffers logs nothing.
pub struct RerunChart {
    session: rr::RecordingStream,
    config: ChartConfig,
    // Points already logged, keyed by panel key.
    logged: HashMap<String, usize>,
}

impl RerunChart {
    pub fn new(session: rr::RecordingStream, config: ChartConfig) -> Self {
        Self {
            session,
            config,
            logged: HashMap::new(),
        }
    }

    /// Number of points sent so far for the panel with `key`.
    pub fn logged_points(&self, key: &str) -> usize {
        self.logged.get(key).copied().unwrap_or(0)
    }

    /// `<panel title>/<series name>`.
    pub fn entity_path(&self, panel: &Panel) -> rr::EntityPath {
        rr::EntityPath::from(vec![
            rr::EntityPathPart::from(panel.title.as_str()),
            rr::EntityPathPart::from(self.config.series_name.as_str()),
        ])
    }

    fn log_style(&self, path: &rr::EntityPath, panel: &Panel) -> Result<()> {
        self.session.log_static(
            path.clone(),
            &rr::SeriesLines::new()
                .with_colors([panel.color])
                .with_names([panel.label.as_str()])
                .with_widths([self.config.line_width]),
        )?;
        Ok(())
    }

    fn log_points(&self, path: &rr::EntityPath, panel: &Panel, from: usize) -> Result<()> {
        for (i, (x, y)) in panel.x.iter().zip(panel.y.iter()).enumerate().skip(from) {
            self.session
                .set_time_sequence(self.config.step_timeline.as_str(), i as i64 + 1);
            self.session.set_time(
                self.config.time_timeline.as_str(),
                rr::TimeCell::from_timestamp_nanos_since_epoch(nanos_since_epoch(*x)?),
            );
            self.session.log(path.clone(), &rr::Scalars::new([*y]))?;
        }
        Ok(())
    }
}

/// Simulation datetime as UTC nanoseconds since the Unix epoch.
pub fn nanos_since_epoch(t: NaiveDateTime) -> Result<i64> {
    t.and_utc()
        .timestamp_nanos_opt()
        .with_context(|| format!("Timestamp out of range for the time timeline: {t}"))
}

impl ChartSink for RerunChart {
    fn present(&mut self, frame: &ChartFrame) -> Result<()> {
        for panel in &frame.panels {
            let path = self.entity_path(panel);
            let sent = match self.logged.get(&panel.key) {
                Some(&n) => n,
                None => {
                    self.log_style(&path, panel)?;
                    0
                }
            };
            // A shorter buffer means a new run started; send everything again.
            let from = if panel.len() < sent { 0 } else { sent };
            self.log_points(&path, panel, from)?;
            self.logged.insert(panel.key.clone(), panel.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::chart::Chart;
    use crate::sim::driver::recorder::{Recorder, Sample};
    use chrono::{NaiveDate, TimeDelta};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn buffered_chart() -> RerunChart {
        let config = ChartConfig::default();
        let session = start_session(&config, &Viewer::Buffered).unwrap();
        RerunChart::new(session, config)
    }

    fn push_step(rec: &mut Recorder, step: i64, outdoor: f64, zone: f64) {
        let timestamp = start() + TimeDelta::minutes(15 * step);
        rec.push(0, Sample { timestamp, value: outdoor }).unwrap();
        rec.push(1, Sample { timestamp, value: zone }).unwrap();
    }

    #[test]
    fn test_present_logs_each_point_once() {
        let mut sink = buffered_chart();
        let config = ChartConfig::default();
        let mut rec = Recorder::new(["outdoor", "south"]);

        push_step(&mut rec, 1, 15.0, 21.0);
        push_step(&mut rec, 2, 15.0, 20.8);
        sink.present(&ChartFrame::from_recorder(&rec, &config)).unwrap();
        assert_eq!(sink.logged_points("outdoor"), 2);
        assert_eq!(sink.logged_points("south"), 2);

        // Unchanged buffers: nothing new to send.
        sink.present(&ChartFrame::from_recorder(&rec, &config)).unwrap();
        assert_eq!(sink.logged_points("south"), 2);

        push_step(&mut rec, 3, 15.0, 20.6);
        sink.present(&ChartFrame::from_recorder(&rec, &config)).unwrap();
        assert_eq!(sink.logged_points("outdoor"), 3);

        // A cleared recorder restarts the count.
        rec.clear();
        push_step(&mut rec, 1, 16.0, 22.0);
        sink.present(&ChartFrame::from_recorder(&rec, &config)).unwrap();
        assert_eq!(sink.logged_points("outdoor"), 1);
    }

    #[test]
    fn test_each_panel_gets_its_own_root() {
        let sink = buffered_chart();
        let config = ChartConfig::default();
        let mut rec = Recorder::new(["outdoor", "south", "west"]);
        push_step(&mut rec, 1, 15.0, 21.0);
        let frame = ChartFrame::from_recorder(&rec, &config);

        let paths: Vec<rr::EntityPath> = frame.panels.iter().map(|p| sink.entity_path(p)).collect();
        let expected = |root: &str| {
            rr::EntityPath::from(vec![
                rr::EntityPathPart::from(root),
                rr::EntityPathPart::from("temperature"),
            ])
        };
        assert_eq!(paths[0], expected("Outdoor Air Temperature"));
        assert_eq!(paths[1], expected("South Zone Air Temperature"));
        assert_eq!(paths[2], expected("West Zone Air Temperature"));
        let roots: std::collections::HashSet<&str> =
            frame.panels.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(roots.len(), 3);
    }

    #[test]
    fn test_time_timeline_uses_sim_datetime_as_utc() {
        // 2024-07-07 00:15:00 UTC
        let t = start() + TimeDelta::minutes(15);
        assert_eq!(nanos_since_epoch(t).unwrap(), 1_720_311_300_000_000_000);
        assert!(nanos_since_epoch(NaiveDateTime::MAX).is_err());
    }

    #[test]
    fn test_chart_with_rerun_sink_is_ok() {
        let sink = buffered_chart();
        let mut chart = Chart::new(ChartConfig::default(), sink);
        let mut rec = Recorder::new(["outdoor", "north"]);
        for step in 1..=8 {
            push_step(&mut rec, step, 10.0 + step as f64, 20.0);
            chart.refresh(&rec).unwrap();
        }
        assert_eq!(chart.refreshes(), 8);
    }

    #[test]
    fn test_save_viewer_writes_file() {
        let path = std::env::temp_dir().join(format!("eplus-live-{}.rrd", std::process::id()));
        let config = ChartConfig::default();
        let session = start_session(&config, &Viewer::Save(path.clone())).unwrap();
        let mut sink = RerunChart::new(session, config.clone());
        let mut rec = Recorder::new(["outdoor"]);
        rec.push(
            0,
            Sample {
                timestamp: start() + TimeDelta::minutes(15),
                value: 15.0,
            },
        )
        .unwrap();
        sink.present(&ChartFrame::from_recorder(&rec, &config)).unwrap();
        // Dropping the stream flushes the file sink.
        drop(sink);
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }
}
