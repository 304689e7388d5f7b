//! Chart model rebuilt from the sample buffers on every refresh.

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::sim::driver::recorder::{Recorder, SampleSeries, SeriesKind};

use super::config::{ChartConfig, Rgb};

/// One subplot: a single line under its own title. Axes autoscale in the
/// viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// Series nickname.
    pub key: String,
    /// Subplot title, also the root of the panel's entity path.
    pub title: String,
    /// Legend label of the line.
    pub label: String,
    pub color: Rgb,
    pub x: Vec<NaiveDateTime>,
    pub y: Vec<f64>,
}

impl Panel {
    fn from_series(series: &SampleSeries, config: &ChartConfig) -> Self {
        let (title, label, color) = match series.kind {
            SeriesKind::Outdoor => (
                "Outdoor Air Temperature".to_string(),
                "Outdoor Air Temp".to_string(),
                config.outdoor_color,
            ),
            SeriesKind::Zone => {
                let name = capitalize(&series.nickname);
                (
                    format!("{name} Zone Air Temperature"),
                    format!("{name} Zone Temp"),
                    config.zone_color,
                )
            }
        };

        Self {
            key: series.nickname.clone(),
            title,
            label,
            color,
            x: series.timestamps(),
            y: series.values(),
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Full chart state for one refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartFrame {
    pub panels: Vec<Panel>,
}

impl ChartFrame {
    /// Projects every buffer to x/y.
    pub fn from_recorder(recorder: &Recorder, config: &ChartConfig) -> Self {
        Self {
            panels: recorder
                .series()
                .iter()
                .map(|s| Panel::from_series(s, config))
                .collect(),
        }
    }
}

/// Destination of chart frames (a live viewer, or nothing).
pub trait ChartSink {
    fn present(&mut self, frame: &ChartFrame) -> Result<()>;
}

/// Discards frames.
#[derive(Debug, Default)]
pub struct NullSink;

impl ChartSink for NullSink {
    fn present(&mut self, _frame: &ChartFrame) -> Result<()> {
        Ok(())
    }
}

pub struct Chart {
    config: ChartConfig,
    sink: Box<dyn ChartSink>,
    refreshes: usize,
}

impl Chart {
    pub fn new<S: ChartSink + 'static>(config: ChartConfig, sink: S) -> Self {
        Self {
            config,
            sink: Box::new(sink),
            refreshes: 0,
        }
    }

    /// Chart that builds frames but shows nothing.
    pub fn headless() -> Self {
        Self::new(ChartConfig::default(), NullSink)
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Rebuilds the frame from the current buffers and presents it.
    pub fn refresh(&mut self, recorder: &Recorder) -> Result<()> {
        let frame = ChartFrame::from_recorder(recorder, &self.config);
        self.sink.present(&frame)?;
        self.refreshes += 1;
        Ok(())
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::driver::recorder::Sample;
    use chrono::{NaiveDate, TimeDelta};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder_with(values: &[(f64, f64)]) -> Recorder {
        let start = NaiveDate::from_ymd_opt(2024, 7, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut rec = Recorder::new(["outdoor", "south"]);
        for (i, (o, z)) in values.iter().enumerate() {
            let timestamp = start + TimeDelta::minutes(15 * (i as i64 + 1));
            rec.push(0, Sample { timestamp, value: *o }).unwrap();
            rec.push(1, Sample { timestamp, value: *z }).unwrap();
        }
        rec
    }

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<ChartFrame>>>);

    impl ChartSink for Capture {
        fn present(&mut self, frame: &ChartFrame) -> Result<()> {
            self.0.borrow_mut().push(frame.clone());
            Ok(())
        }
    }

    #[test]
    fn test_frame_projects_each_series() {
        let rec = recorder_with(&[(10.0, 20.0), (30.0, 20.0)]);
        let config = ChartConfig::default();
        let frame = ChartFrame::from_recorder(&rec, &config);

        assert_eq!(frame.panels.len(), 2);
        let outdoor = &frame.panels[0];
        assert_eq!(outdoor.title, "Outdoor Air Temperature");
        assert_eq!(outdoor.label, "Outdoor Air Temp");
        assert_eq!(outdoor.color, config.outdoor_color);
        assert_eq!(outdoor.y, vec![10.0, 30.0]);
        assert_eq!(outdoor.x[0].to_string(), "2024-07-07 00:15:00");

        let south = &frame.panels[1];
        assert_eq!(south.title, "South Zone Air Temperature");
        assert_eq!(south.label, "South Zone Temp");
        assert_eq!(south.color, config.zone_color);
        assert_eq!(south.y, vec![20.0, 20.0]);
    }

    #[test]
    fn test_empty_buffers_give_empty_panels() {
        let rec = Recorder::new(["outdoor"]);
        let frame = ChartFrame::from_recorder(&rec, &ChartConfig::default());
        assert!(frame.panels[0].is_empty());
        assert_eq!(frame.panels[0].len(), 0);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let rec = recorder_with(&[(12.0, 21.0), (14.0, 21.5), (13.0, 22.0)]);
        let capture = Capture::default();
        let mut chart = Chart::new(ChartConfig::default(), capture.clone());

        chart.refresh(&rec).unwrap();
        chart.refresh(&rec).unwrap();

        let frames = capture.0.borrow();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frames[1]);
        assert_eq!(chart.refreshes(), 2);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("south"), "South");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("élan"), "Élan");
    }
}
