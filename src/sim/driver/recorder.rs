use chrono::NaiveDateTime;

use super::error::DriverError;

/// One reading of a tracked quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    /// Temperature in °C.
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Outdoor,
    Zone,
}

/// Append-only, time-ordered buffer for one tracked quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    pub nickname: String,
    pub kind: SeriesKind,
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new(nickname: &str, kind: SeriesKind) -> Self {
        Self {
            nickname: nickname.to_string(),
            kind,
            samples: Vec::new(),
        }
    }

    /// Appends a sample; timestamps must not go backwards.
    pub fn push(&mut self, sample: Sample) -> Result<(), DriverError> {
        if let Some(last) = self.samples.last() {
            if sample.timestamp < last.timestamp {
                return Err(DriverError::NonMonotonicSample {
                    series: self.nickname.clone(),
                    last: last.timestamp,
                    next: sample.timestamp,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.samples.iter().map(|s| s.value).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Sample buffers for one run: outdoor air first, then one per zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorder {
    series: Vec<SampleSeries>,
}

impl Recorder {
    /// Creates empty buffers; the first nickname is the outdoor series.
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(nicknames: I) -> Self {
        let series = nicknames
            .into_iter()
            .enumerate()
            .map(|(i, n)| {
                let kind = if i == 0 {
                    SeriesKind::Outdoor
                } else {
                    SeriesKind::Zone
                };
                SampleSeries::new(n, kind)
            })
            .collect();
        Self { series }
    }

    /// Appends to the series at `index` (same order as construction).
    pub fn push(&mut self, index: usize, sample: Sample) -> anyhow::Result<()> {
        let Some(series) = self.series.get_mut(index) else {
            anyhow::bail!("Recorder::push: no series at index {index}");
        };
        series.push(sample)?;
        Ok(())
    }

    pub fn series(&self) -> &[SampleSeries] {
        &self.series
    }

    pub fn get(&self, nickname: &str) -> Option<&SampleSeries> {
        self.series.iter().find(|s| s.nickname == nickname)
    }

    pub fn outdoor(&self) -> Option<&SampleSeries> {
        self.series.first()
    }

    pub fn zones(&self) -> &[SampleSeries] {
        self.series.get(1..).unwrap_or_default()
    }

    /// Number of samples in the longest buffer.
    pub fn len(&self) -> usize {
        self.series.iter().map(SampleSeries::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all samples, keeping the series layout.
    pub fn clear(&mut self) {
        for s in self.series.iter_mut() {
            s.samples.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 7)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    #[test]
    fn test_push_rejects_going_backwards() {
        let mut s = SampleSeries::new("south", SeriesKind::Zone);
        s.push(Sample {
            timestamp: at(1, 0),
            value: 20.0,
        })
        .unwrap();
        // Equal timestamps are allowed.
        s.push(Sample {
            timestamp: at(1, 0),
            value: 20.5,
        })
        .unwrap();
        let err = s
            .push(Sample {
                timestamp: at(0, 45),
                value: 21.0,
            })
            .unwrap_err();
        assert!(matches!(err, DriverError::NonMonotonicSample { .. }));
        assert_eq!(s.len(), 2);
        assert_eq!(s.values(), vec![20.0, 20.5]);
        assert_eq!(s.min_max(), Some((20.0, 20.5)));
    }

    #[test]
    fn test_recorder_layout() {
        let mut rec = Recorder::new(["outdoor", "south", "west"]);
        assert!(rec.is_empty());
        assert_eq!(rec.outdoor().unwrap().kind, SeriesKind::Outdoor);
        assert_eq!(rec.zones().len(), 2);
        assert!(rec.zones().iter().all(|z| z.kind == SeriesKind::Zone));

        rec.push(
            2,
            Sample {
                timestamp: at(0, 15),
                value: 23.0,
            },
        )
        .unwrap();
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.get("west").unwrap().len(), 1);
        assert!(rec.get("south").unwrap().is_empty());
        assert!(
            rec.push(
                3,
                Sample {
                    timestamp: at(0, 15),
                    value: 0.0
                }
            )
            .is_err()
        );

        rec.clear();
        assert!(rec.is_empty());
        assert_eq!(rec.series().len(), 3);
    }

    #[test]
    fn test_empty_recorder_has_no_zones() {
        let rec = Recorder::default();
        assert!(rec.outdoor().is_none());
        assert!(rec.zones().is_empty());
    }
}
