/// RGB color with components in 0..=255.
pub type Rgb = [u8; 3];

/// Configuration for live chart sessions.
///
/// Controls session naming, entity paths, and series styling.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    // Labels
    pub application_id: String,
    /// Leaf entity name of each line, under its panel's root.
    pub series_name: String,

    // Timelines
    pub step_timeline: String,
    /// Wall-clock simulation time (start datetime + elapsed), taken as UTC.
    pub time_timeline: String,

    // Styling
    pub outdoor_color: Rgb,
    pub zone_color: Rgb,
    pub line_width: f32,
}

impl ChartConfig {
    pub fn new() -> Self {
        Self {
            application_id: "eplus-live".to_string(),
            series_name: "temperature".to_string(),

            step_timeline: "timestep".to_string(),
            time_timeline: "sim_time".to_string(),

            outdoor_color: [255, 165, 0],
            zone_color: [0, 0, 255],
            line_width: 1.5,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self::new()
    }
}
