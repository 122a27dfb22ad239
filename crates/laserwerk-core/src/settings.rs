// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings payload model.
//
// Jobs arrive with a JSON settings document describing global options and a
// list of processes to run over the markup. Process objects are internally
// tagged with `_of` (`vector_process` / `raster_process`), as are filters
// (`color_filter`). Unknown fields are tolerated so newer host applications
// can talk to older engines.

use serde::{Deserialize, Serialize};

use crate::error::{LaserwerkError, Result};

/// Global job settings plus the process list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Firmware generation the stream should target, when the host knows it.
    #[serde(default)]
    pub firmware_version: Option<String>,

    #[serde(default)]
    pub autofocus: Autofocus,

    #[serde(default = "default_copies")]
    pub copies: u32,

    #[serde(default)]
    pub processes: Vec<Process>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            firmware_version: None,
            autofocus: Autofocus::default(),
            copies: default_copies(),
            processes: Vec::new(),
        }
    }
}

impl JobSettings {
    /// Parse a settings payload.
    ///
    /// An empty or whitespace-only payload is the default job: one implicit
    /// vector process over every color (see [`JobSettings::effective_processes`]).
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| LaserwerkError::Settings(e.to_string()))
    }

    /// The processes to run. A job with an empty process list engraves
    /// everything with one default vector process.
    pub fn effective_processes(&self) -> Vec<Process> {
        if self.processes.is_empty() {
            vec![Process::Vector(VectorProcess::default())]
        } else {
            self.processes.clone()
        }
    }
}

fn default_job_name() -> String {
    "Untitled".to_string()
}

fn default_copies() -> u32 {
    1
}

/// Autofocus behavior before the job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Autofocus {
    #[default]
    Off,
    Plunger,
    Thickness,
}

/// A single process over the markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_of")]
pub enum Process {
    #[serde(rename = "vector_process")]
    Vector(VectorProcess),
    #[serde(rename = "raster_process")]
    Raster(RasterProcess),
}

impl Process {
    pub fn name(&self) -> &str {
        match self {
            Self::Vector(p) => &p.name,
            Self::Raster(p) => &p.name,
        }
    }

    pub fn filter(&self) -> Option<&ProcessFilter> {
        match self {
            Self::Vector(p) => p.filter.as_ref(),
            Self::Raster(p) => p.filter.as_ref(),
        }
    }

    pub fn cycles(&self) -> u32 {
        match self {
            Self::Vector(p) => p.cycles,
            Self::Raster(p) => p.cycles,
        }
    }
}

/// Cut/mark process following path outlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorProcess {
    #[serde(default = "default_process_name")]
    pub name: String,

    #[serde(default)]
    pub filter: Option<ProcessFilter>,

    #[serde(default = "default_cycles")]
    pub cycles: u32,

    /// Head speed as a percentage of the machine maximum.
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Laser power as a percentage of the machine maximum.
    #[serde(default = "default_power")]
    pub power: f32,

    /// Pulse frequency as a percentage (CO2) or kHz (fiber).
    #[serde(default = "default_frequency")]
    pub frequency: f32,

    #[serde(default)]
    pub laser_type: LaserType,

    #[serde(default)]
    pub vector_sorting: VectorSorting,

    #[serde(default)]
    pub air_assist: bool,

    /// Pass curve control points through instead of flattened polylines.
    #[serde(default = "default_beziers")]
    pub beziers: bool,

    /// Beam-width compensation offset in millimetres.
    #[serde(default)]
    pub offset: f32,
}

impl Default for VectorProcess {
    fn default() -> Self {
        Self {
            name: default_process_name(),
            filter: None,
            cycles: default_cycles(),
            speed: default_speed(),
            power: default_power(),
            frequency: default_frequency(),
            laser_type: LaserType::default(),
            vector_sorting: VectorSorting::default(),
            air_assist: false,
            beziers: default_beziers(),
            offset: 0.0,
        }
    }
}

/// Engrave process filling outlines with scanlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterProcess {
    #[serde(default = "default_process_name")]
    pub name: String,

    #[serde(default)]
    pub filter: Option<ProcessFilter>,

    #[serde(default = "default_cycles")]
    pub cycles: u32,

    #[serde(default = "default_speed")]
    pub speed: f32,

    #[serde(default = "default_power")]
    pub power: f32,

    /// Engraving resolution in dots per inch; sets the scanline pitch.
    #[serde(default = "default_resolution")]
    pub resolution: u32,

    #[serde(default)]
    pub laser_type: LaserType,

    #[serde(default)]
    pub air_assist: bool,
}

impl Default for RasterProcess {
    fn default() -> Self {
        Self {
            name: default_process_name(),
            filter: None,
            cycles: default_cycles(),
            speed: default_speed(),
            power: default_power(),
            resolution: default_resolution(),
            laser_type: LaserType::default(),
            air_assist: false,
        }
    }
}

fn default_process_name() -> String {
    "Process".to_string()
}

fn default_cycles() -> u32 {
    1
}

fn default_speed() -> f32 {
    100.0
}

fn default_power() -> f32 {
    50.0
}

fn default_frequency() -> f32 {
    100.0
}

fn default_beziers() -> bool {
    true
}

fn default_resolution() -> u32 {
    300
}

/// Per-process laser source selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaserType {
    #[default]
    Co2,
    Fiber,
}

/// Ordering applied to vector paths before encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSorting {
    #[default]
    Off,
    /// Greedy nearest-neighbor ordering to reduce travel moves.
    Optimize,
    /// Inner contours before the outlines that contain them.
    InsideOut,
}

/// Selects which markup elements a process applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_of")]
pub enum ProcessFilter {
    #[serde(rename = "color_filter")]
    Color(ColorFilter),
}

impl ProcessFilter {
    /// Whether an element with the given color key passes this filter.
    pub fn matches(&self, color_key: &str) -> bool {
        match self {
            Self::Color(f) => f.colors.iter().any(|c| c.eq_ignore_ascii_case(color_key)),
        }
    }
}

/// Filter on element stroke/fill color.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorFilter {
    /// Accepted color keys: CSS names for the common palette, `#rrggbb`
    /// otherwise (as produced by [`color_key`]).
    pub colors: Vec<String>,
}

/// Canonical color key for an RGB triple: a CSS name for the palette hosts
/// actually assign processes to, lowercase hex otherwise.
pub fn color_key(r: u8, g: u8, b: u8) -> String {
    match (r, g, b) {
        (0, 0, 0) => "black".into(),
        (255, 255, 255) => "white".into(),
        (255, 0, 0) => "red".into(),
        (0, 255, 0) => "lime".into(),
        (0, 128, 0) => "green".into(),
        (0, 0, 255) => "blue".into(),
        (255, 255, 0) => "yellow".into(),
        (0, 255, 255) => "cyan".into(),
        (255, 0, 255) => "magenta".into(),
        (255, 165, 0) => "orange".into(),
        _ => format!("#{r:02x}{g:02x}{b:02x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_default_job() {
        let settings = JobSettings::parse("").unwrap();
        assert_eq!(settings.job_name, "Untitled");
        assert_eq!(settings.copies, 1);
        assert!(settings.processes.is_empty());
        // But the job still engraves something.
        assert_eq!(settings.effective_processes().len(), 1);
    }

    #[test]
    fn full_payload_round_trips() {
        let text = r#"{
            "job_name": "badge-engrave",
            "firmware_version": "1.0.9.0",
            "autofocus": "off",
            "copies": 2,
            "processes": [
                {
                    "_of": "vector_process",
                    "name": "CutOutline",
                    "filter": { "_of": "color_filter", "colors": ["black"] },
                    "cycles": 1,
                    "speed": 100.0,
                    "power": 25.0,
                    "frequency": 100.0,
                    "laser_type": "co2",
                    "vector_sorting": "off",
                    "air_assist": false,
                    "beziers": true,
                    "offset": 0.0
                }
            ]
        }"#;

        let settings = JobSettings::parse(text).unwrap();
        assert_eq!(settings.job_name, "badge-engrave");
        assert_eq!(settings.copies, 2);
        assert_eq!(settings.processes.len(), 1);

        let Process::Vector(v) = &settings.processes[0] else {
            panic!("expected vector process");
        };
        assert_eq!(v.name, "CutOutline");
        assert_eq!(v.power, 25.0);
        assert_eq!(v.laser_type, LaserType::Co2);
        assert!(v.filter.as_ref().unwrap().matches("black"));
        assert!(!v.filter.as_ref().unwrap().matches("red"));
    }

    #[test]
    fn raster_process_parses_with_defaults() {
        let text = r#"{
            "processes": [
                { "_of": "raster_process", "name": "EngraveFill" }
            ]
        }"#;
        let settings = JobSettings::parse(text).unwrap();
        let Process::Raster(r) = &settings.processes[0] else {
            panic!("expected raster process");
        };
        assert_eq!(r.resolution, 300);
        assert_eq!(r.cycles, 1);
    }

    #[test]
    fn malformed_payload_is_a_settings_error() {
        let err = JobSettings::parse("{ not json").unwrap_err();
        assert!(matches!(err, LaserwerkError::Settings(_)));
    }

    #[test]
    fn unknown_process_tag_is_rejected() {
        let text = r#"{ "processes": [ { "_of": "plasma_process" } ] }"#;
        assert!(JobSettings::parse(text).is_err());
    }

    #[test]
    fn color_keys_prefer_names() {
        assert_eq!(color_key(0, 0, 0), "black");
        assert_eq!(color_key(255, 0, 0), "red");
        assert_eq!(color_key(18, 52, 86), "#123456");
    }

    #[test]
    fn filter_matching_is_case_insensitive() {
        let filter = ProcessFilter::Color(ColorFilter {
            colors: vec!["Black".into(), "#AB00CD".into()],
        });
        assert!(filter.matches("black"));
        assert!(filter.matches("#ab00cd"));
        assert!(!filter.matches("blue"));
    }
}
