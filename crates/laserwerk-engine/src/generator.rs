// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The job scheduler behind the engine handle.
//
// A `Generator` owns one print-file generation job from construction to a
// terminal state. Work happens in bounded chunks so a host can interleave
// generation with progress polling on one thread, or just drain it in a
// single blocking call. Abort is cooperative: a flag checked at every chunk
// boundary, never mid-stage.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use laserwerk_core::config::EngineConfig;
use laserwerk_core::error::{LaserwerkError, Result};
use laserwerk_core::settings::JobSettings;
use laserwerk_core::types::{JobState, Machine, ProgressKind, ProgressReport};

use crate::encode::Encoder;
use crate::fonts::FontStore;
use crate::plan::Planner;
use crate::svg;

/// Pipeline stage names, in execution order.
const STAGE_NAMES: [&str; 3] = ["parse", "plan", "encode"];

enum Stage {
    Parse,
    Plan(Planner),
    Encode(Encoder),
    /// Terminal — the pipeline ran to an end state and was torn down.
    Drained,
}

/// One print-file generation job.
pub struct Generator {
    job_id: Uuid,
    machine: Machine,
    config: EngineConfig,
    svg_source: String,
    settings_source: String,
    settings: Option<JobSettings>,
    fonts: FontStore,
    created_at: DateTime<Utc>,
    state: JobState,
    stage: Stage,
    stage_index: usize,
    output: Option<Vec<u8>>,
    error: Option<(String, String)>,
    abort: AtomicBool,
}

impl Generator {
    /// Create a job. Inputs are copied; nothing is validated until the
    /// first work chunk, so diagnostics always have a job to attach to.
    pub fn new(
        svg_source: impl Into<String>,
        settings_source: impl Into<String>,
        machine: Machine,
    ) -> Self {
        let job_id = Uuid::new_v4();
        let created_at = Utc::now();
        debug!(job = %job_id, ?machine, created = %created_at, "generator created");
        Self {
            job_id,
            machine,
            config: EngineConfig::default(),
            svg_source: svg_source.into(),
            settings_source: settings_source.into(),
            settings: None,
            fonts: FontStore::new(),
            created_at,
            state: JobState::NotStarted,
            stage: Stage::Parse,
            stage_index: 0,
            output: None,
            error: None,
            abort: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn machine(&self) -> Machine {
        self.machine
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == JobState::Finished
    }

    pub fn has_error(&self) -> bool {
        self.state == JobState::Failed
    }

    pub fn was_aborted(&self) -> bool {
        self.state == JobState::Aborted
    }

    /// The failure message, present only in the `Failed` state.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(_, detail)| detail.as_str())
    }

    /// The generated print file, present only once `Finished`.
    pub fn result(&self) -> Option<&[u8]> {
        match self.state {
            JobState::Finished => self.output.as_deref(),
            _ => None,
        }
    }

    /// Supply font bytes for text layout. Only legal before the first chunk.
    pub fn add_font_data(&mut self, data: &[u8]) -> Result<()> {
        if self.state != JobState::NotStarted {
            return Err(LaserwerkError::JobRunning(
                "font data must be supplied before the first work chunk".into(),
            ));
        }
        self.fonts.add(data)
    }

    /// Ask the job to stop at the next chunk boundary. Non-blocking; safe
    /// from any thread holding a reference.
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
        debug!(job = %self.job_id, "abort requested");
    }

    /// Perform one bounded chunk of work. Returns true while work remains.
    pub fn step(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if self.abort.load(Ordering::Relaxed) {
            self.state = JobState::Aborted;
            self.stage = Stage::Drained;
            info!(job = %self.job_id, stage = STAGE_NAMES[self.stage_index], "job aborted");
            return false;
        }
        self.state = JobState::Running;

        match std::mem::replace(&mut self.stage, Stage::Drained) {
            Stage::Parse => match self.parse_inputs() {
                Ok(planner) => {
                    self.stage_index = 1;
                    self.stage = Stage::Plan(planner);
                }
                Err(e) => self.fail(e),
            },
            Stage::Plan(mut planner) => {
                if planner.step(self.config.plan_chunk) {
                    self.stage = Stage::Plan(planner);
                } else {
                    let settings = self.settings.clone().unwrap_or_default();
                    let encoder = Encoder::new(planner.into_plan(), &settings, self.machine);
                    self.stage_index = 2;
                    self.stage = Stage::Encode(encoder);
                }
            }
            Stage::Encode(mut encoder) => {
                if encoder.step(self.config.encode_chunk) {
                    self.stage = Stage::Encode(encoder);
                } else {
                    let bytes = encoder.into_bytes();
                    info!(
                        job = %self.job_id,
                        bytes = bytes.len(),
                        "print file generated"
                    );
                    self.output = Some(bytes);
                    self.state = JobState::Finished;
                }
            }
            Stage::Drained => {}
        }
        !self.state.is_terminal()
    }

    /// Drain the job in one blocking call and hand back the print file.
    #[instrument(skip(self), fields(job = %self.job_id, machine = ?self.machine))]
    pub fn run_to_completion(&mut self) -> Result<&[u8]> {
        while self.step() {}
        match self.state {
            JobState::Finished => Ok(self.output.as_deref().unwrap_or_default()),
            JobState::Aborted => Err(LaserwerkError::Aborted),
            _ => {
                let (stage, detail) = self.error.clone().unwrap_or_else(|| {
                    (STAGE_NAMES[self.stage_index].into(), "unknown failure".into())
                });
                Err(LaserwerkError::Generation { stage, detail })
            }
        }
    }

    /// Snapshot the job's progress. Valid in every state; two queries in
    /// the same state return equal snapshots.
    pub fn progress(&self) -> ProgressReport {
        let stage_count = STAGE_NAMES.len();
        match self.state {
            JobState::NotStarted => ProgressReport {
                kind: ProgressKind::NotStarted,
                stage_name: "queued".into(),
                stage_detail: None,
                stage_progress: None,
                stage_index: 0,
                stage_count,
                total_progress: 0.0,
            },
            JobState::Finished => ProgressReport {
                kind: ProgressKind::Finished,
                stage_name: STAGE_NAMES[stage_count - 1].into(),
                stage_detail: None,
                stage_progress: Some(1.0),
                stage_index: stage_count - 1,
                stage_count,
                total_progress: 1.0,
            },
            JobState::Failed => {
                let (stage, detail) = self
                    .error
                    .clone()
                    .unwrap_or_else(|| (STAGE_NAMES[self.stage_index].into(), String::new()));
                ProgressReport {
                    kind: ProgressKind::Error,
                    stage_name: stage,
                    stage_detail: Some(json!({ "message": detail })),
                    stage_progress: None,
                    stage_index: self.stage_index,
                    stage_count,
                    total_progress: self.stage_fraction_total(),
                }
            }
            JobState::Running | JobState::Aborted => {
                let kind = if self.state == JobState::Aborted {
                    // The boundary reports abort through its own accessor;
                    // progress folds it into the error kind.
                    ProgressKind::Error
                } else {
                    ProgressKind::InProgress
                };
                let (stage_progress, stage_detail) = self.stage_measurement();
                ProgressReport {
                    kind,
                    stage_name: STAGE_NAMES[self.stage_index].into(),
                    stage_detail,
                    stage_progress,
                    stage_index: self.stage_index,
                    stage_count,
                    total_progress: self.stage_fraction_total(),
                }
            }
        }
    }

    fn stage_measurement(&self) -> (Option<f32>, Option<serde_json::Value>) {
        match &self.stage {
            Stage::Parse => (None, Some(json!({ "bytes": self.svg_source.len() }))),
            Stage::Plan(planner) => {
                let (done, total) = planner.progress();
                (
                    Some(fraction(done, total)),
                    Some(json!({ "processed": done, "total": total })),
                )
            }
            Stage::Encode(encoder) => {
                let (done, total) = encoder.progress();
                (
                    Some(fraction(done, total)),
                    Some(json!({ "processed": done, "total": total })),
                )
            }
            Stage::Drained => (None, None),
        }
    }

    fn stage_fraction_total(&self) -> f32 {
        let (stage_progress, _) = self.stage_measurement();
        let within = stage_progress.unwrap_or(0.0);
        (self.stage_index as f32 + within) / STAGE_NAMES.len() as f32
    }

    fn parse_inputs(&mut self) -> Result<Planner> {
        let settings = JobSettings::parse(&self.settings_source)?;
        let document = svg::parse(
            &self.svg_source,
            &self.fonts,
            self.config.curve_tolerance_mm,
        )?;
        let planner = Planner::new(&document, &settings, self.machine);
        self.settings = Some(settings);
        Ok(planner)
    }

    fn fail(&mut self, err: LaserwerkError) {
        let stage = STAGE_NAMES[self.stage_index].to_string();
        warn!(job = %self.job_id, stage = %stage, error = %err, "generation failed");
        self.error = Some((stage, err.to_string()));
        self.state = JobState::Failed;
        self.stage = Stage::Drained;
    }
}

fn fraction(done: usize, total: usize) -> f32 {
    if total == 0 {
        1.0
    } else {
        (done as f32 / total as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20mm" height="10mm" viewBox="0 0 20 10">
        <rect x="2" y="2" width="16" height="6" fill="none" stroke="black" stroke-width="0.5"/>
        <circle cx="10" cy="5" r="2" fill="none" stroke="red"/>
    </svg>"#;

    const SETTINGS: &str = r#"{
        "job_name": "coupon",
        "processes": [
            {
                "_of": "vector_process",
                "name": "CutAll",
                "speed": 80.0,
                "power": 30.0
            }
        ]
    }"#;

    fn generator() -> Generator {
        trace_init();
        Generator::new(MARKUP, SETTINGS, Machine::Maker24)
    }

    fn trace_init() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn run_to_completion_produces_a_print_file() {
        let mut job = generator();
        let payload = job.run_to_completion().unwrap().to_vec();
        assert!(!payload.is_empty());
        assert!(job.is_complete());
        assert!(!job.has_error());
        assert!(!job.was_aborted());
        assert!(job.error_message().is_none());
        assert_eq!(job.result(), Some(payload.as_slice()));

        let report = job.progress();
        assert_eq!(report.kind, ProgressKind::Finished);
        assert_eq!(report.total_progress, 1.0);
    }

    #[test]
    fn stepping_reports_more_work_until_terminal() {
        let mut job = generator().with_config(EngineConfig {
            plan_chunk: 1,
            encode_chunk: 1,
            ..EngineConfig::default()
        });
        let mut steps = 0;
        while job.step() {
            steps += 1;
            assert!(steps < 1_000, "scheduler failed to converge");
        }
        // Parse, several plan units, several encode units.
        assert!(steps > 3, "only {steps} steps; chunking not observable");
        assert!(job.is_complete());
    }

    #[test]
    fn abort_before_any_work_wins_the_race() {
        let mut job = generator();
        job.request_abort();
        let err = job.run_to_completion().unwrap_err();
        assert!(matches!(err, LaserwerkError::Aborted));
        assert!(job.was_aborted());
        assert!(!job.is_complete());
        assert!(!job.has_error());
        assert!(job.result().is_none());
        assert_eq!(job.progress().kind, ProgressKind::Error);
    }

    #[test]
    fn abort_mid_run_stops_at_a_chunk_boundary() {
        let mut job = generator().with_config(EngineConfig {
            plan_chunk: 1,
            encode_chunk: 1,
            ..EngineConfig::default()
        });
        assert!(job.step()); // parse
        job.request_abort();
        assert!(!job.step());
        assert!(job.was_aborted());
    }

    #[test]
    fn progress_queries_are_idempotent() {
        let mut job = generator();
        assert_eq!(job.progress(), job.progress());
        assert_eq!(job.progress().kind, ProgressKind::NotStarted);

        job.step();
        assert_eq!(job.progress(), job.progress());

        let _ = job.run_to_completion();
        assert_eq!(job.progress(), job.progress());
    }

    #[test]
    fn font_data_is_rejected_after_the_first_chunk() {
        let mut job = generator();
        job.step();
        let err = job.add_font_data(&[0x00, 0x01, 0x00, 0x00, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, LaserwerkError::JobRunning(_)));
        // The rejection must not poison the job.
        assert!(job.run_to_completion().is_ok());
    }

    #[test]
    fn malformed_font_bytes_do_not_poison_the_job() {
        let mut job = generator();
        assert!(job.add_font_data(b"definitely not a font").is_err());
        assert!(job.add_font_data(&[0x00, 0x01, 0x00, 0x00, 0, 0, 0, 0]).is_ok());
        assert!(job.run_to_completion().is_ok());
    }

    #[test]
    fn bad_markup_fails_in_the_parse_stage() {
        let mut job = Generator::new("<svg", "", Machine::Zing24);
        let err = job.run_to_completion().unwrap_err();
        assert!(matches!(err, LaserwerkError::Generation { .. }));
        assert!(job.has_error());
        assert!(!job.was_aborted());
        assert!(job.error_message().is_some());

        let report = job.progress();
        assert_eq!(report.kind, ProgressKind::Error);
        assert_eq!(report.stage_name, "parse");
    }

    #[test]
    fn bad_settings_fail_in_the_parse_stage() {
        let mut job = Generator::new(MARKUP, "{ broken", Machine::Maker24);
        assert!(job.run_to_completion().is_err());
        assert!(job.has_error());
        let message = job.error_message().unwrap_or_default().to_string();
        assert!(!message.is_empty());
    }

    #[test]
    fn empty_settings_generate_with_the_default_process() {
        let mut job = Generator::new(MARKUP, "", Machine::Maker24);
        let payload = job.run_to_completion().unwrap();
        assert!(!payload.is_empty());
    }

    #[test]
    fn completed_jobs_stay_completed() {
        let mut job = generator();
        let first = job.run_to_completion().unwrap().to_vec();
        assert!(!job.step());
        let second = job.run_to_completion().unwrap().to_vec();
        assert_eq!(first, second);
    }
}
