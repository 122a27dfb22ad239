// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encoding stage: motion plan to the machine's print stream.
//
// The stream is a PJL-framed job: UEL + job header carrying the global
// settings, an HPGL-dialect motion body (pen-up travel, pen-down marks,
// per-pass parameter records), and a PJL end-of-job trailer. Output is
// deterministic for identical inputs, chunked or not.

use std::io::Write;

use laserwerk_core::settings::{Autofocus, JobSettings};
use laserwerk_core::types::Machine;

use crate::plan::{MotionPlan, PassParams, ProcessPass};

/// PJL universal exit language sequence.
pub const UEL: &[u8] = b"\x1b%-12345X";

/// Plotter units per millimetre (HPGL convention, 0.025mm resolution).
const PLU_PER_MM: f64 = 40.0;

/// Incremental stream encoder over a finished [`MotionPlan`].
pub struct Encoder {
    plan: MotionPlan,
    machine: Machine,
    job_name: String,
    copies: u32,
    autofocus: Autofocus,
    firmware_version: Option<String>,
    buf: Vec<u8>,
    header_done: bool,
    footer_done: bool,
    pass_idx: usize,
    cycle_idx: u32,
    path_idx: usize,
    done_units: usize,
    total_units: usize,
}

impl Encoder {
    pub fn new(plan: MotionPlan, settings: &JobSettings, machine: Machine) -> Self {
        // Header and trailer each count as one unit of work.
        let total_units = plan.total_marks() + 2;
        Self {
            plan,
            machine,
            job_name: settings.job_name.clone(),
            copies: settings.copies.max(1),
            autofocus: settings.autofocus,
            firmware_version: settings.firmware_version.clone(),
            buf: Vec::new(),
            header_done: false,
            footer_done: false,
            pass_idx: 0,
            cycle_idx: 0,
            path_idx: 0,
            done_units: 0,
            total_units,
        }
    }

    pub fn is_done(&self) -> bool {
        self.footer_done
    }

    /// (units done, units total) for progress reporting.
    pub fn progress(&self) -> (usize, usize) {
        (self.done_units, self.total_units)
    }

    /// Encode up to `budget` units. Returns true while work remains.
    pub fn step(&mut self, budget: usize) -> bool {
        let mut remaining = budget.max(1);
        while remaining > 0 && !self.footer_done {
            // Passes without marks cost nothing and were never counted.
            while self.pass_idx < self.plan.passes.len()
                && self.plan.passes[self.pass_idx].paths.is_empty()
            {
                self.pass_idx += 1;
            }
            if !self.header_done {
                self.emit_header();
                self.header_done = true;
            } else if self.pass_idx < self.plan.passes.len() {
                self.emit_one_mark();
            } else {
                self.emit_footer();
                self.footer_done = true;
            }
            self.done_units += 1;
            remaining -= 1;
        }
        !self.footer_done
    }

    /// Consume the encoder once [`Encoder::is_done`].
    pub fn into_bytes(self) -> Vec<u8> {
        debug_assert!(self.footer_done);
        self.buf
    }

    fn emit_header(&mut self) {
        let (bed_w, bed_h) = self.machine.bed_size_mm();
        self.buf.extend_from_slice(UEL);
        let _ = write!(self.buf, "@PJL JOB NAME = \"{}\"\r\n", self.job_name);
        let _ = write!(
            self.buf,
            "@PJL SET MACHINE = \"{}\"\r\n",
            self.machine.display_name()
        );
        let _ = write!(self.buf, "@PJL SET BED = {bed_w:.0}x{bed_h:.0}\r\n");
        let _ = write!(self.buf, "@PJL SET COPIES = {}\r\n", self.copies);
        let _ = write!(
            self.buf,
            "@PJL SET AUTOFOCUS = {}\r\n",
            match self.autofocus {
                Autofocus::Off => "OFF",
                Autofocus::Plunger => "PLUNGER",
                Autofocus::Thickness => "THICKNESS",
            }
        );
        if let Some(fw) = &self.firmware_version {
            let _ = write!(self.buf, "@PJL SET FIRMWARE = \"{fw}\"\r\n");
        }
        self.buf.extend_from_slice(b"@PJL ENTER LANGUAGE = HPGL\r\n");
        self.buf.extend_from_slice(b"IN;");
    }

    /// Emit the next planned path, advancing the (pass, cycle, path) cursor.
    fn emit_one_mark(&mut self) {
        let pass = &self.plan.passes[self.pass_idx];
        if self.path_idx == 0 {
            Self::emit_pass_prelude(&mut self.buf, pass, self.cycle_idx);
        }
        let path = &pass.paths[self.path_idx];
        Self::emit_path(&mut self.buf, &path.points);

        self.path_idx += 1;
        if self.path_idx >= pass.paths.len() {
            self.path_idx = 0;
            self.cycle_idx += 1;
            if self.cycle_idx >= pass.cycles.max(1) {
                self.cycle_idx = 0;
                self.pass_idx += 1;
            }
        }
    }

    fn emit_pass_prelude(buf: &mut Vec<u8>, pass: &ProcessPass, cycle: u32) {
        let _ = write!(buf, "CO \"{} c{}\";", pass.name, cycle + 1);
        let PassParams {
            speed,
            power,
            frequency,
            resolution,
            air_assist,
            beziers,
            offset,
            ..
        } = &pass.params;
        let _ = write!(buf, "VS{speed:.1};FS{power:.1};");
        if let Some(freq) = frequency {
            let _ = write!(buf, "FR{freq:.1};");
        }
        if let Some(dpi) = resolution {
            let _ = write!(buf, "RS{dpi};");
        }
        let _ = write!(buf, "AA{};", u8::from(*air_assist));
        let _ = write!(buf, "BZ{};", u8::from(*beziers));
        if *offset != 0.0 {
            let _ = write!(buf, "OF{};", plu(f64::from(*offset)));
        }
    }

    fn emit_path(buf: &mut Vec<u8>, points: &[(f64, f64)]) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let _ = write!(buf, "PU{},{};", plu(first.0), plu(first.1));
        if rest.is_empty() {
            return;
        }
        buf.extend_from_slice(b"PD");
        for (i, p) in rest.iter().enumerate() {
            if i > 0 {
                buf.push(b',');
            }
            let _ = write!(buf, "{},{}", plu(p.0), plu(p.1));
        }
        buf.push(b';');
    }

    fn emit_footer(&mut self) {
        self.buf.extend_from_slice(b"PU0,0;");
        self.buf.extend_from_slice(UEL);
        let _ = write!(self.buf, "@PJL EOJ NAME = \"{}\"\r\n", self.job_name);
        self.buf.extend_from_slice(UEL);
    }
}

fn plu(mm: f64) -> i64 {
    (mm * PLU_PER_MM).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PassKind, PlannedPath};
    use laserwerk_core::settings::LaserType;

    fn vector_params() -> PassParams {
        PassParams {
            kind: PassKind::Vector,
            speed: 100.0,
            power: 25.0,
            frequency: Some(100.0),
            resolution: None,
            laser_type: LaserType::Co2,
            air_assist: false,
            beziers: true,
            offset: 0.0,
        }
    }

    fn one_pass_plan(cycles: u32) -> MotionPlan {
        MotionPlan {
            passes: vec![ProcessPass {
                name: "Cut".into(),
                cycles,
                params: vector_params(),
                paths: vec![PlannedPath {
                    points: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)],
                    closed: false,
                }],
            }],
        }
    }

    fn encode_all(plan: MotionPlan, settings: &JobSettings, budget: usize) -> Vec<u8> {
        let mut encoder = Encoder::new(plan, settings, Machine::Maker24);
        while encoder.step(budget) {}
        encoder.into_bytes()
    }

    #[test]
    fn stream_is_pjl_framed() {
        let settings = JobSettings {
            job_name: "badge".into(),
            ..JobSettings::default()
        };
        let bytes = encode_all(one_pass_plan(1), &settings, 16);
        let text = String::from_utf8_lossy(&bytes);

        assert!(bytes.starts_with(UEL));
        assert!(bytes.ends_with(UEL));
        assert!(text.contains("@PJL JOB NAME = \"badge\""));
        assert!(text.contains("@PJL SET MACHINE = \"Fusion Maker 24\""));
        assert!(text.contains("@PJL SET BED = 610x305"));
        assert!(text.contains("@PJL ENTER LANGUAGE = HPGL"));
        assert!(text.contains("@PJL EOJ NAME = \"badge\""));
    }

    #[test]
    fn coordinates_are_plotter_units() {
        let bytes = encode_all(one_pass_plan(1), &JobSettings::default(), 16);
        let text = String::from_utf8_lossy(&bytes);
        // 1.0mm = 40 plotter units.
        assert!(text.contains("PU0,0;"));
        assert!(text.contains("PD40,0,40,40;"));
    }

    #[test]
    fn chunked_output_equals_one_shot() {
        let settings = JobSettings::default();
        let whole = encode_all(one_pass_plan(3), &settings, 1024);
        let chunked = encode_all(one_pass_plan(3), &settings, 1);
        assert_eq!(whole, chunked);
    }

    #[test]
    fn cycles_replicate_the_pass() {
        let bytes = encode_all(one_pass_plan(3), &JobSettings::default(), 16);
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("CO \"Cut").count(), 3);
        assert_eq!(text.matches("PD").count(), 3);
    }

    #[test]
    fn empty_plan_is_still_a_valid_job() {
        let bytes = encode_all(MotionPlan::default(), &JobSettings::default(), 4);
        let text = String::from_utf8_lossy(&bytes);
        assert!(!bytes.is_empty());
        assert!(text.contains("@PJL JOB"));
        assert!(text.contains("@PJL EOJ"));
        assert!(!text.contains("PD"));
    }

    #[test]
    fn progress_counts_to_total() {
        let mut encoder = Encoder::new(one_pass_plan(2), &JobSettings::default(), Machine::Zing16);
        let (_, total) = encoder.progress();
        assert_eq!(total, 2 * 1 + 2);
        while encoder.step(1) {
            let (done, t) = encoder.progress();
            assert!(done <= t);
        }
        let (done, t) = encoder.progress();
        assert_eq!(done, t);
    }
}
