// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planning stage: colored outlines to an ordered motion plan.
//
// Each settings process selects outlines by color, turns them into marks
// (vector follow or raster hatch fill), orders them, and clamps everything
// to the machine bed. Planning is incremental — one outline per work unit —
// so the scheduler can interleave it with progress queries and aborts.

use tracing::warn;

use laserwerk_core::settings::{JobSettings, LaserType, Process, VectorSorting};
use laserwerk_core::types::Machine;

use crate::svg::{Document, Outline};

/// Minimum hatch pitch; guards against absurd resolutions.
const MIN_PITCH_MM: f64 = 0.01;

/// What a pass does with its paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Vector,
    Raster,
}

/// Device parameters for one pass, straight from the process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PassParams {
    pub kind: PassKind,
    pub speed: f32,
    pub power: f32,
    /// Pulse frequency; vector processes only.
    pub frequency: Option<f32>,
    /// Hatch resolution in dpi; raster processes only.
    pub resolution: Option<u32>,
    pub laser_type: LaserType,
    pub air_assist: bool,
    /// Curve passthrough flag, forwarded into the stream record.
    pub beziers: bool,
    /// Beam-width compensation in millimetres, forwarded to the device.
    pub offset: f32,
}

/// One polyline the head must follow with the laser firing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPath {
    pub points: Vec<(f64, f64)>,
    pub closed: bool,
}

impl PlannedPath {
    fn bbox_area(&self) -> f64 {
        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (max_x - min_x).max(0.0) * (max_y - min_y).max(0.0)
    }
}

/// All marks for one process, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessPass {
    pub name: String,
    /// Times the whole pass repeats; the encoder replicates.
    pub cycles: u32,
    pub params: PassParams,
    pub paths: Vec<PlannedPath>,
}

/// The finished plan for a job.
#[derive(Debug, Clone, Default)]
pub struct MotionPlan {
    pub passes: Vec<ProcessPass>,
}

impl MotionPlan {
    /// Path count with cycles applied — the encoder's workload.
    pub fn total_marks(&self) -> usize {
        self.passes
            .iter()
            .map(|p| p.paths.len() * p.cycles as usize)
            .sum()
    }
}

/// Incremental planner; one outline-per-process per work unit.
pub struct Planner {
    outlines: Vec<Outline>,
    processes: Vec<Process>,
    machine: Machine,
    process_idx: usize,
    outline_idx: usize,
    pending: Vec<PlannedPath>,
    clamped: bool,
    passes: Vec<ProcessPass>,
    done_units: usize,
    total_units: usize,
}

impl Planner {
    pub fn new(document: &Document, settings: &JobSettings, machine: Machine) -> Self {
        let processes = settings.effective_processes();
        let outlines = document.outlines.clone();
        let total_units = processes.len() * outlines.len().max(1);
        Self {
            outlines,
            processes,
            machine,
            process_idx: 0,
            outline_idx: 0,
            pending: Vec::new(),
            clamped: false,
            passes: Vec::new(),
            done_units: 0,
            total_units,
        }
    }

    pub fn is_done(&self) -> bool {
        self.process_idx >= self.processes.len()
    }

    /// (units done, units total) for progress reporting.
    pub fn progress(&self) -> (usize, usize) {
        (self.done_units, self.total_units)
    }

    /// Plan up to `budget` work units. Returns true while work remains.
    pub fn step(&mut self, budget: usize) -> bool {
        let mut remaining = budget.max(1);
        while remaining > 0 && !self.is_done() {
            if self.outline_idx < self.outlines.len() {
                self.plan_one();
                self.outline_idx += 1;
                self.done_units += 1;
                remaining -= 1;
                if self.outline_idx < self.outlines.len() {
                    continue;
                }
            } else {
                // No outlines at all: finishing the pass is the unit.
                self.done_units += 1;
                remaining -= 1;
            }
            self.finish_pass();
            self.process_idx += 1;
            self.outline_idx = 0;
        }
        !self.is_done()
    }

    /// Consume the planner once [`Planner::is_done`].
    pub fn into_plan(self) -> MotionPlan {
        debug_assert!(self.is_done());
        MotionPlan { passes: self.passes }
    }

    fn plan_one(&mut self) {
        let Self {
            processes,
            outlines,
            pending,
            clamped,
            machine,
            process_idx,
            outline_idx,
            ..
        } = self;
        let process = &processes[*process_idx];
        let outline = &outlines[*outline_idx];
        if let Some(filter) = process.filter() {
            if !filter.matches(&outline.color) {
                return;
            }
        }
        match process {
            Process::Vector(_) => {
                if outline.points.len() < 2 {
                    return;
                }
                let (points, was_clamped) = clamp_to_bed(&outline.points, *machine);
                *clamped |= was_clamped;
                pending.push(PlannedPath {
                    points,
                    closed: outline.closed,
                });
            }
            Process::Raster(r) => {
                if !(outline.filled && outline.closed) {
                    return;
                }
                let (points, was_clamped) = clamp_to_bed(&outline.points, *machine);
                *clamped |= was_clamped;
                let pitch = (25.4 / f64::from(r.resolution.max(1))).max(MIN_PITCH_MM);
                pending.extend(hatch(&points, pitch));
            }
        }
    }

    fn finish_pass(&mut self) {
        let mut paths = std::mem::take(&mut self.pending);
        let process = &self.processes[self.process_idx];
        if self.clamped {
            warn!(
                process = process.name(),
                machine = ?self.machine,
                "marks extended past the bed and were clamped"
            );
            self.clamped = false;
        }

        let params = match process {
            Process::Vector(v) => {
                paths = match v.vector_sorting {
                    VectorSorting::Off => paths,
                    VectorSorting::Optimize => order_nearest(paths),
                    VectorSorting::InsideOut => order_inside_out(paths),
                };
                PassParams {
                    kind: PassKind::Vector,
                    speed: v.speed,
                    power: v.power,
                    frequency: Some(v.frequency),
                    resolution: None,
                    laser_type: v.laser_type,
                    air_assist: v.air_assist,
                    beziers: v.beziers,
                    offset: v.offset,
                }
            }
            Process::Raster(r) => PassParams {
                kind: PassKind::Raster,
                speed: r.speed,
                power: r.power,
                frequency: None,
                resolution: Some(r.resolution),
                laser_type: r.laser_type,
                air_assist: r.air_assist,
                beziers: false,
                offset: 0.0,
            },
        };

        self.passes.push(ProcessPass {
            name: process.name().to_string(),
            cycles: process.cycles().max(1),
            params,
            paths,
        });
    }
}

fn clamp_to_bed(points: &[(f64, f64)], machine: Machine) -> (Vec<(f64, f64)>, bool) {
    let (bed_w, bed_h) = machine.bed_size_mm();
    let mut clamped = false;
    let out = points
        .iter()
        .map(|&(x, y)| {
            let cx = x.clamp(0.0, bed_w);
            let cy = y.clamp(0.0, bed_h);
            clamped |= cx != x || cy != y;
            (cx, cy)
        })
        .collect();
    (out, clamped)
}

/// Greedy nearest-neighbor ordering from the park position, reversing a
/// path when approaching its far end is cheaper.
fn order_nearest(mut paths: Vec<PlannedPath>) -> Vec<PlannedPath> {
    let mut ordered = Vec::with_capacity(paths.len());
    let mut cursor = (0.0, 0.0);
    while !paths.is_empty() {
        let mut best = 0;
        let mut best_dist = f64::MAX;
        let mut best_reversed = false;
        for (i, path) in paths.iter().enumerate() {
            let Some(&start) = path.points.first() else {
                continue;
            };
            let end = *path.points.last().unwrap_or(&start);
            let d_start = dist2(cursor, start);
            let d_end = dist2(cursor, end);
            if d_start < best_dist {
                best = i;
                best_dist = d_start;
                best_reversed = false;
            }
            if d_end < d_start && d_end < best_dist {
                best = i;
                best_dist = d_end;
                best_reversed = true;
            }
        }
        let mut path = paths.swap_remove(best);
        if best_reversed {
            path.points.reverse();
        }
        if let Some(&end) = path.points.last() {
            cursor = end;
        }
        ordered.push(path);
    }
    ordered
}

/// Smaller bounding boxes first, so inner contours cut before the outline
/// that would free the part.
fn order_inside_out(mut paths: Vec<PlannedPath>) -> Vec<PlannedPath> {
    paths.sort_by(|a, b| {
        a.bbox_area()
            .partial_cmp(&b.bbox_area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    paths
}

fn dist2(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

/// Even-odd scanline fill of a closed polyline, boustrophedon ordered.
fn hatch(points: &[(f64, f64)], pitch_mm: f64) -> Vec<PlannedPath> {
    if points.len() < 3 {
        return Vec::new();
    }
    let min_y = points.iter().map(|p| p.1).fold(f64::MAX, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::MIN, f64::max);

    let mut lines = Vec::new();
    let mut reverse = false;
    let mut y = min_y + pitch_mm / 2.0;
    while y < max_y {
        let mut xs: Vec<f64> = Vec::new();
        for window in points.windows(2) {
            let (p, q) = (window[0], window[1]);
            let crosses = (p.1 <= y && y < q.1) || (q.1 <= y && y < p.1);
            if crosses {
                xs.push(p.0 + (y - p.1) * (q.0 - p.0) / (q.1 - p.1));
            }
        }
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for pair in xs.chunks_exact(2) {
            let (a, b) = if reverse {
                (pair[1], pair[0])
            } else {
                (pair[0], pair[1])
            };
            lines.push(PlannedPath {
                points: vec![(a, y), (b, y)],
                closed: false,
            });
        }
        reverse = !reverse;
        y += pitch_mm;
    }
    lines
}
