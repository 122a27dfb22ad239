// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// C ABI type definitions.
//
// Everything here is `#[repr(C)]` and mirrored in the generated header.
// `CApiError`/`CApiResult` (and the string/array free surface) are compiled
// out on bare wasm32: without WASI there are no C string/heap conventions
// for a host to uphold, so that target gets the reduced surface only.

use std::os::raw::c_char;

use laserwerk_core::types::{Machine, ProgressKind};

/// Machine models addressable across the boundary.
///
/// Ordinals are ABI: they match `Machine::ALL` index for index and must
/// never be reordered.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMachine {
    Pro24,
    Pro32,
    Pro36,
    Pro48,
    Edge12,
    Edge24,
    Edge36,
    Maker12,
    Maker24,
    Maker36,
    G100_4x4,
    G100_6x6,
    G2,
    Fusion32M2,
    Fusion40M2,
    Fusion32,
    Fusion32Fibermark,
    Fusion40,
    Fibermark24,
    Fibermark24S2,
    Zing16,
    Zing24,
    Helix24,
    Mini18,
    Mini24,
    Ext36,
}

impl From<CMachine> for Machine {
    fn from(machine: CMachine) -> Self {
        Machine::ALL[machine as usize]
    }
}

/// Coarse lifecycle classification in a progress snapshot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CProgressType {
    NotStarted,
    InProgress,
    Finished,
    Error,
}

impl From<ProgressKind> for CProgressType {
    fn from(kind: ProgressKind) -> Self {
        match kind {
            ProgressKind::NotStarted => Self::NotStarted,
            ProgressKind::InProgress => Self::InProgress,
            ProgressKind::Finished => Self::Finished,
            ProgressKind::Error => Self::Error,
        }
    }
}

/// Snapshot of a job's progress.
///
/// `stage_name` and `stage_json` are heap strings owned by the caller once
/// returned; release the whole report exactly once with
/// `free_c_progress_report`. `stage_json` may be null.
#[repr(C)]
#[derive(Debug)]
pub struct CProgressReport {
    pub progress_type: CProgressType,
    pub stage_name: *mut c_char,
    pub stage_json: *mut c_char,
    pub stage_has_progress: bool,
    pub stage_progress: f32,
    pub stage_index: usize,
    pub stage_count: usize,
    pub total_progress: f32,
}

/// Outcome of an operation with no payload. An empty `error` string means
/// success. Release exactly once with `free_c_api_error`.
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[repr(C)]
#[derive(Debug)]
pub struct CApiError {
    pub error: *mut c_char,
}

/// Outcome of an operation that may produce output: a byte payload or an
/// error message, never both meaningfully. An empty `error` string means
/// success. Release exactly once with `free_c_api_result`.
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[repr(C)]
#[derive(Debug)]
pub struct CApiResult {
    pub result: *mut c_char,
    pub result_size: usize,
    pub error: *mut c_char,
}
