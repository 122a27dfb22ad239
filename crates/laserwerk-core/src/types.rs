// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Laserwerk engine.

use serde::{Deserialize, Serialize};

/// Supported laser engraver and fiber marking machine models.
///
/// The discriminant order is ABI-stable: host applications address machines
/// by this ordinal across the C boundary, so variants must never be
/// reordered or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Machine {
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

/// Product line a machine belongs to. Selects the stream preamble dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineFamily {
    FusionPro,
    FusionEdge,
    FusionMaker,
    Galvo,
    FusionM2,
    Fusion,
    Fibermark,
    Zing,
    Legacy,
}

/// Source technology of the machine's laser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaserSource {
    Co2,
    Fiber,
}

impl Machine {
    /// All models, in ABI order.
    pub const ALL: [Machine; 26] = [
        Machine::Pro24,
        Machine::Pro32,
        Machine::Pro36,
        Machine::Pro48,
        Machine::Edge12,
        Machine::Edge24,
        Machine::Edge36,
        Machine::Maker12,
        Machine::Maker24,
        Machine::Maker36,
        Machine::G100_4x4,
        Machine::G100_6x6,
        Machine::G2,
        Machine::Fusion32M2,
        Machine::Fusion40M2,
        Machine::Fusion32,
        Machine::Fusion32Fibermark,
        Machine::Fusion40,
        Machine::Fibermark24,
        Machine::Fibermark24S2,
        Machine::Zing16,
        Machine::Zing24,
        Machine::Helix24,
        Machine::Mini18,
        Machine::Mini24,
        Machine::Ext36,
    ];

    /// Product line grouping.
    pub fn family(&self) -> MachineFamily {
        match self {
            Self::Pro24 | Self::Pro32 | Self::Pro36 | Self::Pro48 => MachineFamily::FusionPro,
            Self::Edge12 | Self::Edge24 | Self::Edge36 => MachineFamily::FusionEdge,
            Self::Maker12 | Self::Maker24 | Self::Maker36 => MachineFamily::FusionMaker,
            Self::G100_4x4 | Self::G100_6x6 | Self::G2 => MachineFamily::Galvo,
            Self::Fusion32M2 | Self::Fusion40M2 => MachineFamily::FusionM2,
            Self::Fusion32 | Self::Fusion32Fibermark | Self::Fusion40 => MachineFamily::Fusion,
            Self::Fibermark24 | Self::Fibermark24S2 => MachineFamily::Fibermark,
            Self::Zing16 | Self::Zing24 => MachineFamily::Zing,
            Self::Helix24 | Self::Mini18 | Self::Mini24 | Self::Ext36 => MachineFamily::Legacy,
        }
    }

    /// Native laser source of the model.
    ///
    /// Dual-source models report their primary source; per-process overrides
    /// come from the settings payload.
    pub fn laser_source(&self) -> LaserSource {
        match self.family() {
            MachineFamily::Galvo | MachineFamily::Fibermark => LaserSource::Fiber,
            _ => match self {
                Self::Fusion32Fibermark => LaserSource::Fiber,
                _ => LaserSource::Co2,
            },
        }
    }

    /// Working bed dimensions in millimetres (width, height).
    pub fn bed_size_mm(&self) -> (f64, f64) {
        match self {
            Self::Pro24 => (610.0, 610.0),
            Self::Pro32 => (812.0, 508.0),
            Self::Pro36 => (914.0, 610.0),
            Self::Pro48 => (1219.0, 914.0),
            Self::Edge12 => (305.0, 305.0),
            Self::Edge24 => (610.0, 305.0),
            Self::Edge36 => (914.0, 610.0),
            Self::Maker12 => (305.0, 305.0),
            Self::Maker24 => (610.0, 305.0),
            Self::Maker36 => (914.0, 610.0),
            Self::G100_4x4 => (102.0, 102.0),
            Self::G100_6x6 => (152.0, 152.0),
            Self::G2 => (508.0, 508.0),
            Self::Fusion32M2 => (812.0, 508.0),
            Self::Fusion40M2 => (1016.0, 711.0),
            Self::Fusion32 => (812.0, 508.0),
            Self::Fusion32Fibermark => (812.0, 508.0),
            Self::Fusion40 => (1016.0, 711.0),
            Self::Fibermark24 => (610.0, 305.0),
            Self::Fibermark24S2 => (610.0, 305.0),
            Self::Zing16 => (406.0, 305.0),
            Self::Zing24 => (610.0, 305.0),
            Self::Helix24 => (610.0, 457.0),
            Self::Mini18 => (457.0, 305.0),
            Self::Mini24 => (610.0, 305.0),
            Self::Ext36 => (914.0, 610.0),
        }
    }

    /// Marketing name as printed on the machine.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pro24 => "Fusion Pro 24",
            Self::Pro32 => "Fusion Pro 32",
            Self::Pro36 => "Fusion Pro 36",
            Self::Pro48 => "Fusion Pro 48",
            Self::Edge12 => "Fusion Edge 12",
            Self::Edge24 => "Fusion Edge 24",
            Self::Edge36 => "Fusion Edge 36",
            Self::Maker12 => "Fusion Maker 12",
            Self::Maker24 => "Fusion Maker 24",
            Self::Maker36 => "Fusion Maker 36",
            Self::G100_4x4 => "G100 4x4",
            Self::G100_6x6 => "G100 6x6",
            Self::G2 => "G2",
            Self::Fusion32M2 => "Fusion M2 32",
            Self::Fusion40M2 => "Fusion M2 40",
            Self::Fusion32 => "Fusion 32",
            Self::Fusion32Fibermark => "Fusion 32 Fibermark",
            Self::Fusion40 => "Fusion 40",
            Self::Fibermark24 => "Fibermark 24",
            Self::Fibermark24S2 => "Fibermark 24 S2",
            Self::Zing16 => "Zing 16",
            Self::Zing24 => "Zing 24",
            Self::Helix24 => "Helix 24",
            Self::Mini18 => "Mini 18",
            Self::Mini24 => "Mini 24",
            Self::Ext36 => "EXT 36",
        }
    }

    /// Look up a model from a user-facing name, case- and separator-insensitive
    /// (`"Fusion Maker 24"`, `"fusionmaker24"` and `"maker24"` all resolve).
    pub fn from_model_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if key.is_empty() {
            return None;
        }
        Self::ALL.iter().copied().find(|m| {
            let display: String = m
                .display_name()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect();
            let variant: String = format!("{m:?}")
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect();
            display == key || variant == key
        })
    }
}

/// Lifecycle states of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Created, accepting font data, no work performed yet.
    NotStarted,
    /// At least one chunk of work has run.
    Running,
    /// All stages completed; the print file is available.
    Finished,
    /// Generation failed — see the job error message.
    Failed,
    /// Cooperative abort took effect before completion.
    Aborted,
}

impl JobState {
    /// Whether no further work will ever run for this job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Aborted)
    }
}

/// Coarse progress classification reported to hosts.
///
/// Deliberately smaller than [`JobState`]: the boundary distinguishes abort
/// from failure through a dedicated accessor, not through the progress kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressKind {
    NotStarted,
    InProgress,
    Finished,
    Error,
}

/// Value snapshot of a job's progress, produced fresh on each query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub kind: ProgressKind,
    /// Name of the pipeline stage the job is in (or last reached).
    pub stage_name: String,
    /// Optional structured stage detail (element counts, elapsed time).
    pub stage_detail: Option<serde_json::Value>,
    /// Fraction of the current stage completed, when the stage can measure it.
    pub stage_progress: Option<f32>,
    /// Index of the current stage, starting at zero.
    pub stage_index: usize,
    /// Total number of stages in the pipeline.
    pub stage_count: usize,
    /// Overall fraction of the job completed, in `0.0..=1.0`.
    pub total_progress: f32,
}
