// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine tuning knobs.

use serde::{Deserialize, Serialize};

/// Tunable parameters of the generation engine.
///
/// The defaults are what the C boundary uses; embedding hosts that link the
/// Rust crates directly can override per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Markup elements planned per work chunk.
    pub plan_chunk: usize,
    /// Motion records encoded per work chunk.
    pub encode_chunk: usize,
    /// Maximum chord deviation when flattening curves, in millimetres.
    pub curve_tolerance_mm: f32,
    /// TCP port print files are sent to (raw byte stream).
    pub send_port: u16,
    /// Timeout for the whole network send, in seconds.
    pub send_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plan_chunk: 64,
            encode_chunk: 256,
            curve_tolerance_mm: 0.1,
            send_port: 9100,
            send_timeout_secs: 60,
        }
    }
}
