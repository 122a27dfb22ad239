// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Laserwerk.

use thiserror::Error;

/// Top-level error type for all Laserwerk operations.
#[derive(Debug, Error)]
pub enum LaserwerkError {
    // -- Input errors --
    #[error("markup parse failed: {0}")]
    Markup(String),

    #[error("settings payload invalid: {0}")]
    Settings(String),

    #[error("font data rejected: {0}")]
    Font(String),

    // -- Generation errors --
    #[error("generation failed in stage '{stage}': {detail}")]
    Generation { stage: String, detail: String },

    #[error("job aborted before completion")]
    Aborted,

    #[error("job is already running; {0}")]
    JobRunning(String),

    // -- Transmission --
    #[error("device send failed: {0}")]
    Send(String),

    // -- Infrastructure --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LaserwerkError>;
