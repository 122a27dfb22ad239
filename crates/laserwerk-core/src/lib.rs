// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Laserwerk — Core types, settings model, and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::EngineConfig;
pub use error::LaserwerkError;
pub use settings::JobSettings;
pub use types::*;
