// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Laserwerk — the generation engine: markup parsing, font handling, motion
// planning, device-stream encoding, and the chunked job scheduler that ties
// the stages together behind one handle.

pub mod encode;
pub mod fonts;
pub mod generator;
pub mod plan;
pub mod svg;

pub use fonts::FontStore;
pub use generator::Generator;
