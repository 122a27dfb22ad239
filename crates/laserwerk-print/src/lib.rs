// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Laserwerk — network transmission of finished print files.

pub mod send;

pub use send::{send_print_file, send_print_file_blocking};
