// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! # Laserwerk FFI
//!
//! C ABI for the Laserwerk print-file generation engine, plus a safe
//! resource-owning wrapper for Rust hosts.
//!
//! ## Functions
//!
//! ### Job lifecycle
//! - [`prn_gen_new`] / [`free_prn_gen`] - Create and destroy a job handle
//! - [`prn_gen_add_font_data`] - Supply font bytes before the first chunk
//! - [`prn_gen_run_chunk`] - One bounded unit of work
//! - [`prn_gen_run_until_complete`] - Drain the job in one blocking call
//! - [`prn_gen_request_abort`] - Cooperative stop at the next chunk boundary
//!
//! ### Inspection
//! - [`prn_gen_get_progress`] - Fresh progress snapshot (must be freed)
//! - [`prn_gen_get_result`] - Result value (must be freed)
//! - [`prn_gen_is_complete`] / [`prn_gen_has_error`] / [`prn_gen_was_aborted`]
//! - [`prn_gen_error_string`] - Handle-owned message; do NOT free
//!
//! ### Utilities
//! - [`prn_gen_send_file`] - Raw TCP transmission to a machine
//! - [`api_version`] - Engine version string (must be freed)
//! - [`free_c_progress_report`] / [`free_c_api_result`] / [`free_c_api_error`]
//!   / [`free_cstring`] / [`free_carray`]
//!
//! ## Ownership rules
//!
//! Every value documented as "must be freed" has exactly one matching free
//! function; call it exactly once, after reading what you need. Handles are
//! single-owner and not internally synchronized. The
//! [`outstanding_allocations`] counter lets binding test suites assert the
//! books balance after a session.
//!
//! ## C example
//!
//! ```c
//! #include "laserwerk.h"
//!
//! PrnGen *job = prn_gen_new(svg_text, settings_json, CMachine::Maker24);
//! CApiResult result = prn_gen_run_until_complete(job);
//! if (result.error[0] == '\0') {
//!     prn_gen_send_file(CMachine::Maker24, result.result, result.result_size, "10.0.1.50");
//! }
//! free_c_api_result(&result);
//! free_prn_gen(job);
//! ```
//!
//! ## Restricted targets
//!
//! On `wasm32` without WASI there are no C string/heap conventions to
//! uphold, so `CApiError`, `CApiResult`, `free_cstring`, `free_carray`,
//! `api_version`, and the operations returning those types are compiled
//! out; the chunked lifecycle and progress surface remain.

mod api;
mod convert;
mod types;
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
mod wrapper;

pub use api::*;
pub use convert::outstanding_allocations;
pub use types::*;
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
pub use wrapper::{ApiError, ApiResult, PrintFileGenerator};
