// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Safe resource-owning wrapper over the C ABI.
//
// One wrapper owns one handle for its whole lifetime: construction calls
// `prn_gen_new`, drop calls `free_prn_gen`, every raw struct coming back is
// converted to an owned value and freed before the conversion function
// returns. Move-only; cloning a handle is not a thing the boundary offers.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr::NonNull;

use crate::api::{
    api_version, free_c_api_error, free_c_api_result, free_cstring, free_prn_gen,
    prn_gen_add_font_data, prn_gen_new, prn_gen_run_until_complete, PrnGen,
};
use crate::types::{CApiError, CApiResult, CMachine};

/// Owned outcome of an operation that may produce a print file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResult {
    pub payload: Vec<u8>,
    pub message: String,
    pub succeeded: bool,
}

/// Owned outcome of an operation with no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
    pub succeeded: bool,
}

/// Read a boundary string without taking ownership.
fn string_from(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

impl ApiResult {
    /// Convert a raw result and free it, in that order, exactly once.
    fn from_raw(raw: CApiResult) -> Self {
        let payload = if raw.result.is_null() || raw.result_size == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(raw.result as *const u8, raw.result_size) }
                .to_vec()
        };
        let message = string_from(raw.error);
        unsafe { free_c_api_result(&raw) };
        Self {
            succeeded: message.is_empty(),
            payload,
            message,
        }
    }
}

impl ApiError {
    /// Convert a raw error and free it, in that order, exactly once.
    fn from_raw(raw: CApiError) -> Self {
        let message = string_from(raw.error);
        unsafe { free_c_api_error(&raw) };
        Self {
            succeeded: message.is_empty(),
            message,
        }
    }
}

/// Scoped owner of one generation job.
pub struct PrintFileGenerator {
    handle: NonNull<PrnGen>,
}

impl PrintFileGenerator {
    /// Create a job for the given markup, settings payload, and machine.
    ///
    /// Returns `None` when the boundary refuses a handle (inputs with
    /// interior NULs, for instance).
    pub fn new(svg: &str, settings: &str, machine: CMachine) -> Option<Self> {
        let svg = CString::new(svg).ok()?;
        let settings = CString::new(settings).ok()?;
        let raw = unsafe { prn_gen_new(svg.as_ptr(), settings.as_ptr(), machine) };
        NonNull::new(raw).map(|handle| Self { handle })
    }

    /// Forward font bytes to the engine.
    pub fn add_font_data(&mut self, data: &[u8]) -> ApiError {
        let raw = unsafe {
            prn_gen_add_font_data(
                self.handle.as_ptr(),
                data.as_ptr() as *const c_char,
                data.len(),
            )
        };
        ApiError::from_raw(raw)
    }

    /// Run the job to completion and hand back the owned outcome.
    pub fn generate_print_file(&mut self) -> ApiResult {
        let raw = unsafe { prn_gen_run_until_complete(self.handle.as_ptr()) };
        ApiResult::from_raw(raw)
    }

    /// Engine version; independent of any handle.
    pub fn api_version() -> String {
        let raw = unsafe { api_version() };
        let version = string_from(raw);
        unsafe { free_cstring(raw) };
        version
    }
}

impl Drop for PrintFileGenerator {
    fn drop(&mut self) {
        unsafe { free_prn_gen(self.handle.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::outstanding_allocations;

    const MARKUP: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20mm" height="10mm" viewBox="0 0 20 10">
        <rect x="2" y="2" width="16" height="6" fill="none" stroke="black" stroke-width="0.5"/>
    </svg>"#;

    #[test]
    fn generate_owns_the_outcome_and_frees_the_raw() {
        let before = outstanding_allocations();
        {
            let mut job =
                PrintFileGenerator::new(MARKUP, "", CMachine::Maker24).expect("handle");
            let result = job.generate_print_file();
            assert!(result.succeeded, "error: {}", result.message);
            assert!(!result.payload.is_empty());
            assert!(result.message.is_empty());
        }
        assert_eq!(outstanding_allocations(), before);
    }

    #[test]
    fn font_errors_become_owned_values() {
        let before = outstanding_allocations();
        {
            let mut job =
                PrintFileGenerator::new(MARKUP, "", CMachine::Zing24).expect("handle");
            let rejected = job.add_font_data(b"junk");
            assert!(!rejected.succeeded);
            assert!(!rejected.message.is_empty());

            let accepted = job.add_font_data(&[0x00, 0x01, 0x00, 0x00, 0, 0, 0, 0]);
            assert!(accepted.succeeded);
            assert!(accepted.message.is_empty());
        }
        assert_eq!(outstanding_allocations(), before);
    }

    #[test]
    fn failed_generation_reports_not_throws() {
        let mut job = PrintFileGenerator::new("<svg", "", CMachine::Pro24).expect("handle");
        let result = job.generate_print_file();
        assert!(!result.succeeded);
        assert!(!result.message.is_empty());
        assert!(result.payload.is_empty());
    }

    #[test]
    fn interior_nul_inputs_refuse_a_wrapper() {
        assert!(PrintFileGenerator::new("a\0b", "", CMachine::Pro24).is_none());
    }

    #[test]
    fn version_is_queryable_without_a_handle() {
        let version = PrintFileGenerator::api_version();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
