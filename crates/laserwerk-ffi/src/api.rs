// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// C ABI functions.
//
// Ownership contract: every heap value a function documents as "must be
// freed" has exactly one matching free function, to be called exactly once.
// Handles are single-owner; using one after `free_prn_gen`, or from two
// threads without external locking, is undefined behavior. No panic crosses
// this boundary — engine-executing entry points run under a panic guard.

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use laserwerk_core::config::EngineConfig;
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
use laserwerk_core::error::LaserwerkError;
use laserwerk_engine::Generator;

#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
use crate::convert::{into_byte_ptr, into_cstring_ptr, take_byte_ptr};
use crate::convert::{borrow_str, progress_to_c, take_cstring_ptr, track_alloc, track_free};
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
use crate::types::{CApiError, CApiResult};
use crate::types::{CMachine, CProgressReport, CProgressType};

/// Opaque print-file generation job.
///
/// Created by `prn_gen_new`, destroyed exactly once by `free_prn_gen`.
pub struct PrnGen {
    inner: Generator,
    /// Backing storage for `prn_gen_error_string`; owned by the handle and
    /// refreshed after every mutating call.
    error_cstring: CString,
}

impl PrnGen {
    fn refresh_error(&mut self) {
        let message = self.inner.error_message().unwrap_or_default();
        self.error_cstring = CString::new(message.replace('\0', " ")).unwrap_or_default();
    }
}

fn guard<T>(fallback: impl FnOnce() -> T, op: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(op)) {
        Ok(value) => value,
        Err(_) => {
            warn!("panic caught at the C boundary");
            fallback()
        }
    }
}

#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
fn api_error_from(message: &str) -> CApiError {
    CApiError {
        error: into_cstring_ptr(message),
    }
}

#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
fn api_result_ok(payload: &[u8]) -> CApiResult {
    let (result, result_size) = into_byte_ptr(payload);
    CApiResult {
        result,
        result_size,
        error: into_cstring_ptr(""),
    }
}

#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
fn api_result_err(message: &str) -> CApiResult {
    let (result, result_size) = into_byte_ptr(&[]);
    CApiResult {
        result,
        result_size,
        error: into_cstring_ptr(message),
    }
}

/// Creates a new print file generator for the given markup, settings
/// payload, and machine.
///
/// Returns null when either pointer is null or not valid UTF-8. Input
/// contents are copied; the pointers are not retained past this call.
/// Markup/settings validity is diagnosed by the first work chunk.
///
/// # Safety
/// - `svg` and `settings` must be valid NUL-terminated strings
/// - The returned handle must be released exactly once with `free_prn_gen`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_new(
    svg: *const c_char,
    settings: *const c_char,
    machine: CMachine,
) -> *mut PrnGen {
    let Some(svg) = (unsafe { borrow_str(svg) }) else {
        return std::ptr::null_mut();
    };
    let Some(settings) = (unsafe { borrow_str(settings) }) else {
        return std::ptr::null_mut();
    };
    let handle = PrnGen {
        inner: Generator::new(svg, settings, machine.into()),
        error_cstring: CString::default(),
    };
    track_alloc();
    Box::into_raw(Box::new(handle))
}

/// Releases a generator handle and everything it owns.
///
/// # Safety
/// - `gen` must be a handle from `prn_gen_new`, not yet freed
/// - The handle must not be used after this call
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_prn_gen(r#gen: *mut PrnGen) -> bool {
    if r#gen.is_null() {
        return false;
    }
    track_free();
    drop(unsafe { Box::from_raw(r#gen) });
    true
}

/// Supplies font bytes for text layout. Legal any number of times before
/// the first work chunk; an empty `error` string means success.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
/// - `data` must point to `data_length` readable bytes
/// - The returned value must be released exactly once with `free_c_api_error`
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_add_font_data(
    r#gen: *mut PrnGen,
    data: *const c_char,
    data_length: usize,
) -> CApiError {
    let Some(r#gen) = (unsafe { r#gen.as_mut() }) else {
        return api_error_from("null generator handle");
    };
    if data.is_null() && data_length > 0 {
        return api_error_from("null font data pointer");
    }
    let bytes = if data_length == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(data as *const u8, data_length) }
    };
    guard(
        || api_error_from("internal error: font registration panicked"),
        || {
            let outcome = match r#gen.inner.add_font_data(bytes) {
                Ok(()) => api_error_from(""),
                Err(e) => api_error_from(&e.to_string()),
            };
            r#gen.refresh_error();
            outcome
        },
    )
}

/// Performs one bounded unit of work. Returns true while more work remains,
/// false once the job is in a terminal state.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_run_chunk(r#gen: *mut PrnGen) -> bool {
    let Some(r#gen) = (unsafe { r#gen.as_mut() }) else {
        return false;
    };
    guard(
        || false,
        || {
            let more = r#gen.inner.step();
            r#gen.refresh_error();
            more
        },
    )
}

/// Runs the job to a terminal state and returns the print file, or the
/// error message that stopped it. An empty `error` string means success.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
/// - The returned value must be released exactly once with `free_c_api_result`
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_run_until_complete(r#gen: *mut PrnGen) -> CApiResult {
    let Some(r#gen) = (unsafe { r#gen.as_mut() }) else {
        return api_result_err("null generator handle");
    };
    guard(
        || api_result_err("internal error: generation panicked"),
        || {
            let outcome = match r#gen.inner.run_to_completion() {
                Ok(payload) => api_result_ok(payload),
                Err(e) => api_result_err(&e.to_string()),
            };
            r#gen.refresh_error();
            outcome
        },
    )
}

/// Asks the job to stop at the next chunk boundary. Non-blocking; the job
/// lands in the aborted state, distinguishable from an error.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_request_abort(r#gen: *mut PrnGen) -> bool {
    let Some(r#gen) = (unsafe { r#gen.as_ref() }) else {
        return false;
    };
    r#gen.inner.request_abort();
    true
}

/// Snapshots the job's progress. Valid in every state.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
/// - The returned value must be released exactly once with
///   `free_c_progress_report`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_get_progress(r#gen: *const PrnGen) -> CProgressReport {
    let Some(r#gen) = (unsafe { r#gen.as_ref() }) else {
        return CProgressReport {
            progress_type: CProgressType::Error,
            stage_name: std::ptr::null_mut(),
            stage_json: std::ptr::null_mut(),
            stage_has_progress: false,
            stage_progress: 0.0,
            stage_index: 0,
            stage_count: 0,
            total_progress: 0.0,
        };
    };
    progress_to_c(&r#gen.inner.progress())
}

/// Reads the job's result. Well-defined in every state: before completion
/// the payload is empty; after a failure or abort the error is set.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
/// - The returned value must be released exactly once with `free_c_api_result`
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_get_result(r#gen: *const PrnGen) -> CApiResult {
    let Some(r#gen) = (unsafe { r#gen.as_ref() }) else {
        return api_result_err("null generator handle");
    };
    if let Some(payload) = r#gen.inner.result() {
        return api_result_ok(payload);
    }
    if r#gen.inner.was_aborted() {
        return api_result_err(&LaserwerkError::Aborted.to_string());
    }
    match r#gen.inner.error_message() {
        Some(message) => api_result_err(message),
        None => api_result_ok(&[]),
    }
}

/// Whether the job finished successfully.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_is_complete(r#gen: *const PrnGen) -> bool {
    unsafe { r#gen.as_ref() }.is_some_and(|r#gen| r#gen.inner.is_complete())
}

/// Whether the job stopped on an error (aborts are reported separately).
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_has_error(r#gen: *const PrnGen) -> bool {
    unsafe { r#gen.as_ref() }.is_some_and(|r#gen| r#gen.inner.has_error())
}

/// Whether an abort request took effect.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_was_aborted(r#gen: *const PrnGen) -> bool {
    unsafe { r#gen.as_ref() }.is_some_and(|r#gen| r#gen.inner.was_aborted())
}

/// Current error message, empty when there is none.
///
/// The storage is owned by the handle and stays valid until the next
/// mutating call or `free_prn_gen`. Do NOT pass it to `free_cstring`.
///
/// # Safety
/// - `gen` must be a live handle from `prn_gen_new`
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_error_string(r#gen: *const PrnGen) -> *const c_char {
    match unsafe { r#gen.as_ref() } {
        Some(r#gen) => r#gen.error_cstring.as_ptr(),
        None => std::ptr::null(),
    }
}

/// Sends a finished print file to the machine at `ip_address`.
/// Fire-and-forget: no retry, and no detail beyond the boolean.
///
/// # Safety
/// - `data` must point to `data_length` readable bytes
/// - `ip_address` must be a valid NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn prn_gen_send_file(
    machine: CMachine,
    data: *const c_char,
    data_length: usize,
    ip_address: *const c_char,
) -> bool {
    if data.is_null() && data_length > 0 {
        return false;
    }
    let Some(ip) = (unsafe { borrow_str(ip_address) }) else {
        return false;
    };
    let payload = if data_length == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(data as *const u8, data_length) }
    };
    guard(
        || false,
        || {
            match laserwerk_print::send_print_file_blocking(
                machine.into(),
                payload,
                ip,
                &EngineConfig::default(),
            ) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "send failed");
                    false
                }
            }
        },
    )
}

/// Releases the strings inside a progress report produced by this API.
/// The report value itself lives with the caller.
///
/// # Safety
/// - `report` must point to a report from `prn_gen_get_progress` whose
///   strings have not been freed yet
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_c_progress_report(report: *const CProgressReport) -> bool {
    let Some(report) = (unsafe { report.as_ref() }) else {
        return false;
    };
    unsafe {
        take_cstring_ptr(report.stage_name);
        take_cstring_ptr(report.stage_json);
    }
    true
}

/// Releases the payload and message inside a result produced by this API.
/// The result value itself lives with the caller.
///
/// # Safety
/// - `result` must point to a result from this API whose contents have not
///   been freed yet
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_c_api_result(result: *const CApiResult) -> bool {
    let Some(result) = (unsafe { result.as_ref() }) else {
        return false;
    };
    unsafe {
        take_byte_ptr(result.result, result.result_size);
        take_cstring_ptr(result.error);
    }
    true
}

/// Releases the message inside an error value produced by this API.
/// The error value itself lives with the caller.
///
/// # Safety
/// - `result` must point to an error from this API whose message has not
///   been freed yet
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_c_api_error(result: *const CApiError) -> bool {
    let Some(result) = (unsafe { result.as_ref() }) else {
        return false;
    };
    unsafe { take_cstring_ptr(result.error) }
}

/// Releases a string allocated by this API.
///
/// # Safety
/// - `text` must be null or a string from this API, not yet freed
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_cstring(text: *mut c_char) -> bool {
    unsafe { take_cstring_ptr(text) }
}

/// Releases a byte buffer allocated by this API.
///
/// # Safety
/// - `data`/`data_length` must be null or exactly a pair from this API,
///   not yet freed
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_carray(data: *mut c_char, data_length: usize) -> bool {
    unsafe { take_byte_ptr(data, data_length) }
}

/// Current version of the engine API.
///
/// # Safety
/// - The returned string must be released exactly once with `free_cstring`
#[cfg(not(all(target_arch = "wasm32", not(target_os = "wasi"))))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn api_version() -> *mut c_char {
    into_cstring_ptr(env!("CARGO_PKG_VERSION"))
}
