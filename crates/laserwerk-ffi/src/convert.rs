// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ownership helpers for the C boundary.
//
// Every heap allocation handed across the boundary goes through this module
// so the outstanding-allocation counter stays exact. Binding test suites
// assert the counter returns to zero after a session; a nonzero value means
// a leak or a double-free on the host side.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicIsize, Ordering};

use laserwerk_core::types::ProgressReport;

use crate::types::CProgressReport;

static OUTSTANDING: AtomicIsize = AtomicIsize::new(0);

/// Net count of boundary allocations not yet released.
pub fn outstanding_allocations() -> isize {
    OUTSTANDING.load(Ordering::SeqCst)
}

pub(crate) fn track_alloc() {
    OUTSTANDING.fetch_add(1, Ordering::SeqCst);
}

pub(crate) fn track_free() {
    OUTSTANDING.fetch_sub(1, Ordering::SeqCst);
}

/// Allocate a NUL-terminated copy of `text` for the caller.
///
/// Interior NULs cannot survive the trip and are replaced, not truncated.
pub(crate) fn into_cstring_ptr(text: &str) -> *mut c_char {
    let sanitized;
    let text = if text.contains('\0') {
        sanitized = text.replace('\0', " ");
        sanitized.as_str()
    } else {
        text
    };
    match CString::new(text) {
        Ok(cstring) => {
            track_alloc();
            cstring.into_raw()
        }
        Err(_) => std::ptr::null_mut(),
    }
}

/// Take back and drop a string produced by [`into_cstring_ptr`].
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this crate and
/// not yet freed.
pub(crate) unsafe fn take_cstring_ptr(ptr: *mut c_char) -> bool {
    if ptr.is_null() {
        return true;
    }
    track_free();
    drop(unsafe { CString::from_raw(ptr) });
    true
}

/// Borrow a boundary string as `&str` without taking ownership.
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Allocate a byte buffer for the caller. The pointer/length pair must come
/// back through [`take_byte_ptr`] exactly once.
pub(crate) fn into_byte_ptr(bytes: &[u8]) -> (*mut c_char, usize) {
    let boxed: Box<[u8]> = bytes.to_vec().into_boxed_slice();
    let len = boxed.len();
    track_alloc();
    (Box::into_raw(boxed) as *mut c_char, len)
}

/// Take back and drop a buffer produced by [`into_byte_ptr`].
///
/// # Safety
///
/// `ptr`/`len` must be null or exactly the pair produced by this crate and
/// not yet freed.
pub(crate) unsafe fn take_byte_ptr(ptr: *mut c_char, len: usize) -> bool {
    if ptr.is_null() {
        return true;
    }
    track_free();
    let slice = std::ptr::slice_from_raw_parts_mut(ptr as *mut u8, len);
    drop(unsafe { Box::from_raw(slice) });
    true
}

/// Build the caller-owned C snapshot from an engine progress report.
pub(crate) fn progress_to_c(report: &ProgressReport) -> CProgressReport {
    let stage_json = match &report.stage_detail {
        Some(value) => match serde_json::to_string(value) {
            Ok(json) => into_cstring_ptr(&json),
            Err(_) => std::ptr::null_mut(),
        },
        None => std::ptr::null_mut(),
    };
    CProgressReport {
        progress_type: report.kind.into(),
        stage_name: into_cstring_ptr(&report.stage_name),
        stage_json,
        stage_has_progress: report.stage_progress.is_some(),
        stage_progress: report.stage_progress.unwrap_or(0.0),
        stage_index: report.stage_index,
        stage_count: report.stage_count,
        total_progress: report.total_progress,
    }
}
