//! FFI bindings for CVC Sentinel
//!
//! This module provides C-compatible functions for calling the engine from the
//! bedside app. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `cvc_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{EngineConfig, RiskThresholds};
use crate::pipeline::{assess_capture_json, SurveillanceProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Thresholds JSON from the caller; NULL means the environment
unsafe fn config_from(thresholds: *const c_char) -> EngineConfig {
    match cstr_to_string(thresholds) {
        Some(raw) => EngineConfig::new(RiskThresholds::parse_or_default(Some(&raw))),
        None => EngineConfig::from_env(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Assess a capture JSON and return the assessment payload JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `thresholds` may be NULL to read `RISK_BAND_THRESHOLDS` from the environment.
/// - Returns a newly allocated string that must be freed with `cvc_free_string`.
/// - Returns NULL on error; call `cvc_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cvc_assess_capture(
    json: *const c_char,
    thresholds: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match assess_capture_json(json_str, config_from(thresholds)) {
        Ok(payload) => string_to_cstr(&payload),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a SurveillanceProcessor
pub struct CvcProcessorHandle {
    processor: SurveillanceProcessor,
}

/// Create a new processor.
///
/// # Safety
/// - `thresholds` may be NULL to read `RISK_BAND_THRESHOLDS` from the environment.
/// - Returns a pointer that must be freed with `cvc_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn cvc_processor_new(thresholds: *const c_char) -> *mut CvcProcessorHandle {
    clear_last_error();

    let processor = SurveillanceProcessor::new(config_from(thresholds));
    Box::into_raw(Box::new(CvcProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cvc_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cvc_processor_free(processor: *mut CvcProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Submit a telemetry or capture JSON (tagged by `kind`) to a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cvc_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cvc_free_string`.
/// - Returns NULL on error; call `cvc_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cvc_processor_submit(
    processor: *mut CvcProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_json(&json_str) {
        Ok(outcome) => string_to_cstr(&outcome),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Save processor state (shift windows and history) to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cvc_processor_new`.
/// - Returns a newly allocated string that must be freed with `cvc_free_string`.
/// - Returns NULL on error; call `cvc_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cvc_processor_save_state(processor: *mut CvcProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.save_state() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load processor state from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cvc_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `cvc_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn cvc_processor_load_state(
    processor: *mut CvcProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.load_state(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a `cvc_` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `cvc_` function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn cvc_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - The returned pointer is valid until the next `cvc_` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cvc_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the engine version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn cvc_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn capture_json() -> CString {
        CString::new(
            r#"{
                "patient_id": "bed-4",
                "insertion_date": "2024-05-01T08:00:00Z",
                "captured_at": "2024-05-03T08:00:00Z",
                "patient_factors": { "agitation": false },
                "safety_checklist": {
                    "caps_closed": true,
                    "gloves_worn": true,
                    "no_abnormalities": true,
                    "dressing_intact": true
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_assess_capture() {
        unsafe {
            let json = capture_json();
            let result = cvc_assess_capture(json.as_ptr(), ptr::null());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("payload_version"));
            assert!(result_str.contains("\"risk_phase\": \"early\""));

            cvc_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = cvc_processor_new(ptr::null());
            assert!(!processor.is_null());

            let telemetry = CString::new(
                r#"{"kind":"telemetry","patient_id":"bed-4","submitted_at":"2024-05-03T07:00:00Z","telemetry":{"traction_pulls_red":1}}"#,
            )
            .unwrap();
            let result = cvc_processor_submit(processor, telemetry.as_ptr());
            assert!(!result.is_null());
            cvc_free_string(result);

            let state = cvc_processor_save_state(processor);
            assert!(!state.is_null());

            let restored = cvc_processor_new(ptr::null());
            assert_eq!(cvc_processor_load_state(restored, state), 0);

            cvc_free_string(state);
            cvc_processor_free(processor);
            cvc_processor_free(restored);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid = CString::new("not json").unwrap();
            let result = cvc_assess_capture(invalid.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = cvc_last_error();
            assert!(!error.is_null());
            assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());

            let result = cvc_processor_submit(ptr::null_mut(), invalid.as_ptr());
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = cvc_version();
            assert!(!CStr::from_ptr(version).to_str().unwrap().is_empty());
        }
    }
}
