//! C-compatible API for hosting runtimes that are not written in Rust.
//!
//! A host creates one model handle at startup with `mnist_serve_init` (or
//! `mnist_serve_init_from`), keeps it for the life of the process and releases
//! it with `mnist_serve_free`. Every string returned by this module is owned by
//! the caller and must be released with `mnist_serve_free_str`.
//!
//! Both init calls install the JSON log subscriber on stderr unless the
//! process already has one.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::{ptr, slice};

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::common::config::AppCfg;
use crate::common::error::{ServeError, ServeResult};
use crate::common::log;
use crate::inference::{Feedback, MnistModel};

use super::response::{feedback_json, PredictResponse};

const FALLBACK: &CStr = c"{\"ok\":false}";

/// ABI version to coordinate with the host.
#[no_mangle]
pub extern "C" fn mnist_serve_api_version() -> u32 {
    1
}

/// Load the configured checkpoint. Returns null when the model cannot be loaded.
#[no_mangle]
pub extern "C" fn mnist_serve_init() -> *mut MnistModel {
    let cfg = AppCfg::load();
    log::init_once(&cfg.log_filter);
    into_handle(MnistModel::from_checkpoint(cfg.checkpoint_path))
}

/// Load the checkpoint at `path`. Returns null when the model cannot be loaded.
///
/// # Safety
/// `path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mnist_serve_init_from(path: *const c_char) -> *mut MnistModel {
    log::init_once(&AppCfg::load().log_filter);
    match read_str(path) {
        Some(path) => into_handle(MnistModel::from_checkpoint(PathBuf::from(path))),
        None => ptr::null_mut(),
    }
}

/// Classify `len` bytes of encoded image and return a JSON response.
///
/// `feature_names_json` is null or a JSON array of strings.
///
/// # Safety
/// `model` must be null or a handle from `mnist_serve_init*` that has not been
/// freed. `data` must point to `len` readable bytes when `len > 0`.
/// `feature_names_json` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mnist_serve_predict(
    model: *const MnistModel,
    data: *const u8,
    len: usize,
    feature_names_json: *const c_char,
) -> *mut c_char {
    let result = predict(model, data, len, feature_names_json);
    string_to_raw(PredictResponse::from_result(&result).to_json())
}

unsafe fn predict(
    model: *const MnistModel,
    data: *const u8,
    len: usize,
    feature_names_json: *const c_char,
) -> ServeResult<crate::inference::Prediction> {
    let model = model
        .as_ref()
        .ok_or_else(|| ServeError::invalid("null model handle"))?;
    let payload = read_bytes(data, len)?;
    let feature_names = read_json::<Vec<String>>(feature_names_json)?;

    model.predict(payload, feature_names.as_deref())
}

/// Forward a reward signal. Always returns the JSON text `[]`.
///
/// Malformed optional arguments are logged and ignored.
///
/// # Safety
/// Same pointer rules as [`mnist_serve_predict`]; `truth_json` must be null or
/// a NUL-terminated JSON array of numbers.
#[no_mangle]
pub unsafe extern "C" fn mnist_serve_send_feedback(
    model: *const MnistModel,
    features: *const u8,
    len: usize,
    feature_names_json: *const c_char,
    reward: f64,
    truth_json: *const c_char,
) -> *mut c_char {
    let Some(model) = model.as_ref() else {
        warn!(ev = "send_feedback", "null model handle");
        return string_to_raw(feedback_json(&[]));
    };

    let features = read_bytes(features, len).unwrap_or_default();
    let feature_names = read_json::<Vec<String>>(feature_names_json).unwrap_or_else(|err| {
        warn!(ev = "send_feedback", error = %err, "ignoring feature names");
        None
    });
    let truth = read_json::<Vec<f32>>(truth_json).unwrap_or_else(|err| {
        warn!(ev = "send_feedback", error = %err, "ignoring truth");
        None
    });

    let feedback = Feedback {
        features,
        feature_names: feature_names.as_deref(),
        reward,
        truth: truth.as_deref(),
    };
    string_to_raw(feedback_json(&model.send_feedback(&feedback)))
}

/// Release a model handle.
///
/// # Safety
/// `model` must be null or a handle from `mnist_serve_init*` not freed before.
#[no_mangle]
pub unsafe extern "C" fn mnist_serve_free(model: *mut MnistModel) {
    if !model.is_null() {
        drop(Box::from_raw(model));
    }
}

/// Free strings allocated by this library.
///
/// # Safety
/// `ptr` must be null or a string returned by this library not freed before.
#[no_mangle]
pub unsafe extern "C" fn mnist_serve_free_str(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

fn into_handle(result: ServeResult<MnistModel>) -> *mut MnistModel {
    // Load failures are already logged by `MnistModel::load`.
    match result {
        Ok(model) => Box::into_raw(Box::new(model)),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

unsafe fn read_bytes<'a>(data: *const u8, len: usize) -> ServeResult<&'a [u8]> {
    if len == 0 {
        Ok(&[])
    } else if data.is_null() {
        Err(ServeError::invalid("null payload with non-zero length"))
    } else {
        Ok(slice::from_raw_parts(data, len))
    }
}

unsafe fn read_json<T: DeserializeOwned>(ptr: *const c_char) -> ServeResult<Option<T>> {
    if ptr.is_null() {
        return Ok(None);
    }
    let text = CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| ServeError::invalid("argument is not valid UTF-8"))?;
    serde_json::from_str::<Option<T>>(text)
        .map_err(|err| ServeError::invalid(format!("malformed JSON argument: {err}")))
}

fn string_to_raw(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => CString::from(FALLBACK).into_raw(),
    }
}
