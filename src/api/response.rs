//! JSON bodies returned to hosts.

use serde::{Deserialize, Serialize};

use crate::common::error::{ServeError, ServeResult};
use crate::inference::Prediction;

const FALLBACK: &str = "{\"ok\":false}";

/// Outcome of a predict call, either the score batch or an error code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<f32>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictResponse {
    pub fn success(prediction: &Prediction) -> Self {
        Self {
            ok: true,
            data: Some(prediction.to_batch()),
            class: prediction.top_class(),
            code: None,
            error: None,
        }
    }

    pub fn failure(err: &ServeError) -> Self {
        Self {
            ok: false,
            data: None,
            class: None,
            code: Some(err.code() as u32),
            error: Some(err.to_string()),
        }
    }

    pub fn from_result(result: &ServeResult<Prediction>) -> Self {
        match result {
            Ok(prediction) => Self::success(prediction),
            Err(err) => Self::failure(err),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| FALLBACK.to_string())
    }
}

/// Body returned by the feedback hook: always an empty list.
pub fn feedback_json(result: &[f32]) -> String {
    serde_json::to_string(result).unwrap_or_else(|_| "[]".to_string())
}
