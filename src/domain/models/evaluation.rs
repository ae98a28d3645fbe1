//! Scoring artifacts returned by the backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Final risk verdict for one screening run. Produced once by the
/// evaluation endpoint, read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Coarse risk bucket, e.g. "low" / "moderate" / "high".
    pub risk_level: String,

    /// Model probability in [0, 1].
    #[serde(rename = "dyslexia_probability")]
    pub probability: f64,

    /// Named feature values the model derived from the response logs.
    #[serde(default)]
    pub features: HashMap<String, f64>,
}

/// Handwriting analysis produced out-of-band by the `/dysgraphia` endpoint.
///
/// Stored in the aggregator as an auxiliary per-run artifact; it does not
/// participate in trial progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandwritingReport {
    pub median_letter_height: f64,
    pub spacing_cv: f64,
    pub size_cv: f64,
    pub ocr_score: f64,
    pub risk_score: f64,
    pub verdict: String,

    /// Bounding boxes of detected words, passed through untyped.
    #[serde(default)]
    pub word_boxes: Vec<serde_json::Value>,
}
