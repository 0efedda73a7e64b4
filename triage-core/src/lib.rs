//! Core model and deterministic risk engine for the kidney + infection triage helper.
//!
//! Everything in this crate is pure: the scoring engine, the classifier and the
//! trend helpers take explicit inputs and never read ambient state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod observation;
mod score;
pub mod trend;

pub use observation::{parse_measurement, BloodPressure, Observation, Sex, Symptom, Symptoms};
pub use score::{
    classify, egfr_stage, risk_bar_percent, score, EgfrStage, RiskTier, ScoreResult, Tone,
    MAX_POINTS,
};

/// Number of timeline points kept on a device; older points are evicted first.
pub const TIMELINE_CAPACITY: usize = 250;

/// Audience the report is rendered for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Patient,
    Doctor,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Patient => "patient",
            Mode::Doctor => "doctor",
        }
    }
}

/// Branding printed in the report header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Brand {
    #[serde(rename = "drpius")]
    DrPius,
    /// Also the fallback for unknown brand strings.
    #[default]
    #[serde(other)]
    Bubulizer,
}

impl Brand {
    pub fn display_name(self) -> &'static str {
        match self {
            Brand::Bubulizer => "BUBULIZER Solutions",
            Brand::DrPius => "Dr. Pius Erheyovwe Bubu",
        }
    }
}

/// Presentation context the UI used to keep in globals (country pill, mode, brand).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TriageContext {
    /// ISO country code driving the regional hints (NG, UG, KE).
    pub country: String,
    pub mode: Mode,
    pub brand: Brand,
}

impl Default for TriageContext {
    fn default() -> Self {
        Self {
            country: "NG".to_string(),
            mode: Mode::Patient,
            brand: Brand::Bubulizer,
        }
    }
}

/// Reduced snapshot saved to the timeline for trend viewing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelinePoint {
    #[serde(rename = "ts")]
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub brand: Brand,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub egfr: Option<f64>,
    #[serde(default, rename = "creat")]
    pub creatinine: Option<f64>,
    #[serde(default)]
    pub crp: Option<f64>,
    #[serde(default, rename = "pct")]
    pub procalcitonin: Option<f64>,
    #[serde(default)]
    pub spo2: Option<f64>,
    #[serde(default)]
    pub risk: u8,
    #[serde(default)]
    pub notes: String,
}

impl TimelinePoint {
    /// Builds the point the "save to timeline" action records for an analysed observation.
    pub fn from_analysis(
        observation: &Observation,
        result: &ScoreResult,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recorded_at: observation.recorded_at.unwrap_or(recorded_at),
            country: observation.context.country.clone(),
            brand: observation.context.brand,
            mode: observation.context.mode,
            egfr: finite(observation.egfr),
            creatinine: finite(observation.creatinine),
            crp: finite(observation.crp),
            procalcitonin: finite(observation.procalcitonin),
            spo2: finite(observation.spo2),
            risk: result.points,
            notes: observation.notes.clone(),
        }
    }
}

/// Errors raised while reading triage inputs.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("observation input is empty")]
    MissingData,
    #[error("cannot read observation: {0}")]
    Parse(String),
}

/// Drops NaN and infinities so they behave exactly like a missing value.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
