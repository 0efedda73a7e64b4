//! Chart-ready series built from timeline points.
//!
//! The charting layer only draws what comes out of here: points are ordered
//! chronologically and each series carries the y-bounds it should be drawn with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{finite, TimelinePoint, MAX_POINTS};

/// Number of points shown in the live preview before a point is saved.
pub const PREVIEW_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    /// Data range padded by 15% of the span; a flat series is widened by one unit each way.
    pub fn padded(values: impl IntoIterator<Item = f64>) -> Self {
        let mut finite_values = values.into_iter().filter(|v| v.is_finite()).peekable();
        if finite_values.peek().is_none() {
            return Self { min: 0.0, max: 1.0 };
        }

        let (mut min, mut max) = finite_values.fold((f64::INFINITY, f64::NEG_INFINITY), |acc, v| {
            (acc.0.min(v), acc.1.max(v))
        });
        if min == max {
            min -= 1.0;
            max += 1.0;
        }
        let pad = (max - min) * 0.15;
        Self {
            min: min - pad,
            max: max + pad,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub recorded_at: DateTime<Utc>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendSeries {
    pub name: String,
    pub unit: Option<String>,
    pub bounds: Bounds,
    pub points: Vec<TrendPoint>,
}

/// eGFR, creatinine, CRP and risk series over the given points, oldest first.
pub fn trend_series(points: &[TimelinePoint]) -> Vec<TrendSeries> {
    let mut ordered: Vec<&TimelinePoint> = points.iter().collect();
    ordered.sort_by_key(|point| point.recorded_at);

    let risk_bounds = Bounds {
        min: 0.0,
        max: f64::from(MAX_POINTS),
    };

    vec![
        build_series(&ordered, "eGFR", Some("mL/min/1.73m²"), None, |p| p.egfr),
        build_series(&ordered, "Creatinine", Some("mg/dL"), None, |p| {
            p.creatinine
        }),
        build_series(&ordered, "CRP", Some("mg/L"), None, |p| p.crp),
        build_series(&ordered, "Risk", None, Some(risk_bounds), |p| {
            Some(f64::from(p.risk))
        }),
    ]
}

/// Series for the saved points plus an unsaved candidate, limited to the last
/// [`PREVIEW_WINDOW`] points.
pub fn preview_series(saved: &[TimelinePoint], candidate: TimelinePoint) -> Vec<TrendSeries> {
    let mut merged: Vec<TimelinePoint> = saved.to_vec();
    merged.push(candidate);
    let start = merged.len().saturating_sub(PREVIEW_WINDOW);
    trend_series(&merged[start..])
}

fn build_series(
    ordered: &[&TimelinePoint],
    name: &str,
    unit: Option<&str>,
    fixed_bounds: Option<Bounds>,
    value: impl Fn(&TimelinePoint) -> Option<f64>,
) -> TrendSeries {
    let points: Vec<TrendPoint> = ordered
        .iter()
        .map(|point| TrendPoint {
            recorded_at: point.recorded_at,
            value: finite(value(point)),
        })
        .collect();

    let bounds =
        fixed_bounds.unwrap_or_else(|| Bounds::padded(points.iter().filter_map(|p| p.value)));

    TrendSeries {
        name: name.to_string(),
        unit: unit.map(str::to_string),
        bounds,
        points,
    }
}
