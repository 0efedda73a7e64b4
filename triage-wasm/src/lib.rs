//! Framework-neutral WASM <-> JavaScript bridge for the triage engine.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use triage_core::{
    classify, egfr_stage, risk_bar_percent, score, trend, Brand, Mode, Observation, RiskTier,
    ScoreResult, TimelinePoint, TriageContext, TriageError,
};
use triage_report::{badges, build_summary, country_hints, Badge};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
struct JsTriageContext {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    mode: Option<Mode>,
    #[serde(default)]
    brand: Option<Brand>,
}

impl From<JsTriageContext> for TriageContext {
    fn from(ctx: JsTriageContext) -> Self {
        let mut base = TriageContext::default();
        if let Some(country) = ctx.country.filter(|c| !c.trim().is_empty()) {
            base.country = country.trim().to_uppercase();
        }
        if let Some(mode) = ctx.mode {
            base.mode = mode;
        }
        if let Some(brand) = ctx.brand {
            base.brand = brand;
        }
        base
    }
}

#[derive(Debug, Serialize)]
struct Stage {
    code: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct Analysis {
    score: ScoreResult,
    tier: RiskTier,
    tier_label: &'static str,
    percent: u8,
    stage: Stage,
    badges: Vec<Badge>,
    summary: String,
    /// Point the host would append when the user saves to the timeline.
    point: TimelinePoint,
}

fn analyze_observation(mut observation: Observation, context: Option<TriageContext>) -> Analysis {
    if let Some(context) = context {
        observation.context = context;
    }
    let result = score(&observation);
    let tier = classify(result.points);
    let stage = egfr_stage(observation.egfr);
    Analysis {
        tier,
        tier_label: tier.label(),
        percent: risk_bar_percent(result.points),
        stage: Stage {
            code: stage.code(),
            description: stage.description(),
        },
        badges: badges(&observation, result.points),
        summary: build_summary(&observation, &result),
        point: TimelinePoint::from_analysis(&observation, &result, Utc::now()),
        score: result,
    }
}

fn read_observation(input: JsValue) -> Result<Observation, JsValue> {
    if input.is_null() || input.is_undefined() {
        return Err(js_error(TriageError::MissingData));
    }
    from_value::<Observation>(input)
        .map_err(|err| js_error(TriageError::Parse(err.to_string())))
}

fn read_context(context: Option<JsValue>) -> Result<Option<TriageContext>, JsValue> {
    match context {
        Some(js_ctx) if !js_ctx.is_null() && !js_ctx.is_undefined() => {
            let ctx: JsTriageContext = from_value(js_ctx)
                .map_err(|err| JsValue::from_str(&format!("cannot read context: {err}")))?;
            Ok(Some(TriageContext::from(ctx)))
        }
        _ => Ok(None),
    }
}

fn read_points(points: JsValue) -> Result<Vec<TimelinePoint>, JsValue> {
    from_value(points).map_err(|err| JsValue::from_str(&format!("cannot read timeline points: {err}")))
}

fn js_error(err: TriageError) -> JsValue {
    JsValue::from_str(&format!("Triage error: {err}"))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|err| JsValue::from_str(&format!("cannot serialize result: {err}")))
}

fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Scores an observation and returns score, tier, badges, summary text and the timeline point.
#[wasm_bindgen]
pub fn analyze(observation: JsValue, context: Option<JsValue>) -> Result<JsValue, JsValue> {
    init();
    let observation = read_observation(observation)?;
    let context = read_context(context)?;
    to_js(&analyze_observation(observation, context))
}

/// Summary text only, ready for the clipboard.
#[wasm_bindgen]
pub fn summarize(observation: JsValue, context: Option<JsValue>) -> Result<String, JsValue> {
    init();
    let observation = read_observation(observation)?;
    let context = read_context(context)?;
    Ok(analyze_observation(observation, context).summary)
}

#[wasm_bindgen]
pub fn hints(country: &str) -> String {
    country_hints(country)
}

/// Chart series for saved points.
#[wasm_bindgen]
pub fn trend_series(points: JsValue) -> Result<JsValue, JsValue> {
    init();
    let points = read_points(points)?;
    to_js(&trend::trend_series(&points))
}

/// Chart series for saved points plus the unsaved candidate, last 30 only.
#[wasm_bindgen]
pub fn preview_series(points: JsValue, candidate: JsValue) -> Result<JsValue, JsValue> {
    init();
    let points = read_points(points)?;
    let candidate: TimelinePoint = from_value(candidate)
        .map_err(|err| JsValue::from_str(&format!("cannot read preview point: {err}")))?;
    to_js(&trend::preview_series(&points, candidate))
}
