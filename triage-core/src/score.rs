//! Educational risk engine: additive point rules, tiers and eGFR staging.

use serde::{Deserialize, Serialize};

use crate::{finite, Observation};

/// Ceiling applied to the summed points.
pub const MAX_POINTS: u8 = 20;

/// Points plus the human readable flags, in rule evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScoreResult {
    pub points: u8,
    pub flags: Vec<String>,
}

/// Presentation tone shared by risk tiers and status badges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Ok,
    Warn,
    Danger,
}

/// Ordinal severity bucket derived from the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Lower,
    Moderate,
    High,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Lower => "Lower risk (monitor + clinician guidance)",
            RiskTier::Moderate => "Moderate risk (same-day clinician review)",
            RiskTier::High => "High risk (urgent clinical assessment)",
        }
    }

    /// Label without the parenthesised advice, as shown on badges.
    pub fn short_label(self) -> &'static str {
        match self {
            RiskTier::Lower => "Lower risk",
            RiskTier::Moderate => "Moderate risk",
            RiskTier::High => "High risk",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            RiskTier::Lower => Tone::Ok,
            RiskTier::Moderate => Tone::Warn,
            RiskTier::High => Tone::Danger,
        }
    }
}

pub fn classify(points: u8) -> RiskTier {
    match points {
        p if p >= 10 => RiskTier::High,
        p if p >= 5 => RiskTier::Moderate,
        _ => RiskTier::Lower,
    }
}

/// Width of the risk bar, in percent of the 20 point ceiling.
pub fn risk_bar_percent(points: u8) -> u8 {
    let clamped = f64::from(points.min(MAX_POINTS));
    (clamped / f64::from(MAX_POINTS) * 100.0).round() as u8
}

/// KDIGO-style eGFR category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EgfrStage {
    G1,
    G2,
    G3a,
    G3b,
    G4,
    G5,
    Unknown,
}

impl EgfrStage {
    pub fn code(self) -> &'static str {
        match self {
            EgfrStage::G1 => "G1",
            EgfrStage::G2 => "G2",
            EgfrStage::G3a => "G3a",
            EgfrStage::G3b => "G3b",
            EgfrStage::G4 => "G4",
            EgfrStage::G5 => "G5",
            EgfrStage::Unknown => "Unknown",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EgfrStage::G1 => "Normal or high (≥90)",
            EgfrStage::G2 => "Mildly decreased (60–89)",
            EgfrStage::G3a => "Mild–moderate decrease (45–59)",
            EgfrStage::G3b => "Moderate–severe decrease (30–44)",
            EgfrStage::G4 => "Severely decreased (15–29)",
            EgfrStage::G5 => "Kidney failure (<15)",
            EgfrStage::Unknown => "Missing eGFR",
        }
    }
}

pub fn egfr_stage(egfr: Option<f64>) -> EgfrStage {
    let Some(e) = finite(egfr) else {
        return EgfrStage::Unknown;
    };
    match e {
        e if e >= 90.0 => EgfrStage::G1,
        e if e >= 60.0 => EgfrStage::G2,
        e if e >= 45.0 => EgfrStage::G3a,
        e if e >= 30.0 => EgfrStage::G3b,
        e if e >= 15.0 => EgfrStage::G4,
        _ => EgfrStage::G5,
    }
}

#[derive(Default)]
struct Tally {
    points: u32,
    flags: Vec<String>,
}

impl Tally {
    fn add(&mut self, points: u32, flag: Option<&str>) {
        self.points += points;
        if let Some(flag) = flag {
            self.flags.push(flag.to_string());
        }
    }

    fn finish(self) -> ScoreResult {
        ScoreResult {
            points: self.points.min(u32::from(MAX_POINTS)) as u8,
            flags: self.flags,
        }
    }
}

/// Scores an observation. Total: missing or invalid inputs simply skip their rule.
///
/// Rules are evaluated in a fixed order and the flag order is part of the output.
/// This is the extended rule set, including reduced urine with reduced eGFR.
pub fn score(observation: &Observation) -> ScoreResult {
    let mut tally = Tally::default();
    let sx = &observation.symptoms;

    if let Some(temp) = finite(observation.temperature) {
        if temp >= 38.0 || temp <= 36.0 {
            tally.add(2, Some("Abnormal temperature (infection/physiologic stress)."));
        }
    }
    if finite(observation.heart_rate).is_some_and(|hr| hr >= 100.0) {
        tally.add(2, Some("Tachycardia (consider sepsis/dehydration/pain)."));
    }
    if finite(observation.respiratory_rate).is_some_and(|rr| rr >= 22.0) {
        tally.add(3, Some("RR ≥ 22 (sepsis screen positive)."));
    }
    if finite(observation.spo2).is_some_and(|spo2| spo2 > 0.0 && spo2 < 94.0) {
        tally.add(4, Some("SpO₂ < 94% (urgent assessment)."));
    }
    if observation
        .blood_pressure()
        .is_some_and(|bp| bp.systolic < 90)
    {
        tally.add(4, Some("Systolic BP < 90 (shock risk)."));
    }

    let egfr = finite(observation.egfr);
    match egfr {
        Some(e) if e < 30.0 => tally.add(4, Some("eGFR < 30 (high renal risk).")),
        Some(e) if e < 60.0 => tally.add(2, Some("eGFR 30–59 (moderate renal risk).")),
        Some(e) if e < 90.0 => tally.add(1, None),
        _ => {}
    }
    if sx.urine && egfr.is_some_and(|e| e < 60.0) {
        tally.add(
            2,
            Some("Reduced urine + reduced eGFR (same-day assessment)."),
        );
    }

    if finite(observation.procalcitonin).is_some_and(|pct| pct >= 0.5) {
        tally.add(
            3,
            Some("PCT ≥ 0.5 suggests bacterial infection likelihood (interpret clinically)."),
        );
    }
    if finite(observation.crp).is_some_and(|crp| crp >= 10.0) {
        tally.add(2, Some("CRP elevated (inflammation/infection possible)."));
    }

    if observation.organism.to_lowercase().contains("staph") {
        tally.add(1, None);
    }
    if observation.culture_repeat.contains("still positive") {
        tally.add(
            3,
            Some("Repeat culture still positive (persistent bacteremia concern)."),
        );
    }
    if observation.speciation == "Staphylococcus aureus" {
        tally.add(
            4,
            Some("Staph aureus bacteremia signal (urgent clinician-led management)."),
        );
    }

    if sx.itch && finite(observation.eosinophils).is_some_and(|eos| eos > 6.0) {
        tally.add(
            1,
            Some("Itch + eosinophilia: consider allergy/drug reaction/parasites."),
        );
    }
    let cholestatic = finite(observation.alp).is_some_and(|alp| alp > 120.0)
        || finite(observation.bilirubin).is_some_and(|bili| bili > 1.2);
    if sx.itch && cholestatic {
        tally.add(
            2,
            Some("Itch + cholestatic markers (ALP/bilirubin) — evaluate liver/bile causes."),
        );
    }

    if sx.confusion {
        tally.add(3, Some("Confusion is a red-flag symptom."));
    }
    if sx.low_bp {
        tally.add(2, None);
    }
    if sx.sob {
        tally.add(2, None);
    }

    tally.finish()
}
