use serde::{Deserialize, Serialize};
use triage_core::{classify, egfr_stage, finite, Observation, Tone};

/// Status chip shown next to the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Badge {
    pub tone: Tone,
    pub text: String,
}

impl Badge {
    fn new(tone: Tone, text: String) -> Self {
        Self { tone, text }
    }
}

/// Kidney, WBC, eosinophil, culture and risk chips, in display order.
pub fn badges(observation: &Observation, points: u8) -> Vec<Badge> {
    let mut out = Vec::new();

    let egfr = finite(observation.egfr);
    let kidney_tone = match egfr {
        None => Tone::Warn,
        Some(e) if e >= 90.0 => Tone::Ok,
        Some(e) if e >= 60.0 => Tone::Warn,
        Some(_) => Tone::Danger,
    };
    out.push(Badge::new(
        kidney_tone,
        format!("Kidney: {}", egfr_stage(egfr).code()),
    ));

    if let Some(wbc) = finite(observation.wbc) {
        let tone = if (3.5..=11.0).contains(&wbc) {
            Tone::Ok
        } else {
            Tone::Warn
        };
        out.push(Badge::new(tone, format!("WBC: {wbc}")));
    }

    if let Some(eos) = finite(observation.eosinophils) {
        let tone = if eos <= 6.0 { Tone::Ok } else { Tone::Warn };
        out.push(Badge::new(tone, format!("Eos: {eos}%")));
    }

    let organism = observation.organism.trim();
    if !organism.is_empty() {
        out.push(Badge::new(Tone::Warn, format!("Culture: {organism}")));
    }

    let tier = classify(points);
    out.push(Badge::new(tier.tone(), format!("Risk: {}", tier.short_label())));

    out
}
