//! Observation + score to case-summary text, plus the small presentation helpers
//! (badges, country hints, review proxy envelopes) that travel with it.

use triage_core::{classify, egfr_stage, finite, Observation, ScoreResult};

mod badges;
mod hints;
pub mod review;

pub use badges::{badges, Badge};
pub use hints::country_hints;

/// Bullet shown when the engine raised no flag.
pub const NO_RED_FLAGS: &str =
    "• None detected from entered data (still requires clinical judgement).";

const CLINICIAN_QUESTIONS: [&str; 3] = [
    "• Was blood culture repeated? Speciation done (Staph aureus vs CoNS)? Any likely source (skin/wound/line/urinary/dental)?",
    "• Current meds list (including herbs) and allergies? Any recent antibiotic exposure?",
    "• If kidney concern: repeat creatinine/eGFR, trend ACR/urinalysis, assess volume status and BP.",
];

const ITCH_NOTES: [&str; 2] = [
    "• Itching first-aid: fragrance-free moisturizer, cool showers, avoid harsh soaps; if rash/swelling or breathing symptoms occur, seek urgent care.",
    "• If itching returns with new meds/herbs, clinician should review for drug/allergy reaction; eosinophilia can support that pattern.",
];
const KIDNEY_NOTE: &str = "• Kidney safety: avoid unnecessary NSAIDs (e.g., ibuprofen/diclofenac) unless a clinician says otherwise; many antibiotics need renal dose adjustment.";
const INSOMNIA_NOTE: &str = "• Insomnia: fixed sleep/wake time, reduce caffeine after noon, reduce screens before bed; persistent insomnia deserves clinician review.";
const ERECTILE_NOTE: &str = "• Erectile issues: can follow illness/stress/poor sleep; if persistent, consider BP + glucose/HbA1c + thyroid/testosterone with clinician.";

/// Prompt appended verbatim for the optional downstream review.
pub const REVIEW_PROMPT: &str = "GPT PROMPT (non-prescriptive)
SYSTEM: You are clinical decision-support. Do not prescribe antibiotics. Provide differential, red flags, and next-step questions aligned with local Africa context.
USER: Review this case summary, interpret labs/vitals, and suggest safe next steps and symptom-relief options without prescribing.";

/// Renders the case summary. Every missing field becomes `NA`; nothing here can fail.
pub fn build_summary(observation: &Observation, result: &ScoreResult) -> String {
    let o = observation;
    let ctx = &o.context;
    let stage = egfr_stage(o.egfr);
    let tier = classify(result.points);

    let age = finite(o.age)
        .map(|age| age.to_string())
        .unwrap_or_else(|| "?".to_string());
    let bp = o
        .blood_pressure()
        .map(|bp| bp.to_string())
        .unwrap_or_else(|| text_or_na(&o.blood_pressure_raw));

    let mut lines: Vec<String> = vec![
        "CASE SUMMARY (Educational decision-support; not a prescription)".into(),
        String::new(),
        format!("Brand: {}", ctx.brand.display_name()),
        format!("Country context: {}", ctx.country),
        format!("Mode: {}", ctx.mode.as_str()),
        String::new(),
        "PATIENT".into(),
        format!("- Age/Sex: {age} y/o {}", o.sex),
        format!("- Symptoms: {}", symptom_text(o)),
        format!("- Notes: {}", text_or_na(&o.notes)),
        String::new(),
        "VITALS".into(),
        format!("- Temp: {}", fmt_value(o.temperature, " °C")),
        format!("- BP: {bp}"),
        format!("- HR: {}", fmt_value(o.heart_rate, " bpm")),
        format!("- RR: {}", fmt_value(o.respiratory_rate, " /min")),
        format!("- SpO₂: {}", fmt_value(o.spo2, " %")),
        String::new(),
        "KEY LABS".into(),
        format!(
            "- eGFR: {} mL/min/1.73m² → {} ({})",
            fmt_value(o.egfr, ""),
            stage.code(),
            stage.description()
        ),
        format!("- Creatinine: {} mg/dL", fmt_value(o.creatinine, "")),
        format!("- Urea: {} mg/dL", fmt_value(o.urea, "")),
        format!("- Bicarbonate: {} mmol/L", fmt_value(o.bicarbonate, "")),
        format!(
            "- CBC: WBC {} ×10⁹/L; Hb {} g/dL; Platelets {} ×10⁹/L; Eosinophils {}",
            fmt_value(o.wbc, ""),
            fmt_value(o.hemoglobin, ""),
            fmt_value(o.platelets, ""),
            fmt_value(o.eosinophils, "%")
        ),
        format!(
            "- Electrolytes: Na {}; K {}; Cl {} mmol/L",
            fmt_value(o.sodium, ""),
            fmt_value(o.potassium, ""),
            fmt_value(o.chloride, "")
        ),
        format!(
            "- Inflammation: CRP {} mg/L; Procalcitonin {} ng/mL",
            fmt_value(o.crp, ""),
            fmt_value(o.procalcitonin, "")
        ),
        format!(
            "- Urine: Protein {}; Blood {}; ACR {} mg/g",
            text_or_na(&o.urine_protein),
            text_or_na(&o.urine_blood),
            fmt_value(o.acr, "")
        ),
        format!(
            "- LFTs (itching): Bilirubin {} mg/dL; ALP {} U/L; ALT/AST {}",
            fmt_value(o.bilirubin, ""),
            fmt_value(o.alp, ""),
            text_or_na(&o.alt_ast)
        ),
        String::new(),
        "BLOOD CULTURE".into(),
        format!("- Organism: {}", text_or_na(&o.organism)),
        format!("- Repeated: {}", text_or_na(&o.culture_repeat)),
        format!("- Speciation: {}", text_or_na(&o.speciation)),
        format!("- Antibiogram: {}", text_or_na(&o.antibiogram)),
        String::new(),
        "RISK SCREEN (Educational)".into(),
        format!("- Score: {}/20 → {}", result.points, tier.label()),
        String::new(),
        "RED FLAGS / URGENCY SIGNALS".into(),
    ];

    if result.flags.is_empty() {
        lines.push(NO_RED_FLAGS.to_string());
    } else {
        lines.extend(result.flags.iter().map(|flag| format!("• {flag}")));
    }

    lines.push(String::new());
    lines.push("NEXT HIGH-VALUE CLINICIAN QUESTIONS".into());
    lines.extend(CLINICIAN_QUESTIONS.iter().map(|q| q.to_string()));

    lines.push(String::new());
    lines.push("SYMPTOM SAFETY NOTES (non-prescriptive)".into());
    lines.extend(safety_notes(o).into_iter().map(str::to_string));

    lines.push(String::new());
    lines.push(REVIEW_PROMPT.to_string());

    let mut summary = lines.join("\n");
    summary.push('\n');
    summary
}

/// Conditional first-aid notes; the kidney note is always present.
pub fn safety_notes(observation: &Observation) -> Vec<&'static str> {
    let sx = &observation.symptoms;
    let mut notes = Vec::new();
    if sx.itch {
        notes.extend(ITCH_NOTES);
    }
    notes.push(KIDNEY_NOTE);
    if sx.insomnia {
        notes.push(INSOMNIA_NOTE);
    }
    if sx.ed {
        notes.push(ERECTILE_NOTE);
    }
    notes
}

fn symptom_text(observation: &Observation) -> String {
    let names: Vec<&str> = observation
        .symptoms
        .present()
        .map(|symptom| symptom.display_name())
        .collect();
    if names.is_empty() {
        "none reported".to_string()
    } else {
        names.join(", ")
    }
}

fn fmt_value(value: Option<f64>, unit: &str) -> String {
    match finite(value) {
        Some(v) => format!("{v}{unit}"),
        None => "NA".to_string(),
    }
}

fn text_or_na(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "NA".to_string()
    } else {
        trimmed.to_string()
    }
}
