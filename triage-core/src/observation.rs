use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{TriageContext, TriageError};

/// Sex as captured by the intake form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Sex {
    Male,
    Female,
    Other,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
            Sex::Unspecified => "unspecified",
        };
        f.write_str(text)
    }
}

/// Fixed set of symptom checkboxes, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symptom {
    Fever,
    LowBloodPressure,
    ShortnessOfBreath,
    Confusion,
    Itch,
    Rash,
    Insomnia,
    ReducedUrine,
    SeverePain,
    ErectileIssue,
}

impl Symptom {
    pub const ALL: [Symptom; 10] = [
        Symptom::Fever,
        Symptom::LowBloodPressure,
        Symptom::ShortnessOfBreath,
        Symptom::Confusion,
        Symptom::Itch,
        Symptom::Rash,
        Symptom::Insomnia,
        Symptom::ReducedUrine,
        Symptom::SeverePain,
        Symptom::ErectileIssue,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Symptom::Fever => "fever/chills",
            Symptom::LowBloodPressure => "dizziness/low BP",
            Symptom::ShortnessOfBreath => "shortness of breath",
            Symptom::Confusion => "confusion",
            Symptom::Itch => "itching",
            Symptom::Rash => "rash/swelling",
            Symptom::Insomnia => "insomnia",
            Symptom::ReducedUrine => "reduced/dark urine",
            Symptom::SeverePain => "severe pain",
            Symptom::ErectileIssue => "erectile issues",
        }
    }
}

/// Symptom presence flags, serialized with the form's checkbox keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Symptoms {
    pub fever: bool,
    #[serde(rename = "lowbp")]
    pub low_bp: bool,
    pub sob: bool,
    pub confusion: bool,
    pub itch: bool,
    pub rash: bool,
    pub insomnia: bool,
    pub urine: bool,
    pub pain: bool,
    pub ed: bool,
}

impl Symptoms {
    pub fn has(&self, symptom: Symptom) -> bool {
        match symptom {
            Symptom::Fever => self.fever,
            Symptom::LowBloodPressure => self.low_bp,
            Symptom::ShortnessOfBreath => self.sob,
            Symptom::Confusion => self.confusion,
            Symptom::Itch => self.itch,
            Symptom::Rash => self.rash,
            Symptom::Insomnia => self.insomnia,
            Symptom::ReducedUrine => self.urine,
            Symptom::SeverePain => self.pain,
            Symptom::ErectileIssue => self.ed,
        }
    }

    pub fn set(&mut self, symptom: Symptom, present: bool) {
        let slot = match symptom {
            Symptom::Fever => &mut self.fever,
            Symptom::LowBloodPressure => &mut self.low_bp,
            Symptom::ShortnessOfBreath => &mut self.sob,
            Symptom::Confusion => &mut self.confusion,
            Symptom::Itch => &mut self.itch,
            Symptom::Rash => &mut self.rash,
            Symptom::Insomnia => &mut self.insomnia,
            Symptom::ReducedUrine => &mut self.urine,
            Symptom::SeverePain => &mut self.pain,
            Symptom::ErectileIssue => &mut self.ed,
        };
        *slot = present;
    }

    /// Present symptoms in form order.
    pub fn present(&self) -> impl Iterator<Item = Symptom> + '_ {
        Symptom::ALL.into_iter().filter(|symptom| self.has(*symptom))
    }
}

/// Structurally valid blood pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

impl BloodPressure {
    /// Parses `SYS/DIA` with two or three digits on each side.
    pub fn parse(raw: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(\d{2,3})\s*/\s*(\d{2,3})$").expect("blood pressure pattern is valid")
        });

        let caps = pattern.captures(raw.trim())?;
        Some(Self {
            systolic: caps[1].parse().ok()?,
            diastolic: caps[2].parse().ok()?,
        })
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// Reads a form field as a number; blank, garbage and non-finite values are missing.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lenient readers for intake form values.
mod form_value {
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    use super::parse_measurement;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FormNumber {
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    /// Number, numeric text, blank, garbage or null; anything unusable is missing.
    pub fn measurement<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<FormNumber>::deserialize(deserializer)?;
        Ok(match value {
            Some(FormNumber::Number(v)) => Some(v).filter(|v| v.is_finite()),
            Some(FormNumber::Text(raw)) => parse_measurement(&raw),
            Some(FormNumber::Other(_)) | None => None,
        })
    }

    /// Text field where `null` reads as empty.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }
}

/// One intake: demographics, vitals, labs, culture results and presentation context.
///
/// Numeric fields are `None` when missing. Text fields are kept verbatim for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Observation {
    #[serde(deserialize_with = "form_value::measurement")]
    pub age: Option<f64>,
    pub sex: Sex,
    #[serde(deserialize_with = "form_value::text")]
    pub notes: String,
    #[serde(rename = "sx")]
    pub symptoms: Symptoms,

    #[serde(rename = "temp", deserialize_with = "form_value::measurement")]
    pub temperature: Option<f64>,
    /// Raw `SYS/DIA` text; see [`Observation::blood_pressure`].
    #[serde(rename = "bp", deserialize_with = "form_value::text")]
    pub blood_pressure_raw: String,
    #[serde(rename = "hr", deserialize_with = "form_value::measurement")]
    pub heart_rate: Option<f64>,
    #[serde(rename = "rr", deserialize_with = "form_value::measurement")]
    pub respiratory_rate: Option<f64>,
    #[serde(deserialize_with = "form_value::measurement")]
    pub spo2: Option<f64>,
    #[serde(deserialize_with = "form_value::measurement")]
    pub weight: Option<f64>,

    #[serde(deserialize_with = "form_value::measurement")]
    pub egfr: Option<f64>,
    #[serde(rename = "creat", deserialize_with = "form_value::measurement")]
    pub creatinine: Option<f64>,
    #[serde(deserialize_with = "form_value::measurement")]
    pub urea: Option<f64>,
    #[serde(rename = "bicarb", deserialize_with = "form_value::measurement")]
    pub bicarbonate: Option<f64>,

    #[serde(deserialize_with = "form_value::measurement")]
    pub wbc: Option<f64>,
    #[serde(rename = "hb", deserialize_with = "form_value::measurement")]
    pub hemoglobin: Option<f64>,
    #[serde(rename = "plt", deserialize_with = "form_value::measurement")]
    pub platelets: Option<f64>,
    #[serde(rename = "eos", deserialize_with = "form_value::measurement")]
    pub eosinophils: Option<f64>,

    #[serde(rename = "na", deserialize_with = "form_value::measurement")]
    pub sodium: Option<f64>,
    #[serde(rename = "k", deserialize_with = "form_value::measurement")]
    pub potassium: Option<f64>,
    #[serde(rename = "cl", deserialize_with = "form_value::measurement")]
    pub chloride: Option<f64>,

    #[serde(deserialize_with = "form_value::measurement")]
    pub crp: Option<f64>,
    #[serde(rename = "pct", deserialize_with = "form_value::measurement")]
    pub procalcitonin: Option<f64>,

    #[serde(rename = "u_protein", deserialize_with = "form_value::text")]
    pub urine_protein: String,
    #[serde(rename = "u_blood", deserialize_with = "form_value::text")]
    pub urine_blood: String,
    #[serde(deserialize_with = "form_value::measurement")]
    pub acr: Option<f64>,

    #[serde(rename = "bili", deserialize_with = "form_value::measurement")]
    pub bilirubin: Option<f64>,
    #[serde(deserialize_with = "form_value::measurement")]
    pub alp: Option<f64>,
    #[serde(rename = "altast", deserialize_with = "form_value::text")]
    pub alt_ast: String,

    #[serde(rename = "org", deserialize_with = "form_value::text")]
    pub organism: String,
    #[serde(rename = "bc_repeat", deserialize_with = "form_value::text")]
    pub culture_repeat: String,
    #[serde(rename = "bc_spec", deserialize_with = "form_value::text")]
    pub speciation: String,
    #[serde(rename = "abx", deserialize_with = "form_value::text")]
    pub antibiogram: String,

    #[serde(flatten)]
    pub context: TriageContext,
    #[serde(rename = "ts")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Observation {
    /// Reads an observation from the JSON shape the intake form produces.
    pub fn from_json(input: &str) -> Result<Self, TriageError> {
        if input.trim().is_empty() {
            return Err(TriageError::MissingData);
        }
        serde_json::from_str(input).map_err(|err| TriageError::Parse(err.to_string()))
    }

    /// Parsed blood pressure, or `None` when the raw text is not `SYS/DIA`.
    pub fn blood_pressure(&self) -> Option<BloodPressure> {
        BloodPressure::parse(&self.blood_pressure_raw)
    }

    /// The sample case behind the "Load demo" button.
    pub fn demo() -> Self {
        let mut symptoms = Symptoms::default();
        symptoms.set(Symptom::Itch, true);
        symptoms.set(Symptom::Insomnia, true);
        symptoms.set(Symptom::ErectileIssue, true);

        Self {
            age: Some(60.0),
            sex: Sex::Male,
            notes: "Itching stopped for now; infection not yet treated; insomnia; erectile changes. (Demo)"
                .to_string(),
            symptoms,
            egfr: Some(84.0),
            creatinine: Some(1.10),
            urea: Some(14.4),
            bicarbonate: Some(20.0),
            wbc: Some(7.6),
            hemoglobin: Some(13.0),
            platelets: Some(299.0),
            eosinophils: Some(7.0),
            organism: "Staphylococcus spp.".to_string(),
            culture_repeat: "No".to_string(),
            speciation: "Not speciated".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blood_pressure_requires_two_or_three_digits() {
        assert_eq!(
            BloodPressure::parse("120/80"),
            Some(BloodPressure {
                systolic: 120,
                diastolic: 80
            })
        );
        assert_eq!(
            BloodPressure::parse(" 85 / 60 ").map(|bp| bp.to_string()),
            Some("85/60".to_string())
        );
        assert_eq!(BloodPressure::parse("1200/80"), None);
        assert_eq!(BloodPressure::parse("9/60"), None);
        assert_eq!(BloodPressure::parse("120-80"), None);
        assert_eq!(BloodPressure::parse(""), None);
    }

    #[test]
    fn measurements_treat_blank_and_garbage_as_missing() {
        assert_eq!(parse_measurement(" 38.5 "), Some(38.5));
        assert_eq!(parse_measurement(""), None);
        assert_eq!(parse_measurement("abc"), None);
        assert_eq!(parse_measurement("NaN"), None);
        assert_eq!(parse_measurement("inf"), None);
    }

    #[test]
    fn reads_form_json_with_nulls_and_missing_fields() {
        let json = r#"{
            "age": 42, "sex": "Female", "sx": {"confusion": true, "lowbp": true},
            "temp": 39.1, "bp": "not taken", "egfr": null, "bc_spec": "Staphylococcus aureus",
            "country": "UG", "mode": "doctor"
        }"#;
        let observation = Observation::from_json(json).unwrap();

        assert_eq!(observation.age, Some(42.0));
        assert_eq!(observation.sex, Sex::Female);
        assert!(observation.symptoms.confusion);
        assert!(observation.symptoms.low_bp);
        assert_eq!(observation.blood_pressure(), None);
        assert_eq!(observation.blood_pressure_raw, "not taken");
        assert_eq!(observation.egfr, None);
        assert_eq!(observation.context.country, "UG");
        assert_eq!(observation.speciation, "Staphylococcus aureus");
    }

    #[test]
    fn unusable_lab_values_read_as_missing() {
        let observation =
            Observation::from_json(r#"{"temp":39,"egfr":"n/a","crp":"","hr":" 110 ","pct":true}"#)
                .unwrap();
        assert_eq!(observation.temperature, Some(39.0));
        assert_eq!(observation.egfr, None);
        assert_eq!(observation.crp, None);
        assert_eq!(observation.heart_rate, Some(110.0));
        assert_eq!(observation.procalcitonin, None);
        assert_eq!(crate::score(&observation).points, 4);
    }

    #[test]
    fn null_text_fields_read_as_empty() {
        let observation =
            Observation::from_json(r#"{"bp":null,"org":null,"notes":null,"temp":null}"#).unwrap();
        assert_eq!(observation.blood_pressure_raw, "");
        assert_eq!(observation.organism, "");
        assert_eq!(observation.notes, "");
        assert_eq!(observation.temperature, None);
        assert_eq!(crate::score(&observation).points, 0);
    }

    #[test]
    fn blank_sex_is_unspecified() {
        let observation = Observation::from_json(r#"{"sex": ""}"#).unwrap();
        assert_eq!(observation.sex, Sex::Unspecified);
    }

    #[test]
    fn empty_input_is_missing_data() {
        assert!(matches!(
            Observation::from_json("  "),
            Err(TriageError::MissingData)
        ));
        assert!(matches!(
            Observation::from_json("[1,2]"),
            Err(TriageError::Parse(_))
        ));
    }

    #[test]
    fn present_symptoms_follow_form_order() {
        let mut symptoms = Symptoms::default();
        symptoms.set(Symptom::ErectileIssue, true);
        symptoms.set(Symptom::Fever, true);
        symptoms.set(Symptom::Itch, true);

        let names: Vec<_> = symptoms.present().map(Symptom::display_name).collect();
        assert_eq!(names, ["fever/chills", "itching", "erectile issues"]);
    }
}
