use proptest::prelude::*;
use triage_core::{classify, score, Observation, RiskTier, Symptom, MAX_POINTS};

const RULE_FLAG_PREFIXES: [&str; 14] = [
    "Abnormal temperature",
    "Tachycardia",
    "RR ≥ 22",
    "SpO₂ < 94%",
    "Systolic BP < 90",
    "eGFR < 30",
    "eGFR 30–59",
    "Reduced urine + reduced eGFR",
    "PCT ≥ 0.5",
    "CRP elevated",
    "Repeat culture still positive",
    "Staph aureus bacteremia signal",
    "Itch + eosinophilia",
    "Itch + cholestatic markers",
];

fn rule_index(flag: &str) -> usize {
    if flag.starts_with("Confusion") {
        return RULE_FLAG_PREFIXES.len();
    }
    RULE_FLAG_PREFIXES
        .iter()
        .position(|prefix| flag.starts_with(prefix))
        .unwrap_or_else(|| panic!("unexpected flag {flag}"))
}

fn measurement() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(f64::NAN)),
        (-10.0f64..250.0).prop_map(Some),
    ]
}

prop_compose! {
    fn arb_observation()(
        vitals in proptest::collection::vec(measurement(), 4),
        labs in proptest::collection::vec(measurement(), 6),
        bp in prop_oneof![Just(String::new()), "[0-9]{2,3}/[0-9]{2,3}", ".{0,8}"],
        symptoms in proptest::collection::vec(any::<bool>(), 10),
        staph in any::<bool>(),
        still_positive in any::<bool>(),
        aureus in any::<bool>(),
    ) -> Observation {
        let mut observation = Observation {
            temperature: vitals[0],
            heart_rate: vitals[1],
            respiratory_rate: vitals[2],
            spo2: vitals[3],
            blood_pressure_raw: bp,
            egfr: labs[0],
            procalcitonin: labs[1].map(|v| v / 50.0),
            crp: labs[2],
            eosinophils: labs[3].map(|v| v / 10.0),
            alp: labs[4],
            bilirubin: labs[5].map(|v| v / 50.0),
            organism: if staph { "Staphylococcus spp.".into() } else { String::new() },
            culture_repeat: if still_positive { "Yes - still positive".into() } else { "No".into() },
            speciation: if aureus { "Staphylococcus aureus".into() } else { String::new() },
            ..Observation::default()
        };
        for (symptom, present) in Symptom::ALL.into_iter().zip(symptoms) {
            observation.symptoms.set(symptom, present);
        }
        observation
    }
}

proptest! {
    #[test]
    fn points_stay_within_bounds(observation in arb_observation()) {
        let result = score(&observation);
        prop_assert!(result.points <= MAX_POINTS);
    }

    #[test]
    fn flags_never_go_backwards(observation in arb_observation()) {
        let result = score(&observation);
        let indices: Vec<usize> = result.flags.iter().map(|flag| rule_index(flag)).collect();
        prop_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn scoring_is_deterministic(observation in arb_observation()) {
        prop_assert_eq!(score(&observation), score(&observation.clone()));
    }

    #[test]
    fn tiers_are_monotonic(a in 0u8..=20, b in 0u8..=20) {
        if a <= b {
            prop_assert!(classify(a) <= classify(b));
        }
    }
}

#[test]
fn demo_case_scores_as_lower_risk() {
    let result = score(&Observation::demo());
    assert_eq!(result.points, 3);
    assert_eq!(
        result.flags,
        ["Itch + eosinophilia: consider allergy/drug reaction/parasites."]
    );
    assert_eq!(classify(result.points), RiskTier::Lower);
}
