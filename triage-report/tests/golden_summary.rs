use std::fs;

use triage_core::{score, Observation};
use triage_report::build_summary;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn demo_summary_matches_golden() {
    let input = fs::read_to_string(fixture_path("demo_observation.json"))
        .expect("cannot read demo observation");
    let observation = Observation::from_json(&input).expect("demo observation is valid");

    let summary = build_summary(&observation, &score(&observation));

    let expected =
        fs::read_to_string(fixture_path("demo_summary.txt")).expect("cannot read golden summary");
    assert_eq!(summary, normalize_line_endings(&expected));
}

#[test]
fn fixture_is_the_builtin_demo() {
    let input = fs::read_to_string(fixture_path("demo_observation.json"))
        .expect("cannot read demo observation");
    let observation = Observation::from_json(&input).expect("demo observation is valid");

    assert_eq!(observation, Observation::demo());
}

#[test]
fn summary_never_panics_on_sparse_json() {
    for input in [
        "{}",
        r#"{"bp":"120/"}"#,
        r#"{"sx":{"itch":true},"alp":130}"#,
        r#"{"egfr":null,"age":null,"sex":"Other","mode":"doctor"}"#,
    ] {
        let observation = Observation::from_json(input).expect("sparse observation is valid");
        let summary = build_summary(&observation, &score(&observation));
        assert!(summary.starts_with("CASE SUMMARY"));
        assert!(summary.contains("RISK SCREEN (Educational)"));
    }
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}
