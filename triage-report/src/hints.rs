//! Region-specific antimicrobial stewardship hints (non-prescriptive).

const BASE: &str = "Safety-first (all countries):
• If blood culture shows Staphylococcus spp., clinician must confirm contamination vs true bacteremia (repeat cultures, speciation).
• Staph aureus bacteremia is not “small”. It needs urgent clinician-led management (source control + repeat cultures; echocardiography in selected cases).
• Avoid self-medicating with leftover antibiotics. It fuels resistance and can backfire.";

const NIGERIA: &str = "Nigeria (NG) — resistance hints (non-prescriptive):
• Where antibiotics are easy to buy, resistance trends can be rough. Let culture results lead whenever possible.
• “Staph spp.” without speciation is underpowered information — push for speciation and sensitivities.";

const UGANDA: &str = "Uganda (UG) — resistance hints (non-prescriptive):
• Empiric choices vary by facility; documentation + de-escalation from sensitivity results matters, especially after referral.";

const KENYA: &str = "Kenya (KE) — resistance hints (non-prescriptive):
• Stewardship programs increasingly emphasize avoiding unnecessary broad-spectrum agents; de-escalate when sensitivities return.";

/// Base safety block plus the country block; unknown codes get the Kenya block.
pub fn country_hints(country: &str) -> String {
    let regional = match country.trim().to_uppercase().as_str() {
        "NG" => NIGERIA,
        "UG" => UGANDA,
        _ => KENYA,
    };
    format!("{BASE}\n\n{regional}")
}
