//! Shared fixtures for unit tests: a card that passes the default policy

use crate::card::{Anchors, Card};

pub const HEADINGS: [&str; 7] = [
    "Issue.",
    "Rule.",
    "Application scaffold.",
    "Authorities map.",
    "Statutory hook.",
    "Tripwires.",
    "Conclusion.",
];

pub fn section_text(heading: &str) -> &'static str {
    match heading {
        "Issue." => "This negligence duty question maps the plaintiff relationship and notes the risk context for exam precision. \
                     We keep the issue distinct from breach or causation so the answer stays aligned with the call.",
        "Rule." => "The duty analysis follows salient features, coherence and statutory adjustments from Wrongs Act reforms and High Court guidance. \
                    We emphasise policy reasons that justify recognising the duty while rejecting factors that undermine negligence doctrine.",
        "Application scaffold." => "First, compare the scenario to recognised categories, identifying vulnerability, control and reliance without skipping statutory text. \
                                    Second, run Wrongs Act breach calculus and causation pathways so the reasoning integrates legislative and common law structure. \
                                    Third, close by flagging defences and remedial considerations, keeping the scaffold exam-ready and easy to adapt under pressure.",
        "Authorities map." => "Step 1 — Sullivan v Moody (HCA 2001) [2001] HCA 59; 207 Commonwealth Law Reports (CLR) 562 emphasises coherence in novel relationships. \
                               Step 2 — Perre v Apand (HCA 1999) [1999] HCA 36; 198 CLR 180 confirms vulnerability as the lead feature in economic loss.",
        "Statutory hook." => "Wrongs Act 1958 (Vic) s 48 demands breach reasoning that tracks foreseeability, response and burden through each exam step. \
                              Wrongs Act 1958 (Vic) s 52 reinforces causation by requiring material contribution analysis aligned with the Application scaffold.",
        "Tripwires." => "Never conflate the duty question with breach calibration or the answer loses coherence and ignores reservations. \
                         Watch for defendants invoking policy to block recognition when facts mirror Sullivan v Moody constraints in the authorities map.",
        "Conclusion." => "Return to the issue by affirming the plaintiff pathway and specify how the duty opens the door to relief. \
                          Finish with a reminder about residual statutory requirements so markers see disciplined compliance.",
        _ => "",
    }
}

pub const DIAGRAM: &str = "```mermaid\nmindmap\n  Duty focus\n    Thresholds\n    Salient features\n  Statutes\n    Wrongs Act s 48\n  Authorities\n    Sullivan v Moody\n    Perre v Apand\n  Exam tips\n    Time management\n```\n";

/// Assemble a back from the standard sections
pub fn build_back(overrides: &[(&str, &str)], omit: &[&str]) -> String {
    HEADINGS
        .iter()
        .filter(|h| !omit.contains(*h))
        .map(|heading| {
            let body = overrides
                .iter()
                .find(|(h, _)| h == heading)
                .map_or_else(|| section_text(heading), |(_, body)| *body);
            format!("{}\n{}", heading, body.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn base_card() -> Card {
    Card {
        id: "cards/negligence-duty.yml".into(),
        front: "How do you establish a negligence duty in novel relationships?".into(),
        back: build_back(&[], &[]),
        why_it_matters: "Exam markers reward disciplined duty analysis because it directs the negligence answer under heavy time pressure.".into(),
        mnemonic: "DUTYMAP".into(),
        diagram: DIAGRAM.into(),
        tripwires: strings(&[
            "Confusing duty scope with breach calibration when salient features need separate attention.",
            "Skipping Wrongs Act s 48 elements before concluding on breach obligations.",
            "Relying on policy slogans without anchoring them in Sullivan v Moody guidance.",
        ]),
        anchors: Anchors::List(strings(&[
            "Sullivan v Moody (2001) 207 CLR 562 — coherence boundaries for duty recognition.",
            "Wrongs Act 1958 (Vic) s 48 — breach calculus structure that informs the scaffold.",
            "Perre v Apand (1999) 198 CLR 180 — vulnerability focus and economic loss nuance.",
        ])),
        keywords: strings(&[
            "salient features",
            "coherence",
            "Wrongs Act",
            "vulnerability",
            "policy",
            "exam strategy",
        ]),
        reading_level: "Plain English (JD)".into(),
        tags: strings(&["MLS_H1", "LAWS50025_Torts"]),
        ..Card::default()
    }
}

/// The base card as a YAML record
pub fn base_card_yaml() -> String {
    let card = base_card();
    let record = serde_json::json!({
        "front": card.front,
        "back": card.back,
        "why_it_matters": card.why_it_matters,
        "mnemonic": card.mnemonic,
        "diagram": card.diagram,
        "tripwires": card.tripwires,
        "anchors": card.anchors.items(),
        "keywords": card.keywords,
        "reading_level": card.reading_level,
        "tags": card.tags,
    });
    serde_yaml::to_string(&record).unwrap()
}
