//! Terminal rendering of diagnostic results
//!
//! Everything here returns a `String` so it can be tested without a TTY.
//! Colour is applied only when `color` is set.

use owo_colors::OwoColorize;
use std::fmt::Write;

use zenith_common::model::{
    CompatibilityBand, DiagnosticResponse, Diagnosis, DoNotDo, SafetyLevel, SeverityBand, Tweak,
};
use zenith_common::report::ErrorReport;

#[derive(Debug, Clone, Copy)]
enum Tone {
    Good,
    Warn,
    Bad,
    Accent,
    Dim,
}

#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Good => text.green().to_string(),
            Tone::Warn => text.yellow().to_string(),
            Tone::Bad => text.red().to_string(),
            Tone::Accent => text.bright_cyan().to_string(),
            Tone::Dim => text.dimmed().to_string(),
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn severity_tone(band: SeverityBand) -> Tone {
    match band {
        SeverityBand::Low => Tone::Good,
        SeverityBand::Moderate => Tone::Warn,
        SeverityBand::High => Tone::Bad,
    }
}

fn compatibility_tone(band: CompatibilityBand) -> Tone {
    match band {
        CompatibilityBand::Good => Tone::Good,
        CompatibilityBand::Fair => Tone::Warn,
        CompatibilityBand::Poor => Tone::Bad,
    }
}

fn safety_tone(level: SafetyLevel) -> Tone {
    match level {
        SafetyLevel::Safe => Tone::Good,
        SafetyLevel::Caution => Tone::Warn,
        SafetyLevel::Advanced => Tone::Bad,
    }
}

/// Drop control characters (ESC, BEL, CR...) from text that came from the
/// reasoning service, so it cannot drive the terminal. Newlines and tabs stay.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Ten-cell bar, one cell per severity point
fn severity_bar(severity: u8) -> String {
    let filled = usize::from(severity.min(10));
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

fn render_diagnosis(out: &mut String, p: &Painter, diagnosis: &Diagnosis) {
    let band = diagnosis.severity_band();
    let tone = severity_tone(band);

    let _ = writeln!(out, "{}", p.heading("DIAGNOSIS"));
    let mut header = format!(
        "  {}",
        p.paint(&format!("{} BOTTLENECK", sanitize(&diagnosis.bottleneck_type).to_uppercase()), Tone::Accent)
    );
    if let Some(secondary) = &diagnosis.secondary_bottleneck {
        let _ = write!(header, "  (secondary: {})", p.paint(&sanitize(secondary), Tone::Warn));
    }
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(
        out,
        "  Severity: {} {}",
        p.paint(&format!("{}/10", diagnosis.severity), tone),
        p.paint(&severity_bar(diagnosis.severity), tone)
    );

    if !diagnosis.plain_english.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {}", sanitize(&diagnosis.plain_english));
    }
    if !diagnosis.reasoning.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} {}", p.paint("Reasoning:", Tone::Dim), sanitize(&diagnosis.reasoning));
    }
}

fn render_tweak(out: &mut String, p: &Painter, idx: usize, tweak: &Tweak) {
    let safety = if tweak.safety.is_empty() {
        tweak.safety_level().as_str().to_string()
    } else {
        sanitize(&tweak.safety)
    };

    let _ = write!(out, "  {}  {}", p.paint(&format!("{:02}", idx + 1), Tone::Accent), sanitize(&tweak.title));
    if !tweak.kind.is_empty() {
        let _ = write!(out, "  [{}]", sanitize(&tweak.kind));
    }
    let _ = writeln!(out, "  [{}]", p.paint(&safety, safety_tone(tweak.safety_level())));

    for (n, step) in tweak.steps.iter().enumerate() {
        let _ = writeln!(out, "      {}. {}", n + 1, sanitize(step));
    }
    for command in tweak.usable_commands() {
        let _ = writeln!(out, "      {} {}", p.paint("$", Tone::Dim), sanitize(command));
    }
    if !tweak.rationale.is_empty() {
        let _ = writeln!(out, "      {}", p.paint(&format!("> {}", sanitize(&tweak.rationale)), Tone::Dim));
    }
    if tweak.has_revert() {
        let _ = writeln!(out, "      Revert: {}", sanitize(&tweak.revert));
    }
}

fn render_do_not_do(out: &mut String, p: &Painter, items: &[DoNotDo]) {
    let _ = writeln!(out, "{}", p.heading("DO NOT DO"));
    for item in items {
        let _ = writeln!(out, "  {} {}", p.paint("x", Tone::Bad), sanitize(&item.action));
        if !item.reason.is_empty() {
            let _ = writeln!(out, "    {}", p.paint(&sanitize(&item.reason), Tone::Dim));
        }
    }
}

/// Full text report. Shows at most three tweaks.
pub fn render_response(response: &DiagnosticResponse, p: &Painter) -> String {
    let mut out = String::new();

    render_diagnosis(&mut out, p, &response.diagnosis);

    if let Some(compat) = &response.compatibility {
        let tone = compatibility_tone(compat.band());
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", p.heading("COMPATIBILITY"));
        let _ = write!(out, "  {}", p.paint(&format!("{}%", compat.score), tone));
        if !compat.note.is_empty() {
            let _ = write!(out, "  {}", sanitize(&compat.note));
        }
        let _ = writeln!(out);
    }

    let shown = response.displayed_tweaks();
    if !shown.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", p.heading("OPTIMIZATIONS"));
        for (idx, tweak) in shown.iter().enumerate() {
            if idx > 0 {
                let _ = writeln!(out);
            }
            render_tweak(&mut out, p, idx, tweak);
        }
    }

    if !response.do_not_do.is_empty() {
        let _ = writeln!(out);
        render_do_not_do(&mut out, p, &response.do_not_do);
    }

    out
}

pub fn render_error(report: &ErrorReport, p: &Painter) -> String {
    let mut out = format!(
        "{} [{}] {}",
        p.paint("ERROR", Tone::Bad),
        p.paint(&report.code, Tone::Bad),
        sanitize(&report.message)
    );
    if !report.corrective && !report.is_unhandled() {
        let _ = write!(out, "\n{}", p.paint("This looks transient. Try again in a moment.", Tone::Dim));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zenith_common::ZenithError;

    fn response(value: serde_json::Value) -> DiagnosticResponse {
        DiagnosticResponse::from_map(value.as_object().unwrap())
    }

    #[test]
    fn test_plain_report_sections() {
        let r = response(json!({
            "diagnosis": {
                "bottleneck_type": "cpu",
                "severity": 4,
                "secondary_bottleneck": "Thermal",
                "plain_english": "The CPU is pegged.",
                "reasoning": "Single-thread bound."
            },
            "compatibility": {"score": 55, "note": "Playable"},
            "tweaks": [{
                "title": "High performance power plan",
                "type": "OS",
                "safety": "Safe",
                "steps": ["Open Power Options"],
                "commands": ["powercfg /setactive SCHEME_MIN", "null"],
                "revert": "powercfg /setactive SCHEME_BALANCED",
                "rationale": "Stops clock throttling"
            }],
            "do_not_do": [{"action": "Disable thermal limits", "reason": "Hardware damage"}]
        }));
        let text = render_response(&r, &Painter::new(false));

        assert!(text.contains("CPU BOTTLENECK  (secondary: Thermal)"));
        assert!(text.contains("Severity: 4/10 ████░░░░░░"));
        assert!(text.contains("55%  Playable"));
        assert!(text.contains("01  High performance power plan  [OS]  [Safe]"));
        assert!(text.contains("$ powercfg /setactive SCHEME_MIN"));
        assert!(!text.contains("$ null"));
        assert!(text.contains("Revert: powercfg /setactive SCHEME_BALANCED"));
        assert!(text.contains("x Disable thermal limits"));

        let diag = text.find("DIAGNOSIS").unwrap();
        let compat = text.find("COMPATIBILITY").unwrap();
        let opt = text.find("OPTIMIZATIONS").unwrap();
        let dnd = text.find("DO NOT DO").unwrap();
        assert!(diag < compat && compat < opt && opt < dnd);
    }

    #[test]
    fn test_only_three_tweaks_rendered() {
        let tweaks: Vec<serde_json::Value> =
            (1..=5).map(|i| json!({"title": format!("Tweak {}", i)})).collect();
        let text = render_response(&response(json!({ "tweaks": tweaks })), &Painter::new(false));
        assert!(text.contains("Tweak 3"));
        assert!(!text.contains("Tweak 4"));
        assert!(!text.contains("Tweak 5"));
        assert!(!text.contains("04  "));
    }

    #[test]
    fn test_absent_sections_are_skipped() {
        let text = render_response(&response(json!({})), &Painter::new(false));
        assert!(text.contains("UNKNOWN BOTTLENECK"));
        assert!(text.contains("Severity: 0/10 ░░░░░░░░░░"));
        assert!(!text.contains("COMPATIBILITY"));
        assert!(!text.contains("OPTIMIZATIONS"));
        assert!(!text.contains("DO NOT DO"));
    }

    #[test]
    fn test_unknown_safety_shown_as_given() {
        let text = render_response(
            &response(json!({"tweaks": [{"title": "t", "safety": "spicy"}, {"title": "u"}]})),
            &Painter::new(false),
        );
        assert!(text.contains("01  t  [spicy]"));
        assert!(text.contains("02  u  [safe]"));
    }

    #[test]
    fn test_escape_sequences_are_stripped() {
        let r = response(json!({
            "diagnosis": {
                "bottleneck_type": "GPU\u{1b}[2J",
                "plain_english": "Fine.\u{1b}]0;pwned\u{7}\u{1b}[2J",
                "reasoning": "line one\nline two"
            },
            "compatibility": {"score": 80, "note": "ok\u{1b}[5m"},
            "tweaks": [{
                "title": "Clean\r drivers",
                "steps": ["\u{1b}[31mstep"],
                "commands": ["echo safe \u{1b}[8mrm -rf ~"],
                "revert": "undo\u{9b}",
                "rationale": "\ttabbed"
            }],
            "do_not_do": [{"action": "x\u{0}y", "reason": "r\u{1b}[0m"}]
        }));
        let text = render_response(&r, &Painter::new(false));

        assert!(!text.chars().any(|c| c.is_control() && c != '\n' && c != '\t'));
        assert!(text.contains("Fine.]0;pwned[2J"));
        assert!(text.contains("$ echo safe [8mrm -rf ~"));
        assert!(text.contains("line one\nline two"));
        assert!(text.contains("> \ttabbed"));
        assert!(text.contains("x xy"));

        let report = ErrorReport::from(ZenithError::ExternalService("HTTP 400: bad\u{1b}[2J".into()));
        assert!(!render_error(&report, &Painter::new(false)).contains('\u{1b}'));
    }

    #[test]
    fn test_sanitize_keeps_printable_text() {
        assert_eq!(sanitize("Ryzen 5 → 4.6 GHz\n\tok"), "Ryzen 5 → 4.6 GHz\n\tok");
        assert_eq!(sanitize("\u{1b}[1mbold\u{1b}[0m\r"), "[1mbold[0m");
    }

    #[test]
    fn test_render_error_pairs() {
        let p = Painter::new(false);
        let text = render_error(&ErrorReport::from(ZenithError::Validation("Fill in the CPU.".into())), &p);
        assert_eq!(text, "ERROR [ValidationError] Fill in the CPU.");

        let text = render_error(&ErrorReport::from(ZenithError::ExternalService("timeout".into())), &p);
        assert!(text.starts_with("ERROR [ExternalServiceError] timeout"));
        assert!(text.contains("Try again"));

        let text = render_error(&ErrorReport::unhandled("broken pipe"), &p);
        assert_eq!(
            text,
            "ERROR [UNHANDLED_SYSTEM_FAULT] A critical unhandled error occurred: broken pipe"
        );
    }
}
