//! Pure formatting functions for UI output.
//!
//! `format_*` functions build strings and are unit tested; `display_*`
//! functions only print what the formatters produce.

use crate::engine::{ReleaseCandidate, ReleasePlan};
use crate::warnings::PlanWarning;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a planning warning to the user.
pub fn display_warning(warning: &PlanWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One summary line for a candidate, e.g. `packages/a  1.1.1 -> 1.1.2 (patch: 1 fix)`
pub fn format_candidate_summary(candidate: &ReleaseCandidate) -> String {
    let previous = candidate
        .previous_version
        .as_ref()
        .map_or_else(|| "(new)".to_string(), |v| v.to_string());
    let origin = if candidate.touched_directly {
        format!("{}: {}", candidate.bump.level.as_str(), candidate.bump.reason)
    } else {
        "dependency update".to_string()
    };

    format!(
        "{}  {} -> {} ({})",
        style(&candidate.path).bold(),
        previous,
        style(&candidate.new_version).green(),
        origin
    )
}

/// Full human-readable plan: summaries, then each changelog entry
pub fn format_plan(plan: &ReleasePlan, with_changelog: bool) -> String {
    if plan.candidates.is_empty() {
        return "No components need a release".to_string();
    }

    let mut lines = vec![format!(
        "{}",
        style(format!("{} component(s) to release:", plan.candidates.len())).bold()
    )];
    for candidate in plan.candidates.values() {
        lines.push(format!("  {}", format_candidate_summary(candidate)));
    }

    if with_changelog {
        for candidate in plan.candidates.values() {
            lines.push(String::new());
            lines.push(format!("{}", style(format!("{} ({})", candidate.tag, candidate.path)).underlined()));
            lines.push(candidate.changelog_entry.clone());
        }
    }

    lines.join("\n")
}

pub fn display_plan(plan: &ReleasePlan, with_changelog: bool) {
    for warning in &plan.warnings {
        display_warning(warning);
    }
    println!("{}", format_plan(plan, with_changelog));
}
