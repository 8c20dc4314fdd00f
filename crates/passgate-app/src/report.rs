//! Human-facing renderings of a pass-rate receipt.
//!
//! Keys are printed in receipt order, which is sorted.

use passgate_types::{PassRateReceipt, TestKey, VerdictStatus};

/// Plain console report.
pub fn render_text(receipt: &PassRateReceipt) -> String {
    let mut out = String::new();
    let counts = &receipt.counts;

    out.push_str("=== Pass Rate Report ===\n");
    out.push_str(&format!(
        "Pass rate: {:.2} ({}/{})\n",
        receipt.rate, counts.successful, counts.baseline_passed
    ));
    out.push_str(&format!(
        "Baseline passed tests (after filtering): {}\n",
        counts.baseline_passed
    ));
    out.push_str(&format!(
        "Regressions: {} ({} not run)\n",
        counts.regressions, counts.missing
    ));
    out.push_str(&format!("Verdict: {}\n", status_word(receipt.verdict.status)));

    if !receipt.regression_keys.is_empty() {
        out.push_str("\nRegressed tests:\n");
        for key in &receipt.regression_keys {
            out.push_str(&format!(" - {}{}\n", key, not_run_suffix(receipt, key)));
        }
    }

    out
}

pub fn render_markdown(receipt: &PassRateReceipt) -> String {
    let mut out = String::new();
    let counts = &receipt.counts;

    let header = match receipt.verdict.status {
        VerdictStatus::Pass => "✅ passgate: pass",
        VerdictStatus::Fail => "❌ passgate: fail",
        VerdictStatus::NoData => "⚠️ passgate: no_data",
    };
    out.push_str(header);
    out.push_str("\n\n");

    out.push_str(&format!(
        "**Pass rate:** {} ({}/{})",
        format_pct(receipt.rate),
        counts.successful,
        counts.baseline_passed
    ));
    if let Some(min) = receipt.min_rate {
        out.push_str(&format!(", minimum {}", format_pct(min)));
    }
    out.push_str("\n\n");

    out.push_str("| baseline passed | successful | regressions | not run |\n");
    out.push_str("|---:|---:|---:|---:|\n");
    out.push_str(&format!(
        "| {} | {} | {} | {} |\n",
        counts.baseline_passed, counts.successful, counts.regressions, counts.missing
    ));

    if !receipt.verdict.reasons.is_empty() {
        out.push_str("\n**Notes:**\n");
        for r in &receipt.verdict.reasons {
            out.push_str(&format!("- {}\n", r));
        }
    }

    if !receipt.regression_keys.is_empty() {
        out.push_str(&format!(
            "\n<details><summary>Regressed tests ({})</summary>\n\n",
            receipt.regression_keys.len()
        ));
        for key in &receipt.regression_keys {
            out.push_str(&format!("- `{}`{}\n", key, not_run_suffix(receipt, key)));
        }
        out.push_str("\n</details>\n");
    }

    out
}

pub fn github_annotations(receipt: &PassRateReceipt) -> Vec<String> {
    let mut lines = Vec::new();
    let counts = &receipt.counts;

    match receipt.verdict.status {
        VerdictStatus::Fail => lines.push(format!(
            "::error::passgate: pass rate {} ({}/{}) below minimum {}; {} regressions",
            format_pct(receipt.rate),
            counts.successful,
            counts.baseline_passed,
            format_pct(receipt.min_rate.unwrap_or(0.0)),
            counts.regressions
        )),
        VerdictStatus::NoData => lines.push(
            "::warning::passgate: no baseline tests passed after filtering; nothing to compare"
                .to_string(),
        ),
        VerdictStatus::Pass => {}
    }

    if counts.missing > 0 {
        lines.push(format!(
            "::notice::passgate: {} baseline-passing tests did not run under transformed mode",
            counts.missing
        ));
    }

    lines
}

fn status_word(status: VerdictStatus) -> &'static str {
    match status {
        VerdictStatus::Pass => "pass",
        VerdictStatus::Fail => "fail",
        VerdictStatus::NoData => "no_data",
    }
}

fn not_run_suffix(receipt: &PassRateReceipt, key: &TestKey) -> &'static str {
    // missing_keys is sorted
    if receipt.missing_keys.binary_search(key).is_ok() {
        " (not run)"
    } else {
        ""
    }
}

fn format_pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
