//! Plain-text summary of a verified deposit for terminal display.

use xspv_verify::{DepositVerdict, ExpectedOutput, VerifierConfig};

/// Format a verification verdict as a framed block of `label: value` lines
pub fn format_verdict(
    verdict: &DepositVerdict,
    expected: &ExpectedOutput,
    config: &VerifierConfig,
    headers: usize,
) -> String {
    let mut tip = verdict.chain.tip_hash;
    tip.reverse();

    let rows = [
        ("TXID", verdict.txid.to_string()),
        ("Block", verdict.block_hash.to_string()),
        ("Position", verdict.leaf_index.to_string()),
        ("Paid", format!("{} sat", expected.amount)),
        ("Script", hex::encode(&expected.script)),
        ("Headers", headers.to_string()),
        ("Tip", hex::encode(tip)),
        ("Chain work", verdict.chain.total_work.to_string()),
        ("Max target", config.max_target.to_string()),
    ];

    let width = rows
        .iter()
        .map(|(label, value)| label.len() + 2 + value.len())
        .max()
        .unwrap_or_default();

    let mut output = String::new();
    let title = "─".repeat(width.saturating_sub(17));
    output.push_str(&format!("┌─ Deposit verified {}┐\n", title));
    for (label, value) in rows {
        let line = format!("{}: {}", label, value);
        output.push_str(&format!("│ {:<width$} │\n", line, width = width));
    }
    output.push_str(&format!("└{}┘\n", "─".repeat(width + 2)));
    output
}
