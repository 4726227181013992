//! Human-readable batch summary.

use std::fmt::Write;

use crate::config::NetworkKind;
use crate::report::aggregator::BatchReport;
use crate::report::outcome::{OperationOutcome, Outcome};

/// Explorer URL for a transaction.
pub fn explorer_link(explorer_url: &str, txid: &str, network: NetworkKind) -> String {
    format!(
        "{}/txid/{}?chain={}",
        explorer_url.trim_end_matches('/'),
        txid,
        network
    )
}

fn describe(row: &OperationOutcome) -> String {
    let nonce = row
        .nonce
        .map(|n| format!("nonce {}", n))
        .unwrap_or_else(|| "no nonce".to_string());
    format!(
        "wallet {} ({}) {} {}",
        row.account_id,
        row.address.short(),
        row.operation.kind.name(),
        nonce
    )
}

/// Render counts, failures and explorer links for a finished batch.
pub fn render(report: &BatchReport, explorer_url: &str) -> String {
    let summary = report.summary();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Batch {} on {}{}",
        report.batch_id,
        report.network,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    let _ = writeln!(
        out,
        "  total {} | submitted {} | skipped {} | rejected {} | transport failed {}",
        summary.total, summary.succeeded, summary.skipped, summary.rejected, summary.transport_failed
    );
    let _ = writeln!(
        out,
        "  value moved {} | fees {} (micro-units)",
        summary.total_value_moved, summary.total_fees
    );

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter(|row| !row.outcome.is_success())
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "Not submitted:");
        for row in failures {
            let detail = match &row.outcome {
                Outcome::Skipped { reason } => format!("skipped: {}", reason),
                Outcome::Rejected { code, message } => format!("rejected [{}] {}", code, message),
                Outcome::TransportFailed { message } => format!(
                    "transport failure: {} (check the explorer before retrying)",
                    message
                ),
                Outcome::Submitted { .. } => continue,
            };
            let _ = writeln!(out, "  {} -> {}", describe(row), detail);
        }
    }

    let submitted: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|row| match &row.outcome {
            Outcome::Submitted { txid } => Some((row, txid)),
            _ => None,
        })
        .collect();
    if !submitted.is_empty() {
        let _ = writeln!(out, "Submitted:");
        for (row, txid) in submitted {
            let _ = writeln!(
                out,
                "  {} -> {}",
                describe(row),
                explorer_link(explorer_url, txid, report.network)
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregator::tests::mixed_outcomes;
    use uuid::Uuid;

    #[test]
    fn test_explorer_link() {
        assert_eq!(
            explorer_link("https://explorer.hiro.so/", "0xabc", NetworkKind::Mainnet),
            "https://explorer.hiro.so/txid/0xabc?chain=mainnet"
        );
    }

    #[test]
    fn test_render_lists_failures_and_links() {
        let report = BatchReport {
            batch_id: Uuid::nil(),
            network: NetworkKind::Testnet,
            started_at: 1,
            finished_at: 2,
            cancelled: true,
            outcomes: mixed_outcomes(),
        };
        let text = render(&report, "https://explorer.hiro.so");

        assert!(text.contains("(cancelled)"));
        assert!(text.contains("total 5 | submitted 2 | skipped 1 | rejected 1 | transport failed 1"));
        assert!(text.contains("rejected [BadNonce] bad nonce"));
        assert!(text.contains("check the explorer before retrying"));
        assert!(text.contains("https://explorer.hiro.so/txid/0xbb?chain=testnet"));
    }
}
