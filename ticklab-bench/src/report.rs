//! Report rendering: markdown summary plus a JSON artifact.

use crate::harness::{BackendReport, ComparisonReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Render the comparison as a markdown document.
pub fn render_markdown(report: &ComparisonReport) -> String {
    let mut out = format!(
        "# TickLab Storage Comparison\n\n\
Dataset: {} tickers, {} bars\n\
Fingerprint: `{}`\n\n\
## Backends\n\n\
| Backend | Load (ms) | Storage |\n\
|---------|-----------|---------|\n",
        report.ticker_count, report.bar_count, report.dataset_hash
    );

    for backend in [&report.relational, &report.columnar] {
        out.push_str(&format!(
            "| {} | {:.2} | {} |\n",
            backend.backend,
            backend.load_millis,
            format_size(backend.storage_bytes)
        ));
    }

    push_query_section(&mut out, &report.relational);
    push_query_section(&mut out, &report.columnar);

    // Head-to-head on the one query both backends share.
    let rel_range = range_timing(&report.relational);
    let col_range = range_timing(&report.columnar);
    if let (Some(rel), Some(col)) = (rel_range, col_range) {
        out.push_str(&format!(
            "\n## Head-to-head: range query\n\n\
- relational: {:.2} ms ({} rows)\n\
- columnar:   {:.2} ms ({} rows)\n",
            rel.1, rel.2, col.1, col.2
        ));
    }

    out
}

fn push_query_section(out: &mut String, backend: &BackendReport) {
    out.push_str(&format!("\n## {}\n\n", backend.backend));
    out.push_str("| Query | Latency (ms) | Rows |\n");
    out.push_str("|-------|--------------|------|\n");
    for q in &backend.queries {
        out.push_str(&format!("| {} | {:.2} | {} |\n", q.name, q.millis, q.rows));
    }
}

fn range_timing(backend: &BackendReport) -> Option<(String, f64, usize)> {
    backend
        .queries
        .iter()
        .find(|q| q.name.starts_with("range_query"))
        .map(|q| (q.name.clone(), q.millis, q.rows))
}

/// Write `report.md` and `report.json` into `output_dir`, returning it.
pub fn save_report(report: &ComparisonReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let md_path = output_dir.join("report.md");
    std::fs::write(&md_path, render_markdown(report))
        .with_context(|| format!("failed to write {}", md_path.display()))?;

    let json_path = output_dir.join("report.json");
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    Ok(output_dir.to_path_buf())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
