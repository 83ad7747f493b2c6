//! Markdown and JSON reports for a finished run.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chunkbench_core::metrics;
use chunkbench_core::types::{ExperimentResult, ExperimentStatus};

pub const JSON_REPORT: &str = "experiment_results.json";
pub const MARKDOWN_REPORT: &str = "experiment_results.md";

/// Display order for well-known metrics; anything else follows alphabetically.
fn metric_rank(name: &str) -> (usize, String) {
    let known = [
        metrics::ROUGE1,
        metrics::ROUGE2,
        metrics::ROUGE_L,
        metrics::BLEU,
        metrics::SEMANTIC_F1,
        metrics::SEMANTIC_PRECISION,
        metrics::SEMANTIC_RECALL,
    ];
    if let Some(pos) = known.iter().position(|k| *k == name) {
        return (pos, String::new());
    }
    if name.starts_with("recall@") {
        return (known.len(), name.to_string());
    }
    match name {
        metrics::HIT_RATE => (known.len() + 1, String::new()),
        metrics::MRR => (known.len() + 2, String::new()),
        _ => (known.len() + 3, name.to_string()),
    }
}

/// Metric names reported by any result, in display order.
pub fn report_metrics(results: &[ExperimentResult]) -> Vec<String> {
    let mut names: Vec<String> = results
        .iter()
        .flat_map(|r| r.metrics.keys().cloned())
        .collect();
    names.sort_by_key(|n| metric_rank(n));
    names.dedup();
    names
}

fn format_value(metric: &str, value: f64) -> String {
    if metric == metrics::BLEU {
        format!("{value:.2}")
    } else {
        format!("{value:.4}")
    }
}

fn status_label(status: &ExperimentStatus) -> &'static str {
    match status {
        ExperimentStatus::Completed => "completed",
        ExperimentStatus::EmptyCorpus => "empty corpus",
        ExperimentStatus::Failed { .. } => "failed",
    }
}

/// Results that can be ranked against each other.
fn ranked(results: &[ExperimentResult]) -> impl Iterator<Item = &ExperimentResult> {
    results.iter().filter(|r| !r.is_failed())
}

/// The strategy with the highest mean for `metric`. Ties keep the earlier one.
pub fn best_for<'a>(results: &'a [ExperimentResult], metric: &str) -> Option<(&'a str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for result in ranked(results) {
        if let Some(mean) = result.mean(metric)
            && best.is_none_or(|(_, score)| mean > score)
        {
            best = Some((result.name.as_str(), mean));
        }
    }
    best
}

/// The strategy with the best average of min-max normalized metric means.
/// A metric with no spread normalizes to 1.0 for everyone.
pub fn best_overall(results: &[ExperimentResult]) -> Option<&str> {
    let names = report_metrics(results);
    let ranges: Vec<(f64, f64)> = names
        .iter()
        .map(|name| {
            ranked(results)
                .filter_map(|r| r.mean(name))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
        })
        .collect();

    let mut best: Option<(&str, f64)> = None;
    for result in ranked(results) {
        let normalized: Vec<f64> = names
            .iter()
            .zip(&ranges)
            .filter_map(|(name, &(lo, hi))| {
                result
                    .mean(name)
                    .map(|v| if hi > lo { (v - lo) / (hi - lo) } else { 1.0 })
            })
            .collect();
        if normalized.is_empty() {
            continue;
        }
        let score = normalized.iter().sum::<f64>() / normalized.len() as f64;
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((result.name.as_str(), score));
        }
    }
    best.map(|(name, _)| name)
}

fn summary_table(out: &mut String, results: &[ExperimentResult], names: &[String]) {
    let _ = write!(out, "| Strategy | Mode | Status | Chunks |");
    for name in names {
        let _ = write!(out, " {name} |");
    }
    let _ = writeln!(out, " Duration (ms) |");
    let _ = write!(out, "|---|---|---|---|");
    for _ in names {
        out.push_str("---|");
    }
    out.push_str("---|\n");

    for result in results {
        let mode = serde_json::to_value(result.mode)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let _ = write!(
            out,
            "| {} | {} | {} | {} |",
            result.name,
            mode,
            status_label(&result.status),
            result.num_chunks
        );
        for name in names {
            match result.mean(name) {
                Some(v) => {
                    let _ = write!(out, " {} |", format_value(name, v));
                }
                None => out.push_str(" - |"),
            }
        }
        let _ = writeln!(out, " {} |", result.duration_ms);
    }
}

fn strategy_section(out: &mut String, result: &ExperimentResult) {
    let _ = writeln!(out, "### {}\n", result.name);
    let _ = writeln!(out, "**Configuration:**");
    let _ = writeln!(out, "- Strategy: {}", result.strategy);
    let _ = writeln!(out, "- Chunk Size: {}", result.chunk_size);
    let _ = writeln!(out, "- Chunk Overlap: {}", result.chunk_overlap);
    let _ = writeln!(out, "- Total Chunks: {}", result.num_chunks);
    let _ = writeln!(out, "- Queries Evaluated: {}", result.num_queries);

    if let ExperimentStatus::Failed { error } = &result.status {
        let _ = writeln!(out, "\n**Failed:** {error}\n");
        return;
    }

    let _ = writeln!(out, "\n**Metrics:**");
    let mut names: Vec<&String> = result.metrics.keys().collect();
    names.sort_by_key(|n| metric_rank(n));
    for name in names {
        let s = result.metrics[name];
        let _ = writeln!(
            out,
            "- **{name}**: {} (±{}, median {}, range {} to {})",
            format_value(name, s.mean),
            format_value(name, s.std),
            format_value(name, s.median),
            format_value(name, s.min),
            format_value(name, s.max)
        );
    }
    out.push('\n');
}

fn insights(out: &mut String, results: &[ExperimentResult]) {
    let completed: Vec<&ExperimentResult> = ranked(results).collect();
    if let (Some(min), Some(max)) = (
        completed.iter().min_by_key(|r| r.num_chunks),
        completed.iter().max_by_key(|r| r.num_chunks),
    ) {
        let _ = writeln!(
            out,
            "- **Chunk Count Range**: {} generated {} chunks, while {} generated {} chunks.",
            min.name, min.num_chunks, max.name, max.num_chunks
        );
    }
    if let Some(best) = best_overall(results) {
        let _ = writeln!(
            out,
            "- **Best Overall Strategy**: {best} (average of normalized metric means)"
        );
    }
    let failed = results.len() - completed.len();
    let _ = writeln!(
        out,
        "- **Evaluation Coverage**: Tested {} strategy configurations ({} failed)",
        results.len(),
        failed
    );
}

/// Render the full markdown report.
pub fn render_markdown(results: &[ExperimentResult], generated_at: &str) -> String {
    let names = report_metrics(results);
    let mut out = String::new();

    out.push_str("# Chunking Strategy Evaluation\n\n");
    let _ = writeln!(out, "Generated {generated_at}.\n");

    out.push_str("## Summary Metrics\n\n");
    summary_table(&mut out, results, &names);
    out.push('\n');

    out.push_str("## Detailed Results by Strategy\n\n");
    for result in results {
        strategy_section(&mut out, result);
    }

    out.push_str("## Best Performing Strategies\n\n");
    for name in &names {
        if let Some((strategy, score)) = best_for(results, name) {
            let _ = writeln!(out, "- **{name}**: {strategy} ({})", format_value(name, score));
        }
    }
    out.push('\n');

    out.push_str("## Key Insights\n\n");
    insights(&mut out, results);
    out
}

/// Write the JSON and markdown reports into `output_dir`.
pub fn write_reports(results: &[ExperimentResult], output_dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(output_dir)?;

    let json_path = output_dir.join(JSON_REPORT);
    std::fs::write(&json_path, serde_json::to_string_pretty(results)?)?;

    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let md_path = output_dir.join(MARKDOWN_REPORT);
    std::fs::write(&md_path, render_markdown(results, &generated_at))?;

    tracing::info!(json = %json_path.display(), markdown = %md_path.display(), "Reports written");
    Ok((json_path, md_path))
}
