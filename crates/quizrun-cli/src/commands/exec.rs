//! The `quizrun exec` command.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use comfy_table::{Cell, Table};

use quizrun_core::trace::{derive_series, ExecutionTrace};
use quizrun_sources::config::load_config_from;

use super::build_adapter;

pub async fn execute(
    file: PathBuf,
    track: Vec<String>,
    timeout_ms: Option<u64>,
    plot: Option<PathBuf>,
    plot_var: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let snippet = read_snippet(&file)?;

    let plot_target = match (&plot, plot_var.or_else(|| track.first().cloned())) {
        (Some(path), Some(var)) => Some((path.clone(), var)),
        (Some(_), None) => anyhow::bail!("--plot needs --plot-var or at least one --track variable"),
        (None, _) => None,
    };

    let timeout = Duration::from_millis(timeout_ms.unwrap_or(config.runner.timeout_ms));
    let mut adapter = build_adapter(&config);

    tracing::debug!(
        python = %config.runner.python,
        tracked = track.len(),
        timeout_ms = timeout.as_millis() as u64,
        "running snippet"
    );
    let result = adapter.run_tracked(&snippet, &track, timeout).await?;
    print!("{}", result.stdout);
    if !result.stdout.is_empty() && !result.stdout.ends_with('\n') {
        println!();
    }

    eprintln!(
        "\nRan in {}ms, {} trace event(s).",
        result.duration_ms,
        result.trace.len()
    );
    print_series(&result.trace, &track);

    if let Some((path, var)) = plot_target {
        let image = adapter
            .plot_variable(&var, &format!("{var} per step"))
            .await?;
        write_png(&path, &image.base64)?;
        eprintln!("Plot of `{var}` written to {}", path.display());
    }

    Ok(())
}

fn read_snippet(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut snippet = String::new();
        std::io::stdin()
            .read_to_string(&mut snippet)
            .context("failed to read snippet from stdin")?;
        return Ok(snippet);
    }
    std::fs::read_to_string(file)
        .with_context(|| format!("failed to read snippet: {}", file.display()))
}

/// Table of per-step measures for each variable; every top-level name
/// when none were tracked.
fn print_series(trace: &ExecutionTrace, track: &[String]) {
    let names: Vec<String> = if track.is_empty() {
        trace.variable_names().into_iter().map(str::to_string).collect()
    } else {
        track.to_vec()
    };
    if names.is_empty() || trace.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Variable", "Series", "Final"]);
    for name in &names {
        let series = derive_series(trace, name);
        let last_repr = trace
            .post_exec()
            .filter_map(|e| e.variables.get(name))
            .last()
            .map(|v| v.repr.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format_series(&series)),
            Cell::new(last_repr),
        ]);
    }
    eprintln!("{table}");
}

fn format_series(series: &[f64]) -> String {
    series
        .iter()
        .map(|v| {
            if v.fract() == 0.0 && v.abs() < 1e15 {
                format!("{}", *v as i64)
            } else {
                format!("{v:.3}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_png(path: &Path, encoded: &str) -> Result<()> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("interpreter returned an invalid base64 image")?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
