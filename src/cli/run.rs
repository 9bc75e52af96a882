use crate::cli::{display_rel, format_size};
use crate::config::{OutputFormat, TransformOptions};
use crate::error::Result;
use crate::transform::{run, TransformSummary};

/// Run the transform and return its summary; per-file failures only make it
/// into the summary when `keep_going` is set.
pub fn run_transform(options: &TransformOptions) -> Result<TransformSummary> {
    run(options)
}

/// Render a run summary
pub fn show_summary(summary: &TransformSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)? + "\n"),
        OutputFormat::Text => Ok(render_summary(summary)),
    }
}

fn render_summary(summary: &TransformSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{}: wrote {} files ({}) to each of {} output(s), {} directories\n",
        summary.mode,
        summary.files,
        format_size(summary.bytes_per_share),
        summary.shares,
        summary.directories
    ));
    if !summary.failures.is_empty() {
        output.push_str(&format!("{} file(s) failed:\n", summary.failures.len()));
        for failure in &summary.failures {
            output.push_str(&format!(
                "  {}: {}\n",
                display_rel(&failure.path),
                failure.error
            ));
        }
    }
    output
}
