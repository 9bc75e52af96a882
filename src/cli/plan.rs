use crate::cli::{display_rel, format_size};
use crate::config::{Mode, OutputFormat, TransformOptions};
use crate::error::Result;
use crate::scan::{resolve, scan};
use serde::Serialize;
use std::path::PathBuf;

/// What a run would do, computed from a scan without writing anything
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub mode: Mode,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
    pub files: Vec<PlannedFile>,
    pub bytes_per_share: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub path: PathBuf,
    /// Target length, written to every output root
    pub length: u64,
    /// Input roots that hold this file; the others contribute zeros
    pub present_in: usize,
}

/// Scan the inputs and describe the run
pub fn build_plan(options: &TransformOptions) -> Result<Plan> {
    options.validate()?;
    let info = scan(&options.inputs)?;

    let files = info
        .files
        .iter()
        .map(|(rel, &length)| PlannedFile {
            path: rel.clone(),
            length,
            present_in: options
                .inputs
                .iter()
                .filter(|root| resolve(root, rel).is_file())
                .count(),
        })
        .collect();

    Ok(Plan {
        mode: options.mode(),
        inputs: options.inputs.clone(),
        outputs: options.outputs.clone(),
        directories: info.subdirs.iter().cloned().collect(),
        files,
        bytes_per_share: info.total_bytes(),
    })
}

/// Render the plan for a dry run
pub fn show_plan(options: &TransformOptions, format: OutputFormat) -> Result<String> {
    let plan = build_plan(options)?;
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&plan)? + "\n"),
        OutputFormat::Text => Ok(render_plan(&plan)),
    }
}

fn render_plan(plan: &Plan) -> String {
    let mut output = String::new();
    let title = format!("xorshare plan ({})", plan.mode);
    output.push_str(&format!("{}\n{}\n\n", title, "=".repeat(title.len())));

    output.push_str("Inputs:\n");
    for input in &plan.inputs {
        output.push_str(&format!("  {}\n", input.display()));
    }
    output.push_str("Outputs:\n");
    let last = plan.outputs.len().saturating_sub(1);
    for (i, out) in plan.outputs.iter().enumerate() {
        if i == last && plan.outputs.len() > 1 {
            output.push_str(&format!("  {} (remainder)\n", out.display()));
        } else {
            output.push_str(&format!("  {}\n", out.display()));
        }
    }
    output.push('\n');

    output.push_str(&format!("Directories: {}\n", plan.directories.len()));
    output.push_str(&format!(
        "Files: {} ({} per share)\n",
        plan.files.len(),
        format_size(plan.bytes_per_share)
    ));
    for file in &plan.files {
        output.push_str(&format!(
            "  {}  {}  [{}/{} inputs]\n",
            display_rel(&file.path),
            format_size(file.length),
            file.present_in,
            plan.inputs.len()
        ));
    }

    output
}
