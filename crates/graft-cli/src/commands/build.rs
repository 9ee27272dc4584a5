//! `graft build`: compile and write artifacts.

use std::time::Instant;

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let (project, mut compiler) = utils::load_project(&args.project)?;
    ui::info(&format!("Compiling {}", project.root.display()));

    let output = compiler.build().await?;
    for warning in output.compilation.warnings() {
        ui::warning(&warning.to_string());
    }
    for path in &output.written {
        let shown = path.strip_prefix(&project.root).unwrap_or(path);
        ui::info(&format!("  {}", shown.display()));
    }

    ui::success(&format!(
        "Compiled {} module(s) in {}",
        output.compilation.graph.len(),
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}
