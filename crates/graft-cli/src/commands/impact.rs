//! `graft impact`: modules affected by changed files.

use crate::cli::ImpactArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: ImpactArgs) -> Result<()> {
    let (_project, mut compiler) = utils::load_project(&args.project)?;

    let cwd = std::env::current_dir()?;
    let changed: Vec<_> = args
        .files
        .iter()
        .map(|file| {
            let path = utils::resolve_path(file, &cwd);
            // match the canonical project root when the file exists
            std::fs::canonicalize(&path).unwrap_or(path)
        })
        .collect();

    let report = compiler.impact(&changed).await?;
    for name in &report.affected_modules {
        println!("{name}");
    }

    if report.changed_modules.is_empty() {
        ui::warning("No module owns the given files");
    } else {
        ui::success(&format!(
            "{} changed, {} affected",
            report.changed_modules.join(", "),
            report.affected_modules.len()
        ));
    }
    Ok(())
}
