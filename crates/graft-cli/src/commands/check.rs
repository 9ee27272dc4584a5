//! `graft check`: full validation, nothing written.

use crate::cli::CheckArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CheckArgs) -> Result<()> {
    let (project, mut compiler) = utils::load_project(&args.project)?;
    ui::info(&format!("Checking {}", project.root.display()));

    let compilation = compiler.compile().await?;
    for warning in compilation.warnings() {
        ui::warning(&warning.to_string());
    }

    let providers: usize = compilation.graph.modules().map(|m| m.providers.len()).sum();
    ui::success(&format!(
        "{} module(s), {} provider(s), {} handler(s): no errors",
        compilation.graph.len(),
        providers,
        compilation.handler_index.len()
    ));
    Ok(())
}
