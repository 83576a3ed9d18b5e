//! Tool listing mode

use crate::output::ToolFormatter;
use anyhow::Result;
use colored::Colorize;
use relay_core::Session;

/// Show the tools the connected server exposes
pub async fn tools_command(session: &mut Session) -> Result<()> {
    let name = session.provider_name().to_string();
    let tools = session.refresh_tools().await?;
    let formatter = ToolFormatter::new();

    println!("{}", format!("🛠️  Tools exposed by '{}':", name).bold());
    if tools.is_empty() {
        println!("  (none)");
    }
    for tool in tools {
        println!("{}", formatter.format_tool_entry(tool));
    }
    Ok(())
}
