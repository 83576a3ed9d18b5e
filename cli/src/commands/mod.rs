//! CLI command implementations

pub mod interactive;
pub mod run;
pub mod tools;

pub use interactive::interactive_command;
pub use run::run_command;
pub use tools::tools_command;

use crate::output::{SessionFormatter, ToolFormatter};
use relay_core::agent::QueryOutcome;

/// Print an answer, with tool activity and token usage when verbose
pub(crate) fn print_outcome(outcome: &QueryOutcome, verbose: bool) {
    if verbose {
        let formatter = ToolFormatter::new();
        for result in &outcome.tool_results {
            println!("{}", formatter.format_tool_status(result));
            if let Some(display) = formatter.format_tool_result(result) {
                println!("{}", display);
            }
        }
    }

    println!("\n{}", outcome.answer);

    if verbose && outcome.usage.total_tokens > 0 {
        println!("{}", SessionFormatter::usage(&outcome.usage));
    }
}
