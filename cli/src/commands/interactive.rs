//! Interactive chat loop

use super::print_outcome;
use crate::output::SessionFormatter;
use anyhow::Result;
use colored::Colorize;
use relay_core::Session;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What to do with one line of user input
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InputAction<'a> {
    Quit,
    Skip,
    Query(&'a str),
}

pub(crate) fn parse_input(line: &str) -> InputAction<'_> {
    let query = line.trim();
    if query.eq_ignore_ascii_case("quit") {
        InputAction::Quit
    } else if query.is_empty() {
        InputAction::Skip
    } else {
        InputAction::Query(query)
    }
}

/// Read queries until `quit` or end of input; a failed query does not end the loop
pub async fn interactive_command(session: &mut Session, verbose: bool) -> Result<()> {
    println!("\n{}", "relay client started!".bold());
    println!("Type your queries or 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n{}", "Query: ".cyan());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            InputAction::Quit => break,
            InputAction::Skip => continue,
            InputAction::Query(query) => match session.process_query(query).await {
                Ok(outcome) => print_outcome(&outcome, verbose),
                Err(e) => println!("\n{}", SessionFormatter::error(&e.to_string())),
            },
        }
    }

    Ok(())
}
