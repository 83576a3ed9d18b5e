//! Single-query mode

use super::print_outcome;
use anyhow::Result;
use relay_core::Session;
use tracing::debug;

/// Answer one query and exit
pub async fn run_command(session: &mut Session, query: &str, verbose: bool) -> Result<()> {
    debug!("Running single query against '{}'", session.provider_name());

    let outcome = session.process_query(query).await?;
    print_outcome(&outcome, verbose);
    Ok(())
}
