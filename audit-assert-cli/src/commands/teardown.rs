use anyhow::Result;
use clap::Args;

use crate::state::StateFile;

#[derive(Args)]
pub struct TeardownArgs {}

/// Forget an earlier failure so the next suite starts clean.
pub fn run(state: &StateFile, _args: TeardownArgs) -> Result<()> {
    state.clear()?;
    tracing::debug!(path = %state.path().display(), "cleared audit suite state");
    Ok(())
}
