use anyhow::Result;
use audit_assert::{AuditConfig, AuditSession, LogPosition};
use clap::Args;

#[derive(Args)]
pub struct RecordsArgs {
    /// Offset printed by `baseline`
    #[arg(long)]
    pub baseline: u64,

    /// The log had already rolled over when the baseline was captured
    #[arg(long)]
    pub rotation_observed: bool,
}

pub async fn run(config: AuditConfig, args: RecordsArgs) -> Result<()> {
    let mut session =
        AuditSession::resume(config, LogPosition(args.baseline), args.rotation_observed);
    let records = session.read_records(args.rotation_observed).await?;

    for record in &records {
        println!("{}", record);
    }
    tracing::debug!(count = records.len(), "printed audit records");
    Ok(())
}
