use anyhow::Result;
use audit_assert::{AuditConfig, AuditSession};
use clap::Args;
use serde::Serialize;

use crate::state::StateFile;

#[derive(Args)]
pub struct BaselineArgs {}

/// Handed to later `records` and `verify` runs.
#[derive(Debug, Serialize)]
pub struct BaselineOutput {
    pub baseline: u64,
    pub rotation_observed: bool,
}

pub async fn run(config: AuditConfig, state: &StateFile, _args: BaselineArgs) -> Result<()> {
    if state.load()?.poisoned {
        tracing::warn!(
            state = %state.path().display(),
            "an earlier verification failed; verify will refuse until teardown"
        );
    }

    let mut session = AuditSession::new(config);
    let baseline = session.begin_test().await?;

    let output = BaselineOutput {
        baseline: baseline.bytes(),
        rotation_observed: session.rotation_observed(),
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape() {
        let output = BaselineOutput {
            baseline: 1024,
            rotation_observed: false,
        };
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"{"baseline":1024,"rotation_observed":false}"#
        );
    }
}
