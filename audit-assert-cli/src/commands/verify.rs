use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use audit_assert::{AuditConfig, AuditSession, ExpectationSet, LogPosition, Scenario, ScenarioKind};
use clap::Args;

use crate::state::{StateFile, SuiteState};
use crate::steps::StepsFile;

#[derive(Args)]
pub struct VerifyArgs {
    /// Offset printed by `baseline`
    #[arg(long)]
    pub baseline: u64,

    /// The log had already rolled over when the baseline was captured
    #[arg(long)]
    pub rotation_observed: bool,

    /// TOML file listing the expected records
    #[arg(long, conflicts_with = "scenario")]
    pub expectations: Option<PathBuf>,

    /// Named scenario, e.g. `query-matches-admin`
    #[arg(long)]
    pub scenario: Option<String>,

    /// Principal the scenario runs as; not needed by the admin-only scenarios
    #[arg(long)]
    pub principal: Option<String>,

    /// Indices the scenario resolves (repeatable)
    #[arg(long = "index")]
    pub indices: Vec<String>,

    /// Override the configured timeout, e.g. `30s`
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Override the configured poll interval, e.g. `250ms`
    #[arg(long, value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,
}

fn parse_duration(value: &str) -> Result<Duration, humantime_serde::re::humantime::DurationError> {
    humantime_serde::re::humantime::parse_duration(value)
}

pub async fn run(mut config: AuditConfig, state: &StateFile, args: VerifyArgs) -> Result<()> {
    if let Some(timeout) = args.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(interval) = args.poll_interval {
        if interval.is_zero() {
            bail!("--poll-interval must be greater than zero");
        }
        config = config.with_poll_interval(interval);
    }

    let poisoned = state.load()?.poisoned;
    let mut session =
        AuditSession::resume(config, LogPosition(args.baseline), args.rotation_observed)
            .with_poisoned(poisoned);
    let expected = expectations(&session, &args)?;

    let result = session.verify(expected).await;
    if session.is_poisoned() && !poisoned {
        state.save(&SuiteState { poisoned: true })?;
    }
    result?;

    println!("audit records verified");
    Ok(())
}

fn expectations(session: &AuditSession, args: &VerifyArgs) -> Result<ExpectationSet> {
    if let Some(path) = &args.expectations {
        return StepsFile::load(path)?.apply(session.expectations());
    }

    let Some(name) = &args.scenario else {
        bail!("either --expectations or --scenario is required");
    };
    let kind: ScenarioKind = name.parse()?;
    let principal = match &args.principal {
        Some(principal) => principal.clone(),
        None if kind.needs_principal() => bail!("--scenario {kind} requires --principal"),
        None => String::new(),
    };
    let mut scenario = Scenario::new(kind, principal);
    if !args.indices.is_empty() {
        scenario = scenario.with_indices(args.indices.iter().cloned());
    }

    Ok(scenario.apply(session.expectations(), &session.config().admin_principal))
}
