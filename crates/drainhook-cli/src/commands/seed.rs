use clap::ValueEnum;
use drainhook_core::{CloudWatchEnvelope, LifecycleEvent, StaticConfig};
use drainhook_steps::{SeedKind, seed_parameters};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Kind {
    Drain,
    ClusterReady,
    BrokerReady,
}

impl From<Kind> for SeedKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Drain => SeedKind::Drain,
            Kind::ClusterReady => SeedKind::ClusterReady,
            Kind::BrokerReady => SeedKind::BrokerReady,
        }
    }
}

pub fn run(kind: Kind, event_path: &str, config: &StaticConfig, now: Option<&str>) -> anyhow::Result<()> {
    let event = parse_event(&super::read_input(event_path)?)?;
    let now = super::now(now)?;

    let bag = seed_parameters(kind.into(), &event, config, now)?;
    info!(?kind, ec2_instance_id = %bag.ec2_instance_id, "seeded parameter bag");
    println!("{}", bag.to_json()?);
    Ok(())
}

/// Accept the event-bus envelope or a bare lifecycle event.
fn parse_event(input: &str) -> anyhow::Result<LifecycleEvent> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    if value.get("detail").is_some() {
        let envelope: CloudWatchEnvelope = serde_json::from_value(value)?;
        return Ok(envelope.detail);
    }
    Ok(serde_json::from_value(value)?)
}
