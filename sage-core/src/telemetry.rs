use crate::fleet_commander::CommandKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sage_domain::{Address, Signature};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{event, Instrument, Level};

/// Lifecycle events of a single command invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Start {
        command: CommandKind,
        fleet: Address,
        at: DateTime<Utc>,
    },
    Success {
        command: CommandKind,
        fleet: Address,
        signatures: Vec<Signature>,
        at: DateTime<Utc>,
    },
    Error {
        command: CommandKind,
        fleet: Address,
        message: String,
        at: DateTime<Utc>,
    },
}

#[async_trait]
pub trait TelemetrySink: Send + Sync + Debug {
    async fn deliver(&self, event: &TelemetryEvent) -> anyhow::Result<()>;
}

/// Writes events to the log. Used when no external sink is configured.
#[derive(Debug, Clone, Default)]
pub struct TracingTelemetrySink;

#[async_trait]
impl TelemetrySink for TracingTelemetrySink {
    async fn deliver(&self, telemetry_event: &TelemetryEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(telemetry_event)?;
        event!(Level::INFO, telemetry = %payload, "Telemetry event");
        Ok(())
    }
}

/// Fire-and-forget delivery. Failures are logged and never reach the caller.
#[derive(Debug, Clone)]
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Telemetry { sink }
    }

    pub fn emit(&self, telemetry_event: TelemetryEvent) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(
            async move {
                if let Err(err) = sink.deliver(&telemetry_event).await {
                    event!(Level::ERROR, "Failed to deliver telemetry event {:?}: {:#}", telemetry_event, err);
                }
            }
            .in_current_span(),
        )
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Telemetry::new(Arc::new(TracingTelemetrySink))
    }
}
