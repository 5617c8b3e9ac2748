use crate::batch_submitter::BatchSubmitter;
use crate::cargo_transfer_manager::{CargoTransferError, CargoTransferManager};
use crate::configuration::{ConfigurationError, SubmitterConfiguration};
use crate::sage_client::{build_descriptor, read_fleet, resolve_resource_mint, InstructionBuilder, LedgerReader, RetryingLedgerReader, SubmissionClient};
use crate::telemetry::{Telemetry, TelemetryEvent};
use crate::transition_planner::plan_transition;
use chrono::Utc;
use sage_domain::{
    Address, BuildFailure, ContextError, FleetAccount, GameContext, GameContextCell, OperationDescriptor, OperationKind, OperationOrigin, OperationParams,
    PlanningError, ReadFailure, SubmissionReport, TargetState, TransferDirection, TransferRequest,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{event, info_span, Instrument, Level};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Dock,
    Undock,
    StartMining,
    LoadCargo,
    UnloadCargo,
}

/// Reasons a command was rejected before anything was submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Read(#[from] ReadFailure),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    CargoTransfer(#[from] CargoTransferError),
    #[error(transparent)]
    Build(#[from] BuildFailure),
    #[error("fleet commander has been shut down")]
    ShutDown,
}

/// Player-facing verbs on a single fleet.
///
/// Every verb re-reads the fleet, plans the transition into the state it needs, appends
/// its own operations and submits everything in batches. Planning failures abort the
/// verb before anything is sent. Submission problems are reported in the returned
/// [`SubmissionReport`], since earlier groups may already be on the ledger.
#[derive(Debug)]
pub struct FleetCommander {
    context: GameContextCell,
    reader: Arc<dyn LedgerReader>,
    builder: Arc<dyn InstructionBuilder>,
    submitter: BatchSubmitter,
    transfers: CargoTransferManager,
    telemetry: Telemetry,
    batch_size: NonZeroUsize,
    after_operations: Vec<OperationDescriptor>,
    cancellation: CancellationToken,
}

impl FleetCommander {
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        builder: Arc<dyn InstructionBuilder>,
        client: Arc<dyn SubmissionClient>,
        telemetry: Telemetry,
        configuration: &SubmitterConfiguration,
    ) -> Result<Self, ConfigurationError> {
        let reader: Arc<dyn LedgerReader> = Arc::new(RetryingLedgerReader::new(reader, configuration.read_policy()));
        Ok(FleetCommander {
            context: GameContextCell::new(),
            reader: Arc::clone(&reader),
            builder: Arc::clone(&builder),
            submitter: BatchSubmitter::new(client, configuration.submit_policy(), configuration.confirm_policy()),
            transfers: CargoTransferManager::new(reader, builder),
            telemetry,
            batch_size: configuration.batch_size()?,
            after_operations: vec![],
            cancellation: CancellationToken::new(),
        })
    }

    /// Operations appended to the last group of every submission, e.g. fee settlement.
    pub fn with_after_operations(mut self, after_operations: Vec<OperationDescriptor>) -> Self {
        self.after_operations = after_operations;
        self
    }

    pub fn initialize(&self, context: GameContext) -> Result<&GameContext, ContextError> {
        self.context.initialize(context)
    }

    /// Cancelling shuts the commander down. A submission in progress stops before its next
    /// group, with the group already sent running to completion. Every later verb fails with
    /// [`CommandError::ShutDown`] before reading anything.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub async fn dock(&self, fleet: &Address) -> Result<SubmissionReport, CommandError> {
        self.run(CommandKind::Dock, fleet, self.reach_state(fleet, TargetState::StarbaseLoadingBay))
            .await
    }

    /// Brings the fleet to Idle from wherever it is, settling movement or stopping mining as needed.
    pub async fn undock(&self, fleet: &Address) -> Result<SubmissionReport, CommandError> {
        self.run(CommandKind::Undock, fleet, self.reach_state(fleet, TargetState::Idle))
            .await
    }

    pub async fn start_mining(&self, fleet: &Address, resource: &Address) -> Result<SubmissionReport, CommandError> {
        self.run(CommandKind::StartMining, fleet, self.mine(fleet, resource))
            .await
    }

    pub async fn load_cargo(&self, fleet: &Address, starbase_pod: &Address, requests: &[TransferRequest]) -> Result<SubmissionReport, CommandError> {
        self.run(
            CommandKind::LoadCargo,
            fleet,
            self.transfer_cargo(fleet, starbase_pod, TransferDirection::ToFleet, requests),
        )
        .await
    }

    pub async fn unload_cargo(&self, fleet: &Address, starbase_pod: &Address, requests: &[TransferRequest]) -> Result<SubmissionReport, CommandError> {
        self.run(
            CommandKind::UnloadCargo,
            fleet,
            self.transfer_cargo(fleet, starbase_pod, TransferDirection::ToStarbase, requests),
        )
        .await
    }

    async fn reach_state(&self, fleet: &Address, target: TargetState) -> Result<SubmissionReport, CommandError> {
        let (_, _, operations) = self.prepare(fleet, target).await?;
        Ok(self.submit(operations).await)
    }

    async fn mine(&self, fleet: &Address, resource: &Address) -> Result<SubmissionReport, CommandError> {
        let (context, account, mut operations) = self.prepare(fleet, TargetState::Idle).await?;
        let (resource_account, mine_item) = resolve_resource_mint(self.reader.as_ref(), resource).await?;

        let params = OperationParams::StartMining {
            fleet: account.address.clone(),
            resource: resource.clone(),
            asteroid: resource_account.asteroid,
            mint: mine_item.mint,
        };
        let origin = OperationOrigin::Command {
            kind: OperationKind::StartMining,
        };
        operations.push(build_descriptor(self.builder.as_ref(), context, &params, origin)?);

        Ok(self.submit(operations).await)
    }

    async fn transfer_cargo(
        &self,
        fleet: &Address,
        starbase_pod: &Address,
        direction: TransferDirection,
        requests: &[TransferRequest],
    ) -> Result<SubmissionReport, CommandError> {
        let (context, account, mut operations) = self.prepare(fleet, TargetState::StarbaseLoadingBay).await?;
        let transfers = self
            .transfers
            .plan_transfers(context, &account, starbase_pod, direction, requests)
            .await?;
        operations.extend(transfers);

        Ok(self.submit(operations).await)
    }

    async fn prepare(&self, fleet: &Address, target: TargetState) -> Result<(&GameContext, FleetAccount, Vec<OperationDescriptor>), CommandError> {
        if self.cancellation.is_cancelled() {
            return Err(CommandError::ShutDown);
        }
        let context = self.context.get()?;
        let account = read_fleet(self.reader.as_ref(), fleet).await?;
        let plan = plan_transition(context, &account, target, Utc::now(), self.reader.as_ref(), self.builder.as_ref()).await?;
        Ok((context, account, plan.into_operations()))
    }

    async fn submit(&self, operations: Vec<OperationDescriptor>) -> SubmissionReport {
        self.submitter
            .submit(operations, self.batch_size, &self.after_operations, &self.cancellation)
            .await
    }

    async fn run(
        &self,
        kind: CommandKind,
        fleet: &Address,
        command: impl Future<Output = Result<SubmissionReport, CommandError>>,
    ) -> Result<SubmissionReport, CommandError> {
        let span = info_span!("command", command = %kind, fleet = %fleet);
        let _ = self.telemetry.emit(TelemetryEvent::Start {
            command: kind,
            fleet: fleet.clone(),
            at: Utc::now(),
        });

        let result = command.instrument(span).await;

        let outcome = match &result {
            Ok(report) if report.fully_succeeded => TelemetryEvent::Success {
                command: kind,
                fleet: fleet.clone(),
                signatures: report.signatures.clone(),
                at: Utc::now(),
            },
            Ok(report) => {
                event!(
                    Level::WARN,
                    "{} on {} incomplete: {} group(s) failed, {} not attempted",
                    kind,
                    fleet,
                    report.failures.len(),
                    report.not_attempted.len()
                );
                TelemetryEvent::Error {
                    command: kind,
                    fleet: fleet.clone(),
                    message: format!(
                        "{} group(s) failed, {} not attempted, {} confirmed",
                        report.failures.len(),
                        report.not_attempted.len(),
                        report.signatures.len()
                    ),
                    at: Utc::now(),
                }
            }
            Err(err) => {
                event!(Level::INFO, "{} on {} rejected: {}", kind, fleet, err);
                TelemetryEvent::Error {
                    command: kind,
                    fleet: fleet.clone(),
                    message: err.to_string(),
                    at: Utc::now(),
                }
            }
        };
        let _ = self.telemetry.emit(outcome);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_ledger::InMemoryLedger;
    use crate::test_objects::{JsonInstructionBuilder, RecordingTelemetrySink, ScriptedSubmissionClient, TestObjects};
    use itertools::Itertools;
    use sage_domain::{AccountData, CargoPodKind, ConfirmationStatus, SubmissionError, TransferMode};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        commander: FleetCommander,
        client: Arc<ScriptedSubmissionClient>,
        events: UnboundedReceiver<TelemetryEvent>,
    }

    fn harness(ledger: InMemoryLedger) -> Harness {
        harness_with(Arc::new(ledger))
    }

    fn harness_with(ledger: Arc<InMemoryLedger>) -> Harness {
        let client = Arc::new(ScriptedSubmissionClient::always_confirming());
        let (sink, events) = RecordingTelemetrySink::new();
        let commander = FleetCommander::new(
            ledger,
            Arc::new(JsonInstructionBuilder),
            client.clone(),
            Telemetry::new(Arc::new(sink)),
            &SubmitterConfiguration::default(),
        )
        .unwrap();
        commander.initialize(TestObjects::context()).unwrap();

        Harness { commander, client, events }
    }

    async fn ledger_with_fleet(fleet: FleetAccount) -> InMemoryLedger {
        let ledger = TestObjects::mining_ledger();
        ledger.insert(fleet.address.clone(), AccountData::Fleet(fleet)).await;
        ledger
    }

    fn submitted_kinds(batches: &[Vec<OperationDescriptor>]) -> Vec<OperationKind> {
        batches.iter().flatten().map(|op| op.kind).collect_vec()
    }

    #[tokio::test]
    async fn test_dock_idle_fleet() {
        let ledger = ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await;
        let mut harness = harness(ledger);

        let report = harness.commander.dock(&TestObjects::fleet_address()).await.unwrap();

        assert!(report.fully_succeeded);
        assert_eq!(submitted_kinds(&harness.client.submitted_batches().await), vec![OperationKind::Dock]);
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Start { command: CommandKind::Dock, .. })));
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Success { signatures, .. }) if signatures.len() == 1));
    }

    #[tokio::test]
    async fn test_dock_when_already_docked_submits_nothing() {
        let ledger = ledger_with_fleet(TestObjects::fleet_account(TestObjects::docked_state())).await;
        let harness = harness(ledger);

        let report = harness.commander.dock(&TestObjects::fleet_address()).await.unwrap();

        assert!(report.fully_succeeded);
        assert!(report.signatures.is_empty());
        assert!(harness.client.submitted_batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_undock_with_missing_crew_is_rejected_before_submission() {
        let mut fleet = TestObjects::fleet_account(TestObjects::docked_state());
        fleet.crew = TestObjects::crew(3, 10, 20);
        let mut harness = harness(ledger_with_fleet(fleet).await);

        let result = harness.commander.undock(&TestObjects::fleet_address()).await;

        assert_eq!(
            result,
            Err(CommandError::Planning(PlanningError::CrewNotNormalized {
                current: 3,
                required: 10,
                capacity: 20
            }))
        );
        assert!(harness.client.submitted_batches().await.is_empty());
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Start { .. })));
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Error { message, .. }) if message.contains("crew")));
    }

    #[tokio::test]
    async fn test_start_mining_from_loading_bay_undocks_first() {
        let ledger = ledger_with_fleet(TestObjects::fleet_account(TestObjects::docked_state())).await;
        let harness = harness(ledger);

        let report = harness
            .commander
            .start_mining(&TestObjects::fleet_address(), &TestObjects::resource_address())
            .await
            .unwrap();

        assert!(report.fully_succeeded);
        let batches = harness.client.submitted_batches().await;
        assert_eq!(submitted_kinds(&batches), vec![OperationKind::Undock, OperationKind::StartMining]);
        assert_eq!(
            JsonInstructionBuilder::decode(&batches[0][1]),
            OperationParams::StartMining {
                fleet: TestObjects::fleet_address(),
                resource: TestObjects::resource_address(),
                asteroid: TestObjects::asteroid_address(),
                mint: TestObjects::ore_mint(),
            }
        );
    }

    #[tokio::test]
    async fn test_load_cargo_docks_then_withdraws() {
        let ore = TestObjects::ore_mint();
        let ledger = TestObjects::transfer_ledger(
            vec![TestObjects::cargo_hold(100, &[]), TestObjects::starbase_pod(&[(ore.clone(), 1_000, 1)])],
            &[(ore.clone(), 1)],
        );
        ledger
            .insert(
                TestObjects::fleet_address(),
                AccountData::Fleet(TestObjects::fleet_account(TestObjects::idle_state())),
            )
            .await;
        let harness = harness(ledger);

        let report = harness
            .commander
            .load_cargo(
                &TestObjects::fleet_address(),
                &TestObjects::starbase_pod_address(),
                &[TransferRequest {
                    resource: ore,
                    pod_kind: CargoPodKind::CargoHold,
                    mode: TransferMode::Max,
                    value: 60,
                }],
            )
            .await
            .unwrap();

        assert!(report.fully_succeeded);
        assert_eq!(
            submitted_kinds(&harness.client.submitted_batches().await),
            vec![OperationKind::Dock, OperationKind::WithdrawCargo]
        );
    }

    #[tokio::test]
    async fn test_after_operations_ride_on_the_last_group() {
        let ledger = ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await;
        let after = TestObjects::bookkeeping_operation("settle-fees");
        let Harness { commander, client, .. } = harness(ledger);
        let commander = commander.with_after_operations(vec![after.clone()]);

        commander.dock(&TestObjects::fleet_address()).await.unwrap();

        let batches = client.submitted_batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][0].kind, OperationKind::Dock);
        assert_eq!(batches[0].last(), Some(&after));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_ledger_rejection_is_reported_not_returned_as_error() {
        let ledger = ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await;
        let mut harness = harness(ledger);
        harness
            .client
            .script_confirm(vec![Ok(ConfirmationStatus {
                on_ledger_error: Some("fleet is not in the sector of the starbase".to_string()),
            })])
            .await;

        let report = harness.commander.dock(&TestObjects::fleet_address()).await.unwrap();

        assert!(!report.fully_succeeded);
        assert!(matches!(report.failures[0].error, SubmissionError::OnLedgerRejection { .. }));
        assert!(matches!(report.into_result(), Err(SubmissionError::PartialBatchFailure { .. })));
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Start { .. })));
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_commands_fail_before_context_is_initialized() {
        let ledger = ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await;
        let (sink, _events) = RecordingTelemetrySink::new();
        let commander = FleetCommander::new(
            Arc::new(ledger),
            Arc::new(JsonInstructionBuilder),
            Arc::new(ScriptedSubmissionClient::always_confirming()),
            Telemetry::new(Arc::new(sink)),
            &SubmitterConfiguration::default(),
        )
        .unwrap();

        assert_eq!(
            commander.dock(&TestObjects::fleet_address()).await,
            Err(CommandError::Context(ContextError::NotInitialized))
        );

        commander.initialize(TestObjects::context()).unwrap();
        assert_eq!(commander.initialize(TestObjects::context()), Err(ContextError::AlreadyInitialized));
    }

    #[tokio::test]
    async fn test_unknown_fleet_is_a_read_failure() {
        let harness = harness(InMemoryLedger::new());

        assert_eq!(
            harness.commander.undock(&TestObjects::fleet_address()).await,
            Err(CommandError::Read(ReadFailure::NotFound {
                address: TestObjects::fleet_address()
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_ledger_is_retried_before_planning() {
        let ledger = Arc::new(ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await);
        ledger.mark_unavailable_for(TestObjects::fleet_address(), 2).await;
        let harness = harness_with(ledger.clone());

        let report = harness.commander.dock(&TestObjects::fleet_address()).await.unwrap();

        assert!(report.fully_succeeded);
        assert_eq!(ledger.read_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_ledger_fails_the_command_after_five_reads() {
        let ledger = Arc::new(ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await);
        ledger.mark_unavailable(TestObjects::fleet_address()).await;
        let harness = harness_with(ledger.clone());

        let result = harness.commander.dock(&TestObjects::fleet_address()).await;

        assert!(matches!(result, Err(CommandError::Read(ReadFailure::Unavailable { .. }))));
        assert_eq!(ledger.read_count(), 5);
        assert!(harness.client.submitted_batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_verbs_after_shutdown_are_rejected() {
        let ledger = Arc::new(ledger_with_fleet(TestObjects::fleet_account(TestObjects::idle_state())).await);
        let mut harness = harness_with(ledger.clone());
        harness.commander.cancellation_token().cancel();

        let result = harness.commander.dock(&TestObjects::fleet_address()).await;

        assert_eq!(result, Err(CommandError::ShutDown));
        assert_eq!(ledger.read_count(), 0);
        assert!(harness.client.submitted_batches().await.is_empty());
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Start { .. })));
        assert!(matches!(harness.events.recv().await, Some(TelemetryEvent::Error { message, .. }) if message == "fleet commander has been shut down"));
    }
}
