use crate::in_memory_ledger::InMemoryLedger;
use crate::sage_client::{InstructionBuilder, SubmissionClient};
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sage_domain::{
    AccountData, Address, BuildFailure, CargoPodKind, CargoPodSnapshot, CargoTypeAccount, ConfirmFailure, ConfirmationStatus, CrewCount, EncodedInstruction,
    FleetAccount, FleetCargoPods, FleetState, GameContext, MineItemAccount, OperationDescriptor, OperationKind, OperationOrigin, OperationParams,
    PlanetAccount, ResourceAccount, ResourceHolding, Sector, Signature, SubmitFailure, TransferDirection, TransferMode, TransferRequest,
};
use std::collections::VecDeque;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct TestObjects;

impl TestObjects {
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 13, 19, 0, 0).unwrap()
    }

    pub fn context() -> GameContext {
        GameContext {
            game: Address::new("GAME"),
            program: Address::new("SAGE_PROGRAM"),
            profile: Address::new("PLAYER_PROFILE"),
            fuel_mint: Self::fuel_mint(),
            ammo_mint: Self::ammo_mint(),
        }
    }

    pub fn crew(current: u64, required: u64, capacity: u64) -> CrewCount {
        CrewCount { current, required, capacity }
    }
}

// addresses and sectors
impl TestObjects {
    pub fn fleet_address() -> Address {
        Address::new("FLEET_1")
    }

    pub fn starbase_address() -> Address {
        Address::new("STARBASE_MUD")
    }

    pub fn resource_address() -> Address {
        Address::new("RESOURCE_HYDROGEN")
    }

    pub fn asteroid_address() -> Address {
        Address::new("ASTEROID_7")
    }

    pub fn mine_item_address() -> Address {
        Address::new("MINE_ITEM_HYDROGEN")
    }

    pub fn ore_mint() -> Address {
        Address::new("MINT_HYDROGEN")
    }

    pub fn fuel_mint() -> Address {
        Address::new("MINT_FUEL")
    }

    pub fn ammo_mint() -> Address {
        Address::new("MINT_AMMO")
    }

    pub fn fuel_tank_address() -> Address {
        Address::new("FLEET_1_FUEL_TANK")
    }

    pub fn ammo_bank_address() -> Address {
        Address::new("FLEET_1_AMMO_BANK")
    }

    pub fn cargo_hold_address() -> Address {
        Address::new("FLEET_1_CARGO_HOLD")
    }

    pub fn starbase_pod_address() -> Address {
        Address::new("STARBASE_MUD_PLAYER_POD")
    }

    pub fn home_sector() -> Sector {
        Sector::new(0, -39)
    }

    pub fn destination_sector() -> Sector {
        Sector::new(-40, 30)
    }

    pub fn asteroid_sector() -> Sector {
        Sector::new(2, -34)
    }
}

// fleet states and accounts
impl TestObjects {
    pub fn idle_state() -> FleetState {
        FleetState::Idle { sector: Self::home_sector() }
    }

    pub fn docked_state() -> FleetState {
        FleetState::StarbaseLoadingBay {
            starbase: Self::starbase_address(),
        }
    }

    pub fn warp_state(arrival_time: DateTime<Utc>) -> FleetState {
        FleetState::MoveWarp {
            to_sector: Self::destination_sector(),
            arrival_time,
        }
    }

    pub fn subwarp_state(arrival_time: DateTime<Utc>) -> FleetState {
        FleetState::MoveSubwarp {
            to_sector: Self::destination_sector(),
            arrival_time,
        }
    }

    pub fn mining_state() -> FleetState {
        FleetState::MineAsteroid {
            resource: Self::resource_address(),
            asteroid: Self::asteroid_address(),
        }
    }

    pub fn respawn_state() -> FleetState {
        FleetState::Respawn { sector: Self::home_sector() }
    }

    pub fn fleet_account(state: FleetState) -> FleetAccount {
        FleetAccount {
            address: Self::fleet_address(),
            owner_profile: Self::context().profile,
            state,
            crew: Self::crew(10, 10, 20),
            cargo_pods: FleetCargoPods {
                fuel_tank: Self::fuel_tank_address(),
                ammo_bank: Self::ammo_bank_address(),
                cargo_hold: Self::cargo_hold_address(),
            },
        }
    }

    /// Resource, mine item and asteroid accounts behind [`TestObjects::mining_state`].
    pub fn mining_ledger() -> InMemoryLedger {
        InMemoryLedger::with_accounts([
            (
                Self::resource_address(),
                AccountData::Resource(ResourceAccount {
                    address: Self::resource_address(),
                    mine_item: Self::mine_item_address(),
                    asteroid: Self::asteroid_address(),
                }),
            ),
            (
                Self::mine_item_address(),
                AccountData::MineItem(MineItemAccount {
                    address: Self::mine_item_address(),
                    mint: Self::ore_mint(),
                }),
            ),
            (
                Self::asteroid_address(),
                AccountData::Planet(PlanetAccount {
                    address: Self::asteroid_address(),
                    sector: Self::asteroid_sector(),
                }),
            ),
        ])
    }
}

// cargo
impl TestObjects {
    fn with_holdings(mut snapshot: CargoPodSnapshot, holdings: &[(Address, u64, u64)]) -> CargoPodSnapshot {
        for (mint, amount_in_tokens, cargo_units_per_token) in holdings {
            let amount_in_cargo_units = amount_in_tokens * cargo_units_per_token;
            snapshot.resources.insert(
                mint.clone(),
                ResourceHolding {
                    amount_in_tokens: *amount_in_tokens,
                    amount_in_cargo_units,
                    cargo_units_per_token: *cargo_units_per_token,
                },
            );
            snapshot.total_resources_amount_in_cargo_units += amount_in_cargo_units;
        }
        snapshot
    }

    pub fn fuel_tank(max_capacity: u64, fuel: u64) -> CargoPodSnapshot {
        let tank = CargoPodSnapshot::fleet_pod(Self::fuel_tank_address(), CargoPodKind::FuelTank, max_capacity);
        if fuel == 0 {
            return tank;
        }
        Self::with_holdings(tank, &[(Self::fuel_mint(), fuel, 1)])
    }

    pub fn cargo_hold(max_capacity: u64, holdings: &[(Address, u64, u64)]) -> CargoPodSnapshot {
        Self::with_holdings(
            CargoPodSnapshot::fleet_pod(Self::cargo_hold_address(), CargoPodKind::CargoHold, max_capacity),
            holdings,
        )
    }

    pub fn starbase_pod(holdings: &[(Address, u64, u64)]) -> CargoPodSnapshot {
        Self::with_holdings(CargoPodSnapshot::depot(Self::starbase_pod_address()), holdings)
    }

    /// Ledger holding the given pods plus one cargo type per `(mint, cargo_units_per_token)`.
    pub fn transfer_ledger(pods: Vec<CargoPodSnapshot>, cargo_types: &[(Address, u64)]) -> InMemoryLedger {
        let pods = pods
            .into_iter()
            .map(|pod| (pod.address.clone(), AccountData::CargoPod(pod)));
        let cargo_types = cargo_types.iter().map(|(mint, cargo_units_per_token)| {
            (
                mint.clone(),
                AccountData::CargoType(CargoTypeAccount {
                    mint: mint.clone(),
                    cargo_units_per_token: *cargo_units_per_token,
                }),
            )
        });
        InMemoryLedger::with_accounts(pods.chain(cargo_types))
    }
}

// operations
impl TestObjects {
    /// `count` distinct deposit operations of one token each of a different resource.
    pub fn deposit_operations(count: usize) -> Vec<OperationDescriptor> {
        (0..count)
            .map(|idx| {
                let resource = Address::new(format!("MINT_{idx}"));
                let amount_in_tokens = idx as u64 + 1;
                let params = OperationParams::DepositCargo {
                    fleet: Self::fleet_address(),
                    fleet_pod: Self::cargo_hold_address(),
                    starbase_pod: Self::starbase_pod_address(),
                    resource: resource.clone(),
                    amount_in_tokens,
                };
                OperationDescriptor {
                    kind: OperationKind::DepositCargo,
                    origin: OperationOrigin::CargoTransfer {
                        direction: TransferDirection::ToStarbase,
                        request: TransferRequest {
                            resource,
                            pod_kind: CargoPodKind::CargoHold,
                            mode: TransferMode::Fixed,
                            value: amount_in_tokens,
                        },
                        amount_in_tokens,
                    },
                    instruction: JsonInstructionBuilder.build_operation(&Self::context(), &params).unwrap(),
                }
            })
            .collect()
    }

    pub fn bookkeeping_operation(label: &str) -> OperationDescriptor {
        OperationDescriptor {
            kind: OperationKind::DepositCargo,
            origin: OperationOrigin::Bookkeeping { label: label.to_string() },
            instruction: EncodedInstruction(label.as_bytes().to_vec()),
        }
    }
}

/// Encodes operation parameters as JSON so tests can decode and inspect them.
#[derive(Debug, Clone, Default)]
pub struct JsonInstructionBuilder;

impl JsonInstructionBuilder {
    pub fn decode(descriptor: &OperationDescriptor) -> OperationParams {
        serde_json::from_slice(&descriptor.instruction.0).unwrap()
    }
}

impl InstructionBuilder for JsonInstructionBuilder {
    fn build_operation(&self, _context: &GameContext, params: &OperationParams) -> Result<EncodedInstruction, BuildFailure> {
        serde_json::to_vec(params).map(EncodedInstruction).map_err(|err| BuildFailure {
            kind: params.kind(),
            reason: err.to_string(),
        })
    }
}

/// Submission client that replays scripted results and confirms everything else.
#[derive(Debug, Default)]
pub struct ScriptedSubmissionClient {
    submit_script: Mutex<VecDeque<Result<Signature, SubmitFailure>>>,
    confirm_script: Mutex<VecDeque<Result<ConfirmationStatus, ConfirmFailure>>>,
    submitted: Mutex<Vec<Vec<OperationDescriptor>>>,
    confirm_calls: Mutex<usize>,
    cancel_on_confirm: Option<CancellationToken>,
}

impl ScriptedSubmissionClient {
    pub fn always_confirming() -> Self {
        Self::default()
    }

    pub fn cancel_after_first_confirm(mut self, token: CancellationToken) -> Self {
        self.cancel_on_confirm = Some(token);
        self
    }

    pub async fn script_submit(&self, results: Vec<Result<Signature, SubmitFailure>>) {
        self.submit_script.lock().await.extend(results);
    }

    pub async fn script_confirm(&self, results: Vec<Result<ConfirmationStatus, ConfirmFailure>>) {
        self.confirm_script.lock().await.extend(results);
    }

    /// Every batch passed to `submit`, including the ones that failed.
    pub async fn submitted_batches(&self) -> Vec<Vec<OperationDescriptor>> {
        self.submitted.lock().await.clone()
    }

    pub async fn confirm_calls(&self) -> usize {
        *self.confirm_calls.lock().await
    }
}

#[async_trait]
impl SubmissionClient for ScriptedSubmissionClient {
    async fn submit(&self, batch: &[OperationDescriptor]) -> Result<Signature, SubmitFailure> {
        let mut submitted = self.submitted.lock().await;
        submitted.push(batch.to_vec());
        let signature = Signature(format!("SIG-{}", submitted.len()));

        self.submit_script.lock().await.pop_front().unwrap_or(Ok(signature))
    }

    async fn confirm(&self, _signature: &Signature) -> Result<ConfirmationStatus, ConfirmFailure> {
        *self.confirm_calls.lock().await += 1;
        if let Some(token) = &self.cancel_on_confirm {
            token.cancel();
        }

        self.confirm_script
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(ConfirmationStatus::default()))
    }
}

#[derive(Debug, Clone)]
pub struct RecordingTelemetrySink {
    sender: UnboundedSender<TelemetryEvent>,
}

impl RecordingTelemetrySink {
    pub fn new() -> (Self, UnboundedReceiver<TelemetryEvent>) {
        let (sender, receiver) = unbounded_channel();
        (RecordingTelemetrySink { sender }, receiver)
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetrySink {
    async fn deliver(&self, event: &TelemetryEvent) -> anyhow::Result<()> {
        self.sender.send(event.clone())?;
        Ok(())
    }
}
