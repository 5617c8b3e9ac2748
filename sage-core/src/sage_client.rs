use crate::retry_policy::{classify_read_failure, RetryError, SubmissionRetryPolicy};
use async_trait::async_trait;
use sage_domain::{
    AccountData, AccountKind, Address, BuildFailure, CargoPodSnapshot, CargoTypeAccount, ConfirmFailure, ConfirmationStatus, EncodedInstruction, FleetAccount,
    GameContext, MineItemAccount, OperationDescriptor, OperationOrigin, OperationParams, PlanetAccount, ReadFailure, ResourceAccount, Signature,
    StarbaseAccount, SubmitFailure,
};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Read access to ledger accounts. Reads are eventually consistent: two calls in a row may disagree.
#[async_trait]
pub trait LedgerReader: Send + Sync + Debug {
    async fn read_account(&self, address: &Address, kind: AccountKind) -> Result<AccountData, ReadFailure>;

    async fn read_many(&self, requests: &[(Address, AccountKind)]) -> Vec<Result<AccountData, ReadFailure>>;
}

/// Wraps a reader so that unreachable-node failures are retried under a bounded policy.
/// Missing accounts and accounts of the wrong kind fail on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryingLedgerReader {
    inner: Arc<dyn LedgerReader>,
    policy: SubmissionRetryPolicy,
}

impl RetryingLedgerReader {
    pub fn new(inner: Arc<dyn LedgerReader>, policy: SubmissionRetryPolicy) -> Self {
        RetryingLedgerReader { inner, policy }
    }
}

#[async_trait]
impl LedgerReader for RetryingLedgerReader {
    async fn read_account(&self, address: &Address, kind: AccountKind) -> Result<AccountData, ReadFailure> {
        let timed_out = |after: Duration| ReadFailure::Unavailable {
            address: address.clone(),
            reason: format!("no response within {after:?}"),
        };

        self.policy
            .run(&format!("read of {kind} {address}"), classify_read_failure, timed_out, || self.inner.read_account(address, kind))
            .await
            .map_err(RetryError::into_error)
    }

    /// Every account gets its own attempts, so one flaky address does not fail the others.
    async fn read_many(&self, requests: &[(Address, AccountKind)]) -> Vec<Result<AccountData, ReadFailure>> {
        futures::future::join_all(
            requests
                .iter()
                .map(|(address, kind)| self.read_account(address, *kind)),
        )
        .await
    }
}

/// Turns typed operation parameters into an encoded ledger instruction.
pub trait InstructionBuilder: Send + Sync + Debug {
    fn build_operation(&self, context: &GameContext, params: &OperationParams) -> Result<EncodedInstruction, BuildFailure>;
}

#[async_trait]
pub trait SubmissionClient: Send + Sync + Debug {
    async fn submit(&self, batch: &[OperationDescriptor]) -> Result<Signature, SubmitFailure>;

    async fn confirm(&self, signature: &Signature) -> Result<ConfirmationStatus, ConfirmFailure>;
}

pub fn build_descriptor(
    builder: &dyn InstructionBuilder,
    context: &GameContext,
    params: &OperationParams,
    origin: OperationOrigin,
) -> Result<OperationDescriptor, BuildFailure> {
    let instruction = builder.build_operation(context, params)?;
    Ok(OperationDescriptor {
        kind: params.kind(),
        origin,
        instruction,
    })
}

fn unexpected(address: &Address, expected: AccountKind, actual: &AccountData) -> ReadFailure {
    ReadFailure::UnexpectedAccountKind {
        address: address.clone(),
        expected,
        actual: actual.kind(),
    }
}

pub fn expect_cargo_pod(address: &Address, data: AccountData) -> Result<CargoPodSnapshot, ReadFailure> {
    match data {
        AccountData::CargoPod(snapshot) => Ok(snapshot),
        other => Err(unexpected(address, AccountKind::CargoPod, &other)),
    }
}

pub fn expect_cargo_type(address: &Address, data: AccountData) -> Result<CargoTypeAccount, ReadFailure> {
    match data {
        AccountData::CargoType(cargo_type) => Ok(cargo_type),
        other => Err(unexpected(address, AccountKind::CargoType, &other)),
    }
}

pub async fn read_fleet(reader: &dyn LedgerReader, address: &Address) -> Result<FleetAccount, ReadFailure> {
    match reader.read_account(address, AccountKind::Fleet).await? {
        AccountData::Fleet(fleet) => Ok(fleet),
        other => Err(unexpected(address, AccountKind::Fleet, &other)),
    }
}

pub async fn read_cargo_pod(reader: &dyn LedgerReader, address: &Address) -> Result<CargoPodSnapshot, ReadFailure> {
    let data = reader.read_account(address, AccountKind::CargoPod).await?;
    expect_cargo_pod(address, data)
}

pub async fn read_resource(reader: &dyn LedgerReader, address: &Address) -> Result<ResourceAccount, ReadFailure> {
    match reader.read_account(address, AccountKind::Resource).await? {
        AccountData::Resource(resource) => Ok(resource),
        other => Err(unexpected(address, AccountKind::Resource, &other)),
    }
}

pub async fn read_mine_item(reader: &dyn LedgerReader, address: &Address) -> Result<MineItemAccount, ReadFailure> {
    match reader.read_account(address, AccountKind::MineItem).await? {
        AccountData::MineItem(mine_item) => Ok(mine_item),
        other => Err(unexpected(address, AccountKind::MineItem, &other)),
    }
}

pub async fn read_planet(reader: &dyn LedgerReader, address: &Address) -> Result<PlanetAccount, ReadFailure> {
    match reader.read_account(address, AccountKind::Planet).await? {
        AccountData::Planet(planet) => Ok(planet),
        other => Err(unexpected(address, AccountKind::Planet, &other)),
    }
}

pub async fn read_starbase(reader: &dyn LedgerReader, address: &Address) -> Result<StarbaseAccount, ReadFailure> {
    match reader.read_account(address, AccountKind::Starbase).await? {
        AccountData::Starbase(starbase) => Ok(starbase),
        other => Err(unexpected(address, AccountKind::Starbase, &other)),
    }
}

/// Resolves the mint produced by a resource deposit: resource -> mine item -> mint.
pub async fn resolve_resource_mint(reader: &dyn LedgerReader, resource: &Address) -> Result<(ResourceAccount, MineItemAccount), ReadFailure> {
    let resource_account = read_resource(reader, resource).await?;
    let mine_item = read_mine_item(reader, &resource_account.mine_item).await?;
    Ok((resource_account, mine_item))
}
