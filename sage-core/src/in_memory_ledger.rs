use crate::sage_client::LedgerReader;
use async_trait::async_trait;
use sage_domain::{AccountData, AccountKind, Address, ReadFailure};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outage {
    Permanent,
    Remaining(u32),
}

/// Ledger reader backed by a map of accounts, for simulations and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<Address, AccountData>>,
    outages: RwLock<HashMap<Address, Outage>>,
    reads: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = (Address, AccountData)>) -> Self {
        InMemoryLedger {
            accounts: RwLock::new(accounts.into_iter().collect()),
            ..Self::default()
        }
    }

    pub async fn insert(&self, address: Address, data: AccountData) {
        self.accounts.write().await.insert(address, data);
    }

    /// Subsequent reads of `address` fail as if the node could not be reached.
    pub async fn mark_unavailable(&self, address: Address) {
        self.outages.write().await.insert(address, Outage::Permanent);
    }

    /// The next `failures` reads of `address` fail as unreachable, later reads succeed.
    pub async fn mark_unavailable_for(&self, address: Address, failures: u32) {
        self.outages.write().await.insert(address, Outage::Remaining(failures));
    }

    /// Number of single-account reads served so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn take_outage(&self, address: &Address) -> bool {
        let mut outages = self.outages.write().await;
        match outages.get_mut(address) {
            Some(Outage::Permanent) => true,
            Some(Outage::Remaining(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn read_account(&self, address: &Address, kind: AccountKind) -> Result<AccountData, ReadFailure> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.take_outage(address).await {
            return Err(ReadFailure::Unavailable {
                address: address.clone(),
                reason: "node unreachable".to_string(),
            });
        }

        let guard = self.accounts.read().await;
        let data = guard
            .get(address)
            .ok_or_else(|| ReadFailure::NotFound { address: address.clone() })?;

        if data.kind() != kind {
            return Err(ReadFailure::UnexpectedAccountKind {
                address: address.clone(),
                expected: kind,
                actual: data.kind(),
            });
        }

        Ok(data.clone())
    }

    async fn read_many(&self, requests: &[(Address, AccountKind)]) -> Vec<Result<AccountData, ReadFailure>> {
        futures::future::join_all(
            requests
                .iter()
                .map(|(address, kind)| self.read_account(address, *kind)),
        )
        .await
    }
}
