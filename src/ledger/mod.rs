use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::owners::{OwnerError, OwnerSet};

pub type AccountId = String;
pub type Amount = u128;

pub const NAME: &str = "Votemint Credit";
pub const SYMBOL: &str = "VMNT";
pub const DECIMALS: u8 = 18;
pub const SCALE: Amount = 1_000_000_000_000_000_000; // 1 credit = 1e18 base units

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Owner(#[from] OwnerError),
    #[error("grant of {requested} would exceed cap {cap} ({granted} already granted)")]
    CapExceeded {
        requested: Amount,
        granted: Amount,
        cap: Amount,
    },
    #[error("{recipients} recipients but {amounts} amounts")]
    LengthMismatch { recipients: usize, amounts: usize },
    #[error("snapshot failed verification: {reason}")]
    CorruptSnapshot { reason: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Issuance from the null source, the one event external indexers see.
    Issuance { to: AccountId, amount: Amount },
}

/// Capped issuance ledger gated by an [`OwnerSet`].
///
/// Open-minting policy: `total_granted` starts at zero and repeated grants
/// to the same recipient accumulate. Two invariants hold in every reachable
/// state: `total_granted == sum(balances)` and `total_granted <= cap`. Any
/// operation that would break either is rejected whole.
///
/// Every mutation takes `&mut self`, so the read-check-write sequence of
/// each operation is already exclusive; sharing across threads needs one
/// external lock around the whole ledger.
#[derive(Clone, Debug)]
pub struct Ledger {
    cap: Amount,
    total_granted: Amount,
    balances: BTreeMap<AccountId, Amount>,
    owners: OwnerSet,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Creates a ledger with a fixed cap and a single seed owner.
    pub fn new(initial_owner: impl Into<AccountId>, cap: Amount) -> Self {
        Self {
            cap,
            total_granted: 0,
            balances: BTreeMap::new(),
            owners: OwnerSet::new(initial_owner),
            events: Vec::new(),
        }
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn total_granted(&self) -> Amount {
        self.total_granted
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn is_owner(&self, account: &str) -> bool {
        self.owners.is_owner(account)
    }

    pub fn owners(&self) -> &OwnerSet {
        &self.owners
    }

    pub fn balances(&self) -> &BTreeMap<AccountId, Amount> {
        &self.balances
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn add_owner(&mut self, caller: &str, new_owner: &str) -> Result<(), LedgerError> {
        self.owners.add(caller, new_owner)?;
        Ok(())
    }

    pub fn remove_owner(&mut self, caller: &str, target: &str) -> Result<(), LedgerError> {
        self.owners.remove(caller, target)?;
        Ok(())
    }

    /// Mints `amount` to `recipient`, accumulating over any prior balance.
    pub fn grant(
        &mut self,
        caller: &str,
        recipient: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.owners.require(caller)?;
        self.check_capacity(amount)?;
        self.credit(recipient, amount);
        self.total_granted += amount;
        Ok(())
    }

    /// Batch grant: the same `amount` to every recipient, all-or-nothing.
    pub fn multigrant(
        &mut self,
        caller: &str,
        recipients: &[AccountId],
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.owners.require(caller)?;
        let aggregate = self.batch_total(recipients.iter().map(|_| amount))?;
        self.check_capacity(aggregate)?;
        for recipient in recipients {
            self.credit(recipient, amount);
        }
        self.total_granted += aggregate;
        Ok(())
    }

    /// Batch grant with a per-recipient amount; the two slices must be the
    /// same length. Same all-or-nothing cap semantics as [`Self::multigrant`].
    pub fn multigrant_each(
        &mut self,
        caller: &str,
        recipients: &[AccountId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        self.owners.require(caller)?;
        if recipients.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch {
                recipients: recipients.len(),
                amounts: amounts.len(),
            });
        }
        let aggregate = self.batch_total(amounts.iter().copied())?;
        self.check_capacity(aggregate)?;
        for (recipient, amount) in recipients.iter().zip(amounts) {
            self.credit(recipient, *amount);
        }
        self.total_granted += aggregate;
        Ok(())
    }

    /// Rejects when the projected post-grant total would pass the cap.
    fn check_capacity(&self, requested: Amount) -> Result<(), LedgerError> {
        let exceeded = || LedgerError::CapExceeded {
            requested,
            granted: self.total_granted,
            cap: self.cap,
        };
        let projected = self
            .total_granted
            .checked_add(requested)
            .ok_or_else(exceeded)?;
        if projected > self.cap {
            return Err(exceeded());
        }
        Ok(())
    }

    /// Sums a batch with overflow checks, before any state is touched.
    fn batch_total(&self, amounts: impl Iterator<Item = Amount>) -> Result<Amount, LedgerError> {
        let mut total: Amount = 0;
        for amount in amounts {
            total = total.checked_add(amount).ok_or(LedgerError::CapExceeded {
                requested: amount,
                granted: self.total_granted,
                cap: self.cap,
            })?;
        }
        Ok(total)
    }

    fn credit(&mut self, recipient: &str, amount: Amount) {
        *self.balances.entry(recipient.to_string()).or_default() += amount;
        self.events.push(LedgerEvent::Issuance {
            to: recipient.to_string(),
            amount,
        });
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            name: NAME.to_string(),
            symbol: SYMBOL.to_string(),
            decimals: DECIMALS,
            cap: self.cap,
            total_granted: self.total_granted,
            balances: self.balances.clone(),
            owners: self.owners.clone(),
            events: self.events.clone(),
            merkle_root: compute_merkle_root(
                self.cap,
                self.total_granted,
                &self.balances,
                &self.owners,
            ),
        }
    }

    /// Restores a ledger from a snapshot, rejecting one whose digest or
    /// accounting invariants do not hold.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let corrupt = |reason: &str| LedgerError::CorruptSnapshot {
            reason: reason.to_string(),
        };
        let expected = compute_merkle_root(
            snapshot.cap,
            snapshot.total_granted,
            &snapshot.balances,
            &snapshot.owners,
        );
        if expected != snapshot.merkle_root {
            return Err(corrupt("merkle root mismatch"));
        }
        if snapshot.owners.is_empty() {
            return Err(corrupt("empty owner set"));
        }
        let mut sum: Amount = 0;
        for amount in snapshot.balances.values() {
            sum = sum
                .checked_add(*amount)
                .ok_or_else(|| corrupt("balance sum overflow"))?;
        }
        if sum != snapshot.total_granted {
            return Err(corrupt("total granted does not match balance sum"));
        }
        if snapshot.total_granted > snapshot.cap {
            return Err(corrupt("total granted exceeds cap"));
        }
        Ok(Self {
            cap: snapshot.cap,
            total_granted: snapshot.total_granted,
            balances: snapshot.balances,
            owners: snapshot.owners,
            events: snapshot.events,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub cap: Amount,
    pub total_granted: Amount,
    pub balances: BTreeMap<AccountId, Amount>,
    pub owners: OwnerSet,
    pub events: Vec<LedgerEvent>,
    pub merkle_root: [u8; 32],
}

fn compute_merkle_root(
    cap: Amount,
    total_granted: Amount,
    balances: &BTreeMap<AccountId, Amount>,
    owners: &OwnerSet,
) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::new();
    let mut hasher = Sha256::new();
    hasher.update(b"meta");
    hasher.update(cap.to_le_bytes());
    hasher.update(total_granted.to_le_bytes());
    leaves.push(hasher.finalize().into());
    for (account, amount) in balances {
        let mut hasher = Sha256::new();
        hasher.update(b"bal");
        hasher.update(account.as_bytes());
        hasher.update(amount.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    for owner in owners.iter() {
        let mut hasher = Sha256::new();
        hasher.update(b"own");
        hasher.update(owner.as_bytes());
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"votemint-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
