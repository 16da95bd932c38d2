use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ledger::AccountId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OwnerError {
    #[error("account {account} is not an owner")]
    NotOwner { account: AccountId },
    #[error("account {account} is already an owner")]
    AlreadyOwner { account: AccountId },
    #[error("account {account} is not an owner and cannot be removed")]
    CannotRemoveNonOwner { account: AccountId },
    #[error("an owner cannot remove itself")]
    CannotRemoveSelf,
}

/// The set of accounts allowed to call privileged ledger operations.
///
/// Seeded with exactly one owner at construction. Removal requires a
/// *different* acting owner, so the set can never empty: the last
/// remaining owner is irremovable without any cardinality check.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerSet {
    members: BTreeSet<AccountId>,
}

impl OwnerSet {
    pub fn new(initial: impl Into<AccountId>) -> Self {
        let mut members = BTreeSet::new();
        members.insert(initial.into());
        Self { members }
    }

    pub fn is_owner(&self, account: &str) -> bool {
        self.members.contains(account)
    }

    /// Authorization gate consulted before every privileged mutation.
    pub fn require(&self, caller: &str) -> Result<(), OwnerError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(OwnerError::NotOwner {
                account: caller.to_string(),
            })
        }
    }

    pub fn add(&mut self, caller: &str, new_owner: &str) -> Result<(), OwnerError> {
        self.require(caller)?;
        if self.is_owner(new_owner) {
            return Err(OwnerError::AlreadyOwner {
                account: new_owner.to_string(),
            });
        }
        self.members.insert(new_owner.to_string());
        Ok(())
    }

    pub fn remove(&mut self, caller: &str, target: &str) -> Result<(), OwnerError> {
        self.require(caller)?;
        if !self.is_owner(target) {
            return Err(OwnerError::CannotRemoveNonOwner {
                account: target.to_string(),
            });
        }
        if target == caller {
            return Err(OwnerError::CannotRemoveSelf);
        }
        self.members.remove(target);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountId> {
        self.members.iter()
    }
}
