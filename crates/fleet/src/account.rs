//! Accounts and egress assignment

use rewards_api::Egress;

use crate::error::{Error, Result};

/// One configured account. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// 1-based position in the accounts file, for diagnostics
    pub index: usize,
    /// Wallet address, passed through unvalidated
    pub address: String,
    pub egress: Option<Egress>,
}

/// Egress for the account at 0-based `position`: `slots[position % len]`.
///
/// A slot holding `None` (unrecognized proxy scheme) still counts towards the
/// modulus; an empty slot list means every account connects directly.
pub fn assign_egress(position: usize, slots: &[Option<Egress>]) -> Option<Egress> {
    if slots.is_empty() {
        return None;
    }
    slots[position % slots.len()].clone()
}

/// Pair each address with its egress, keeping input order.
pub fn plan_accounts(addresses: Vec<String>, slots: &[Option<Egress>]) -> Result<Vec<Account>> {
    if addresses.is_empty() {
        return Err(Error::NoAccounts);
    }
    Ok(addresses
        .into_iter()
        .enumerate()
        .map(|(position, address)| Account {
            index: position + 1,
            address,
            egress: assign_egress(position, slots),
        })
        .collect())
}
