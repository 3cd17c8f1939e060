//! Pull-payment ledger.
//!
//! Round settlement only ever credits balances here; funds leave the
//! contract later, when a beneficiary (or the operator on their behalf)
//! withdraws. Entries are zeroed, never removed.

use soroban_sdk::{Address, Env};

use crate::{DataKey, EvCredited, KingPotError, INSTANCE_TTL_LEDGERS, PENDING_TTL_LEDGERS};

pub struct WithdrawalLedger<'a> {
    env: &'a Env,
}

impl<'a> WithdrawalLedger<'a> {
    pub fn new(env: &'a Env) -> Self {
        WithdrawalLedger { env }
    }

    /// Owed balance; zero for anyone never credited.
    pub fn balance_of(&self, beneficiary: &Address) -> i128 {
        self.env
            .storage()
            .persistent()
            .get(&DataKey::Pending(beneficiary.clone()))
            .unwrap_or(0)
    }

    /// Sum of every owed balance.
    pub fn total_pending(&self) -> i128 {
        self.env
            .storage()
            .instance()
            .get(&DataKey::TotalPending)
            .unwrap_or(0)
    }

    /// Add `amount` to what `beneficiary` is owed. Returns the new balance.
    pub(crate) fn credit(&self, beneficiary: &Address, amount: i128) -> Result<i128, KingPotError> {
        if amount < 0 {
            return Err(KingPotError::InvalidAmount);
        }
        if amount == 0 {
            return Ok(self.balance_of(beneficiary));
        }

        let balance = self.add(beneficiary, amount)?;
        EvCredited {
            beneficiary: beneficiary.clone(),
            amount,
            balance,
        }
        .publish(self.env);
        Ok(balance)
    }

    /// Zero the entry and hand back what was owed. The caller pays out
    /// afterwards, so a re-entrant withdrawal finds nothing left.
    pub(crate) fn take(&self, beneficiary: &Address) -> Result<i128, KingPotError> {
        let owed = self.balance_of(beneficiary);
        if owed == 0 {
            return Err(KingPotError::NothingOwed);
        }

        let total = self
            .total_pending()
            .checked_sub(owed)
            .ok_or(KingPotError::Overflow)?;
        self.write_entry(beneficiary, 0);
        self.write_total(total);
        Ok(owed)
    }

    /// Put back an amount returned by [`take`](Self::take) after the payout
    /// could not be delivered.
    pub(crate) fn restore(&self, beneficiary: &Address, amount: i128) -> Result<(), KingPotError> {
        self.add(beneficiary, amount)?;
        Ok(())
    }

    fn add(&self, beneficiary: &Address, amount: i128) -> Result<i128, KingPotError> {
        let balance = self
            .balance_of(beneficiary)
            .checked_add(amount)
            .ok_or(KingPotError::Overflow)?;
        let total = self
            .total_pending()
            .checked_add(amount)
            .ok_or(KingPotError::Overflow)?;
        self.write_entry(beneficiary, balance);
        self.write_total(total);
        Ok(balance)
    }

    fn write_entry(&self, beneficiary: &Address, balance: i128) {
        let key = DataKey::Pending(beneficiary.clone());
        self.env.storage().persistent().set(&key, &balance);
        self.env
            .storage()
            .persistent()
            .extend_ttl(&key, PENDING_TTL_LEDGERS, PENDING_TTL_LEDGERS);
    }

    fn write_total(&self, total: i128) {
        self.env.storage().instance().set(&DataKey::TotalPending, &total);
        self.env
            .storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_LEDGERS, INSTANCE_TTL_LEDGERS);
    }
}
