//! Fund movement in and out of the contract.

use soroban_sdk::{token, Address, Env};

use crate::KingPotError;

/// Destination for outbound payments. A failed send must leave the caller
/// free to restore its own bookkeeping.
pub trait FundSink {
    fn send(&self, to: &Address, amount: i128) -> Result<(), KingPotError>;
}

/// Pays out of the contract's own balance on the game token.
pub struct TokenSink<'a> {
    env: &'a Env,
    token: token::Client<'a>,
}

impl<'a> TokenSink<'a> {
    pub fn new(env: &'a Env, token: &Address) -> Self {
        TokenSink {
            env,
            token: token::Client::new(env, token),
        }
    }

    /// Move `amount` from `from` into the contract. Any failure aborts the
    /// whole invocation, so this is always called after storage is final.
    pub fn pull(&self, from: &Address, amount: i128) {
        self.token
            .transfer(from, &self.env.current_contract_address(), &amount);
    }
}

impl FundSink for TokenSink<'_> {
    fn send(&self, to: &Address, amount: i128) -> Result<(), KingPotError> {
        match self
            .token
            .try_transfer(&self.env.current_contract_address(), to, &amount)
        {
            Ok(Ok(())) => Ok(()),
            _ => Err(KingPotError::TransferFailed),
        }
    }
}
