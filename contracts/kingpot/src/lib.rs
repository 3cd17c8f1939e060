#![no_std]

//! # KingPot
//!
//! A self-restarting king-of-the-hill pot. Players send tokens to outbid the
//! current king; every accepted bid grows the pot. When the countdown runs
//! out, anyone may end the round: the operator's fee and the king's prize
//! are credited to a withdrawal ledger, a rollover share seeds the next
//! round's pot, and a fresh round starts immediately.
//!
//! ## Round flow
//! 1. Fresh round, no king. Bids open at `first_start`; the first positive
//!    bid crowns its sender.
//! 2. Higher bids take the crown and push the deadline out by
//!    `extension_secs`. Lower bids still land in the pot (unless
//!    `reject_low_bids` is set) but change nothing else.
//! 3. The operator may top up the pot at any time without touching the
//!    king or the deadline.
//! 4. Once `now >= end_time` bids are refused and `end_game` may be called.
//!    `fee = pot / host_fee_divisor`, `rollover = pot / rollover_divisor`,
//!    `prize = pot - fee - rollover`.
//!
//! ## Payments
//! No funds leave the contract during play. Winners and the operator pull
//! their balances with `withdraw`; the operator can push a balance out to
//! its owner with `force_withdraw`. Ledger entries are zeroed before the
//! token transfer and restored if it fails.

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, panic_with_error,
    Address, Env,
};

mod clock;
mod game;
mod ledger;
mod payout;

pub use clock::Clock;
pub use game::{split_pot, BidReceipt, GameConfig, Phase, PotSplit, Round, Settlement};
pub use ledger::WithdrawalLedger;
pub use payout::{FundSink, TokenSink};

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract Events
// ═══════════════════════════════════════════════════════════════════════════════

#[contractevent]
pub struct EvBidPlaced {
    pub round_id: u32,
    pub bidder: Address,
    pub amount: i128,
    pub pot: i128,
    pub crowned: bool,
    pub end_time: u64,
}

#[contractevent]
pub struct EvPotInjected {
    pub round_id: u32,
    pub amount: i128,
    pub pot: i128,
}

#[contractevent]
pub struct EvRoundEnded {
    pub round_id: u32,
    pub king: Option<Address>,
    pub pot: i128,
    pub host_fee: i128,
    pub rollover: i128,
    pub king_prize: i128,
}

/// Emitted whenever a ledger balance grows.
#[contractevent]
pub struct EvCredited {
    pub beneficiary: Address,
    pub amount: i128,
    pub balance: i128,
}

#[contractevent]
pub struct EvWithdrawn {
    pub beneficiary: Address,
    pub amount: i128,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum KingPotError {
    InactiveGame = 1,
    BidTooLow = 2,
    GameStillActive = 3,
    Unauthorized = 4,
    NothingOwed = 5,
    InvalidAmount = 6,
    InvalidConfig = 7,
    Overflow = 8,
    TransferFailed = 9,
    NotInitialized = 10,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Storage & views
// ═══════════════════════════════════════════════════════════════════════════════

#[contracttype]
#[derive(Clone)]
pub(crate) enum DataKey {
    Config,
    Round,
    /// Running sum of every ledger entry.
    TotalPending,
    /// Owed balance: DataKey::Pending(address) → i128
    Pending(Address),
}

/// One consistent snapshot of the current round plus the payout divisors.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundView {
    pub king: Option<Address>,
    pub pot: i128,
    pub highest_bid: i128,
    pub start_time: u64,
    pub end_time: u64,
    pub round_id: u32,
    pub host_fee_divisor: u32,
    pub rollover_divisor: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Smallest divisor that keeps `fee + rollover <= pot` for any pot.
const MIN_DIVISOR: u32 = 2;

// Ledger rate is approximately 5 seconds per ledger on Stellar
const LEDGER_RATE_SECS: u32 = 5;

// Config and the live round: 30 days
const INSTANCE_TTL_SECONDS: u32 = 30 * 24 * 60 * 60;
pub(crate) const INSTANCE_TTL_LEDGERS: u32 = INSTANCE_TTL_SECONDS / LEDGER_RATE_SECS;

// Unclaimed balances outlive any single round: 120 days
const PENDING_TTL_SECONDS: u32 = 120 * 24 * 60 * 60;
pub(crate) const PENDING_TTL_LEDGERS: u32 = PENDING_TTL_SECONDS / LEDGER_RATE_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
//  Contract
// ═══════════════════════════════════════════════════════════════════════════════

#[contract]
pub struct KingPotContract;

#[contractimpl]
impl KingPotContract {
    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Constructor
    // ───────────────────────────────────────────────────────────────────────────

    /// The first round opens at `first_start` (or now, if that moment has
    /// passed) and runs for one `extension_secs` window.
    pub fn __constructor(
        env: Env,
        operator: Address,
        token: Address,
        first_start: u64,
        extension_secs: u64,
        host_fee_divisor: u32,
        rollover_divisor: u32,
        reject_low_bids: bool,
    ) {
        if host_fee_divisor < MIN_DIVISOR || rollover_divisor < MIN_DIVISOR {
            panic_with_error!(&env, KingPotError::InvalidConfig);
        }

        let config = GameConfig {
            operator,
            token,
            extension_secs,
            host_fee_divisor,
            rollover_divisor,
            reject_low_bids,
        };
        env.storage().instance().set(&DataKey::Config, &config);

        let start_time = first_start.max(env.now());
        let end_time = match start_time.checked_add(extension_secs) {
            Some(end_time) => end_time,
            None => panic_with_error!(&env, KingPotError::InvalidConfig),
        };
        Self::write_round(&env, &Round::open(start_time, end_time));
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Play
    // ───────────────────────────────────────────────────────────────────────────

    /// Bid `amount` tokens. The tokens join the pot whether or not the bid
    /// takes the crown.
    pub fn place_bid(env: Env, bidder: Address, amount: i128) -> Result<RoundView, KingPotError> {
        bidder.require_auth();

        let config = Self::load_config(&env)?;
        let mut round = Self::load_round(&env)?;
        let receipt = round.place_bid(&bidder, amount, env.now(), &config)?;
        Self::write_round(&env, &round);

        TokenSink::new(&env, &config.token).pull(&bidder, amount);

        EvBidPlaced {
            round_id: round.round_id,
            bidder,
            amount,
            pot: round.pot,
            crowned: receipt.crowned,
            end_time: round.end_time,
        }
        .publish(&env);

        Ok(Self::view(&round, &config))
    }

    /// Operator-only top-up of the current pot. Returns the new pot.
    pub fn inject_into_pot(env: Env, caller: Address, amount: i128) -> Result<i128, KingPotError> {
        caller.require_auth();

        let config = Self::load_config(&env)?;
        Self::require_operator(&config, &caller)?;

        let mut round = Self::load_round(&env)?;
        round.inject(amount)?;
        Self::write_round(&env, &round);

        TokenSink::new(&env, &config.token).pull(&caller, amount);

        EvPotInjected {
            round_id: round.round_id,
            amount,
            pot: round.pot,
        }
        .publish(&env);

        Ok(round.pot)
    }

    /// Close an expired round. Open to any caller. Credits the ledger and
    /// starts the next round; no tokens move here.
    pub fn end_game(env: Env) -> Result<Settlement, KingPotError> {
        let config = Self::load_config(&env)?;
        let mut round = Self::load_round(&env)?;
        let settlement = round.settle(env.now(), &config)?;

        let ledger = WithdrawalLedger::new(&env);
        ledger.credit(&config.operator, settlement.host_fee)?;
        if let Some(king) = &settlement.king {
            ledger.credit(king, settlement.king_prize)?;
        }
        Self::write_round(&env, &round);

        EvRoundEnded {
            round_id: settlement.round_id,
            king: settlement.king.clone(),
            pot: settlement.pot,
            host_fee: settlement.host_fee,
            rollover: settlement.rollover,
            king_prize: settlement.king_prize,
        }
        .publish(&env);

        Ok(settlement)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Withdrawals
    // ───────────────────────────────────────────────────────────────────────────

    /// Pay out everything owed to `beneficiary`. Returns the amount sent.
    pub fn withdraw(env: Env, beneficiary: Address) -> Result<i128, KingPotError> {
        beneficiary.require_auth();

        let config = Self::load_config(&env)?;
        let sink = TokenSink::new(&env, &config.token);
        Self::pay_out(&env, &sink, &beneficiary)
    }

    /// Operator pushes a beneficiary's balance out to them.
    pub fn force_withdraw(
        env: Env,
        caller: Address,
        beneficiary: Address,
    ) -> Result<i128, KingPotError> {
        caller.require_auth();

        let config = Self::load_config(&env)?;
        Self::require_operator(&config, &caller)?;

        let sink = TokenSink::new(&env, &config.token);
        Self::pay_out(&env, &sink, &beneficiary)
    }

    // ───────────────────────────────────────────────────────────────────────────
    //  Public: Read
    // ───────────────────────────────────────────────────────────────────────────

    pub fn get_all(env: Env) -> Result<RoundView, KingPotError> {
        let config = Self::load_config(&env)?;
        let round = Self::load_round(&env)?;
        Ok(Self::view(&round, &config))
    }

    pub fn get_phase(env: Env) -> Result<Phase, KingPotError> {
        Ok(Self::load_round(&env)?.phase(env.now()))
    }

    pub fn should_end_game(env: Env) -> Result<bool, KingPotError> {
        Ok(Self::load_round(&env)?.should_end(env.now()))
    }

    /// True once the round has started and until its deadline.
    pub fn game_is_active(env: Env) -> Result<bool, KingPotError> {
        Ok(Self::load_round(&env)?.is_active(env.now()))
    }

    pub fn pending_withdrawal_for_address(env: Env, beneficiary: Address) -> i128 {
        WithdrawalLedger::new(&env).balance_of(&beneficiary)
    }

    pub fn total_pending(env: Env) -> i128 {
        WithdrawalLedger::new(&env).total_pending()
    }

    pub fn get_config(env: Env) -> Result<GameConfig, KingPotError> {
        Self::load_config(&env)
    }

    pub fn get_operator(env: Env) -> Result<Address, KingPotError> {
        Ok(Self::load_config(&env)?.operator)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    //  Internal
    // ═══════════════════════════════════════════════════════════════════════════

    /// Zero the entry, then send. A failed send puts the balance back.
    fn pay_out<S: FundSink>(
        env: &Env,
        sink: &S,
        beneficiary: &Address,
    ) -> Result<i128, KingPotError> {
        let ledger = WithdrawalLedger::new(env);
        let amount = ledger.take(beneficiary)?;

        if let Err(err) = sink.send(beneficiary, amount) {
            ledger.restore(beneficiary, amount)?;
            return Err(err);
        }

        EvWithdrawn {
            beneficiary: beneficiary.clone(),
            amount,
        }
        .publish(env);

        Ok(amount)
    }

    fn require_operator(config: &GameConfig, caller: &Address) -> Result<(), KingPotError> {
        if *caller != config.operator {
            return Err(KingPotError::Unauthorized);
        }
        Ok(())
    }

    fn view(round: &Round, config: &GameConfig) -> RoundView {
        RoundView {
            king: round.king.clone(),
            pot: round.pot,
            highest_bid: round.highest_bid,
            start_time: round.start_time,
            end_time: round.end_time,
            round_id: round.round_id,
            host_fee_divisor: config.host_fee_divisor,
            rollover_divisor: config.rollover_divisor,
        }
    }

    fn load_config(env: &Env) -> Result<GameConfig, KingPotError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(KingPotError::NotInitialized)
    }

    fn load_round(env: &Env) -> Result<Round, KingPotError> {
        env.storage()
            .instance()
            .get(&DataKey::Round)
            .ok_or(KingPotError::NotInitialized)
    }

    fn write_round(env: &Env, round: &Round) {
        env.storage().instance().set(&DataKey::Round, round);
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_TTL_LEDGERS, INSTANCE_TTL_LEDGERS);
    }
}
