//! Round state machine.
//!
//! Everything here is a pure transition over [`Round`]: callers pass `now`
//! in and persist the result themselves. Nothing in this module touches
//! storage, the ledger clock or the token contract.
//!
//! ```text
//!   Scheduled ──now >= start_time──▶ Fresh ──bid──▶ Contested
//!                                      ▲                │
//!                                   settle      now >= end_time
//!                                      │                ▼
//!                                      └───────────── Expired
//! ```
//!
//! Only the first round can be `Scheduled`; settling starts the next round
//! at once. No phase is ever stored. It is derived from `now` against
//! `start_time` and `end_time` every time it is asked for.

use soroban_sdk::{contracttype, Address};

use crate::KingPotError;

// ═══════════════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════════════

/// Deployment parameters. Fixed by the constructor, never touched by play.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameConfig {
    pub operator: Address,
    pub token: Address,
    /// Seconds added to the clock when a new king is crowned or a round resets.
    pub extension_secs: u64,
    pub host_fee_divisor: u32,
    pub rollover_divisor: u32,
    /// When false, bids that do not beat the king still land in the pot.
    pub reject_low_bids: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Round {
    pub round_id: u32,
    pub pot: i128,
    pub king: Option<Address>,
    pub highest_bid: i128,
    /// Bids before this moment are refused.
    pub start_time: u64,
    pub end_time: u64,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Deployed ahead of its first start time.
    Scheduled,
    /// No king yet; any positive bid is accepted.
    Fresh,
    /// A king exists; only higher bids take the crown.
    Contested,
    /// Deadline reached; waiting for someone to end the round.
    Expired,
}

/// Result of a finished round. Returned by `end_game` and mirrored in the
/// round-ended event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settlement {
    pub round_id: u32,
    pub king: Option<Address>,
    pub pot: i128,
    pub host_fee: i128,
    pub rollover: i128,
    pub king_prize: i128,
    pub next_end_time: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BidReceipt {
    pub crowned: bool,
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PotSplit {
    pub host_fee: i128,
    pub rollover: i128,
    pub king_prize: i128,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Payout arithmetic
// ═══════════════════════════════════════════════════════════════════════════════

/// Floor-divide the pot into operator fee, rollover and king prize.
/// The three parts always sum back to `pot`.
pub fn split_pot(
    pot: i128,
    host_fee_divisor: u32,
    rollover_divisor: u32,
) -> Result<PotSplit, KingPotError> {
    if pot < 0 {
        return Err(KingPotError::InvalidAmount);
    }
    if host_fee_divisor == 0 || rollover_divisor == 0 {
        return Err(KingPotError::InvalidConfig);
    }

    let host_fee = pot / host_fee_divisor as i128;
    let rollover = pot / rollover_divisor as i128;
    let king_prize = pot - host_fee - rollover;
    if king_prize < 0 {
        return Err(KingPotError::InvalidConfig);
    }

    Ok(PotSplit {
        host_fee,
        rollover,
        king_prize,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Transitions
// ═══════════════════════════════════════════════════════════════════════════════

impl Round {
    /// The very first round. Later rounds come out of [`Round::settle`].
    pub fn open(start_time: u64, end_time: u64) -> Self {
        Round {
            round_id: 1,
            pot: 0,
            king: None,
            highest_bid: 0,
            start_time,
            end_time,
        }
    }

    pub fn should_end(&self, now: u64) -> bool {
        now >= self.end_time
    }

    /// Started and not yet past its deadline.
    pub fn is_active(&self, now: u64) -> bool {
        now >= self.start_time && !self.should_end(now)
    }

    pub fn phase(&self, now: u64) -> Phase {
        if now < self.start_time {
            Phase::Scheduled
        } else if self.should_end(now) {
            Phase::Expired
        } else if self.king.is_none() {
            Phase::Fresh
        } else {
            Phase::Contested
        }
    }

    /// Apply a bid. On error the round is left untouched.
    ///
    /// A bid beating `highest_bid` (or any bid in a fresh round) crowns the
    /// bidder. The timer is pushed out only when the crown changes hands; a
    /// king raising their own bid keeps the current deadline.
    pub fn place_bid(
        &mut self,
        bidder: &Address,
        amount: i128,
        now: u64,
        config: &GameConfig,
    ) -> Result<BidReceipt, KingPotError> {
        if amount <= 0 {
            return Err(KingPotError::InvalidAmount);
        }
        if !self.is_active(now) {
            return Err(KingPotError::InactiveGame);
        }

        let crowned = match self.king {
            None => true,
            Some(_) => amount > self.highest_bid,
        };
        if !crowned && config.reject_low_bids {
            return Err(KingPotError::BidTooLow);
        }

        let pot = self
            .pot
            .checked_add(amount)
            .ok_or(KingPotError::Overflow)?;

        let usurped = crowned && self.king.as_ref() != Some(bidder);
        let end_time = if usurped {
            let candidate = now
                .checked_add(config.extension_secs)
                .ok_or(KingPotError::Overflow)?;
            candidate.max(self.end_time)
        } else {
            self.end_time
        };

        let extended = end_time > self.end_time;
        self.pot = pot;
        self.end_time = end_time;
        if crowned {
            self.king = Some(bidder.clone());
            self.highest_bid = amount;
        }

        Ok(BidReceipt { crowned, extended })
    }

    /// Operator top-up. Only the pot moves.
    pub fn inject(&mut self, amount: i128) -> Result<(), KingPotError> {
        if amount <= 0 {
            return Err(KingPotError::InvalidAmount);
        }
        self.pot = self
            .pot
            .checked_add(amount)
            .ok_or(KingPotError::Overflow)?;
        Ok(())
    }

    /// Close an expired round and roll straight into the next one.
    ///
    /// The operator's fee is taken whether or not anyone was crowned. A
    /// round without a king has no prize to pay, so everything after the
    /// fee rolls over.
    pub fn settle(&mut self, now: u64, config: &GameConfig) -> Result<Settlement, KingPotError> {
        if !self.should_end(now) {
            return Err(KingPotError::GameStillActive);
        }

        let split = split_pot(self.pot, config.host_fee_divisor, config.rollover_divisor)?;
        let split = match self.king {
            Some(_) => split,
            None => PotSplit {
                host_fee: split.host_fee,
                rollover: self.pot - split.host_fee,
                king_prize: 0,
            },
        };
        let next_round_id = self
            .round_id
            .checked_add(1)
            .ok_or(KingPotError::Overflow)?;
        let next_end_time = now
            .checked_add(config.extension_secs)
            .ok_or(KingPotError::Overflow)?;

        let settlement = Settlement {
            round_id: self.round_id,
            king: self.king.take(),
            pot: self.pot,
            host_fee: split.host_fee,
            rollover: split.rollover,
            king_prize: split.king_prize,
            next_end_time,
        };

        self.round_id = next_round_id;
        self.pot = split.rollover;
        self.highest_bid = 0;
        self.start_time = now;
        self.end_time = next_end_time;

        Ok(settlement)
    }
}
