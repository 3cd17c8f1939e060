use soroban_sdk::Env;

/// Source of the current time, in seconds.
///
/// The round logic never reads a clock itself; the contract asks a `Clock`
/// and hands the value to the state machine.
pub trait Clock {
    fn now(&self) -> u64;
}

impl Clock for Env {
    fn now(&self) -> u64 {
        self.ledger().timestamp()
    }
}
