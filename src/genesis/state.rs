// Genesis state - Per-module initial state embedded in the genesis document
use crate::types::{BaseAccount, Coin, Coins, GenesisBalance, SignedTransaction, BOND_DENOM};
use serde::{Deserialize, Serialize};

/// Application state at genesis, one section per module
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenesisState {
    pub auth: AuthGenesis,
    pub bank: BankGenesis,
    pub staking: StakingGenesis,
    pub genutil: GenutilGenesis,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthGenesis {
    pub params: AuthParams,
    pub accounts: Vec<BaseAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    pub max_memo_characters: usize,
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            max_memo_characters: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BankGenesis {
    pub balances: Vec<GenesisBalance>,

    /// Total of all balances, per denomination
    pub supply: Vec<Coin>,
}

impl BankGenesis {
    /// Sum of `balances`
    pub fn compute_supply(&self) -> Vec<Coin> {
        let mut total = Coins::new();
        for balance in &self.balances {
            for coin in &balance.coins {
                total.add(coin);
            }
        }
        total.iter().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StakingGenesis {
    pub params: StakingParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    pub bond_denom: String,
    pub max_validators: u32,
    pub unbonding_time_secs: u64,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            bond_denom: BOND_DENOM.to_string(),
            max_validators: 100,
            unbonding_time_secs: 21 * 24 * 60 * 60,
        }
    }
}

/// Collected genesis transactions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenutilGenesis {
    pub gen_txs: Vec<SignedTransaction>,
}

/// Default genesis of every module
pub fn default_genesis() -> GenesisState {
    GenesisState::default()
}
