// Application state - Auth, bank and staking modules of the test application
use crate::abci::*;
use crate::genesis::GenesisState;
use crate::types::{
    AccountId, Amount, BaseAccount, ChainId, Coin, Coins, Hash, PubKey, SignedTransaction,
    TransactionCall, POWER_REDUCTION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bonded validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: AccountId,
    pub moniker: String,
    pub node_id: String,
    pub consensus_pubkey: PubKey,
    pub tokens: Amount,
}

impl Validator {
    /// Consensus power derived from bonded tokens
    pub fn power(&self) -> u64 {
        u64::try_from(self.tokens / POWER_REDUCTION).unwrap_or(u64::MAX)
    }

    pub fn update(&self) -> ValidatorUpdate {
        ValidatorUpdate {
            pub_key: self.consensus_pubkey,
            power: self.power(),
        }
    }
}

/// Module parameters copied from genesis
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppParams {
    pub bond_denom: String,
    pub max_memo_characters: usize,
    pub max_validators: u32,
}

/// Complete state of the application at one height
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppState {
    pub chain_id: ChainId,
    pub params: AppParams,
    pub accounts: BTreeMap<AccountId, BaseAccount>,
    pub balances: BTreeMap<AccountId, Coins>,
    pub validators: Vec<Validator>,
    pub next_account_number: u64,
}

/// Failure of a single transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFailure {
    pub code: u32,
    pub log: String,
}

impl TxFailure {
    fn new(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }
}

impl From<TxFailure> for TxResult {
    fn from(failure: TxFailure) -> Self {
        TxResult::error(failure.code, failure.log)
    }
}

impl AppState {
    /// State described by a genesis document, before genesis transactions
    pub fn from_genesis(chain_id: ChainId, genesis: &GenesisState) -> Self {
        let mut state = AppState {
            chain_id,
            params: AppParams {
                bond_denom: genesis.staking.params.bond_denom.clone(),
                max_memo_characters: genesis.auth.params.max_memo_characters,
                max_validators: genesis.staking.params.max_validators,
            },
            ..AppState::default()
        };

        for account in &genesis.auth.accounts {
            state.accounts.insert(account.address, account.clone());
            state.next_account_number = state.next_account_number.max(account.account_number + 1);
        }
        for balance in &genesis.bank.balances {
            let coins = state.balances.entry(balance.address).or_default();
            for coin in &balance.coins {
                coins.add(coin);
            }
        }
        state
    }

    /// Blake3 hash of the binary encoding
    pub fn app_hash(&self) -> Hash {
        match bincode::serialize(self) {
            Ok(bytes) => Hash::hash(&bytes),
            Err(_) => Hash::ZERO,
        }
    }

    pub fn account(&self, address: &AccountId) -> Option<&BaseAccount> {
        self.accounts.get(address)
    }

    pub fn balances_of(&self, address: &AccountId) -> Vec<Coin> {
        self.balances
            .get(address)
            .map(|coins| coins.iter().collect())
            .unwrap_or_default()
    }

    /// Runs a signed transaction
    ///
    /// Checks happen before any mutation, so a failed transaction leaves the
    /// state untouched. Genesis transactions skip the account number check.
    pub fn apply(
        &mut self,
        tx: &SignedTransaction,
        genesis: bool,
    ) -> Result<Option<ValidatorUpdate>, TxFailure> {
        let body = &tx.transaction;
        if body.chain_id != self.chain_id {
            return Err(TxFailure::new(
                CODE_WRONG_CHAIN,
                format!("expected chain {}, got {}", self.chain_id, body.chain_id),
            ));
        }
        if body.memo.chars().count() > self.params.max_memo_characters {
            return Err(TxFailure::new(CODE_MEMO_TOO_LARGE, "memo too large"));
        }
        if !tx.verify() {
            return Err(TxFailure::new(CODE_UNAUTHORIZED, "signature verification failed"));
        }

        let account = self.accounts.get(&body.sender).cloned().ok_or_else(|| {
            TxFailure::new(CODE_UNKNOWN_ADDRESS, format!("account {} does not exist", body.sender))
        })?;
        if !genesis && account.account_number != body.account_number {
            return Err(TxFailure::new(
                CODE_UNAUTHORIZED,
                format!(
                    "account number mismatch: expected {}, got {}",
                    account.account_number, body.account_number
                ),
            ));
        }
        if account.sequence != body.sequence {
            return Err(TxFailure::new(
                CODE_INVALID_SEQUENCE,
                format!(
                    "account sequence mismatch: expected {}, got {}",
                    account.sequence, body.sequence
                ),
            ));
        }

        let update = match &body.call {
            TransactionCall::Transfer { to, amount } => {
                self.transfer(&body.sender, to, amount)?;
                None
            }
            TransactionCall::CreateValidator {
                moniker,
                node_id,
                consensus_pubkey,
                self_delegation,
            } => Some(self.create_validator(
                &body.sender,
                moniker,
                node_id,
                *consensus_pubkey,
                self_delegation,
            )?),
        };

        if let Some(account) = self.accounts.get_mut(&body.sender) {
            account.sequence += 1;
        }
        Ok(update)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: &Coin) -> Result<(), TxFailure> {
        if amount.amount == 0 {
            return Err(TxFailure::new(CODE_INVALID_COINS, "transfer amount must be positive"));
        }
        self.debit(from, amount)?;
        self.ensure_account(to);
        self.balances.entry(*to).or_default().add(amount);
        Ok(())
    }

    fn create_validator(
        &mut self,
        operator: &AccountId,
        moniker: &str,
        node_id: &str,
        consensus_pubkey: PubKey,
        self_delegation: &Coin,
    ) -> Result<ValidatorUpdate, TxFailure> {
        if self_delegation.denom != self.params.bond_denom {
            return Err(TxFailure::new(
                CODE_INVALID_COINS,
                format!("self-delegation must be in {}", self.params.bond_denom),
            ));
        }
        if self
            .validators
            .iter()
            .any(|v| v.operator == *operator || v.consensus_pubkey == consensus_pubkey)
        {
            return Err(TxFailure::new(CODE_VALIDATOR_EXISTS, "validator already exists"));
        }
        if self.validators.len() >= self.params.max_validators as usize {
            return Err(TxFailure::new(CODE_VALIDATOR_EXISTS, "validator set is full"));
        }
        if self_delegation.amount < POWER_REDUCTION {
            return Err(TxFailure::new(
                CODE_INVALID_COINS,
                "self-delegation is below one unit of power",
            ));
        }

        self.debit(operator, self_delegation)?;
        let validator = Validator {
            operator: *operator,
            moniker: moniker.to_string(),
            node_id: node_id.to_string(),
            consensus_pubkey,
            tokens: self_delegation.amount,
        };
        let update = validator.update();
        self.validators.push(validator);
        Ok(update)
    }

    fn debit(&mut self, from: &AccountId, amount: &Coin) -> Result<(), TxFailure> {
        let insufficient = || {
            TxFailure::new(
                CODE_INSUFFICIENT_FUNDS,
                format!("account {} cannot cover {}", from, amount),
            )
        };
        let coins = self.balances.get_mut(from).ok_or_else(insufficient)?;
        if !coins.try_sub(amount) {
            return Err(insufficient());
        }
        Ok(())
    }

    /// Creates an auth account for a first-time recipient
    fn ensure_account(&mut self, address: &AccountId) {
        if !self.accounts.contains_key(address) {
            let number = self.next_account_number;
            self.next_account_number += 1;
            self.accounts
                .insert(*address, BaseAccount::new(*address, number, 0));
        }
    }

    /// Current validator set as consensus updates
    pub fn validator_updates(&self) -> Vec<ValidatorUpdate> {
        self.validators
            .iter()
            .filter(|v| v.power() > 0)
            .map(Validator::update)
            .collect()
    }
}
