// Primitives - Minimal fundamental types shared by every component
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Universal hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash data with Blake3
    pub fn hash(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

/// Block height
pub type Height = u64;

/// Token amount in base units
pub type Amount = u128;

/// Native bond denomination of the test chain
pub const BOND_DENOM: &str = "ukrat";

/// Balance every provisioned test account starts with
pub const DEFAULT_TEST_BALANCE: Amount = 99_999_999_999_999_999;

/// Tokens per unit of consensus voting power
pub const POWER_REDUCTION: Amount = 1_000_000;

/// Chain identifier binding genesis, keys and client context together
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Length of randomly generated test chain ids
    pub const RANDOM_LEN: usize = 6;

    pub fn new(id: impl Into<String>) -> Self {
        ChainId(id.into())
    }

    /// Fresh random alphanumeric chain id
    pub fn random() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::RANDOM_LEN)
            .map(char::from)
            .collect();
        ChainId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Amount of a single denomination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Coin in the bond denomination
    pub fn bond(amount: Amount) -> Self {
        Self::new(BOND_DENOM, amount)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sorted set of coins, at most one entry per denomination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(BTreeMap<String, Amount>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn amount_of(&self, denom: &str) -> Amount {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|amount| *amount == 0)
    }

    /// Adds a coin, saturating on overflow
    pub fn add(&mut self, coin: &Coin) {
        let entry = self.0.entry(coin.denom.clone()).or_insert(0);
        *entry = entry.saturating_add(coin.amount);
    }

    /// Subtracts a coin, returning false without mutation when funds are short
    pub fn try_sub(&mut self, coin: &Coin) -> bool {
        let current = self.amount_of(&coin.denom);
        if current < coin.amount {
            return false;
        }
        if current == coin.amount {
            self.0.remove(&coin.denom);
        } else {
            self.0.insert(coin.denom.clone(), current - coin.amount);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0
            .iter()
            .map(|(denom, amount)| Coin::new(denom.clone(), *amount))
    }
}

impl From<Vec<Coin>> for Coins {
    fn from(coins: Vec<Coin>) -> Self {
        let mut set = Coins::new();
        for coin in &coins {
            set.add(coin);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"testnode";
        assert_eq!(Hash::hash(data), Hash::hash(data));
        assert_ne!(Hash::hash(data), Hash::ZERO);
    }

    #[test]
    fn test_random_chain_ids_are_alphanumeric() {
        let a = ChainId::random();
        let b = ChainId::random();
        assert_eq!(a.as_str().len(), ChainId::RANDOM_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_coins_sub_keeps_state_on_shortfall() {
        let mut coins = Coins::from(vec![Coin::bond(10), Coin::new("other", 3)]);
        assert!(!coins.try_sub(&Coin::bond(11)));
        assert_eq!(coins.amount_of(BOND_DENOM), 10);

        assert!(coins.try_sub(&Coin::bond(10)));
        assert_eq!(coins.amount_of(BOND_DENOM), 0);
        assert_eq!(coins.iter().count(), 1);
    }
}
